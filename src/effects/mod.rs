//! Screen-space effects run by the output chain.
//!
//! Every effect is a config (serialized, modulatable) plus a GPU pass built
//! from it. Transforms map the current frame to the next ping-pong surface;
//! generators render into a scratch surface and are composited through the
//! blend compositor. The descriptor table next to [`TransformEffectType`]
//! carries the serialization id, display name, category and routing flags.

mod artistic;
mod cellular;
mod color;
mod flow;
mod generators;
mod graphic;
mod motion;
mod optical;
mod retro;
mod spectrum;
mod symmetry;
mod warp;

pub use artistic::{
    CrossHatchingConfig, ImpressionistConfig, InkWashConfig, OilPaintConfig, PencilSketchConfig,
    WatercolorConfig,
};
pub use cellular::{PhyllotaxisConfig, VoronoiConfig};
pub use color::{ColorGradeConfig, FalseColorConfig, PaletteQuantizationConfig};
pub use flow::{FeedbackFlowConfig, FlowFieldConfig, ProceduralWarpConfig};
pub use generators::{
    ConstellationConfig, InterferenceConfig, MoireGeneratorConfig, MoireLayerConfig, MoirePattern,
    MuonsConfig, NebulaConfig, PlasmaConfig, ScanBarsConfig, SolidColorConfig,
};
pub use graphic::{
    DiscoBallConfig, HalftoneConfig, KuwaharaConfig, LegoBricksConfig, NeonGlowConfig, ToonConfig,
};
pub use motion::{
    DensityWaveSpiralConfig, DrosteZoomConfig, InfiniteZoomConfig, RadialPulseConfig,
    RadialStreakConfig, RelativisticDopplerConfig, ShakeConfig,
};
pub use optical::{
    AnamorphicStreakConfig, AnamorphicStreakEffect, BloomConfig, BloomEffect, BokehConfig,
    HeightfieldReliefConfig,
};
pub use retro::{AsciiArtConfig, GlitchConfig, MatrixRainConfig, PixelationConfig, SynthwaveConfig};
pub use spectrum::{
    FilamentsConfig, FireworksConfig, FireworksEffect, PitchSpiralConfig, SlashesConfig,
    SpectralArcsConfig,
};
pub use symmetry::{
    KaleidoscopeConfig, KifsConfig, LatticeFoldConfig, MandelboxConfig, MoireBlendMode,
    MoireInterferenceConfig, RadialIfsConfig, TriangleFoldConfig,
};
pub use warp::{
    ChladniWarpConfig, CircuitBoardConfig, CorridorWarpConfig, CorridorWarpMode, DomainWarpConfig,
    GradientFlowConfig, InterferenceWarpConfig, MobiusConfig, PoincareDiskConfig, SineWarpConfig,
    SurfaceWarpConfig, TextureWarpConfig, WaveRippleConfig,
};

use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, ColorLut, default_gradient};
use crate::effect_config::EffectConfig;
use crate::gpu::{Gpu, GpuError, ProgramId, ShaderProgram, TextureId, UniformValue};
use anyhow::Context;
use std::f32::consts::PI;
use std::ops::BitOr;

/// Bound for rotation rates, radians per second.
pub const ROTATION_SPEED_MAX: f32 = PI;
/// Bound for static angle offsets, radians.
pub const ROTATION_OFFSET_MAX: f32 = PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformEffectType {
    SineWarp,
    Kaleidoscope,
    InfiniteZoom,
    RadialStreak,
    TextureWarp,
    Voronoi,
    WaveRipple,
    Mobius,
    Pixelation,
    Glitch,
    PoincareDisk,
    Toon,
    HeightfieldRelief,
    GradientFlow,
    DrosteZoom,
    Kifs,
    LatticeFold,
    ColorGrade,
    AsciiArt,
    OilPaint,
    Watercolor,
    NeonGlow,
    RadialPulse,
    FalseColor,
    Halftone,
    ChladniWarp,
    CrossHatching,
    PaletteQuantization,
    Bokeh,
    Bloom,
    Mandelbox,
    TriangleFold,
    DomainWarp,
    Phyllotaxis,
    DensityWaveSpiral,
    MoireInterference,
    PencilSketch,
    MatrixRain,
    Impressionist,
    Kuwahara,
    InkWash,
    DiscoBall,
    SurfaceWarp,
    InterferenceWarp,
    CorridorWarp,
    Shake,
    LegoBricks,
    RadialIfs,
    CircuitBoard,
    Synthwave,
    RelativisticDoppler,
    AnamorphicStreak,
    Constellation,
    Plasma,
    Interference,
    SolidColor,
    ScanBars,
    Muons,
    Nebula,
    Fireworks,
    Filaments,
    Slashes,
    SpectralArcs,
    PitchSpiral,
    MoireGenerator,
}

impl TransformEffectType {
    pub const COUNT: usize = 65;

    /// Dense order; also the default transform order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::SineWarp,
        Self::Kaleidoscope,
        Self::InfiniteZoom,
        Self::RadialStreak,
        Self::TextureWarp,
        Self::Voronoi,
        Self::WaveRipple,
        Self::Mobius,
        Self::Pixelation,
        Self::Glitch,
        Self::PoincareDisk,
        Self::Toon,
        Self::HeightfieldRelief,
        Self::GradientFlow,
        Self::DrosteZoom,
        Self::Kifs,
        Self::LatticeFold,
        Self::ColorGrade,
        Self::AsciiArt,
        Self::OilPaint,
        Self::Watercolor,
        Self::NeonGlow,
        Self::RadialPulse,
        Self::FalseColor,
        Self::Halftone,
        Self::ChladniWarp,
        Self::CrossHatching,
        Self::PaletteQuantization,
        Self::Bokeh,
        Self::Bloom,
        Self::Mandelbox,
        Self::TriangleFold,
        Self::DomainWarp,
        Self::Phyllotaxis,
        Self::DensityWaveSpiral,
        Self::MoireInterference,
        Self::PencilSketch,
        Self::MatrixRain,
        Self::Impressionist,
        Self::Kuwahara,
        Self::InkWash,
        Self::DiscoBall,
        Self::SurfaceWarp,
        Self::InterferenceWarp,
        Self::CorridorWarp,
        Self::Shake,
        Self::LegoBricks,
        Self::RadialIfs,
        Self::CircuitBoard,
        Self::Synthwave,
        Self::RelativisticDoppler,
        Self::AnamorphicStreak,
        Self::Constellation,
        Self::Plasma,
        Self::Interference,
        Self::SolidColor,
        Self::ScanBars,
        Self::Muons,
        Self::Nebula,
        Self::Fireworks,
        Self::Filaments,
        Self::Slashes,
        Self::SpectralArcs,
        Self::PitchSpiral,
        Self::MoireGenerator,
    ];

    /// Integer ids of older presets, which numbered the transforms in
    /// declaration order including a run of simulation boosts that are no
    /// longer transforms. Those slots are `None`.
    const LEGACY_ORDER: [Option<Self>; 58] = [
        Some(Self::SineWarp),
        Some(Self::Kaleidoscope),
        Some(Self::InfiniteZoom),
        Some(Self::RadialStreak),
        Some(Self::TextureWarp),
        Some(Self::Voronoi),
        Some(Self::WaveRipple),
        Some(Self::Mobius),
        Some(Self::Pixelation),
        Some(Self::Glitch),
        Some(Self::PoincareDisk),
        Some(Self::Toon),
        Some(Self::HeightfieldRelief),
        Some(Self::GradientFlow),
        Some(Self::DrosteZoom),
        Some(Self::Kifs),
        Some(Self::LatticeFold),
        Some(Self::ColorGrade),
        Some(Self::AsciiArt),
        Some(Self::OilPaint),
        Some(Self::Watercolor),
        Some(Self::NeonGlow),
        Some(Self::RadialPulse),
        Some(Self::FalseColor),
        Some(Self::Halftone),
        Some(Self::ChladniWarp),
        Some(Self::CrossHatching),
        Some(Self::PaletteQuantization),
        Some(Self::Bokeh),
        Some(Self::Bloom),
        Some(Self::Mandelbox),
        Some(Self::TriangleFold),
        Some(Self::DomainWarp),
        Some(Self::Phyllotaxis),
        // physarum, curl flow, curl advection, attractor flow, boids,
        // cymatics and particle life boosts
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        Some(Self::DensityWaveSpiral),
        Some(Self::MoireInterference),
        Some(Self::PencilSketch),
        Some(Self::MatrixRain),
        Some(Self::Impressionist),
        Some(Self::Kuwahara),
        Some(Self::InkWash),
        Some(Self::DiscoBall),
        Some(Self::SurfaceWarp),
        Some(Self::InterferenceWarp),
        Some(Self::CorridorWarp),
        Some(Self::Shake),
        Some(Self::LegoBricks),
        Some(Self::RadialIfs),
        Some(Self::CircuitBoard),
        Some(Self::Synthwave),
        Some(Self::RelativisticDoppler),
    ];

    /// Resolves an integer entry of an older preset's transform order.
    pub fn from_legacy_index(i: i64) -> Option<Self> {
        usize::try_from(i)
            .ok()
            .and_then(|i| Self::LEGACY_ORDER.get(i).copied().flatten())
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Serialization id, stable across enum renumbering.
    pub fn id(self) -> &'static str {
        match self {
            Self::SineWarp => "sineWarp",
            Self::Kaleidoscope => "kaleidoscope",
            Self::InfiniteZoom => "infiniteZoom",
            Self::RadialStreak => "radialStreak",
            Self::TextureWarp => "textureWarp",
            Self::Voronoi => "voronoi",
            Self::WaveRipple => "waveRipple",
            Self::Mobius => "mobius",
            Self::Pixelation => "pixelation",
            Self::Glitch => "glitch",
            Self::PoincareDisk => "poincareDisk",
            Self::Toon => "toon",
            Self::HeightfieldRelief => "heightfieldRelief",
            Self::GradientFlow => "gradientFlow",
            Self::DrosteZoom => "drosteZoom",
            Self::Kifs => "kifs",
            Self::LatticeFold => "latticeFold",
            Self::ColorGrade => "colorGrade",
            Self::AsciiArt => "asciiArt",
            Self::OilPaint => "oilPaint",
            Self::Watercolor => "watercolor",
            Self::NeonGlow => "neonGlow",
            Self::RadialPulse => "radialPulse",
            Self::FalseColor => "falseColor",
            Self::Halftone => "halftone",
            Self::ChladniWarp => "chladniWarp",
            Self::CrossHatching => "crossHatching",
            Self::PaletteQuantization => "paletteQuantization",
            Self::Bokeh => "bokeh",
            Self::Bloom => "bloom",
            Self::Mandelbox => "mandelbox",
            Self::TriangleFold => "triangleFold",
            Self::DomainWarp => "domainWarp",
            Self::PencilSketch => "pencilSketch",
            Self::Impressionist => "impressionist",
            Self::Kuwahara => "kuwahara",
            Self::InkWash => "inkWash",
            Self::Shake => "shake",
            Self::RadialIfs => "radialIfs",
            Self::Constellation => "constellation",
            Self::Plasma => "plasma",
            Self::Interference => "interference",
            Self::SolidColor => "solidColor",
            Self::ScanBars => "scanBars",
            Self::Muons => "muons",
            Self::Nebula => "nebula",
            Self::Phyllotaxis => "phyllotaxis",
            Self::DensityWaveSpiral => "densityWaveSpiral",
            Self::MoireInterference => "moireInterference",
            Self::MatrixRain => "matrixRain",
            Self::DiscoBall => "discoBall",
            Self::SurfaceWarp => "surfaceWarp",
            Self::InterferenceWarp => "interferenceWarp",
            Self::CorridorWarp => "corridorWarp",
            Self::LegoBricks => "legoBricks",
            Self::CircuitBoard => "circuitBoard",
            Self::Synthwave => "synthwave",
            Self::RelativisticDoppler => "relativisticDoppler",
            Self::AnamorphicStreak => "anamorphicStreak",
            Self::Fireworks => "fireworks",
            Self::Filaments => "filaments",
            Self::Slashes => "slashes",
            Self::SpectralArcs => "spectralArcs",
            Self::PitchSpiral => "pitchSpiral",
            Self::MoireGenerator => "moireGenerator",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SineWarp => "Sine Warp",
            Self::Kaleidoscope => "Kaleidoscope",
            Self::InfiniteZoom => "Infinite Zoom",
            Self::RadialStreak => "Radial Blur",
            Self::TextureWarp => "Texture Warp",
            Self::Voronoi => "Voronoi",
            Self::WaveRipple => "Wave Ripple",
            Self::Mobius => "Mobius",
            Self::Pixelation => "Pixelation",
            Self::Glitch => "Glitch",
            Self::PoincareDisk => "Poincare Disk",
            Self::Toon => "Toon",
            Self::HeightfieldRelief => "Heightfield Relief",
            Self::GradientFlow => "Gradient Flow",
            Self::DrosteZoom => "Droste Zoom",
            Self::Kifs => "KIFS",
            Self::LatticeFold => "Lattice Fold",
            Self::ColorGrade => "Color Grade",
            Self::AsciiArt => "ASCII Art",
            Self::OilPaint => "Oil Paint",
            Self::Watercolor => "Watercolor",
            Self::NeonGlow => "Neon Glow",
            Self::RadialPulse => "Radial Pulse",
            Self::FalseColor => "False Color",
            Self::Halftone => "Halftone",
            Self::ChladniWarp => "Chladni Warp",
            Self::CrossHatching => "Cross-Hatching",
            Self::PaletteQuantization => "Palette Quantization",
            Self::Bokeh => "Bokeh",
            Self::Bloom => "Bloom",
            Self::Mandelbox => "Mandelbox",
            Self::TriangleFold => "Triangle Fold",
            Self::DomainWarp => "Domain Warp",
            Self::PencilSketch => "Pencil Sketch",
            Self::Impressionist => "Impressionist",
            Self::Kuwahara => "Kuwahara",
            Self::InkWash => "Ink Wash",
            Self::Shake => "Shake",
            Self::RadialIfs => "Radial IFS",
            Self::Constellation => "Constellation",
            Self::Plasma => "Plasma",
            Self::Interference => "Interference",
            Self::SolidColor => "Solid Color",
            Self::ScanBars => "Scan Bars",
            Self::Muons => "Muons",
            Self::Nebula => "Nebula",
            Self::Phyllotaxis => "Phyllotaxis",
            Self::DensityWaveSpiral => "Density Wave Spiral",
            Self::MoireInterference => "Moire Interference",
            Self::MatrixRain => "Matrix Rain",
            Self::DiscoBall => "Disco Ball",
            Self::SurfaceWarp => "Surface Warp",
            Self::InterferenceWarp => "Interference Warp",
            Self::CorridorWarp => "Corridor Warp",
            Self::LegoBricks => "LEGO Bricks",
            Self::CircuitBoard => "Circuit Board",
            Self::Synthwave => "Synthwave",
            Self::RelativisticDoppler => "Relativistic Doppler",
            Self::AnamorphicStreak => "Anamorphic Streak",
            Self::Fireworks => "Fireworks",
            Self::Filaments => "Filaments",
            Self::Slashes => "Slashes",
            Self::SpectralArcs => "Spectral Arcs",
            Self::PitchSpiral => "Pitch Spiral",
            Self::MoireGenerator => "Moire Generator",
        }
    }

    /// Accepts the serialization id or, for older presets, the display name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.id() == s)
            .or_else(|| Self::ALL.iter().copied().find(|t| t.name() == s))
    }

    pub fn category(self) -> EffectCategory {
        use EffectCategory as C;
        match self {
            Self::Kaleidoscope
            | Self::Kifs
            | Self::LatticeFold
            | Self::TriangleFold
            | Self::Mandelbox
            | Self::RadialIfs
            | Self::MoireInterference => C::Symmetry,
            Self::SineWarp
            | Self::TextureWarp
            | Self::WaveRipple
            | Self::Mobius
            | Self::PoincareDisk
            | Self::DomainWarp
            | Self::GradientFlow
            | Self::ChladniWarp
            | Self::SurfaceWarp
            | Self::InterferenceWarp
            | Self::CorridorWarp
            | Self::CircuitBoard => C::Warp,
            Self::Voronoi | Self::Phyllotaxis => C::Cellular,
            Self::InfiniteZoom
            | Self::RadialStreak
            | Self::DrosteZoom
            | Self::Shake
            | Self::RadialPulse
            | Self::DensityWaveSpiral
            | Self::RelativisticDoppler => C::Motion,
            Self::OilPaint
            | Self::Watercolor
            | Self::Impressionist
            | Self::InkWash
            | Self::PencilSketch
            | Self::CrossHatching => C::Artistic,
            Self::Toon
            | Self::NeonGlow
            | Self::Halftone
            | Self::Kuwahara
            | Self::DiscoBall
            | Self::LegoBricks => C::Graphic,
            Self::Pixelation
            | Self::Glitch
            | Self::AsciiArt
            | Self::MatrixRain
            | Self::Synthwave => C::Retro,
            Self::Bloom
            | Self::Bokeh
            | Self::HeightfieldRelief
            | Self::AnamorphicStreak => C::Optical,
            Self::ColorGrade | Self::FalseColor | Self::PaletteQuantization => C::Color,
            Self::Constellation
            | Self::Plasma
            | Self::Interference
            | Self::SolidColor
            | Self::ScanBars
            | Self::Muons
            | Self::Nebula
            | Self::Fireworks
            | Self::Filaments
            | Self::Slashes
            | Self::SpectralArcs
            | Self::PitchSpiral
            | Self::MoireGenerator => C::Generator,
        }
    }

    pub fn flags(self) -> EffectFlags {
        match self {
            Self::RadialStreak | Self::Watercolor | Self::Impressionist => EffectFlags::HALF_RES,
            Self::Bloom | Self::AnamorphicStreak => EffectFlags::NEEDS_RESIZE,
            Self::Fireworks => EffectFlags::BLEND | EffectFlags::NEEDS_RESIZE,
            _ if self.category() == EffectCategory::Generator => EffectFlags::BLEND,
            _ => EffectFlags::NONE,
        }
    }

    pub fn descriptor(self) -> EffectDescriptor {
        EffectDescriptor {
            kind: self,
            id: self.id(),
            name: self.name(),
            category: self.category(),
            flags: self.flags(),
        }
    }

    pub fn is_generator(self) -> bool {
        self.flags().contains(EffectFlags::BLEND)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectCategory {
    Symmetry,
    Warp,
    Cellular,
    Motion,
    Artistic,
    Graphic,
    Retro,
    Optical,
    Color,
    Generator,
}

impl EffectCategory {
    pub fn badge(self) -> &'static str {
        match self {
            Self::Symmetry => "SYM",
            Self::Warp => "WARP",
            Self::Cellular => "CELL",
            Self::Motion => "MOT",
            Self::Artistic => "ART",
            Self::Graphic => "GFX",
            Self::Retro => "RET",
            Self::Optical => "OPT",
            Self::Color => "COL",
            Self::Generator => "GEN",
        }
    }
}

/// Routing flags of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectFlags(u8);

impl EffectFlags {
    pub const NONE: Self = Self(0);
    /// Rendered to scratch, then composited through the blend compositor.
    pub const BLEND: Self = Self(1);
    /// Runs on a half-resolution copy and is upsampled afterwards.
    pub const HALF_RES: Self = Self(2);
    /// Owns screen-sized surfaces that follow window resizes.
    pub const NEEDS_RESIZE: Self = Self(8);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EffectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub kind: TransformEffectType,
    pub id: &'static str,
    pub name: &'static str,
    pub category: EffectCategory,
    pub flags: EffectFlags,
}

/// A modulatable float field and its static range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub field: &'static str,
    pub min: f32,
    pub max: f32,
}

/// Named float fields a modulation route can address.
pub trait ParamTable {
    fn param_specs(&self) -> &'static [ParamSpec];
    fn param(&self, field: &str) -> Option<f32>;
    fn param_mut(&mut self, field: &str) -> Option<&mut f32>;
}

/// Config-side contract of every effect in the transform order.
pub trait EffectSettings: ParamTable {
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, on: bool);
}

/// Implements [`ParamTable`] from `field: "id" => min, max;` rows.
macro_rules! param_table {
    ($ty:ty { $($($field:ident).+ : $id:literal => $min:expr, $max:expr;)* }) => {
        impl $crate::effects::ParamTable for $ty {
            fn param_specs(&self) -> &'static [$crate::effects::ParamSpec] {
                &[$($crate::effects::ParamSpec { field: $id, min: $min, max: $max }),*]
            }

            fn param(&self, field: &str) -> Option<f32> {
                match field {
                    $($id => Some(self.$($field).+),)*
                    _ => None,
                }
            }

            fn param_mut(&mut self, field: &str) -> Option<&mut f32> {
                match field {
                    $($id => Some(&mut self.$($field).+),)*
                    _ => None,
                }
            }
        }
    };
}
pub(crate) use param_table;

/// [`param_table!`] plus the `enabled` flag accessors.
macro_rules! effect_settings {
    ($ty:ty { $($rows:tt)* }) => {
        $crate::effects::param_table!($ty { $($rows)* });

        impl $crate::effects::EffectSettings for $ty {
            fn enabled(&self) -> bool {
                self.enabled
            }

            fn set_enabled(&mut self, on: bool) {
                self.enabled = on;
            }
        }
    };
}
pub(crate) use effect_settings;

/// A CPU-side accumulator so rate edits never make the image jump.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Phase(pub f32);

impl Phase {
    pub fn advance(&mut self, rate: f32, dt: f32) -> f32 {
        self.0 += rate * dt;
        self.0
    }

    /// Like [`Phase::advance`] but kept in [0, 2π).
    pub fn spin(&mut self, rate: f32, dt: f32) -> f32 {
        self.0 = (self.0 + rate * dt).rem_euclid(std::f32::consts::TAU);
        self.0
    }
}

/// Rotation plus per-iteration twist, both rate driven.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpinState {
    pub rotation: Phase,
    pub twist: Phase,
}

/// Gradient-mode colour used as the default of generator LUTs.
pub(crate) fn gradient_color() -> ColorConfig {
    ColorConfig::gradient(default_gradient())
}

/// Per-frame inputs available to every setup.
#[derive(Debug, Clone, Copy)]
pub struct EffectFrame {
    pub dt: f32,
    pub width: u32,
    pub height: u32,
    pub fft: TextureId,
    pub waveform: TextureId,
    pub waveform_write_index: usize,
}

impl EffectFrame {
    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Writes uniforms of one program for the current frame.
pub struct UniformWriter<'a> {
    gpu: &'a mut dyn Gpu,
    program: &'a ShaderProgram,
}

impl<'a> UniformWriter<'a> {
    pub fn new(gpu: &'a mut dyn Gpu, program: &'a ShaderProgram) -> Self {
        Self { gpu, program }
    }

    pub fn f32(&mut self, name: &str, v: f32) {
        self.program.set_f32(self.gpu, name, v);
    }

    pub fn i32(&mut self, name: &str, v: i32) {
        self.program.set_i32(self.gpu, name, v);
    }

    pub fn flag(&mut self, name: &str, on: bool) {
        self.program.set_i32(self.gpu, name, i32::from(on));
    }

    pub fn vec2(&mut self, name: &str, v: [f32; 2]) {
        self.program.set_vec2(self.gpu, name, v);
    }

    pub fn vec3(&mut self, name: &str, v: [f32; 3]) {
        self.program.set_vec3(self.gpu, name, v);
    }

    pub fn vec4(&mut self, name: &str, v: [f32; 4]) {
        self.program.set_vec4(self.gpu, name, v);
    }

    pub fn floats(&mut self, name: &str, v: Vec<f32>) {
        self.program.set(self.gpu, name, UniformValue::FloatArray(v));
    }

    pub fn texture(&mut self, name: &str, t: TextureId) {
        self.program.set_texture(self.gpu, name, t);
    }
}

/// A single-program effect: shader, uniform schema, CPU accumulators.
///
/// `setup` advances the accumulators in `state` by `dt` times the config's
/// rates and pushes every uniform. Rates are read fresh each frame since
/// modulation may have rewritten them.
pub trait TransformEffect: EffectSettings + Clone + 'static {
    const KIND: TransformEffectType;
    const SHADER: &'static str;
    const UNIFORMS: &'static [&'static str];
    type State: Default;

    fn select(cfg: &EffectConfig) -> &Self;

    /// Colour configs sampled into owned LUTs, bound in order.
    fn gradients(&self) -> Vec<&ColorConfig> {
        Vec::new()
    }

    /// Blend mode and intensity for generators.
    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        None
    }

    fn setup(&self, state: &mut Self::State, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]);
}

/// GPU side of an effect as the pipeline drives it.
pub trait EffectModule {
    fn kind(&self) -> TransformEffectType;
    fn program(&self) -> ProgramId;
    fn setup(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, frame: &EffectFrame);

    fn blend(&self, _cfg: &EffectConfig) -> Option<(EffectBlendMode, f32)> {
        None
    }

    /// One pass from `input` into `target`.
    fn render(&mut self, gpu: &mut dyn Gpu, input: TextureId, target: TextureId) -> Result<(), GpuError> {
        gpu.draw_fullscreen(self.program(), input, target)
    }

    fn resize(&mut self, _gpu: &mut dyn Gpu, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu);
}

/// Runtime of a [`TransformEffect`]: the loaded program, its LUTs and state.
pub struct EffectPass<C: TransformEffect> {
    program: ShaderProgram,
    luts: Vec<ColorLut>,
    state: C::State,
}

impl<C: TransformEffect> EffectPass<C> {
    pub fn new(gpu: &mut dyn Gpu, cfg: &C) -> Result<Self, GpuError> {
        let program = ShaderProgram::fragment(gpu, C::SHADER, C::UNIFORMS)?;
        let mut luts = Vec::new();
        for color in cfg.gradients() {
            match ColorLut::new(gpu, color) {
                Ok(lut) => luts.push(lut),
                Err(err) => {
                    luts.into_iter().for_each(|l: ColorLut| l.release(gpu));
                    program.release(gpu);
                    return Err(err);
                }
            }
        }
        Ok(Self {
            program,
            luts,
            state: C::State::default(),
        })
    }

    pub fn state(&self) -> &C::State {
        &self.state
    }
}

impl<C: TransformEffect> EffectModule for EffectPass<C> {
    fn kind(&self) -> TransformEffectType {
        C::KIND
    }

    fn program(&self) -> ProgramId {
        self.program.id()
    }

    fn setup(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, frame: &EffectFrame) {
        let cfg = C::select(cfg);
        for (lut, color) in self.luts.iter_mut().zip(cfg.gradients()) {
            lut.update(gpu, color);
        }
        let luts: Vec<TextureId> = self.luts.iter().map(ColorLut::texture).collect();
        let mut u = UniformWriter::new(gpu, &self.program);
        cfg.setup(&mut self.state, &mut u, frame, &luts);
    }

    fn blend(&self, cfg: &EffectConfig) -> Option<(EffectBlendMode, f32)> {
        C::select(cfg).blend()
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu) {
        let this = *self;
        this.luts.into_iter().for_each(|l| l.release(gpu));
        this.program.release(gpu);
    }
}

fn boxed<C: TransformEffect>(gpu: &mut dyn Gpu, cfg: &EffectConfig) -> anyhow::Result<Box<dyn EffectModule>> {
    let pass = EffectPass::<C>::new(gpu, C::select(cfg)).with_context(|| C::KIND.name())?;
    Ok(Box::new(pass))
}

/// Builds the GPU side of `kind`. Errors leave nothing allocated.
pub fn create_effect(
    kind: TransformEffectType,
    gpu: &mut dyn Gpu,
    cfg: &EffectConfig,
    width: u32,
    height: u32,
) -> anyhow::Result<Box<dyn EffectModule>> {
    use TransformEffectType as T;
    match kind {
        T::SineWarp => boxed::<SineWarpConfig>(gpu, cfg),
        T::Kaleidoscope => boxed::<KaleidoscopeConfig>(gpu, cfg),
        T::InfiniteZoom => boxed::<InfiniteZoomConfig>(gpu, cfg),
        T::RadialStreak => boxed::<RadialStreakConfig>(gpu, cfg),
        T::TextureWarp => boxed::<TextureWarpConfig>(gpu, cfg),
        T::Voronoi => boxed::<VoronoiConfig>(gpu, cfg),
        T::WaveRipple => boxed::<WaveRippleConfig>(gpu, cfg),
        T::Mobius => boxed::<MobiusConfig>(gpu, cfg),
        T::Pixelation => boxed::<PixelationConfig>(gpu, cfg),
        T::Glitch => boxed::<GlitchConfig>(gpu, cfg),
        T::PoincareDisk => boxed::<PoincareDiskConfig>(gpu, cfg),
        T::Toon => boxed::<ToonConfig>(gpu, cfg),
        T::HeightfieldRelief => boxed::<HeightfieldReliefConfig>(gpu, cfg),
        T::GradientFlow => boxed::<GradientFlowConfig>(gpu, cfg),
        T::DrosteZoom => boxed::<DrosteZoomConfig>(gpu, cfg),
        T::Kifs => boxed::<KifsConfig>(gpu, cfg),
        T::LatticeFold => boxed::<LatticeFoldConfig>(gpu, cfg),
        T::ColorGrade => boxed::<ColorGradeConfig>(gpu, cfg),
        T::AsciiArt => boxed::<AsciiArtConfig>(gpu, cfg),
        T::OilPaint => boxed::<OilPaintConfig>(gpu, cfg),
        T::Watercolor => boxed::<WatercolorConfig>(gpu, cfg),
        T::NeonGlow => boxed::<NeonGlowConfig>(gpu, cfg),
        T::RadialPulse => boxed::<RadialPulseConfig>(gpu, cfg),
        T::FalseColor => boxed::<FalseColorConfig>(gpu, cfg),
        T::Halftone => boxed::<HalftoneConfig>(gpu, cfg),
        T::ChladniWarp => boxed::<ChladniWarpConfig>(gpu, cfg),
        T::CrossHatching => boxed::<CrossHatchingConfig>(gpu, cfg),
        T::PaletteQuantization => boxed::<PaletteQuantizationConfig>(gpu, cfg),
        T::Bokeh => boxed::<BokehConfig>(gpu, cfg),
        T::Bloom => {
            let bloom = BloomEffect::new(gpu, width, height).context("Bloom")?;
            Ok(Box::new(bloom))
        }
        T::Mandelbox => boxed::<MandelboxConfig>(gpu, cfg),
        T::TriangleFold => boxed::<TriangleFoldConfig>(gpu, cfg),
        T::DomainWarp => boxed::<DomainWarpConfig>(gpu, cfg),
        T::PencilSketch => boxed::<PencilSketchConfig>(gpu, cfg),
        T::Impressionist => boxed::<ImpressionistConfig>(gpu, cfg),
        T::Kuwahara => boxed::<KuwaharaConfig>(gpu, cfg),
        T::InkWash => boxed::<InkWashConfig>(gpu, cfg),
        T::Shake => boxed::<ShakeConfig>(gpu, cfg),
        T::RadialIfs => boxed::<RadialIfsConfig>(gpu, cfg),
        T::Constellation => boxed::<ConstellationConfig>(gpu, cfg),
        T::Plasma => boxed::<PlasmaConfig>(gpu, cfg),
        T::Interference => boxed::<InterferenceConfig>(gpu, cfg),
        T::SolidColor => boxed::<SolidColorConfig>(gpu, cfg),
        T::ScanBars => boxed::<ScanBarsConfig>(gpu, cfg),
        T::Muons => boxed::<MuonsConfig>(gpu, cfg),
        T::Nebula => boxed::<NebulaConfig>(gpu, cfg),
        T::Phyllotaxis => boxed::<PhyllotaxisConfig>(gpu, cfg),
        T::DensityWaveSpiral => boxed::<DensityWaveSpiralConfig>(gpu, cfg),
        T::MoireInterference => boxed::<MoireInterferenceConfig>(gpu, cfg),
        T::MatrixRain => boxed::<MatrixRainConfig>(gpu, cfg),
        T::DiscoBall => boxed::<DiscoBallConfig>(gpu, cfg),
        T::SurfaceWarp => boxed::<SurfaceWarpConfig>(gpu, cfg),
        T::InterferenceWarp => boxed::<InterferenceWarpConfig>(gpu, cfg),
        T::CorridorWarp => boxed::<CorridorWarpConfig>(gpu, cfg),
        T::LegoBricks => boxed::<LegoBricksConfig>(gpu, cfg),
        T::CircuitBoard => boxed::<CircuitBoardConfig>(gpu, cfg),
        T::Synthwave => boxed::<SynthwaveConfig>(gpu, cfg),
        T::RelativisticDoppler => boxed::<RelativisticDopplerConfig>(gpu, cfg),
        T::AnamorphicStreak => {
            let streak = AnamorphicStreakEffect::new(gpu, width, height).context("Anamorphic Streak")?;
            Ok(Box::new(streak))
        }
        T::Fireworks => {
            let fireworks = FireworksEffect::new(gpu, cfg, width, height).context("Fireworks")?;
            Ok(Box::new(fireworks))
        }
        T::Filaments => boxed::<FilamentsConfig>(gpu, cfg),
        T::Slashes => boxed::<SlashesConfig>(gpu, cfg),
        T::SpectralArcs => boxed::<SpectralArcsConfig>(gpu, cfg),
        T::PitchSpiral => boxed::<PitchSpiralConfig>(gpu, cfg),
        T::MoireGenerator => boxed::<MoireGeneratorConfig>(gpu, cfg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_order_matches_discriminants() {
        for (i, t) in TransformEffectType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i, "{} out of place", t.id());
        }
    }

    #[test]
    fn legacy_indices_skip_retired_boosts() {
        use TransformEffectType as T;
        assert_eq!(T::from_legacy_index(0), Some(T::SineWarp));
        assert_eq!(T::from_legacy_index(32), Some(T::DomainWarp));
        assert_eq!(T::from_legacy_index(33), Some(T::Phyllotaxis));
        for i in 34..=40 {
            assert_eq!(T::from_legacy_index(i), None, "slot {i} is a boost");
        }
        assert_eq!(T::from_legacy_index(41), Some(T::DensityWaveSpiral));
        assert_eq!(T::from_legacy_index(43), Some(T::PencilSketch));
        assert_eq!(T::from_legacy_index(57), Some(T::RelativisticDoppler));
        assert_eq!(T::from_legacy_index(58), None);
        assert_eq!(T::from_legacy_index(-1), None);

        let mapped: Vec<T> = (0..58).filter_map(T::from_legacy_index).collect();
        let mut unique = mapped.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), mapped.len(), "a transform appears twice");
        assert!(mapped.iter().all(|t| !t.is_generator()));
        assert!(!mapped.contains(&T::AnamorphicStreak));
    }

    #[test]
    fn ids_and_names_parse_back() {
        for t in TransformEffectType::ALL {
            assert_eq!(TransformEffectType::parse(t.id()), Some(t));
            assert_eq!(TransformEffectType::parse(t.name()), Some(t));
        }
        assert_eq!(TransformEffectType::parse("warpDrive"), None);
    }

    #[test]
    fn flags_follow_category() {
        assert!(TransformEffectType::Plasma.flags().contains(EffectFlags::BLEND));
        assert!(TransformEffectType::Watercolor.flags().contains(EffectFlags::HALF_RES));
        assert!(TransformEffectType::Bloom.flags().contains(EffectFlags::NEEDS_RESIZE));
        assert!(TransformEffectType::AnamorphicStreak.flags().contains(EffectFlags::NEEDS_RESIZE));
        let fireworks = TransformEffectType::Fireworks.flags();
        assert!(fireworks.contains(EffectFlags::BLEND) && fireworks.contains(EffectFlags::NEEDS_RESIZE));
        assert!(TransformEffectType::MoireGenerator.is_generator());
        assert!(!TransformEffectType::MoireInterference.is_generator());
        assert_eq!(TransformEffectType::Kifs.flags(), EffectFlags::NONE);
        assert_eq!(TransformEffectType::Voronoi.category().badge(), "CELL");
    }
}
