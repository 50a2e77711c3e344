//! Generators: synthesize imagery, then composite through the blend
//! compositor with their own mode and intensity.

use super::{
    EffectFrame, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX, TransformEffect, TransformEffectType,
    UniformWriter, effect_settings, gradient_color,
};
use crate::audio::SAMPLE_RATE;
use crate::blend::EffectBlendMode;
use crate::color::ColorConfig;
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use crate::lissajous::DualLissajousConfig;
use serde::{Deserialize, Serialize};

/// Shared tail of every generator's `setup`.
pub(super) fn bind_lut(u: &mut UniformWriter<'_>, name: &str, luts: &[TextureId], slot: usize) {
    if let Some(&lut) = luts.get(slot) {
        u.texture(name, lut);
    }
}

/// FFT mapping parameters shared by the audio-reactive generators.
pub(super) fn bind_spectrum(u: &mut UniformWriter<'_>, frame: &EffectFrame, base_freq: f32, gain: f32, curve: f32, base_bright: f32) {
    u.texture("fftTexture", frame.fft);
    u.f32("sampleRate", SAMPLE_RATE as f32);
    u.f32("baseFreq", base_freq);
    u.f32("gain", gain);
    u.f32("curve", curve);
    u.f32("baseBright", base_bright);
}

/// Falloff of a bolt's glow with distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PlasmaFalloff {
    Sharp,
    #[default]
    Linear,
    Soft,
}

impl From<i32> for PlasmaFalloff {
    fn from(i: i32) -> Self {
        match i {
            0 => Self::Sharp,
            2 => Self::Soft,
            _ => Self::Linear,
        }
    }
}

impl From<PlasmaFalloff> for i32 {
    fn from(f: PlasmaFalloff) -> i32 {
        f as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlasmaConfig {
    pub enabled: bool,
    pub bolt_count: i32,
    /// Background layers drawn at smaller scale.
    pub layer_count: i32,
    /// Few octaves read as smooth plasma, many as jagged lightning.
    pub octaves: i32,
    pub falloff_type: PlasmaFalloff,
    pub drift_speed: f32,
    pub drift_amount: f32,
    pub anim_speed: f32,
    pub displacement: f32,
    pub glow_radius: f32,
    pub core_brightness: f32,
    pub flicker_amount: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for PlasmaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bolt_count: 3,
            layer_count: 2,
            octaves: 6,
            falloff_type: PlasmaFalloff::Linear,
            drift_speed: 0.5,
            drift_amount: 0.3,
            anim_speed: 0.8,
            displacement: 1.0,
            glow_radius: 0.07,
            core_brightness: 1.5,
            flicker_amount: 0.2,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(PlasmaConfig {
    anim_speed: "animSpeed" => 0.0, 5.0;
    core_brightness: "coreBrightness" => 0.5, 3.0;
    displacement: "displacement" => 0.0, 2.0;
    drift_amount: "driftAmount" => 0.0, 1.0;
    drift_speed: "driftSpeed" => 0.0, 2.0;
    flicker_amount: "flickerAmount" => 0.0, 1.0;
    glow_radius: "glowRadius" => 0.01, 0.3;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PlasmaState {
    anim: Phase,
    drift: Phase,
    flicker: Phase,
}

impl TransformEffect for PlasmaConfig {
    const KIND: TransformEffectType = TransformEffectType::Plasma;
    const SHADER: &'static str = "shaders/plasma.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "boltCount",
        "layerCount",
        "octaves",
        "falloffType",
        "animPhase",
        "driftPhase",
        "driftAmount",
        "flickerTime",
        "flickerAmount",
        "displacement",
        "glowRadius",
        "coreBrightness",
        "gradientLUT",
    ];
    type State = PlasmaState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.plasma
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut PlasmaState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("boltCount", self.bolt_count.clamp(1, 8));
        u.i32("layerCount", self.layer_count.clamp(1, 3));
        u.i32("octaves", self.octaves.clamp(1, 10));
        u.i32("falloffType", self.falloff_type.into());
        u.f32("animPhase", s.anim.advance(self.anim_speed, frame.dt));
        u.f32("driftPhase", s.drift.advance(self.drift_speed, frame.dt));
        u.f32("driftAmount", self.drift_amount);
        // Flicker runs on wall time so it never freezes with animSpeed at 0.
        u.f32("flickerTime", s.flicker.advance(1.0, frame.dt));
        u.f32("flickerAmount", self.flicker_amount);
        u.f32("displacement", self.displacement);
        u.f32("glowRadius", self.glow_radius);
        u.f32("coreBrightness", self.core_brightness);
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Ray-marched turbulent rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MuonsConfig {
    pub enabled: bool,
    pub march_steps: i32,
    pub turbulence_octaves: i32,
    pub turbulence_strength: f32,
    pub ring_thickness: f32,
    pub camera_distance: f32,
    pub color_freq: f32,
    pub color_speed: f32,
    pub gradient: ColorConfig,
    pub brightness: f32,
    /// Tonemap divisor; lower is brighter.
    pub exposure: f32,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for MuonsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            march_steps: 10,
            turbulence_octaves: 9,
            turbulence_strength: 1.0,
            ring_thickness: 0.03,
            camera_distance: 9.0,
            color_freq: 33.0,
            color_speed: 0.5,
            gradient: gradient_color(),
            brightness: 1.0,
            exposure: 3000.0,
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(MuonsConfig {
    turbulence_strength: "turbulenceStrength" => 0.0, 2.0;
    ring_thickness: "ringThickness" => 0.005, 0.1;
    camera_distance: "cameraDistance" => 3.0, 20.0;
    color_freq: "colorFreq" => 0.5, 50.0;
    color_speed: "colorSpeed" => 0.0, 2.0;
    brightness: "brightness" => 0.5, 3.0;
    exposure: "exposure" => 500.0, 10000.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MuonsState {
    time: Phase,
    color: Phase,
}

impl TransformEffect for MuonsConfig {
    const KIND: TransformEffectType = TransformEffectType::Muons;
    const SHADER: &'static str = "shaders/muons.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "marchSteps",
        "turbulenceOctaves",
        "turbulenceStrength",
        "ringThickness",
        "cameraDistance",
        "colorFreq",
        "colorPhase",
        "brightness",
        "exposure",
        "gradientLUT",
    ];
    type State = MuonsState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.muons
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut MuonsState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("time", s.time.advance(1.0, frame.dt));
        u.i32("marchSteps", self.march_steps.clamp(4, 40));
        u.i32("turbulenceOctaves", self.turbulence_octaves.clamp(1, 12));
        u.f32("turbulenceStrength", self.turbulence_strength);
        u.f32("ringThickness", self.ring_thickness);
        u.f32("cameraDistance", self.camera_distance);
        u.f32("colorFreq", self.color_freq);
        u.f32("colorPhase", s.color.advance(self.color_speed, frame.dt).fract());
        u.f32("brightness", self.brightness);
        u.f32("exposure", self.exposure.max(1.0));
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Circular waves from moving emitters, summed with optional mirror sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterferenceConfig {
    pub enabled: bool,
    pub source_count: i32,
    pub base_radius: f32,
    pub lissajous: DualLissajousConfig,
    pub wave_freq: f32,
    pub wave_speed: f32,
    /// 0 none, 1 inverse, 2 inverse square, 3 gaussian.
    pub falloff_type: i32,
    pub falloff_strength: f32,
    pub boundaries: bool,
    pub reflection_gain: f32,
    /// 0 raw, 1 absolute, 2 contour.
    pub visual_mode: i32,
    pub contour_count: i32,
    pub visual_gain: f32,
    /// 0 intensity, 1 per source, 2 chromatic.
    pub color_mode: i32,
    pub chroma_spread: f32,
    pub color: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

pub const MAX_INTERFERENCE_SOURCES: usize = 8;

impl Default for InterferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_count: 3,
            base_radius: 0.4,
            lissajous: DualLissajousConfig::default(),
            wave_freq: 30.0,
            wave_speed: 2.0,
            falloff_type: 3,
            falloff_strength: 1.0,
            boundaries: false,
            reflection_gain: 0.5,
            visual_mode: 0,
            contour_count: 8,
            visual_gain: 1.5,
            color_mode: 0,
            chroma_spread: 0.03,
            color: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(InterferenceConfig {
    base_radius: "baseRadius" => 0.0, 1.0;
    chroma_spread: "chromaSpread" => 0.0, 0.1;
    falloff_strength: "falloffStrength" => 0.0, 5.0;
    lissajous.amplitude: "lissajous.amplitude" => 0.0, 0.5;
    lissajous.motion_speed: "lissajous.motionSpeed" => 0.0, 5.0;
    reflection_gain: "reflectionGain" => 0.0, 1.0;
    visual_gain: "visualGain" => 0.5, 5.0;
    wave_freq: "waveFreq" => 5.0, 100.0;
    wave_speed: "waveSpeed" => 0.0, 10.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Default)]
pub struct InterferenceState {
    time: Phase,
    motion: Phase,
}

impl TransformEffect for InterferenceConfig {
    const KIND: TransformEffectType = TransformEffectType::Interference;
    const SHADER: &'static str = "shaders/interference.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "sources",
        "sourceCount",
        "waveFreq",
        "falloffType",
        "falloffStrength",
        "boundaries",
        "reflectionGain",
        "visualMode",
        "contourCount",
        "visualGain",
        "colorMode",
        "chromaSpread",
        "colorLUT",
    ];
    type State = InterferenceState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.interference
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.color]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut InterferenceState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        let count = self.source_count.clamp(1, MAX_INTERFERENCE_SOURCES as i32) as usize;
        let mut motion = self.lissajous.clone();
        motion.phase = s.motion.0;
        let sources = motion.update_multi(frame.dt, count, self.base_radius, (0.5, 0.5));
        s.motion.0 = motion.phase;
        u.vec2("resolution", frame.resolution());
        u.f32("time", s.time.advance(self.wave_speed, frame.dt));
        u.floats("sources", sources.iter().flat_map(|&(x, y)| [x, y]).collect());
        u.i32("sourceCount", count as i32);
        u.f32("waveFreq", self.wave_freq);
        u.i32("falloffType", self.falloff_type.clamp(0, 3));
        u.f32("falloffStrength", self.falloff_strength);
        u.flag("boundaries", self.boundaries);
        u.f32("reflectionGain", self.reflection_gain);
        u.i32("visualMode", self.visual_mode.clamp(0, 2));
        u.i32("contourCount", self.contour_count.clamp(2, 20));
        u.f32("visualGain", self.visual_gain);
        u.i32("colorMode", self.color_mode.clamp(0, 2));
        u.f32("chromaSpread", self.chroma_spread);
        bind_lut(u, "colorLUT", luts, 0);
    }
}

/// Wandering grid points joined by glowing lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstellationConfig {
    pub enabled: bool,
    /// Cells across the screen.
    pub grid_scale: f32,
    pub anim_speed: f32,
    pub wander_amp: f32,
    pub wave_freq: f32,
    pub wave_amp: f32,
    pub wave_speed: f32,
    pub fill_enabled: bool,
    pub fill_opacity: f32,
    /// Triangles with a longer perimeter are not filled.
    pub fill_threshold: f32,
    pub wave_center_x: f32,
    pub wave_center_y: f32,
    pub point_size: f32,
    pub point_brightness: f32,
    pub line_thickness: f32,
    pub max_line_len: f32,
    pub line_opacity: f32,
    /// Blend endpoint colours instead of sampling by length.
    pub interpolate_line_color: bool,
    pub point_gradient: ColorConfig,
    pub line_gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_scale: 21.0,
            anim_speed: 1.0,
            wander_amp: 0.4,
            wave_freq: 1.0,
            wave_amp: 2.0,
            wave_speed: 0.5,
            fill_enabled: false,
            fill_opacity: 0.3,
            fill_threshold: 2.5,
            wave_center_x: 0.5,
            wave_center_y: 0.5,
            point_size: 1.0,
            point_brightness: 1.0,
            line_thickness: 0.05,
            max_line_len: 1.5,
            line_opacity: 0.5,
            interpolate_line_color: false,
            point_gradient: gradient_color(),
            line_gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(ConstellationConfig {
    anim_speed: "animSpeed" => 0.0, 5.0;
    grid_scale: "gridScale" => 5.0, 50.0;
    line_opacity: "lineOpacity" => 0.0, 1.0;
    max_line_len: "maxLineLen" => 0.5, 2.0;
    point_brightness: "pointBrightness" => 0.0, 2.0;
    point_size: "pointSize" => 0.3, 3.0;
    wave_amp: "waveAmp" => 0.0, 4.0;
    wave_speed: "waveSpeed" => 0.0, 5.0;
    wander_amp: "wanderAmp" => 0.0, 0.5;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstellationState {
    anim: Phase,
    wave: Phase,
}

impl TransformEffect for ConstellationConfig {
    const KIND: TransformEffectType = TransformEffectType::Constellation;
    const SHADER: &'static str = "shaders/constellation.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "animPhase",
        "wavePhase",
        "gridScale",
        "wanderAmp",
        "waveFreq",
        "waveAmp",
        "waveCenter",
        "fillEnabled",
        "fillOpacity",
        "fillThreshold",
        "pointSize",
        "pointBrightness",
        "lineThickness",
        "maxLineLen",
        "lineOpacity",
        "interpolateLineColor",
        "pointLUT",
        "lineLUT",
    ];
    type State = ConstellationState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.constellation
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.point_gradient, &self.line_gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut ConstellationState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("animPhase", s.anim.advance(self.anim_speed, frame.dt));
        u.f32("wavePhase", s.wave.advance(self.wave_speed, frame.dt));
        u.f32("gridScale", self.grid_scale);
        u.f32("wanderAmp", self.wander_amp);
        u.f32("waveFreq", self.wave_freq);
        u.f32("waveAmp", self.wave_amp);
        u.vec2("waveCenter", [self.wave_center_x, self.wave_center_y]);
        u.flag("fillEnabled", self.fill_enabled);
        u.f32("fillOpacity", self.fill_opacity);
        u.f32("fillThreshold", self.fill_threshold);
        u.f32("pointSize", self.point_size);
        u.f32("pointBrightness", self.point_brightness);
        u.f32("lineThickness", self.line_thickness);
        u.f32("maxLineLen", self.max_line_len);
        u.f32("lineOpacity", self.line_opacity);
        u.flag("interpolateLineColor", self.interpolate_line_color);
        bind_lut(u, "pointLUT", luts, 0);
        bind_lut(u, "lineLUT", luts, 1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolidColorConfig {
    pub enabled: bool,
    pub color: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for SolidColorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color: ColorConfig::default(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(SolidColorConfig {
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for SolidColorConfig {
    const KIND: TransformEffectType = TransformEffectType::SolidColor;
    const SHADER: &'static str = "shaders/solid_color.fs";
    const UNIFORMS: &'static [&'static str] = &["color"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.solid_color
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, _luts: &[TextureId]) {
        let [r, g, b] = self.color.eval(0.5);
        u.vec4("color", [r, g, b, 1.0]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ScanBarsMode {
    #[default]
    Linear,
    Spokes,
    Rings,
}

impl From<i32> for ScanBarsMode {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Spokes,
            2 => Self::Rings,
            _ => Self::Linear,
        }
    }
}

impl From<ScanBarsMode> for i32 {
    fn from(m: ScanBarsMode) -> i32 {
        m as i32
    }
}

/// Scrolling bars whose brightness follows the spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanBarsConfig {
    pub enabled: bool,
    pub mode: ScanBarsMode,
    pub angle: f32,
    pub bar_density: f32,
    pub convergence: f32,
    pub convergence_freq: f32,
    pub convergence_offset: f32,
    pub sharpness: f32,
    pub scroll_speed: f32,
    pub color_speed: f32,
    pub chaos_freq: f32,
    pub chaos_intensity: f32,
    /// Time quantization; 0 is smooth.
    pub snap_amount: f32,
    /// Lowest mapped frequency in Hz.
    pub base_freq: f32,
    pub num_octaves: f32,
    pub gain: f32,
    pub curve: f32,
    pub base_bright: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for ScanBarsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ScanBarsMode::Linear,
            angle: 0.0,
            bar_density: 10.0,
            convergence: 0.5,
            convergence_freq: 5.0,
            convergence_offset: 0.0,
            sharpness: 0.1,
            scroll_speed: 0.2,
            color_speed: 1.0,
            chaos_freq: 10.0,
            chaos_intensity: 1.0,
            snap_amount: 0.0,
            base_freq: 55.0,
            num_octaves: 5.0,
            gain: 2.0,
            curve: 0.7,
            base_bright: 0.15,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(ScanBarsConfig {
    angle: "angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    bar_density: "barDensity" => 1.0, 100.0;
    convergence: "convergence" => 0.0, 2.0;
    convergence_freq: "convergenceFreq" => 0.0, 20.0;
    convergence_offset: "convergenceOffset" => -1.0, 1.0;
    sharpness: "sharpness" => 0.01, 1.0;
    scroll_speed: "scrollSpeed" => 0.0, 5.0;
    color_speed: "colorSpeed" => 0.0, 5.0;
    chaos_freq: "chaosFreq" => 0.0, 50.0;
    chaos_intensity: "chaosIntensity" => 0.0, 5.0;
    snap_amount: "snapAmount" => 0.0, 2.0;
    base_freq: "baseFreq" => 27.5, 440.0;
    gain: "gain" => 0.1, 10.0;
    curve: "curve" => 0.1, 3.0;
    base_bright: "baseBright" => 0.0, 1.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanBarsState {
    scroll: Phase,
    color: Phase,
    time: Phase,
}

impl TransformEffect for ScanBarsConfig {
    const KIND: TransformEffectType = TransformEffectType::ScanBars;
    const SHADER: &'static str = "shaders/scan_bars.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "mode",
        "angle",
        "barDensity",
        "convergence",
        "convergenceFreq",
        "convergenceOffset",
        "sharpness",
        "scrollPhase",
        "colorPhase",
        "time",
        "chaosFreq",
        "chaosIntensity",
        "snapAmount",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "numOctaves",
        "gain",
        "curve",
        "baseBright",
        "gradientLUT",
    ];
    type State = ScanBarsState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.scan_bars
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut ScanBarsState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("mode", self.mode.into());
        u.f32("angle", self.angle);
        u.f32("barDensity", self.bar_density);
        u.f32("convergence", self.convergence);
        u.f32("convergenceFreq", self.convergence_freq);
        u.f32("convergenceOffset", self.convergence_offset);
        u.f32("sharpness", self.sharpness);
        u.f32("scrollPhase", s.scroll.advance(self.scroll_speed, frame.dt));
        u.f32("colorPhase", s.color.advance(self.color_speed, frame.dt));
        u.f32("time", s.time.advance(1.0, frame.dt));
        u.f32("chaosFreq", self.chaos_freq);
        u.f32("chaosIntensity", self.chaos_intensity);
        u.f32("snapAmount", self.snap_amount);
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.f32("numOctaves", self.num_octaves);
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Layered fractal gas with semitone-mapped stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NebulaConfig {
    pub enabled: bool,
    pub base_freq: f32,
    pub num_octaves: f32,
    pub gain: f32,
    pub curve: f32,
    pub base_bright: f32,
    pub drift_speed: f32,
    pub front_scale: f32,
    pub mid_scale: f32,
    pub back_scale: f32,
    pub front_iter: i32,
    pub mid_iter: i32,
    pub back_iter: i32,
    pub star_density: f32,
    pub star_sharpness: f32,
    pub glow_width: f32,
    pub glow_intensity: f32,
    pub brightness: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for NebulaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_freq: 55.0,
            num_octaves: 5.0,
            gain: 2.0,
            curve: 0.7,
            base_bright: 0.15,
            drift_speed: 1.0,
            front_scale: 4.0,
            mid_scale: 3.0,
            back_scale: 4.0,
            front_iter: 26,
            mid_iter: 20,
            back_iter: 18,
            star_density: 400.0,
            star_sharpness: 35.0,
            glow_width: 0.25,
            glow_intensity: 2.0,
            brightness: 1.0,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(NebulaConfig {
    base_freq: "baseFreq" => 27.5, 440.0;
    gain: "gain" => 0.1, 10.0;
    curve: "curve" => 0.1, 3.0;
    base_bright: "baseBright" => 0.0, 1.0;
    drift_speed: "driftSpeed" => 0.01, 5.0;
    front_scale: "frontScale" => 1.0, 8.0;
    mid_scale: "midScale" => 1.0, 10.0;
    back_scale: "backScale" => 2.0, 12.0;
    star_density: "starDensity" => 100.0, 800.0;
    star_sharpness: "starSharpness" => 10.0, 60.0;
    glow_width: "glowWidth" => 0.05, 0.3;
    glow_intensity: "glowIntensity" => 0.5, 10.0;
    brightness: "brightness" => 0.5, 3.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for NebulaConfig {
    const KIND: TransformEffectType = TransformEffectType::Nebula;
    const SHADER: &'static str = "shaders/nebula.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "numOctaves",
        "gain",
        "curve",
        "baseBright",
        "layerScales",
        "layerIterations",
        "starDensity",
        "starSharpness",
        "glowWidth",
        "glowIntensity",
        "brightness",
        "gradientLUT",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.nebula
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        let iters = |n: i32| n.clamp(6, 40) as f32;
        u.vec2("resolution", frame.resolution());
        u.f32("time", time.advance(self.drift_speed, frame.dt));
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.f32("numOctaves", self.num_octaves);
        u.vec3("layerScales", [self.front_scale, self.mid_scale, self.back_scale]);
        u.vec3(
            "layerIterations",
            [iters(self.front_iter), iters(self.mid_iter), iters(self.back_iter)],
        );
        u.f32("starDensity", self.star_density);
        u.f32("starSharpness", self.star_sharpness);
        u.f32("glowWidth", self.glow_width);
        u.f32("glowIntensity", self.glow_intensity);
        u.f32("brightness", self.brightness);
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Grating shape of a moire layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MoirePattern {
    #[default]
    Stripes,
    Circles,
    Grid,
}

impl From<i32> for MoirePattern {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Circles,
            2 => Self::Grid,
            _ => Self::Stripes,
        }
    }
}

impl From<MoirePattern> for i32 {
    fn from(p: MoirePattern) -> i32 {
        p as i32
    }
}

/// One rotatable grating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoireLayerConfig {
    pub frequency: f32,
    pub angle: f32,
    pub rotation_speed: f32,
    pub warp_amount: f32,
    pub scale: f32,
    pub phase: f32,
}

impl Default for MoireLayerConfig {
    fn default() -> Self {
        Self {
            frequency: 20.0,
            angle: 0.0,
            rotation_speed: 0.0,
            warp_amount: 0.0,
            scale: 1.0,
            phase: 0.0,
        }
    }
}

impl MoireLayerConfig {
    fn staggered(frequency: f32, angle: f32) -> Self {
        Self {
            frequency,
            angle,
            ..Self::default()
        }
    }
}

/// Overlaid line gratings whose beat frequencies form moire fringes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoireGeneratorConfig {
    pub enabled: bool,
    pub pattern_mode: MoirePattern,
    /// Active layers, 2..=4.
    pub layer_count: i32,
    /// Square-wave gratings instead of sinusoids.
    pub sharp_mode: bool,
    /// 0 is grayscale, 1 is fully LUT coloured.
    pub color_intensity: f32,
    pub global_brightness: f32,
    pub layer0: MoireLayerConfig,
    pub layer1: MoireLayerConfig,
    pub layer2: MoireLayerConfig,
    pub layer3: MoireLayerConfig,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for MoireGeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern_mode: MoirePattern::Stripes,
            layer_count: 3,
            sharp_mode: false,
            color_intensity: 0.0,
            global_brightness: 1.0,
            layer0: MoireLayerConfig::default(),
            layer1: MoireLayerConfig::staggered(22.0, 0.0873),
            layer2: MoireLayerConfig::staggered(24.0, 0.1745),
            layer3: MoireLayerConfig::staggered(26.0, 0.2618),
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(MoireGeneratorConfig {
    color_intensity: "colorIntensity" => 0.0, 1.0;
    global_brightness: "globalBrightness" => 0.0, 2.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
    layer0.frequency: "layer0.frequency" => 1.0, 100.0;
    layer0.angle: "layer0.angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer0.rotation_speed: "layer0.rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    layer0.warp_amount: "layer0.warpAmount" => 0.0, 0.5;
    layer0.scale: "layer0.scale" => 0.5, 4.0;
    layer0.phase: "layer0.phase" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer1.frequency: "layer1.frequency" => 1.0, 100.0;
    layer1.angle: "layer1.angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer1.rotation_speed: "layer1.rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    layer1.warp_amount: "layer1.warpAmount" => 0.0, 0.5;
    layer1.scale: "layer1.scale" => 0.5, 4.0;
    layer1.phase: "layer1.phase" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer2.frequency: "layer2.frequency" => 1.0, 100.0;
    layer2.angle: "layer2.angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer2.rotation_speed: "layer2.rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    layer2.warp_amount: "layer2.warpAmount" => 0.0, 0.5;
    layer2.scale: "layer2.scale" => 0.5, 4.0;
    layer2.phase: "layer2.phase" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer3.frequency: "layer3.frequency" => 1.0, 100.0;
    layer3.angle: "layer3.angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer3.rotation_speed: "layer3.rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    layer3.warp_amount: "layer3.warpAmount" => 0.0, 0.5;
    layer3.scale: "layer3.scale" => 0.5, 4.0;
    layer3.phase: "layer3.phase" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

/// Per-layer rotation plus the warp clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoireState {
    layer_angles: [f32; 4],
    time: f32,
}

impl MoireGeneratorConfig {
    pub fn layers(&self) -> [&MoireLayerConfig; 4] {
        [&self.layer0, &self.layer1, &self.layer2, &self.layer3]
    }
}

impl TransformEffect for MoireGeneratorConfig {
    const KIND: TransformEffectType = TransformEffectType::MoireGenerator;
    const SHADER: &'static str = "shaders/moire_generator.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "patternMode",
        "layerCount",
        "sharpMode",
        "colorIntensity",
        "globalBrightness",
        "time",
        "layerFrequency",
        "layerAngle",
        "layerWarpAmount",
        "layerScale",
        "layerPhase",
        "gradientLUT",
    ];
    type State = MoireState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.moire_generator
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut MoireState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        s.time += frame.dt;
        let layers = self.layers();
        for (acc, layer) in s.layer_angles.iter_mut().zip(layers) {
            *acc = (*acc + layer.rotation_speed * frame.dt).rem_euclid(std::f32::consts::TAU);
        }
        u.vec2("resolution", frame.resolution());
        u.i32("patternMode", self.pattern_mode.into());
        u.i32("layerCount", self.layer_count.clamp(2, 4));
        u.flag("sharpMode", self.sharp_mode);
        u.f32("colorIntensity", self.color_intensity);
        u.f32("globalBrightness", self.global_brightness);
        u.f32("time", s.time);
        u.floats("layerFrequency", layers.iter().map(|l| l.frequency).collect());
        u.floats(
            "layerAngle",
            layers.iter().zip(s.layer_angles).map(|(l, acc)| l.angle + acc).collect(),
        );
        u.floats("layerWarpAmount", layers.iter().map(|l| l.warp_amount).collect());
        u.floats("layerScale", layers.iter().map(|l| l.scale).collect());
        u.floats("layerPhase", layers.iter().map(|l| l.phase).collect());
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ParamTable;

    #[test]
    fn moire_layers_stagger_and_address_by_dotted_id() {
        let mut cfg = MoireGeneratorConfig::default();
        assert_eq!(cfg.layer2.frequency, 24.0);
        assert_eq!(cfg.param("layer3.angle"), Some(0.2618));
        *cfg.param_mut("layer1.rotationSpeed").expect("layer1 rotation should be addressable") = 0.5;
        assert_eq!(cfg.layer1.rotation_speed, 0.5);
        assert_eq!(cfg.param("layer4.angle"), None);
    }

    #[test]
    fn moire_pattern_loads_from_ints() {
        let cfg: MoireGeneratorConfig =
            serde_json::from_value(serde_json::json!({ "patternMode": 2, "layerCount": 4 }))
                .expect("moire config should deserialize");
        assert_eq!(cfg.pattern_mode, MoirePattern::Grid);
        assert_eq!(cfg.layer0, MoireLayerConfig::default());
        let back = serde_json::to_value(&cfg).expect("moire config should serialize");
        assert_eq!(back["patternMode"], 2);
    }
}
