//! Generators whose geometry is laid out on the spectrum: every semitone
//! between a base frequency and its octave span owns a ring, bar, arc or
//! particle, lit by that bin's FFT magnitude.

use super::generators::{bind_lut, bind_spectrum};
use super::{
    EffectFrame, EffectModule, EffectPass, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX,
    TransformEffect, TransformEffectType, UniformWriter, effect_settings, gradient_color,
};
use crate::blend::EffectBlendMode;
use crate::color::ColorConfig;
use crate::effect_config::EffectConfig;
use crate::gpu::{DrawBlend, Gpu, GpuError, ProgramId, TextureDesc, TextureId};
use serde::{Deserialize, Serialize};

/// Spectrum-lit particle bursts that fall under gravity and leave trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FireworksConfig {
    pub enabled: bool,
    /// Bursts per second.
    pub burst_rate: f32,
    /// Concurrent burst slots, 1..=8.
    pub max_bursts: i32,
    /// Particles per burst, 16..=120.
    pub particles: i32,
    /// Spawn distance from the centre.
    pub spread_area: f32,
    pub y_bias: f32,
    pub burst_radius: f32,
    pub gravity: f32,
    /// Exponential deceleration.
    pub drag_rate: f32,
    pub glow_intensity: f32,
    pub particle_size: f32,
    pub glow_sharpness: f32,
    pub sparkle_speed: f32,
    pub base_freq: f32,
    pub max_freq: f32,
    pub gain: f32,
    pub curve: f32,
    pub base_bright: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for FireworksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            burst_rate: 1.5,
            max_bursts: 3,
            particles: 60,
            spread_area: 0.5,
            y_bias: 0.2,
            burst_radius: 0.6,
            gravity: 0.8,
            drag_rate: 2.0,
            glow_intensity: 1.0,
            particle_size: 0.008,
            glow_sharpness: 1.7,
            sparkle_speed: 20.0,
            base_freq: 55.0,
            max_freq: 14_000.0,
            gain: 2.0,
            curve: 1.0,
            base_bright: 0.1,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(FireworksConfig {
    burst_rate: "burstRate" => 0.0, 5.0;
    spread_area: "spreadArea" => 0.1, 1.0;
    y_bias: "yBias" => -0.5, 0.5;
    burst_radius: "burstRadius" => 0.1, 1.5;
    gravity: "gravity" => 0.0, 2.0;
    drag_rate: "dragRate" => 0.5, 5.0;
    glow_intensity: "glowIntensity" => 0.1, 3.0;
    particle_size: "particleSize" => 0.002, 0.03;
    glow_sharpness: "glowSharpness" => 1.0, 3.0;
    sparkle_speed: "sparkleSpeed" => 5.0, 40.0;
    base_freq: "baseFreq" => 27.5, 440.0;
    max_freq: "maxFreq" => 1000.0, 16_000.0;
    gain: "gain" => 0.1, 10.0;
    curve: "curve" => 0.1, 3.0;
    base_bright: "baseBright" => 0.0, 1.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for FireworksConfig {
    const KIND: TransformEffectType = TransformEffectType::Fireworks;
    const SHADER: &'static str = "shaders/fireworks.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "burstRate",
        "maxBursts",
        "particles",
        "spreadArea",
        "yBias",
        "burstRadius",
        "gravity",
        "dragRate",
        "glowIntensity",
        "particleSize",
        "glowSharpness",
        "sparkleSpeed",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "maxFreq",
        "gain",
        "curve",
        "baseBright",
        "decayFactor",
        "gradientLUT",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.fireworks
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("time", time.advance(1.0, frame.dt));
        u.f32("burstRate", self.burst_rate);
        u.i32("maxBursts", self.max_bursts.clamp(1, 8));
        u.i32("particles", self.particles.clamp(16, 120));
        u.f32("spreadArea", self.spread_area);
        u.f32("yBias", self.y_bias);
        u.f32("burstRadius", self.burst_radius);
        u.f32("gravity", self.gravity);
        u.f32("dragRate", self.drag_rate);
        u.f32("glowIntensity", self.glow_intensity);
        u.f32("particleSize", self.particle_size);
        u.f32("glowSharpness", self.glow_sharpness);
        u.f32("sparkleSpeed", self.sparkle_speed);
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.f32("maxFreq", self.max_freq.max(self.base_freq));
        // Trails fade with the drag rate.
        u.f32("decayFactor", (-self.drag_rate * frame.dt).exp());
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Fireworks plus the trail pair it accumulates into. Each frame draws the
/// previous trail through the shader into the other half of the pair and
/// hands the result to the compositor.
pub struct FireworksEffect {
    pass: EffectPass<FireworksConfig>,
    trail: [TextureId; 2],
    read: usize,
}

fn alloc_trail(gpu: &mut dyn Gpu, width: u32, height: u32) -> Result<[TextureId; 2], GpuError> {
    let a = gpu.create_texture(TextureDesc::screen(width, height))?;
    let b = match gpu.create_texture(TextureDesc::screen(width, height)) {
        Ok(b) => b,
        Err(err) => {
            gpu.destroy_texture(a);
            return Err(err);
        }
    };
    gpu.clear_texture(a, [0.0; 4]);
    gpu.clear_texture(b, [0.0; 4]);
    Ok([a, b])
}

impl FireworksEffect {
    pub fn new(gpu: &mut dyn Gpu, cfg: &EffectConfig, width: u32, height: u32) -> anyhow::Result<Self> {
        let pass = EffectPass::<FireworksConfig>::new(gpu, &cfg.fireworks)?;
        let trail = match alloc_trail(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                Box::new(pass).release(gpu);
                return Err(err.into());
            }
        };
        Ok(Self { pass, trail, read: 0 })
    }

    /// The surface holding the latest trail.
    pub fn trail(&self) -> TextureId {
        self.trail[self.read]
    }
}

impl EffectModule for FireworksEffect {
    fn kind(&self) -> TransformEffectType {
        TransformEffectType::Fireworks
    }

    fn program(&self) -> ProgramId {
        self.pass.program()
    }

    fn setup(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, frame: &EffectFrame) {
        self.pass.setup(gpu, cfg, frame);
    }

    fn blend(&self, cfg: &EffectConfig) -> Option<(EffectBlendMode, f32)> {
        self.pass.blend(cfg)
    }

    fn render(&mut self, gpu: &mut dyn Gpu, _input: TextureId, target: TextureId) -> Result<(), GpuError> {
        let write = 1 - self.read;
        gpu.draw_fullscreen(self.pass.program(), self.trail[self.read], self.trail[write])?;
        self.read = write;
        gpu.draw_texture(self.trail[write], target, DrawBlend::Replace)
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        let fresh = alloc_trail(gpu, width, height)?;
        for t in std::mem::replace(&mut self.trail, fresh) {
            gpu.destroy_texture(t);
        }
        self.read = 0;
        Ok(())
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu) {
        let this = *self;
        for t in this.trail {
            gpu.destroy_texture(t);
        }
        Box::new(this.pass).release(gpu);
    }
}

/// Glowing segments between rotating endpoint pairs, one per semitone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilamentsConfig {
    pub enabled: bool,
    /// Filament count, 4..=256.
    pub filaments: i32,
    pub base_freq: f32,
    pub max_freq: f32,
    pub gain: f32,
    pub curve: f32,
    /// Endpoint distance from the centre.
    pub radius: f32,
    /// Angular fan per filament index.
    pub spread: f32,
    /// Cumulative rotation between filaments.
    pub step_angle: f32,
    pub glow_intensity: f32,
    pub base_bright: f32,
    pub rotation_speed: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for FilamentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filaments: 60,
            base_freq: 55.0,
            max_freq: 14_000.0,
            gain: 2.0,
            curve: 0.7,
            radius: 0.8,
            spread: 0.0,
            step_angle: 0.0,
            glow_intensity: 2.0,
            base_bright: 0.15,
            rotation_speed: 1.5,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(FilamentsConfig {
    base_freq: "baseFreq" => 27.5, 440.0;
    max_freq: "maxFreq" => 1000.0, 16_000.0;
    gain: "gain" => 0.1, 10.0;
    curve: "curve" => 0.1, 3.0;
    radius: "radius" => 0.1, 2.0;
    spread: "spread" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    step_angle: "stepAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    glow_intensity: "glowIntensity" => 0.5, 10.0;
    base_bright: "baseBright" => 0.0, 1.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for FilamentsConfig {
    const KIND: TransformEffectType = TransformEffectType::Filaments;
    const SHADER: &'static str = "shaders/filaments.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "filaments",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "maxFreq",
        "gain",
        "curve",
        "baseBright",
        "radius",
        "spread",
        "stepAngle",
        "glowIntensity",
        "rotationAccum",
        "gradientLUT",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.filaments
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("filaments", self.filaments.clamp(4, 256));
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.f32("maxFreq", self.max_freq.max(self.base_freq));
        u.f32("radius", self.radius);
        u.f32("spread", self.spread);
        u.f32("stepAngle", self.step_angle);
        u.f32("glowIntensity", self.glow_intensity);
        u.f32("rotationAccum", rotation.spin(self.rotation_speed, frame.dt));
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Scattered bars, one per semitone, re-rolled on every tick and held for
/// an envelope whose length follows the bin's magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlashesConfig {
    pub enabled: bool,
    pub base_freq: f32,
    /// Bars are twelve per octave.
    pub num_octaves: i32,
    pub gain: f32,
    pub curve: f32,
    /// Re-rolls per second.
    pub tick_rate: f32,
    pub envelope_sharp: f32,
    pub max_bar_length: f32,
    pub bar_thickness: f32,
    pub thickness_variation: f32,
    pub scatter: f32,
    pub glow_softness: f32,
    pub base_bright: f32,
    /// 0 is flat, 1 scatters bars in depth.
    pub rotation_depth: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for SlashesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_freq: 55.0,
            num_octaves: 5,
            gain: 2.0,
            curve: 0.7,
            tick_rate: 4.0,
            envelope_sharp: 4.0,
            max_bar_length: 0.7,
            bar_thickness: 0.005,
            thickness_variation: 0.5,
            scatter: 0.5,
            glow_softness: 0.01,
            base_bright: 0.15,
            rotation_depth: 0.0,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(SlashesConfig {
    base_freq: "baseFreq" => 27.5, 440.0;
    gain: "gain" => 0.1, 10.0;
    curve: "curve" => 0.1, 3.0;
    tick_rate: "tickRate" => 0.5, 20.0;
    envelope_sharp: "envelopeSharp" => 1.0, 10.0;
    max_bar_length: "maxBarLength" => 0.1, 1.5;
    bar_thickness: "barThickness" => 0.001, 0.03;
    thickness_variation: "thicknessVariation" => 0.0, 1.0;
    scatter: "scatter" => 0.0, 1.0;
    glow_softness: "glowSoftness" => 0.001, 0.05;
    base_bright: "baseBright" => 0.0, 1.0;
    rotation_depth: "rotationDepth" => 0.0, 1.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for SlashesConfig {
    const KIND: TransformEffectType = TransformEffectType::Slashes;
    const SHADER: &'static str = "shaders/slashes.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "numOctaves",
        "gain",
        "curve",
        "tickAccum",
        "envelopeSharp",
        "maxBarLength",
        "barThickness",
        "thicknessVariation",
        "scatter",
        "glowSoftness",
        "baseBright",
        "rotationDepth",
        "gradientLUT",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.slashes
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, tick: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.i32("numOctaves", self.num_octaves.clamp(1, 8));
        u.f32("tickAccum", tick.advance(self.tick_rate, frame.dt));
        u.f32("envelopeSharp", self.envelope_sharp);
        u.f32("maxBarLength", self.max_bar_length);
        u.f32("barThickness", self.bar_thickness);
        u.f32("thicknessVariation", self.thickness_variation);
        u.f32("scatter", self.scatter);
        u.f32("glowSoftness", self.glow_softness.max(1e-4));
        u.f32("rotationDepth", self.rotation_depth);
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// Concentric partial rings, one per semitone, whose arcs open with the
/// bin's magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpectralArcsConfig {
    pub enabled: bool,
    pub base_freq: f32,
    pub num_octaves: i32,
    pub gain: f32,
    pub curve: f32,
    /// Higher packs the rings tighter.
    pub ring_scale: f32,
    pub tilt: f32,
    pub tilt_angle: f32,
    /// Visible share of each ring.
    pub arc_width: f32,
    pub glow_intensity: f32,
    pub glow_falloff: f32,
    pub base_bright: f32,
    pub rotation_speed: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for SpectralArcsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_freq: 220.0,
            num_octaves: 8,
            gain: 5.0,
            curve: 2.0,
            ring_scale: 2.5,
            tilt: 0.0,
            tilt_angle: 0.0,
            arc_width: 0.6,
            glow_intensity: 0.2,
            glow_falloff: 40.0,
            base_bright: 0.1,
            rotation_speed: 1.0,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(SpectralArcsConfig {
    base_freq: "baseFreq" => 27.5, 440.0;
    gain: "gain" => 0.1, 20.0;
    curve: "curve" => 0.1, 4.0;
    ring_scale: "ringScale" => 0.5, 5.0;
    tilt: "tilt" => 0.0, 1.0;
    tilt_angle: "tiltAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    arc_width: "arcWidth" => 0.0, 1.0;
    glow_intensity: "glowIntensity" => 0.01, 1.0;
    glow_falloff: "glowFalloff" => 1.0, 100.0;
    base_bright: "baseBright" => 0.0, 1.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

impl TransformEffect for SpectralArcsConfig {
    const KIND: TransformEffectType = TransformEffectType::SpectralArcs;
    const SHADER: &'static str = "shaders/spectral_arcs.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "numOctaves",
        "gain",
        "curve",
        "ringScale",
        "tilt",
        "tiltAngle",
        "arcWidth",
        "glowIntensity",
        "glowFalloff",
        "baseBright",
        "rotationAccum",
        "gradientLUT",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.spectral_arcs
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, self.base_bright);
        u.i32("numOctaves", self.num_octaves.clamp(1, 10));
        u.f32("ringScale", self.ring_scale);
        u.f32("tilt", self.tilt);
        u.f32("tiltAngle", self.tilt_angle);
        u.f32("arcWidth", self.arc_width);
        u.f32("glowIntensity", self.glow_intensity);
        u.f32("glowFalloff", self.glow_falloff);
        u.f32("rotationAccum", rotation.spin(self.rotation_speed, frame.dt));
        bind_lut(u, "gradientLUT", luts, 0);
    }
}

/// A spiral with one turn per octave, so equal pitch classes line up along
/// the same ray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PitchSpiralConfig {
    pub enabled: bool,
    pub base_freq: f32,
    /// Visible octaves.
    pub num_turns: i32,
    pub spiral_spacing: f32,
    pub line_width: f32,
    pub blur: f32,
    pub gain: f32,
    pub curve: f32,
    pub tilt: f32,
    pub tilt_angle: f32,
    pub rotation_speed: f32,
    /// Breathing frequency in Hz.
    pub breath_rate: f32,
    pub breath_depth: f32,
    /// 1 is Archimedean.
    pub shape_exponent: f32,
    pub gradient: ColorConfig,
    pub blend_mode: EffectBlendMode,
    pub blend_intensity: f32,
}

impl Default for PitchSpiralConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_freq: 220.0,
            num_turns: 8,
            spiral_spacing: 0.05,
            line_width: 0.02,
            blur: 0.02,
            gain: 5.0,
            curve: 2.0,
            tilt: 0.0,
            tilt_angle: 0.0,
            rotation_speed: 0.0,
            breath_rate: 1.0,
            breath_depth: 0.0,
            shape_exponent: 1.0,
            gradient: gradient_color(),
            blend_mode: EffectBlendMode::Screen,
            blend_intensity: 1.0,
        }
    }
}

effect_settings!(PitchSpiralConfig {
    base_freq: "baseFreq" => 27.5, 440.0;
    spiral_spacing: "spiralSpacing" => 0.01, 0.2;
    line_width: "lineWidth" => 0.005, 0.1;
    blur: "blur" => 0.001, 0.1;
    gain: "gain" => 0.1, 20.0;
    curve: "curve" => 0.1, 4.0;
    tilt: "tilt" => 0.0, 1.0;
    tilt_angle: "tiltAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    breath_rate: "breathRate" => 0.1, 5.0;
    breath_depth: "breathDepth" => 0.0, 0.5;
    shape_exponent: "shapeExponent" => 0.3, 3.0;
    blend_intensity: "blendIntensity" => 0.0, 5.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PitchSpiralState {
    rotation: Phase,
    breath: Phase,
}

impl TransformEffect for PitchSpiralConfig {
    const KIND: TransformEffectType = TransformEffectType::PitchSpiral;
    const SHADER: &'static str = "shaders/pitch_spiral.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "fftTexture",
        "sampleRate",
        "baseFreq",
        "numTurns",
        "spiralSpacing",
        "lineWidth",
        "blur",
        "gain",
        "curve",
        "baseBright",
        "tilt",
        "tiltAngle",
        "rotationAccum",
        "breathScale",
        "shapeExponent",
        "gradientLUT",
    ];
    type State = PitchSpiralState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.pitch_spiral
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn blend(&self) -> Option<(EffectBlendMode, f32)> {
        Some((self.blend_mode, self.blend_intensity))
    }

    fn setup(&self, s: &mut PitchSpiralState, u: &mut UniformWriter<'_>, frame: &EffectFrame, luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        bind_spectrum(u, frame, self.base_freq, self.gain, self.curve, 0.0);
        u.i32("numTurns", self.num_turns.clamp(1, 12));
        u.f32("spiralSpacing", self.spiral_spacing);
        u.f32("lineWidth", self.line_width);
        u.f32("blur", self.blur.max(1e-4));
        u.f32("tilt", self.tilt);
        u.f32("tiltAngle", self.tilt_angle);
        u.f32("rotationAccum", s.rotation.spin(self.rotation_speed, frame.dt));
        let breath = s.breath.spin(self.breath_rate * std::f32::consts::TAU, frame.dt);
        u.f32("breathScale", 1.0 + self.breath_depth * breath.sin());
        u.f32("shapeExponent", self.shape_exponent);
        bind_lut(u, "gradientLUT", luts, 0);
    }
}
