//! UV displacement transforms.

use super::{
    EffectFrame, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX, SpinState, TransformEffect,
    TransformEffectType, UniformWriter, effect_settings,
};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use crate::lissajous::DualLissajousConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SineWarpConfig {
    pub enabled: bool,
    pub octaves: i32,
    pub strength: f32,
    pub speed: f32,
    pub octave_rotation: f32,
    pub radial_mode: bool,
    /// Sample every octave rather than once at the end.
    pub depth_blend: bool,
}

impl Default for SineWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            octaves: 4,
            strength: 0.5,
            speed: 0.3,
            octave_rotation: 0.5,
            radial_mode: false,
            depth_blend: true,
        }
    }
}

effect_settings!(SineWarpConfig {
    strength: "strength" => 0.0, 2.0;
    octave_rotation: "octaveRotation" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for SineWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::SineWarp;
    const SHADER: &'static str = "shaders/sine_warp.fs";
    const UNIFORMS: &'static [&'static str] =
        &["octaves", "strength", "time", "octaveRotation", "radialMode", "depthBlend"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.sine_warp
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("octaves", self.octaves.clamp(1, 8));
        u.f32("strength", self.strength);
        u.f32("time", time.advance(self.speed, frame.dt));
        u.f32("octaveRotation", self.octave_rotation);
        u.flag("radialMode", self.radial_mode);
        u.flag("depthBlend", self.depth_blend);
    }
}

/// Which channels of the input steer the self-warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum TextureWarpChannelMode {
    #[default]
    Rg,
    Rb,
    Gb,
    Luminance,
    LuminanceSplit,
    Chrominance,
    Polar,
}

impl From<i32> for TextureWarpChannelMode {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Rb,
            2 => Self::Gb,
            3 => Self::Luminance,
            4 => Self::LuminanceSplit,
            5 => Self::Chrominance,
            6 => Self::Polar,
            _ => Self::Rg,
        }
    }
}

impl From<TextureWarpChannelMode> for i32 {
    fn from(m: TextureWarpChannelMode) -> i32 {
        m as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureWarpConfig {
    pub enabled: bool,
    pub strength: f32,
    pub iterations: i32,
    pub channel_mode: TextureWarpChannelMode,
    pub ridge_angle: f32,
    pub anisotropy: f32,
    pub noise_amount: f32,
    pub noise_scale: f32,
}

impl Default for TextureWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.05,
            iterations: 3,
            channel_mode: TextureWarpChannelMode::Rg,
            ridge_angle: 0.0,
            anisotropy: 0.0,
            noise_amount: 0.0,
            noise_scale: 5.0,
        }
    }
}

effect_settings!(TextureWarpConfig {
    strength: "strength" => 0.0, 0.3;
    ridge_angle: "ridgeAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    anisotropy: "anisotropy" => 0.0, 1.0;
    noise_amount: "noiseAmount" => 0.0, 1.0;
});

impl TransformEffect for TextureWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::TextureWarp;
    const SHADER: &'static str = "shaders/texture_warp.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "strength",
        "iterations",
        "channelMode",
        "ridgeAngle",
        "anisotropy",
        "noiseAmount",
        "noiseScale",
        "time",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.texture_warp
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("strength", self.strength);
        u.i32("iterations", self.iterations.clamp(1, 8));
        u.i32("channelMode", self.channel_mode.into());
        u.f32("ridgeAngle", self.ridge_angle);
        u.f32("anisotropy", self.anisotropy);
        u.f32("noiseAmount", self.noise_amount);
        u.f32("noiseScale", self.noise_scale);
        u.f32("time", time.advance(1.0, frame.dt));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveRippleConfig {
    pub enabled: bool,
    pub octaves: i32,
    pub strength: f32,
    pub speed: f32,
    pub frequency: f32,
    /// Gerstner asymmetry: 0 is a sine, 1 sharp crests.
    pub steepness: f32,
    pub decay: f32,
    pub center_hole: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub origin_lissajous: DualLissajousConfig,
    pub shade_enabled: bool,
    pub shade_intensity: f32,
}

impl Default for WaveRippleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            octaves: 2,
            strength: 0.02,
            speed: 1.0,
            frequency: 8.0,
            steepness: 0.0,
            decay: 5.0,
            center_hole: 0.0,
            origin_x: 0.5,
            origin_y: 0.5,
            origin_lissajous: DualLissajousConfig {
                amplitude: 0.0,
                freq_x1: 1.0,
                freq_y1: 1.0,
                ..DualLissajousConfig::default()
            },
            shade_enabled: false,
            shade_intensity: 0.2,
        }
    }
}

effect_settings!(WaveRippleConfig {
    strength: "strength" => 0.0, 0.5;
    frequency: "frequency" => 1.0, 20.0;
    steepness: "steepness" => 0.0, 1.0;
    decay: "decay" => 0.0, 50.0;
    center_hole: "centerHole" => 0.0, 0.5;
    origin_x: "originX" => 0.0, 1.0;
    origin_y: "originY" => 0.0, 1.0;
    shade_intensity: "shadeIntensity" => 0.0, 0.5;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct RippleState {
    time: Phase,
    origin: Phase,
}

impl TransformEffect for WaveRippleConfig {
    const KIND: TransformEffectType = TransformEffectType::WaveRipple;
    const SHADER: &'static str = "shaders/wave_ripple.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "time",
        "octaves",
        "strength",
        "frequency",
        "steepness",
        "decay",
        "centerHole",
        "origin",
        "shadeEnabled",
        "shadeIntensity",
    ];
    type State = RippleState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.wave_ripple
    }

    fn setup(&self, s: &mut RippleState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let phase = s.origin.advance(self.origin_lissajous.motion_speed, frame.dt);
        let (ox, oy) = self.origin_lissajous.offset_for(phase);
        u.f32("time", s.time.advance(self.speed, frame.dt));
        u.i32("octaves", self.octaves.clamp(1, 4));
        u.f32("strength", self.strength);
        u.f32("frequency", self.frequency);
        u.f32("steepness", self.steepness);
        u.f32("decay", self.decay);
        u.f32("centerHole", self.center_hole);
        u.vec2("origin", [self.origin_x + ox, self.origin_y + oy]);
        u.flag("shadeEnabled", self.shade_enabled);
        u.f32("shadeIntensity", self.shade_intensity);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MobiusConfig {
    pub enabled: bool,
    pub point1_x: f32,
    pub point1_y: f32,
    pub point2_x: f32,
    pub point2_y: f32,
    pub spiral_tightness: f32,
    pub zoom_factor: f32,
    pub speed: f32,
    pub point1_lissajous: DualLissajousConfig,
    pub point2_lissajous: DualLissajousConfig,
}

impl Default for MobiusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            point1_x: 0.3,
            point1_y: 0.5,
            point2_x: 0.7,
            point2_y: 0.5,
            spiral_tightness: 0.0,
            zoom_factor: 0.0,
            speed: 1.0,
            point1_lissajous: DualLissajousConfig::default(),
            point2_lissajous: DualLissajousConfig::default(),
        }
    }
}

effect_settings!(MobiusConfig {
    spiral_tightness: "spiralTightness" => -2.0, 2.0;
    zoom_factor: "zoomFactor" => -2.0, 2.0;
    speed: "speed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    point1_x: "point1X" => 0.0, 1.0;
    point1_y: "point1Y" => 0.0, 1.0;
    point2_x: "point2X" => 0.0, 1.0;
    point2_y: "point2Y" => 0.0, 1.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MobiusState {
    time: Phase,
    point1: Phase,
    point2: Phase,
}

impl TransformEffect for MobiusConfig {
    const KIND: TransformEffectType = TransformEffectType::Mobius;
    const SHADER: &'static str = "shaders/mobius.fs";
    const UNIFORMS: &'static [&'static str] = &["time", "point1", "point2", "spiralTightness", "zoomFactor"];
    type State = MobiusState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.mobius
    }

    fn setup(&self, s: &mut MobiusState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let p1 = self
            .point1_lissajous
            .offset_for(s.point1.advance(self.point1_lissajous.motion_speed, frame.dt));
        let p2 = self
            .point2_lissajous
            .offset_for(s.point2.advance(self.point2_lissajous.motion_speed, frame.dt));
        u.f32("time", s.time.advance(self.speed, frame.dt));
        u.vec2("point1", [self.point1_x + p1.0, self.point1_y + p1.1]);
        u.vec2("point2", [self.point2_x + p2.0, self.point2_y + p2.1]);
        u.f32("spiralTightness", self.spiral_tightness);
        u.f32("zoomFactor", self.zoom_factor);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoincareDiskConfig {
    pub enabled: bool,
    /// Vertex angles of the tiling triangle are π/P, π/Q, π/R.
    pub tile_p: i32,
    pub tile_q: i32,
    pub tile_r: i32,
    pub translation_x: f32,
    pub translation_y: f32,
    pub translation_speed: f32,
    pub translation_amplitude: f32,
    pub disk_scale: f32,
    pub rotation_speed: f32,
}

impl Default for PoincareDiskConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tile_p: 4,
            tile_q: 4,
            tile_r: 4,
            translation_x: 0.0,
            translation_y: 0.0,
            translation_speed: 0.0,
            translation_amplitude: 0.0,
            disk_scale: 1.0,
            rotation_speed: 0.0,
        }
    }
}

effect_settings!(PoincareDiskConfig {
    translation_x: "translationX" => -0.9, 0.9;
    translation_y: "translationY" => -0.9, 0.9;
    translation_speed: "translationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    translation_amplitude: "translationAmplitude" => 0.0, 0.9;
    disk_scale: "diskScale" => 0.5, 2.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
});

impl PoincareDiskConfig {
    /// Sum of the triangle's angles must stay below π for a hyperbolic tiling.
    fn is_hyperbolic(&self) -> bool {
        let inv = |n: i32| 1.0 / n.max(2) as f32;
        inv(self.tile_p) + inv(self.tile_q) + inv(self.tile_r) < 1.0
    }
}

impl TransformEffect for PoincareDiskConfig {
    const KIND: TransformEffectType = TransformEffectType::PoincareDisk;
    const SHADER: &'static str = "shaders/poincare_disk.fs";
    const UNIFORMS: &'static [&'static str] =
        &["tileP", "tileQ", "tileR", "translation", "rotation", "diskScale"];
    type State = SpinState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.poincare_disk
    }

    fn setup(&self, s: &mut SpinState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let (p, q, r) = if self.is_hyperbolic() {
            (self.tile_p, self.tile_q, self.tile_r)
        } else {
            (4, 4, 4)
        };
        let orbit = s.twist.spin(self.translation_speed, frame.dt);
        let (sin, cos) = orbit.sin_cos();
        let amp = self.translation_amplitude;
        let mut t = [self.translation_x + amp * cos, self.translation_y + amp * sin];
        // Translations on the boundary are undefined.
        let len = (t[0] * t[0] + t[1] * t[1]).sqrt();
        if len > 0.99 {
            t = [t[0] * 0.99 / len, t[1] * 0.99 / len];
        }
        u.i32("tileP", p.clamp(2, 12));
        u.i32("tileQ", q.clamp(2, 12));
        u.i32("tileR", r.clamp(2, 12));
        u.vec2("translation", t);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("diskScale", self.disk_scale);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomainWarpConfig {
    pub enabled: bool,
    pub warp_strength: f32,
    pub warp_scale: f32,
    pub warp_iterations: i32,
    pub falloff: f32,
    pub drift_speed: f32,
    pub drift_angle: f32,
}

impl Default for DomainWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            warp_strength: 0.1,
            warp_scale: 4.0,
            warp_iterations: 2,
            falloff: 0.5,
            drift_speed: 0.0,
            drift_angle: 0.0,
        }
    }
}

effect_settings!(DomainWarpConfig {
    warp_strength: "warpStrength" => 0.0, 0.5;
    falloff: "falloff" => 0.3, 0.8;
    drift_speed: "driftSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    drift_angle: "driftAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for DomainWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::DomainWarp;
    const SHADER: &'static str = "shaders/domain_warp.fs";
    const UNIFORMS: &'static [&'static str] =
        &["warpStrength", "warpScale", "warpIterations", "falloff", "drift"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.domain_warp
    }

    fn setup(&self, drift: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let d = drift.advance(self.drift_speed, frame.dt);
        let (sin, cos) = self.drift_angle.sin_cos();
        u.f32("warpStrength", self.warp_strength);
        u.f32("warpScale", self.warp_scale);
        u.i32("warpIterations", self.warp_iterations.clamp(1, 3));
        u.f32("falloff", self.falloff);
        u.vec2("drift", [d * cos, d * sin]);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradientFlowConfig {
    pub enabled: bool,
    pub strength: f32,
    pub iterations: i32,
    /// 0 displaces uniformly, 1 scales by edge magnitude.
    pub edge_weight: f32,
    pub random_direction: bool,
}

impl Default for GradientFlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.01,
            iterations: 8,
            edge_weight: 1.0,
            random_direction: false,
        }
    }
}

effect_settings!(GradientFlowConfig {
    strength: "strength" => 0.0, 0.1;
    edge_weight: "edgeWeight" => 0.0, 1.0;
});

impl TransformEffect for GradientFlowConfig {
    const KIND: TransformEffectType = TransformEffectType::GradientFlow;
    const SHADER: &'static str = "shaders/gradient_flow.fs";
    const UNIFORMS: &'static [&'static str] =
        &["resolution", "strength", "iterations", "edgeWeight", "randomDirection"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.gradient_flow
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("strength", self.strength);
        u.i32("iterations", self.iterations.clamp(1, 8));
        u.f32("edgeWeight", self.edge_weight);
        u.flag("randomDirection", self.random_direction);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChladniWarpConfig {
    pub enabled: bool,
    /// Modal frequencies of the plate.
    pub n: f32,
    pub m: f32,
    pub plate_size: f32,
    pub strength: f32,
    pub warp_mode: i32,
    pub speed: f32,
    pub anim_range: f32,
    pub pre_fold: bool,
}

impl Default for ChladniWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            n: 4.0,
            m: 3.0,
            plate_size: 1.0,
            strength: 0.1,
            warp_mode: 0,
            speed: 0.0,
            anim_range: 0.0,
            pre_fold: false,
        }
    }
}

effect_settings!(ChladniWarpConfig {
    n: "n" => 1.0, 12.0;
    m: "m" => 1.0, 12.0;
    strength: "strength" => 0.0, 0.5;
    anim_range: "animRange" => 0.0, 5.0;
});

impl TransformEffect for ChladniWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::ChladniWarp;
    const SHADER: &'static str = "shaders/chladni_warp.fs";
    const UNIFORMS: &'static [&'static str] =
        &["n", "m", "plateSize", "strength", "warpMode", "animPhase", "animRange", "preFold"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.chladni_warp
    }

    fn setup(&self, phase: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("n", self.n);
        u.f32("m", self.m);
        u.f32("plateSize", self.plate_size);
        u.f32("strength", self.strength);
        u.i32("warpMode", self.warp_mode);
        u.f32("animPhase", phase.advance(self.speed, frame.dt));
        u.f32("animRange", self.anim_range);
        u.flag("preFold", self.pre_fold);
    }
}

/// Rolling hills: UV pushed along a rotating direction by a scrolling
/// height profile, valleys darkened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceWarpConfig {
    pub enabled: bool,
    /// Hill steepness.
    pub intensity: f32,
    pub angle: f32,
    pub rotation_speed: f32,
    pub scroll_speed: f32,
    pub depth_shade: f32,
}

impl Default for SurfaceWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.5,
            angle: 0.0,
            rotation_speed: 0.0,
            scroll_speed: 0.5,
            depth_shade: 0.3,
        }
    }
}

effect_settings!(SurfaceWarpConfig {
    intensity: "intensity" => 0.0, 2.0;
    angle: "angle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    scroll_speed: "scrollSpeed" => -2.0, 2.0;
    depth_shade: "depthShade" => 0.0, 1.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceWarpState {
    rotation: Phase,
    scroll: Phase,
}

impl TransformEffect for SurfaceWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::SurfaceWarp;
    const SHADER: &'static str = "shaders/surface_warp.fs";
    const UNIFORMS: &'static [&'static str] =
        &["intensity", "angle", "rotation", "scrollOffset", "depthShade"];
    type State = SurfaceWarpState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.surface_warp
    }

    fn setup(&self, s: &mut SurfaceWarpState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("intensity", self.intensity);
        u.f32("angle", self.angle);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("scrollOffset", s.scroll.advance(self.scroll_speed, frame.dt));
        u.f32("depthShade", self.depth_shade);
    }
}

/// Sum of sine waves along evenly spaced axes; more axes read as a
/// quasicrystal lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterferenceWarpConfig {
    pub enabled: bool,
    pub amplitude: f32,
    pub scale: f32,
    /// Lattice symmetry, 2..=8.
    pub axes: i32,
    pub axis_rotation_speed: f32,
    /// Summed harmonics, 8..=256.
    pub harmonics: i32,
    /// Amplitude falloff exponent per harmonic.
    pub decay: f32,
    pub speed: f32,
    /// Phase drift exponent per harmonic.
    pub drift: f32,
}

impl Default for InterferenceWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amplitude: 0.1,
            scale: 2.0,
            axes: 3,
            axis_rotation_speed: 0.0,
            harmonics: 64,
            decay: 1.0,
            speed: 0.0003,
            drift: 2.0,
        }
    }
}

effect_settings!(InterferenceWarpConfig {
    amplitude: "amplitude" => 0.0, 0.5;
    scale: "scale" => 0.5, 10.0;
    axis_rotation_speed: "axisRotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    decay: "decay" => 0.5, 2.0;
    speed: "speed" => 0.0, 0.01;
    drift: "drift" => 1.0, 3.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct InterferenceWarpState {
    time: Phase,
    axis_rotation: Phase,
}

impl TransformEffect for InterferenceWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::InterferenceWarp;
    const SHADER: &'static str = "shaders/interference_warp.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "amplitude",
        "scale",
        "axes",
        "axisRotation",
        "harmonics",
        "decay",
        "drift",
    ];
    type State = InterferenceWarpState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.interference_warp
    }

    fn setup(&self, s: &mut InterferenceWarpState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        // Speed is per frame at 60 fps.
        u.f32("time", s.time.advance(self.speed * 60.0, frame.dt));
        u.f32("amplitude", self.amplitude);
        u.f32("scale", self.scale);
        u.i32("axes", self.axes.clamp(2, 8));
        u.f32("axisRotation", s.axis_rotation.spin(self.axis_rotation_speed, frame.dt));
        u.i32("harmonics", self.harmonics.clamp(8, 256));
        u.f32("decay", self.decay);
        u.f32("drift", self.drift);
    }
}

/// Which planes of the corridor are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum CorridorWarpMode {
    Floor,
    Ceiling,
    #[default]
    Corridor,
}

impl From<i32> for CorridorWarpMode {
    fn from(i: i32) -> Self {
        match i {
            0 => Self::Floor,
            1 => Self::Ceiling,
            _ => Self::Corridor,
        }
    }
}

impl From<CorridorWarpMode> for i32 {
    fn from(m: CorridorWarpMode) -> i32 {
        m as i32
    }
}

/// Projects the frame onto receding floor and ceiling planes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorridorWarpConfig {
    pub enabled: bool,
    /// Vanishing point height.
    pub horizon: f32,
    pub perspective_strength: f32,
    pub mode: CorridorWarpMode,
    pub view_rotation_speed: f32,
    pub plane_rotation_speed: f32,
    /// Texture tiling density.
    pub scale: f32,
    pub scroll_speed: f32,
    pub strafe_speed: f32,
    pub fog_strength: f32,
}

impl Default for CorridorWarpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            horizon: 0.5,
            perspective_strength: 1.0,
            mode: CorridorWarpMode::Corridor,
            view_rotation_speed: 0.0,
            plane_rotation_speed: 0.0,
            scale: 2.0,
            scroll_speed: 0.5,
            strafe_speed: 0.0,
            fog_strength: 1.0,
        }
    }
}

effect_settings!(CorridorWarpConfig {
    horizon: "horizon" => 0.0, 1.0;
    perspective_strength: "perspectiveStrength" => 0.5, 2.0;
    view_rotation_speed: "viewRotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    plane_rotation_speed: "planeRotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    scale: "scale" => 0.5, 10.0;
    scroll_speed: "scrollSpeed" => -2.0, 2.0;
    strafe_speed: "strafeSpeed" => -2.0, 2.0;
    fog_strength: "fogStrength" => 0.0, 4.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct CorridorState {
    view: Phase,
    plane: Phase,
    scroll: Phase,
    strafe: Phase,
}

impl TransformEffect for CorridorWarpConfig {
    const KIND: TransformEffectType = TransformEffectType::CorridorWarp;
    const SHADER: &'static str = "shaders/corridor_warp.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "horizon",
        "perspectiveStrength",
        "mode",
        "viewRotation",
        "planeRotation",
        "scale",
        "scrollOffset",
        "strafeOffset",
        "fogStrength",
    ];
    type State = CorridorState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.corridor_warp
    }

    fn setup(&self, s: &mut CorridorState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("horizon", self.horizon);
        u.f32("perspectiveStrength", self.perspective_strength);
        u.i32("mode", self.mode.into());
        u.f32("viewRotation", s.view.spin(self.view_rotation_speed, frame.dt));
        u.f32("planeRotation", s.plane.spin(self.plane_rotation_speed, frame.dt));
        u.f32("scale", self.scale);
        u.f32("scrollOffset", s.scroll.advance(self.scroll_speed, frame.dt));
        u.f32("strafeOffset", s.strafe.advance(self.strafe_speed, frame.dt));
        u.f32("fogStrength", self.fog_strength);
    }
}

/// Recursive triangle folds whose traces look like PCB routing; the folded
/// coordinate displaces the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitBoardConfig {
    pub enabled: bool,
    pub pattern_x: f32,
    pub pattern_y: f32,
    pub iterations: i32,
    /// Initial folding frequency.
    pub scale: f32,
    pub offset: f32,
    /// Scale divisor per iteration.
    pub scale_decay: f32,
    pub strength: f32,
    pub scroll_speed: f32,
    /// Separate fold per channel.
    pub chromatic: bool,
}

impl Default for CircuitBoardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern_x: 7.0,
            pattern_y: 5.0,
            iterations: 6,
            scale: 1.4,
            offset: 0.16,
            scale_decay: 1.05,
            strength: 0.5,
            scroll_speed: 0.0,
            chromatic: false,
        }
    }
}

effect_settings!(CircuitBoardConfig {
    pattern_x: "patternX" => 1.0, 10.0;
    pattern_y: "patternY" => 1.0, 10.0;
    scale: "scale" => 0.5, 3.0;
    offset: "offset" => 0.05, 0.5;
    scale_decay: "scaleDecay" => 1.01, 1.2;
    strength: "strength" => 0.0, 1.0;
    scroll_speed: "scrollSpeed" => 0.0, 2.0;
});

impl TransformEffect for CircuitBoardConfig {
    const KIND: TransformEffectType = TransformEffectType::CircuitBoard;
    const SHADER: &'static str = "shaders/circuit_board.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "patternConst",
        "iterations",
        "scale",
        "offset",
        "scaleDecay",
        "strength",
        "scrollOffset",
        "chromatic",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.circuit_board
    }

    fn setup(&self, scroll: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("patternConst", [self.pattern_x, self.pattern_y]);
        u.i32("iterations", self.iterations.clamp(3, 12));
        u.f32("scale", self.scale);
        u.f32("offset", self.offset);
        u.f32("scaleDecay", self.scale_decay.max(1.001));
        u.f32("strength", self.strength);
        u.f32("scrollOffset", scroll.advance(self.scroll_speed, frame.dt));
        u.flag("chromatic", self.chromatic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spherical_tilings_are_rejected() {
        let cfg = PoincareDiskConfig {
            tile_p: 2,
            tile_q: 3,
            tile_r: 4,
            ..PoincareDiskConfig::default()
        };
        assert!(!cfg.is_hyperbolic());
        assert!(PoincareDiskConfig::default().is_hyperbolic());
    }

    #[test]
    fn corridor_mode_loads_from_legacy_ints() {
        let cfg: CorridorWarpConfig =
            serde_json::from_str(r#"{"enabled": true, "mode": 1}"#).expect("corridor should parse");
        assert_eq!(cfg.mode, CorridorWarpMode::Ceiling);
        let fallback: CorridorWarpConfig =
            serde_json::from_str(r#"{"mode": 9}"#).expect("corridor should parse");
        assert_eq!(fallback.mode, CorridorWarpMode::Corridor);
        let saved = serde_json::to_value(&cfg).expect("corridor should save");
        assert_eq!(saved["mode"], 1);
    }
}
