//! Zoom, streak, shake and moving-camera transforms.

use super::{
    EffectFrame, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX, TransformEffect,
    TransformEffectType, UniformWriter, effect_settings,
};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfiniteZoomConfig {
    pub enabled: bool,
    pub speed: f32,
    pub zoom_depth: f32,
    pub layers: i32,
    pub spiral_angle: f32,
    pub spiral_twist: f32,
    pub layer_rotate: f32,
}

impl Default for InfiniteZoomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: 1.0,
            zoom_depth: 3.0,
            layers: 6,
            spiral_angle: 0.0,
            spiral_twist: 0.0,
            layer_rotate: 0.0,
        }
    }
}

effect_settings!(InfiniteZoomConfig {
    spiral_angle: "spiralAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    spiral_twist: "spiralTwist" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    layer_rotate: "layerRotate" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for InfiniteZoomConfig {
    const KIND: TransformEffectType = TransformEffectType::InfiniteZoom;
    const SHADER: &'static str = "shaders/infinite_zoom.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "zoomPhase",
        "zoomDepth",
        "layers",
        "spiralAngle",
        "spiralTwist",
        "layerRotate",
        "resolution",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.infinite_zoom
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("zoomPhase", time.advance(self.speed, frame.dt));
        u.f32("zoomDepth", self.zoom_depth);
        u.i32("layers", self.layers.clamp(1, 16));
        u.f32("spiralAngle", self.spiral_angle);
        u.f32("spiralTwist", self.spiral_twist);
        u.f32("layerRotate", self.layer_rotate);
        u.vec2("resolution", frame.resolution());
    }
}

/// Radial blur from the centre. Runs at half resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialStreakConfig {
    pub enabled: bool,
    pub samples: i32,
    pub streak_length: f32,
    /// 0 keeps the original, 1 is the full streak.
    pub intensity: f32,
}

impl Default for RadialStreakConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            samples: 16,
            streak_length: 0.3,
            intensity: 1.0,
        }
    }
}

effect_settings!(RadialStreakConfig {
    streak_length: "streakLength" => 0.0, 1.0;
    intensity: "intensity" => 0.0, 1.0;
});

impl TransformEffect for RadialStreakConfig {
    const KIND: TransformEffectType = TransformEffectType::RadialStreak;
    const SHADER: &'static str = "shaders/radial_streak.fs";
    const UNIFORMS: &'static [&'static str] = &["samples", "streakLength", "intensity"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.radial_streak
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("samples", self.samples.clamp(1, 64));
        u.f32("streakLength", self.streak_length);
        u.f32("intensity", self.intensity);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrosteZoomConfig {
    pub enabled: bool,
    pub speed: f32,
    pub scale: f32,
    pub spiral_angle: f32,
    pub shear_coeff: f32,
    pub inner_radius: f32,
    pub branches: i32,
}

impl Default for DrosteZoomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: 1.0,
            scale: 2.5,
            spiral_angle: 0.0,
            shear_coeff: 0.0,
            inner_radius: 0.0,
            branches: 1,
        }
    }
}

effect_settings!(DrosteZoomConfig {
    scale: "scale" => 1.5, 10.0;
    spiral_angle: "spiralAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    shear_coeff: "shearCoeff" => -1.0, 1.0;
    inner_radius: "innerRadius" => 0.0, 0.5;
});

impl TransformEffect for DrosteZoomConfig {
    const KIND: TransformEffectType = TransformEffectType::DrosteZoom;
    const SHADER: &'static str = "shaders/droste_zoom.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "time",
        "scale",
        "spiralAngle",
        "shearCoeff",
        "innerRadius",
        "branches",
        "resolution",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.droste_zoom
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("time", time.advance(self.speed, frame.dt));
        u.f32("scale", self.scale);
        u.f32("spiralAngle", self.spiral_angle);
        u.f32("shearCoeff", self.shear_coeff);
        u.f32("innerRadius", self.inner_radius);
        u.i32("branches", self.branches.clamp(1, 8));
        u.vec2("resolution", frame.resolution());
    }
}

/// Jittered multi-tap sampling. `samples` is a float so it can be modulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShakeConfig {
    pub enabled: bool,
    pub intensity: f32,
    pub samples: f32,
    /// Jitter reseeds per second.
    pub rate: f32,
    pub gaussian: bool,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.02,
            samples: 4.0,
            rate: 12.0,
            gaussian: false,
        }
    }
}

effect_settings!(ShakeConfig {
    intensity: "intensity" => 0.0, 0.2;
    rate: "rate" => 1.0, 60.0;
    samples: "samples" => 1.0, 16.0;
});

impl TransformEffect for ShakeConfig {
    const KIND: TransformEffectType = TransformEffectType::Shake;
    const SHADER: &'static str = "shaders/shake.fs";
    const UNIFORMS: &'static [&'static str] = &["time", "intensity", "samples", "rate", "gaussian"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.shake
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("time", time.advance(1.0, frame.dt));
        u.f32("intensity", self.intensity);
        u.i32("samples", self.samples.round().clamp(1.0, 16.0) as i32);
        u.f32("rate", self.rate);
        u.flag("gaussian", self.gaussian);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialPulseConfig {
    pub enabled: bool,
    pub radial_freq: f32,
    pub radial_amp: f32,
    pub segments: i32,
    pub angular_amp: f32,
    pub petal_amp: f32,
    pub phase_speed: f32,
    pub spiral_twist: f32,
    pub octaves: i32,
    pub octave_rotation: f32,
    pub depth_blend: bool,
}

impl Default for RadialPulseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radial_freq: 8.0,
            radial_amp: 0.05,
            segments: 6,
            angular_amp: 0.1,
            petal_amp: 0.0,
            phase_speed: 1.0,
            spiral_twist: 0.0,
            octaves: 1,
            octave_rotation: 0.0,
            depth_blend: false,
        }
    }
}

effect_settings!(RadialPulseConfig {
    radial_freq: "radialFreq" => 1.0, 30.0;
    radial_amp: "radialAmp" => -0.3, 0.3;
    angular_amp: "angularAmp" => -0.5, 0.5;
    petal_amp: "petalAmp" => -1.0, 1.0;
    spiral_twist: "spiralTwist" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    octave_rotation: "octaveRotation" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for RadialPulseConfig {
    const KIND: TransformEffectType = TransformEffectType::RadialPulse;
    const SHADER: &'static str = "shaders/radial_pulse.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "radialFreq",
        "radialAmp",
        "segments",
        "angularAmp",
        "petalAmp",
        "phase",
        "spiralTwist",
        "octaves",
        "octaveRotation",
        "depthBlend",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.radial_pulse
    }

    fn setup(&self, phase: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("radialFreq", self.radial_freq);
        u.f32("radialAmp", self.radial_amp);
        u.i32("segments", self.segments.max(1));
        u.f32("angularAmp", self.angular_amp);
        u.f32("petalAmp", self.petal_amp);
        u.f32("phase", phase.advance(self.phase_speed, frame.dt));
        u.f32("spiralTwist", self.spiral_twist);
        u.i32("octaves", self.octaves.clamp(1, 8));
        u.f32("octaveRotation", self.octave_rotation);
        u.flag("depthBlend", self.depth_blend);
    }
}

/// Galaxy arms from nested tilted ellipses that rotate differentially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DensityWaveSpiralConfig {
    pub enabled: bool,
    pub center_x: f32,
    pub center_y: f32,
    pub aspect_x: f32,
    /// Smaller reads as a barred spiral.
    pub aspect_y: f32,
    /// Arm winding; negative trails.
    pub tightness: f32,
    pub rotation_speed: f32,
    pub global_rotation_speed: f32,
    pub thickness: f32,
    pub ring_count: i32,
    pub falloff: f32,
}

impl Default for DensityWaveSpiralConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            center_x: 0.0,
            center_y: 0.0,
            aspect_x: 0.5,
            aspect_y: 0.3,
            tightness: -std::f32::consts::FRAC_PI_2,
            rotation_speed: 0.5,
            global_rotation_speed: 0.0,
            thickness: 0.3,
            ring_count: 30,
            falloff: 1.0,
        }
    }
}

effect_settings!(DensityWaveSpiralConfig {
    center_x: "centerX" => -0.5, 0.5;
    center_y: "centerY" => -0.5, 0.5;
    aspect_x: "aspectX" => 0.1, 1.0;
    aspect_y: "aspectY" => 0.1, 1.0;
    tightness: "tightness" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    global_rotation_speed: "globalRotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    thickness: "thickness" => 0.05, 0.5;
    falloff: "falloff" => 0.5, 2.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct DensityWaveState {
    rotation: Phase,
    global: Phase,
}

impl TransformEffect for DensityWaveSpiralConfig {
    const KIND: TransformEffectType = TransformEffectType::DensityWaveSpiral;
    const SHADER: &'static str = "shaders/density_wave_spiral.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "center",
        "aspect",
        "tightness",
        "rotationAccum",
        "globalRotationAccum",
        "thickness",
        "ringCount",
        "falloff",
    ];
    type State = DensityWaveState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.density_wave_spiral
    }

    fn setup(&self, s: &mut DensityWaveState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.vec2("center", [self.center_x, self.center_y]);
        u.vec2("aspect", [self.aspect_x.max(0.01), self.aspect_y.max(0.01)]);
        u.f32("tightness", self.tightness);
        u.f32("rotationAccum", s.rotation.advance(self.rotation_speed, frame.dt));
        u.f32("globalRotationAccum", s.global.spin(self.global_rotation_speed, frame.dt));
        u.f32("thickness", self.thickness);
        u.i32("ringCount", self.ring_count.clamp(10, 50));
        u.f32("falloff", self.falloff);
    }
}

/// Special-relativistic view from a camera moving into the screen:
/// aberration pulls the scene toward the direction of travel, Doppler
/// shifts hue, and the headlight effect brightens the forward cone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelativisticDopplerConfig {
    pub enabled: bool,
    /// Fraction of light speed.
    pub velocity: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub aberration: f32,
    pub color_shift: f32,
    pub headlight: f32,
}

impl Default for RelativisticDopplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            velocity: 0.5,
            center_x: 0.5,
            center_y: 0.5,
            aberration: 1.0,
            color_shift: 1.0,
            headlight: 0.3,
        }
    }
}

effect_settings!(RelativisticDopplerConfig {
    velocity: "velocity" => 0.0, 0.99;
    center_x: "centerX" => 0.0, 1.0;
    center_y: "centerY" => 0.0, 1.0;
    aberration: "aberration" => 0.0, 1.0;
    color_shift: "colorShift" => 0.0, 1.0;
    headlight: "headlight" => 0.0, 1.0;
});

impl TransformEffect for RelativisticDopplerConfig {
    const KIND: TransformEffectType = TransformEffectType::RelativisticDoppler;
    const SHADER: &'static str = "shaders/relativistic_doppler.fs";
    const UNIFORMS: &'static [&'static str] =
        &["resolution", "velocity", "center", "aberration", "colorShift", "headlight"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.relativistic_doppler
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        // β = 1 makes γ infinite.
        u.f32("velocity", self.velocity.clamp(0.0, 0.99));
        u.vec2("center", [self.center_x, self.center_y]);
        u.f32("aberration", self.aberration);
        u.f32("colorShift", self.color_shift);
        u.f32("headlight", self.headlight);
    }
}
