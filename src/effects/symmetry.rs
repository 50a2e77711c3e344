//! Mirror and fold transforms.

use super::{
    EffectFrame, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX, SpinState, TransformEffect,
    TransformEffectType, UniformWriter, effect_settings,
};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KaleidoscopeConfig {
    pub enabled: bool,
    /// Wedge count, 1..=12.
    pub segments: i32,
    pub rotation_speed: f32,
    pub twist_angle: f32,
    /// Blend width at wedge seams; 0 is a hard edge.
    pub smoothing: f32,
}

impl Default for KaleidoscopeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            segments: 6,
            rotation_speed: 0.0,
            twist_angle: 0.0,
            smoothing: 0.0,
        }
    }
}

effect_settings!(KaleidoscopeConfig {
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    twist_angle: "twistAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    smoothing: "smoothing" => 0.0, 0.5;
});

impl TransformEffect for KaleidoscopeConfig {
    const KIND: TransformEffectType = TransformEffectType::Kaleidoscope;
    const SHADER: &'static str = "shaders/kaleidoscope.fs";
    const UNIFORMS: &'static [&'static str] = &["segments", "rotation", "twistAngle", "smoothing"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.kaleidoscope
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("segments", self.segments.clamp(1, 12));
        u.f32("rotation", rotation.spin(self.rotation_speed, frame.dt));
        u.f32("twistAngle", self.twist_angle);
        u.f32("smoothing", self.smoothing);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KifsConfig {
    pub enabled: bool,
    pub iterations: i32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_speed: f32,
    pub twist_speed: f32,
    pub octant_fold: bool,
    pub polar_fold: bool,
    pub polar_fold_segments: i32,
    pub polar_fold_smoothing: f32,
}

impl Default for KifsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: 4,
            scale: 2.0,
            offset_x: 1.0,
            offset_y: 1.0,
            rotation_speed: 0.0,
            twist_speed: 0.0,
            octant_fold: false,
            polar_fold: false,
            polar_fold_segments: 6,
            polar_fold_smoothing: 0.0,
        }
    }
}

effect_settings!(KifsConfig {
    scale: "scale" => 1.5, 2.5;
    offset_x: "offsetX" => 0.0, 2.0;
    offset_y: "offsetY" => 0.0, 2.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    twist_speed: "twistSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    polar_fold_smoothing: "polarFoldSmoothing" => 0.0, 0.5;
});

impl TransformEffect for KifsConfig {
    const KIND: TransformEffectType = TransformEffectType::Kifs;
    const SHADER: &'static str = "shaders/kifs.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "iterations",
        "scale",
        "kifsOffset",
        "rotation",
        "twist",
        "octantFold",
        "polarFold",
        "polarFoldSegments",
        "polarFoldSmoothing",
    ];
    type State = SpinState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.kifs
    }

    fn setup(&self, s: &mut SpinState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("iterations", self.iterations.clamp(1, 6));
        u.f32("scale", self.scale);
        u.vec2("kifsOffset", [self.offset_x, self.offset_y]);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("twist", s.twist.spin(self.twist_speed, frame.dt));
        u.flag("octantFold", self.octant_fold);
        u.flag("polarFold", self.polar_fold);
        u.i32("polarFoldSegments", self.polar_fold_segments.clamp(2, 12));
        u.f32("polarFoldSmoothing", self.polar_fold_smoothing);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LatticeFoldConfig {
    pub enabled: bool,
    /// Lattice symmetry: 3 triangular, 4 square, 6 hexagonal.
    pub cell_type: i32,
    pub cell_scale: f32,
    pub rotation_speed: f32,
    pub smoothing: f32,
}

impl Default for LatticeFoldConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_type: 6,
            cell_scale: 8.0,
            rotation_speed: 0.0,
            smoothing: 0.0,
        }
    }
}

effect_settings!(LatticeFoldConfig {
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    cell_scale: "cellScale" => 1.0, 20.0;
    smoothing: "smoothing" => 0.0, 0.5;
});

impl TransformEffect for LatticeFoldConfig {
    const KIND: TransformEffectType = TransformEffectType::LatticeFold;
    const SHADER: &'static str = "shaders/lattice_fold.fs";
    const UNIFORMS: &'static [&'static str] = &["cellType", "cellScale", "rotation", "smoothing", "resolution"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.lattice_fold
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("cellType", self.cell_type);
        u.f32("cellScale", self.cell_scale);
        u.f32("rotation", rotation.spin(self.rotation_speed, frame.dt));
        u.f32("smoothing", self.smoothing);
        u.vec2("resolution", frame.resolution());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriangleFoldConfig {
    pub enabled: bool,
    pub iterations: i32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_speed: f32,
    pub twist_speed: f32,
}

impl Default for TriangleFoldConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: 3,
            scale: 2.0,
            offset_x: 0.5,
            offset_y: 0.5,
            rotation_speed: 0.0,
            twist_speed: 0.0,
        }
    }
}

effect_settings!(TriangleFoldConfig {
    scale: "scale" => 1.5, 2.5;
    offset_x: "offsetX" => 0.0, 2.0;
    offset_y: "offsetY" => 0.0, 2.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    twist_speed: "twistSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
});

impl TransformEffect for TriangleFoldConfig {
    const KIND: TransformEffectType = TransformEffectType::TriangleFold;
    const SHADER: &'static str = "shaders/triangle_fold.fs";
    const UNIFORMS: &'static [&'static str] = &["iterations", "scale", "offset", "rotation", "twist"];
    type State = SpinState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.triangle_fold
    }

    fn setup(&self, s: &mut SpinState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("iterations", self.iterations.clamp(1, 6));
        u.f32("scale", self.scale);
        u.vec2("offset", [self.offset_x, self.offset_y]);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("twist", s.twist.spin(self.twist_speed, frame.dt));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MandelboxConfig {
    pub enabled: bool,
    pub iterations: i32,
    pub box_limit: f32,
    pub sphere_min: f32,
    pub sphere_max: f32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_speed: f32,
    pub twist_speed: f32,
    pub box_intensity: f32,
    pub sphere_intensity: f32,
    pub polar_fold: bool,
    pub polar_fold_segments: i32,
}

impl Default for MandelboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: 2,
            box_limit: 1.0,
            sphere_min: 0.5,
            sphere_max: 1.0,
            scale: -2.0,
            offset_x: 1.0,
            offset_y: 1.0,
            rotation_speed: 0.0,
            twist_speed: 0.0,
            box_intensity: 1.0,
            sphere_intensity: 1.0,
            polar_fold: false,
            polar_fold_segments: 6,
        }
    }
}

effect_settings!(MandelboxConfig {
    box_limit: "boxLimit" => 0.5, 2.0;
    sphere_min: "sphereMin" => 0.1, 0.5;
    sphere_max: "sphereMax" => 0.5, 2.0;
    scale: "scale" => -3.0, 3.0;
    offset_x: "offsetX" => 0.0, 2.0;
    offset_y: "offsetY" => 0.0, 2.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    twist_speed: "twistSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    box_intensity: "boxIntensity" => 0.0, 1.0;
    sphere_intensity: "sphereIntensity" => 0.0, 1.0;
});

impl TransformEffect for MandelboxConfig {
    const KIND: TransformEffectType = TransformEffectType::Mandelbox;
    const SHADER: &'static str = "shaders/mandelbox.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "iterations",
        "boxLimit",
        "sphereMin",
        "sphereMax",
        "scale",
        "offset",
        "rotation",
        "twist",
        "boxIntensity",
        "sphereIntensity",
        "polarFold",
        "polarFoldSegments",
    ];
    type State = SpinState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.mandelbox
    }

    fn setup(&self, s: &mut SpinState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("iterations", self.iterations.clamp(1, 6));
        u.f32("boxLimit", self.box_limit);
        // A collapsed shell would divide by zero in the sphere fold.
        u.f32("sphereMin", self.sphere_min.min(self.sphere_max - 1e-3));
        u.f32("sphereMax", self.sphere_max);
        u.f32("scale", self.scale);
        u.vec2("offset", [self.offset_x, self.offset_y]);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("twist", s.twist.spin(self.twist_speed, frame.dt));
        u.f32("boxIntensity", self.box_intensity);
        u.f32("sphereIntensity", self.sphere_intensity);
        u.flag("polarFold", self.polar_fold);
        u.i32("polarFoldSegments", self.polar_fold_segments.clamp(2, 12));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialIfsConfig {
    pub enabled: bool,
    pub segments: i32,
    pub iterations: i32,
    pub scale: f32,
    pub offset: f32,
    pub rotation_speed: f32,
    pub twist_speed: f32,
    pub smoothing: f32,
}

impl Default for RadialIfsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            segments: 6,
            iterations: 4,
            scale: 1.8,
            offset: 0.5,
            rotation_speed: 0.0,
            twist_speed: 0.0,
            smoothing: 0.0,
        }
    }
}

effect_settings!(RadialIfsConfig {
    scale: "scale" => 1.2, 2.5;
    offset: "offset" => 0.0, 2.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    twist_speed: "twistSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    smoothing: "smoothing" => 0.0, 0.5;
});

impl TransformEffect for RadialIfsConfig {
    const KIND: TransformEffectType = TransformEffectType::RadialIfs;
    const SHADER: &'static str = "shaders/radial_ifs.fs";
    const UNIFORMS: &'static [&'static str] =
        &["segments", "iterations", "scale", "offset", "rotation", "twist", "smoothing"];
    type State = SpinState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.radial_ifs
    }

    fn setup(&self, s: &mut SpinState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.i32("segments", self.segments.clamp(3, 12));
        u.i32("iterations", self.iterations.clamp(1, 8));
        u.f32("scale", self.scale);
        u.f32("offset", self.offset);
        u.f32("rotation", s.rotation.spin(self.rotation_speed, frame.dt));
        u.f32("twist", s.twist.spin(self.twist_speed, frame.dt));
        u.f32("smoothing", self.smoothing);
    }
}

/// How the rotated and scaled copies combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MoireBlendMode {
    #[default]
    Multiply,
    Min,
    Average,
    Difference,
}

impl From<i32> for MoireBlendMode {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Min,
            2 => Self::Average,
            3 => Self::Difference,
            _ => Self::Multiply,
        }
    }
}

impl From<MoireBlendMode> for i32 {
    fn from(m: MoireBlendMode) -> i32 {
        m as i32
    }
}

/// Overlays copies of the frame, each rotated and scaled a little further,
/// so fine detail beats into moiré fringes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoireInterferenceConfig {
    pub enabled: bool,
    /// Angle between successive layers.
    pub rotation_angle: f32,
    pub scale_diff: f32,
    /// Overlaid samples, 2..=4.
    pub layers: i32,
    pub blend_mode: MoireBlendMode,
    pub center_x: f32,
    pub center_y: f32,
    pub animation_speed: f32,
}

impl Default for MoireInterferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rotation_angle: 0.087,
            scale_diff: 1.02,
            layers: 2,
            blend_mode: MoireBlendMode::Multiply,
            center_x: 0.5,
            center_y: 0.5,
            animation_speed: 0.017,
        }
    }
}

effect_settings!(MoireInterferenceConfig {
    rotation_angle: "rotationAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    scale_diff: "scaleDiff" => 0.9, 1.1;
    animation_speed: "animationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
});

impl TransformEffect for MoireInterferenceConfig {
    const KIND: TransformEffectType = TransformEffectType::MoireInterference;
    const SHADER: &'static str = "shaders/moire_interference.fs";
    const UNIFORMS: &'static [&'static str] =
        &["rotationAngle", "scaleDiff", "layers", "blendMode", "center", "rotationAccum"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.moire_interference
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("rotationAngle", self.rotation_angle);
        u.f32("scaleDiff", self.scale_diff);
        u.i32("layers", self.layers.clamp(2, 4));
        u.i32("blendMode", self.blend_mode.into());
        u.vec2("center", [self.center_x, self.center_y]);
        u.f32("rotationAccum", rotation.spin(self.animation_speed, frame.dt));
    }
}
