use super::{EffectFrame, Phase, TransformEffect, TransformEffectType, UniformWriter, effect_settings};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

/// Animated cell field whose distance terms drive several mixable layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoronoiConfig {
    pub enabled: bool,
    pub smooth_mode: bool,
    pub scale: f32,
    pub speed: f32,
    pub edge_falloff: f32,
    pub iso_frequency: f32,
    pub uv_distort_intensity: f32,
    pub edge_iso_intensity: f32,
    pub center_iso_intensity: f32,
    pub flat_fill_intensity: f32,
    pub organic_flow_intensity: f32,
    pub edge_glow_intensity: f32,
    pub determinant_intensity: f32,
    pub ratio_intensity: f32,
    pub edge_detect_intensity: f32,
}

impl Default for VoronoiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smooth_mode: false,
            scale: 15.0,
            speed: 0.5,
            edge_falloff: 0.3,
            iso_frequency: 10.0,
            uv_distort_intensity: 0.0,
            edge_iso_intensity: 0.0,
            center_iso_intensity: 0.0,
            flat_fill_intensity: 0.0,
            organic_flow_intensity: 0.0,
            edge_glow_intensity: 0.0,
            determinant_intensity: 0.0,
            ratio_intensity: 0.0,
            edge_detect_intensity: 0.0,
        }
    }
}

effect_settings!(VoronoiConfig {
    scale: "scale" => 5.0, 50.0;
    speed: "speed" => 0.1, 2.0;
    edge_falloff: "edgeFalloff" => 0.1, 1.0;
    iso_frequency: "isoFrequency" => 1.0, 50.0;
    uv_distort_intensity: "uvDistortIntensity" => 0.0, 1.0;
    edge_iso_intensity: "edgeIsoIntensity" => 0.0, 1.0;
    center_iso_intensity: "centerIsoIntensity" => 0.0, 1.0;
    flat_fill_intensity: "flatFillIntensity" => 0.0, 1.0;
    organic_flow_intensity: "organicFlowIntensity" => 0.0, 1.0;
    edge_glow_intensity: "edgeGlowIntensity" => 0.0, 1.0;
    determinant_intensity: "determinantIntensity" => 0.0, 1.0;
    ratio_intensity: "ratioIntensity" => 0.0, 1.0;
    edge_detect_intensity: "edgeDetectIntensity" => 0.0, 1.0;
});

impl TransformEffect for VoronoiConfig {
    const KIND: TransformEffectType = TransformEffectType::Voronoi;
    const SHADER: &'static str = "shaders/voronoi.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "smoothMode",
        "scale",
        "edgeFalloff",
        "isoFrequency",
        "uvDistortIntensity",
        "edgeIsoIntensity",
        "centerIsoIntensity",
        "flatFillIntensity",
        "organicFlowIntensity",
        "edgeGlowIntensity",
        "determinantIntensity",
        "ratioIntensity",
        "edgeDetectIntensity",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.voronoi
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("time", time.advance(self.speed, frame.dt));
        u.flag("smoothMode", self.smooth_mode);
        u.f32("scale", self.scale);
        u.f32("edgeFalloff", self.edge_falloff);
        u.f32("isoFrequency", self.iso_frequency);
        u.f32("uvDistortIntensity", self.uv_distort_intensity);
        u.f32("edgeIsoIntensity", self.edge_iso_intensity);
        u.f32("centerIsoIntensity", self.center_iso_intensity);
        u.f32("flatFillIntensity", self.flat_fill_intensity);
        u.f32("organicFlowIntensity", self.organic_flow_intensity);
        u.f32("edgeGlowIntensity", self.edge_glow_intensity);
        u.f32("determinantIntensity", self.determinant_intensity);
        u.f32("ratioIntensity", self.ratio_intensity);
        u.f32("edgeDetectIntensity", self.edge_detect_intensity);
    }
}

/// Sunflower seed lattice: cell `i` sits at radius `sqrt(i)` and angle
/// `i` times the golden angle, with the same layers as [`VoronoiConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhyllotaxisConfig {
    pub enabled: bool,
    /// Seed spacing; smaller packs more seeds.
    pub scale: f32,
    /// Drift of the divergence angle, radians per second.
    pub angle_speed: f32,
    /// Per-cell pulse, radians per second.
    pub phase_speed: f32,
    pub cell_radius: f32,
    pub iso_frequency: f32,
    pub uv_distort_intensity: f32,
    pub flat_fill_intensity: f32,
    pub center_iso_intensity: f32,
    pub edge_glow_intensity: f32,
}

impl Default for PhyllotaxisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 0.06,
            angle_speed: 0.0,
            phase_speed: 0.0,
            cell_radius: 0.8,
            iso_frequency: 5.0,
            uv_distort_intensity: 0.0,
            flat_fill_intensity: 0.0,
            center_iso_intensity: 0.0,
            edge_glow_intensity: 0.0,
        }
    }
}

effect_settings!(PhyllotaxisConfig {
    scale: "scale" => 0.02, 0.15;
    angle_speed: "angleSpeed" => -0.1, 0.1;
    phase_speed: "phaseSpeed" => -5.0, 5.0;
    cell_radius: "cellRadius" => 0.1, 1.5;
    iso_frequency: "isoFrequency" => 1.0, 20.0;
    uv_distort_intensity: "uvDistortIntensity" => 0.0, 1.0;
    flat_fill_intensity: "flatFillIntensity" => 0.0, 1.0;
    center_iso_intensity: "centerIsoIntensity" => 0.0, 1.0;
    edge_glow_intensity: "edgeGlowIntensity" => 0.0, 1.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PhyllotaxisState {
    angle: Phase,
    phase: Phase,
}

impl TransformEffect for PhyllotaxisConfig {
    const KIND: TransformEffectType = TransformEffectType::Phyllotaxis;
    const SHADER: &'static str = "shaders/phyllotaxis.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "scale",
        "divergenceAngle",
        "phaseTime",
        "cellRadius",
        "isoFrequency",
        "uvDistortIntensity",
        "flatFillIntensity",
        "centerIsoIntensity",
        "edgeGlowIntensity",
    ];
    type State = PhyllotaxisState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.phyllotaxis
    }

    fn setup(&self, s: &mut PhyllotaxisState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("scale", self.scale.max(0.005));
        u.f32("divergenceAngle", GOLDEN_ANGLE + s.angle.advance(self.angle_speed, frame.dt));
        u.f32("phaseTime", s.phase.advance(self.phase_speed, frame.dt));
        u.f32("cellRadius", self.cell_radius);
        u.f32("isoFrequency", self.iso_frequency);
        u.f32("uvDistortIntensity", self.uv_distort_intensity);
        u.f32("flatFillIntensity", self.flat_fill_intensity);
        u.f32("centerIsoIntensity", self.center_iso_intensity);
        u.f32("edgeGlowIntensity", self.edge_glow_intensity);
    }
}

/// 2π(1 - 1/φ).
pub const GOLDEN_ANGLE: f32 = 2.399_963;
