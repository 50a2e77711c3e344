//! Flat graphic stylizers and faceted surfaces.

use super::{
    EffectFrame, Phase, ROTATION_OFFSET_MAX, ROTATION_SPEED_MAX, TransformEffect, TransformEffectType,
    UniformWriter, effect_settings,
};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToonConfig {
    pub enabled: bool,
    pub levels: i32,
    pub edge_threshold: f32,
    pub edge_softness: f32,
    /// Noise-driven stroke width variation.
    pub thickness_variation: f32,
    pub noise_scale: f32,
}

impl Default for ToonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            levels: 4,
            edge_threshold: 0.2,
            edge_softness: 0.05,
            thickness_variation: 0.0,
            noise_scale: 5.0,
        }
    }
}

effect_settings!(ToonConfig {
    edge_threshold: "edgeThreshold" => 0.0, 1.0;
    edge_softness: "edgeSoftness" => 0.0, 0.2;
    thickness_variation: "thicknessVariation" => 0.0, 1.0;
});

impl TransformEffect for ToonConfig {
    const KIND: TransformEffectType = TransformEffectType::Toon;
    const SHADER: &'static str = "shaders/toon.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "levels",
        "edgeThreshold",
        "edgeSoftness",
        "thicknessVariation",
        "noiseScale",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.toon
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("levels", self.levels.clamp(2, 16));
        u.f32("edgeThreshold", self.edge_threshold);
        u.f32("edgeSoftness", self.edge_softness);
        u.f32("thicknessVariation", self.thickness_variation);
        u.f32("noiseScale", self.noise_scale);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum NeonColorMode {
    #[default]
    Custom,
    /// Glow takes the hue of the source pixel.
    Source,
}

impl From<i32> for NeonColorMode {
    fn from(i: i32) -> Self {
        if i == 1 { Self::Source } else { Self::Custom }
    }
}

impl From<NeonColorMode> for i32 {
    fn from(m: NeonColorMode) -> i32 {
        m as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NeonGlowConfig {
    pub enabled: bool,
    pub glow_r: f32,
    pub glow_g: f32,
    pub glow_b: f32,
    pub edge_threshold: f32,
    pub edge_power: f32,
    pub glow_intensity: f32,
    pub glow_radius: f32,
    /// Cross-tap count; forced odd.
    pub glow_samples: i32,
    pub original_visibility: f32,
    pub color_mode: NeonColorMode,
    pub saturation_boost: f32,
    pub brightness_boost: f32,
}

impl Default for NeonGlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            glow_r: 0.0,
            glow_g: 1.0,
            glow_b: 1.0,
            edge_threshold: 0.1,
            edge_power: 1.0,
            glow_intensity: 2.0,
            glow_radius: 2.0,
            glow_samples: 5,
            original_visibility: 0.0,
            color_mode: NeonColorMode::Custom,
            saturation_boost: 0.5,
            brightness_boost: 0.5,
        }
    }
}

effect_settings!(NeonGlowConfig {
    glow_intensity: "glowIntensity" => 0.5, 5.0;
    edge_threshold: "edgeThreshold" => 0.0, 0.5;
    original_visibility: "originalVisibility" => 0.0, 1.0;
    saturation_boost: "saturationBoost" => 0.0, 1.0;
    brightness_boost: "brightnessBoost" => 0.0, 1.0;
});

impl TransformEffect for NeonGlowConfig {
    const KIND: TransformEffectType = TransformEffectType::NeonGlow;
    const SHADER: &'static str = "shaders/neon_glow.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "glowColor",
        "edgeThreshold",
        "edgePower",
        "glowIntensity",
        "glowRadius",
        "glowSamples",
        "originalVisibility",
        "colorMode",
        "saturationBoost",
        "brightnessBoost",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.neon_glow
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let samples = self.glow_samples.clamp(3, 9) | 1;
        u.vec2("resolution", frame.resolution());
        u.vec3("glowColor", [self.glow_r, self.glow_g, self.glow_b]);
        u.f32("edgeThreshold", self.edge_threshold);
        u.f32("edgePower", self.edge_power);
        u.f32("glowIntensity", self.glow_intensity);
        u.f32("glowRadius", self.glow_radius);
        u.i32("glowSamples", samples);
        u.f32("originalVisibility", self.original_visibility);
        u.i32("colorMode", self.color_mode.into());
        u.f32("saturationBoost", self.saturation_boost);
        u.f32("brightnessBoost", self.brightness_boost);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HalftoneConfig {
    pub enabled: bool,
    /// Grid cell size in pixels.
    pub dot_scale: f32,
    pub dot_size: f32,
    pub rotation_speed: f32,
    pub rotation_angle: f32,
}

impl Default for HalftoneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dot_scale: 8.0,
            dot_size: 1.0,
            rotation_speed: 0.0,
            rotation_angle: 0.0,
        }
    }
}

effect_settings!(HalftoneConfig {
    dot_scale: "dotScale" => 2.0, 20.0;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_angle: "rotationAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for HalftoneConfig {
    const KIND: TransformEffectType = TransformEffectType::Halftone;
    const SHADER: &'static str = "shaders/halftone.fs";
    const UNIFORMS: &'static [&'static str] = &["resolution", "dotScale", "dotSize", "rotation"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.halftone
    }

    fn setup(&self, rotation: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let angle = rotation.spin(self.rotation_speed, frame.dt) + self.rotation_angle;
        u.vec2("resolution", frame.resolution());
        u.f32("dotScale", self.dot_scale);
        u.f32("dotSize", self.dot_size);
        u.f32("rotation", angle);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KuwaharaConfig {
    pub enabled: bool,
    /// Kernel radius; truncated to an integer when drawn.
    pub radius: f32,
}

impl Default for KuwaharaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 4.0,
        }
    }
}

effect_settings!(KuwaharaConfig {
    radius: "radius" => 2.0, 12.0;
});

impl TransformEffect for KuwaharaConfig {
    const KIND: TransformEffectType = TransformEffectType::Kuwahara;
    const SHADER: &'static str = "shaders/kuwahara.fs";
    const UNIFORMS: &'static [&'static str] = &["resolution", "radius"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.kuwahara
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("radius", self.radius as i32);
    }
}

/// Mirror-tiled sphere reflecting the frame, with light spots thrown
/// onto the background outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoBallConfig {
    pub enabled: bool,
    /// Fraction of screen height.
    pub sphere_radius: f32,
    /// Facet size; smaller is more tiles.
    pub tile_size: f32,
    pub rotation_speed: f32,
    pub bump_height: f32,
    pub reflect_intensity: f32,
    pub spot_intensity: f32,
    pub spot_falloff: f32,
    /// Input brightness below this throws no spot.
    pub brightness_threshold: f32,
}

impl Default for DiscoBallConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sphere_radius: 0.8,
            tile_size: 0.12,
            rotation_speed: 0.5,
            bump_height: 0.1,
            reflect_intensity: 2.0,
            spot_intensity: 1.0,
            spot_falloff: 1.0,
            brightness_threshold: 0.1,
        }
    }
}

effect_settings!(DiscoBallConfig {
    sphere_radius: "sphereRadius" => 0.2, 1.5;
    tile_size: "tileSize" => 0.05, 0.3;
    rotation_speed: "rotationSpeed" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    bump_height: "bumpHeight" => 0.0, 0.2;
    reflect_intensity: "reflectIntensity" => 0.5, 5.0;
    spot_intensity: "spotIntensity" => 0.0, 3.0;
    spot_falloff: "spotFalloff" => 0.5, 3.0;
    brightness_threshold: "brightnessThreshold" => 0.0, 0.5;
});

impl TransformEffect for DiscoBallConfig {
    const KIND: TransformEffectType = TransformEffectType::DiscoBall;
    const SHADER: &'static str = "shaders/disco_ball.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "sphereRadius",
        "tileSize",
        "sphereAngle",
        "bumpHeight",
        "reflectIntensity",
        "spotIntensity",
        "spotFalloff",
        "brightnessThreshold",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.disco_ball
    }

    fn setup(&self, angle: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("sphereRadius", self.sphere_radius);
        u.f32("tileSize", self.tile_size.max(0.01));
        u.f32("sphereAngle", angle.spin(self.rotation_speed, frame.dt));
        u.f32("bumpHeight", self.bump_height);
        u.f32("reflectIntensity", self.reflect_intensity);
        u.f32("spotIntensity", self.spot_intensity);
        u.f32("spotFalloff", self.spot_falloff);
        u.f32("brightnessThreshold", self.brightness_threshold);
    }
}

/// Pixelation into studded bricks; similar neighbours merge into wider ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegoBricksConfig {
    pub enabled: bool,
    /// Brick size relative to the screen.
    pub brick_scale: f32,
    pub stud_height: f32,
    pub edge_shadow: f32,
    /// Colour distance under which neighbours merge.
    pub color_threshold: f32,
    /// Largest brick side in cells, 1 or 2.
    pub max_brick_size: i32,
    pub light_angle: f32,
}

impl Default for LegoBricksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brick_scale: 0.04,
            stud_height: 0.5,
            edge_shadow: 0.2,
            color_threshold: 0.1,
            max_brick_size: 2,
            light_angle: std::f32::consts::FRAC_PI_4,
        }
    }
}

effect_settings!(LegoBricksConfig {
    brick_scale: "brickScale" => 0.01, 0.2;
    stud_height: "studHeight" => 0.0, 1.0;
    edge_shadow: "edgeShadow" => 0.0, 1.0;
    color_threshold: "colorThreshold" => 0.0, 0.5;
    light_angle: "lightAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
});

impl TransformEffect for LegoBricksConfig {
    const KIND: TransformEffectType = TransformEffectType::LegoBricks;
    const SHADER: &'static str = "shaders/lego_bricks.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "brickScale",
        "studHeight",
        "edgeShadow",
        "colorThreshold",
        "maxBrickSize",
        "lightDir",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.lego_bricks
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let (sin, cos) = self.light_angle.sin_cos();
        u.vec2("resolution", frame.resolution());
        u.f32("brickScale", self.brick_scale.max(0.005));
        u.f32("studHeight", self.stud_height);
        u.f32("edgeShadow", self.edge_shadow);
        u.f32("colorThreshold", self.color_threshold);
        u.i32("maxBrickSize", self.max_brick_size.clamp(1, 2));
        u.vec2("lightDir", [cos, sin]);
    }
}
