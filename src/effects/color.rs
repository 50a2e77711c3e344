//! Colour remapping transforms.

use super::{EffectFrame, TransformEffect, TransformEffectType, UniformWriter, effect_settings, gradient_color};
use crate::color::ColorConfig;
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorGradeConfig {
    pub enabled: bool,
    /// Hue rotation, 0..1 of a full turn.
    pub hue_shift: f32,
    pub saturation: f32,
    /// Exposure in stops.
    pub brightness: f32,
    pub contrast: f32,
    pub temperature: f32,
    pub shadows_offset: f32,
    pub midtones_offset: f32,
    pub highlights_offset: f32,
}

impl Default for ColorGradeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hue_shift: 0.0,
            saturation: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            temperature: 0.0,
            shadows_offset: 0.0,
            midtones_offset: 0.0,
            highlights_offset: 0.0,
        }
    }
}

effect_settings!(ColorGradeConfig {
    hue_shift: "hueShift" => 0.0, 1.0;
    saturation: "saturation" => 0.0, 2.0;
    brightness: "brightness" => -2.0, 2.0;
    contrast: "contrast" => 0.5, 2.0;
    temperature: "temperature" => -1.0, 1.0;
    shadows_offset: "shadowsOffset" => -0.5, 0.5;
    midtones_offset: "midtonesOffset" => -0.5, 0.5;
    highlights_offset: "highlightsOffset" => -0.5, 0.5;
});

impl TransformEffect for ColorGradeConfig {
    const KIND: TransformEffectType = TransformEffectType::ColorGrade;
    const SHADER: &'static str = "shaders/color_grade.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "hueShift",
        "saturation",
        "brightness",
        "contrast",
        "temperature",
        "liftGammaGain",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.color_grade
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("hueShift", self.hue_shift);
        u.f32("saturation", self.saturation);
        u.f32("brightness", self.brightness);
        u.f32("contrast", self.contrast);
        u.f32("temperature", self.temperature);
        u.vec3(
            "liftGammaGain",
            [self.shadows_offset, self.midtones_offset, self.highlights_offset],
        );
    }
}

/// Maps luminance through a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FalseColorConfig {
    pub enabled: bool,
    pub gradient: ColorConfig,
    /// 0 keeps the original, 1 is full false colour.
    pub intensity: f32,
}

impl Default for FalseColorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gradient: gradient_color(),
            intensity: 1.0,
        }
    }
}

effect_settings!(FalseColorConfig {
    intensity: "intensity" => 0.0, 1.0;
});

impl TransformEffect for FalseColorConfig {
    const KIND: TransformEffectType = TransformEffectType::FalseColor;
    const SHADER: &'static str = "shaders/false_color.fs";
    const UNIFORMS: &'static [&'static str] = &["intensity", "gradientLUT"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.false_color
    }

    fn gradients(&self) -> Vec<&ColorConfig> {
        vec![&self.gradient]
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, luts: &[TextureId]) {
        u.f32("intensity", self.intensity);
        if let Some(&lut) = luts.first() {
            u.texture("gradientLUT", lut);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaletteQuantizationConfig {
    pub enabled: bool,
    pub color_levels: f32,
    /// 0 gives hard bands, 1 full ordered dither.
    pub dither_strength: f32,
    /// Bayer matrix size, 4 or 8.
    pub bayer_size: i32,
}

impl Default for PaletteQuantizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color_levels: 4.0,
            dither_strength: 0.5,
            bayer_size: 8,
        }
    }
}

effect_settings!(PaletteQuantizationConfig {
    color_levels: "colorLevels" => 2.0, 16.0;
    dither_strength: "ditherStrength" => 0.0, 1.0;
});

impl TransformEffect for PaletteQuantizationConfig {
    const KIND: TransformEffectType = TransformEffectType::PaletteQuantization;
    const SHADER: &'static str = "shaders/palette_quantization.fs";
    const UNIFORMS: &'static [&'static str] = &["colorLevels", "ditherStrength", "bayerSize"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.palette_quantization
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("colorLevels", self.color_levels);
        u.f32("ditherStrength", self.dither_strength);
        u.i32("bayerSize", if self.bayer_size <= 4 { 4 } else { 8 });
    }
}
