//! Painterly stylizers.

use super::{EffectFrame, Phase, TransformEffect, TransformEffectType, UniformWriter, effect_settings};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OilPaintConfig {
    pub enabled: bool,
    /// Stroke width relative to the base grid cell.
    pub brush_size: f32,
    /// Negative bends strokes against the gradient.
    pub stroke_bend: f32,
    pub specular: f32,
    pub layers: i32,
}

impl Default for OilPaintConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brush_size: 1.0,
            stroke_bend: -1.0,
            specular: 0.15,
            layers: 8,
        }
    }
}

effect_settings!(OilPaintConfig {
    brush_size: "brushSize" => 0.5, 3.0;
    stroke_bend: "strokeBend" => -2.0, 2.0;
    specular: "specular" => 0.0, 1.0;
});

impl TransformEffect for OilPaintConfig {
    const KIND: TransformEffectType = TransformEffectType::OilPaint;
    const SHADER: &'static str = "shaders/oil_paint.fs";
    const UNIFORMS: &'static [&'static str] = &["resolution", "brushSize", "strokeBend", "specular", "layers"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.oil_paint
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("brushSize", self.brush_size);
        u.f32("strokeBend", self.stroke_bend);
        u.f32("specular", self.specular);
        u.i32("layers", self.layers.clamp(3, 11));
    }
}

/// Outline tracing plus wash. Runs at half resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatercolorConfig {
    pub enabled: bool,
    pub samples: i32,
    pub stroke_step: f32,
    /// 0 is outline only, 1 a full wash.
    pub wash_strength: f32,
    pub paper_scale: f32,
    pub paper_strength: f32,
    pub edge_pool: f32,
    pub flow_center: f32,
    pub flow_width: f32,
}

impl Default for WatercolorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            samples: 24,
            stroke_step: 1.0,
            wash_strength: 0.7,
            paper_scale: 8.0,
            paper_strength: 0.4,
            edge_pool: 0.3,
            flow_center: 0.9,
            flow_width: 0.2,
        }
    }
}

effect_settings!(WatercolorConfig {
    stroke_step: "strokeStep" => 0.4, 2.0;
    wash_strength: "washStrength" => 0.0, 1.0;
    paper_strength: "paperStrength" => 0.0, 1.0;
});

impl TransformEffect for WatercolorConfig {
    const KIND: TransformEffectType = TransformEffectType::Watercolor;
    const SHADER: &'static str = "shaders/watercolor.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "samples",
        "strokeStep",
        "washStrength",
        "paperScale",
        "paperStrength",
        "edgePool",
        "flowCenter",
        "flowWidth",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.watercolor
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("samples", self.samples.clamp(8, 32));
        u.f32("strokeStep", self.stroke_step);
        u.f32("washStrength", self.wash_strength);
        u.f32("paperScale", self.paper_scale);
        u.f32("paperStrength", self.paper_strength);
        u.f32("edgePool", self.edge_pool);
        u.f32("flowCenter", self.flow_center);
        u.f32("flowWidth", self.flow_width);
    }
}

/// Splatted brush dabs with outlines and grain. Runs at half resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImpressionistConfig {
    pub enabled: bool,
    pub splat_count: i32,
    pub splat_size_min: f32,
    pub splat_size_max: f32,
    pub stroke_freq: f32,
    pub stroke_opacity: f32,
    pub outline_strength: f32,
    pub edge_strength: f32,
    pub edge_max_darken: f32,
    pub grain_scale: f32,
    pub grain_amount: f32,
    pub exposure: f32,
}

impl Default for ImpressionistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            splat_count: 11,
            splat_size_min: 0.018,
            splat_size_max: 0.1,
            stroke_freq: 1200.0,
            stroke_opacity: 0.7,
            outline_strength: 1.0,
            edge_strength: 4.0,
            edge_max_darken: 0.13,
            grain_scale: 400.0,
            grain_amount: 0.1,
            exposure: 1.28,
        }
    }
}

effect_settings!(ImpressionistConfig {
    splat_size_max: "splatSizeMax" => 0.05, 0.25;
    stroke_freq: "strokeFreq" => 400.0, 2000.0;
    edge_strength: "edgeStrength" => 0.0, 8.0;
    stroke_opacity: "strokeOpacity" => 0.0, 1.0;
});

impl TransformEffect for ImpressionistConfig {
    const KIND: TransformEffectType = TransformEffectType::Impressionist;
    const SHADER: &'static str = "shaders/impressionist.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "splatCount",
        "splatSizeMin",
        "splatSizeMax",
        "strokeFreq",
        "strokeOpacity",
        "outlineStrength",
        "edgeStrength",
        "edgeMaxDarken",
        "grainScale",
        "grainAmount",
        "exposure",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.impressionist
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("splatCount", self.splat_count.max(1));
        u.f32("splatSizeMin", self.splat_size_min.min(self.splat_size_max));
        u.f32("splatSizeMax", self.splat_size_max);
        u.f32("strokeFreq", self.stroke_freq);
        u.f32("strokeOpacity", self.stroke_opacity);
        u.f32("outlineStrength", self.outline_strength);
        u.f32("edgeStrength", self.edge_strength);
        u.f32("edgeMaxDarken", self.edge_max_darken);
        u.f32("grainScale", self.grain_scale);
        u.f32("grainAmount", self.grain_amount);
        u.f32("exposure", self.exposure);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InkWashConfig {
    pub enabled: bool,
    pub strength: f32,
    pub granulation: f32,
    pub bleed_strength: f32,
    pub bleed_radius: f32,
    /// Pre-blur radius before edge detection.
    pub softness: f32,
}

impl Default for InkWashConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 1.0,
            granulation: 0.5,
            bleed_strength: 0.5,
            bleed_radius: 5.0,
            softness: 0.0,
        }
    }
}

effect_settings!(InkWashConfig {
    strength: "strength" => 0.0, 2.0;
    granulation: "granulation" => 0.0, 1.0;
    bleed_strength: "bleedStrength" => 0.0, 1.0;
    bleed_radius: "bleedRadius" => 1.0, 10.0;
    softness: "softness" => 0.0, 5.0;
});

impl TransformEffect for InkWashConfig {
    const KIND: TransformEffectType = TransformEffectType::InkWash;
    const SHADER: &'static str = "shaders/ink_wash.fs";
    const UNIFORMS: &'static [&'static str] =
        &["resolution", "strength", "granulation", "bleedStrength", "bleedRadius", "softness"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.ink_wash
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("strength", self.strength);
        u.f32("granulation", self.granulation);
        u.f32("bleedStrength", self.bleed_strength);
        u.f32("bleedRadius", self.bleed_radius);
        u.f32("softness", self.softness);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PencilSketchConfig {
    pub enabled: bool,
    pub angle_count: i32,
    pub sample_count: i32,
    pub stroke_falloff: f32,
    pub gradient_eps: f32,
    pub paper_strength: f32,
    pub vignette_strength: f32,
    /// 0 keeps the strokes still.
    pub wobble_speed: f32,
    pub wobble_amount: f32,
}

impl Default for PencilSketchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            angle_count: 3,
            sample_count: 16,
            stroke_falloff: 1.0,
            gradient_eps: 0.4,
            paper_strength: 0.5,
            vignette_strength: 1.0,
            wobble_speed: 1.0,
            wobble_amount: 4.0,
        }
    }
}

effect_settings!(PencilSketchConfig {
    stroke_falloff: "strokeFalloff" => 0.0, 1.0;
    paper_strength: "paperStrength" => 0.0, 1.0;
    vignette_strength: "vignetteStrength" => 0.0, 1.0;
    wobble_amount: "wobbleAmount" => 0.0, 8.0;
});

impl TransformEffect for PencilSketchConfig {
    const KIND: TransformEffectType = TransformEffectType::PencilSketch;
    const SHADER: &'static str = "shaders/pencil_sketch.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "angleCount",
        "sampleCount",
        "strokeFalloff",
        "gradientEps",
        "paperStrength",
        "vignetteStrength",
        "wobbleTime",
        "wobbleAmount",
    ];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.pencil_sketch
    }

    fn setup(&self, wobble: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.i32("angleCount", self.angle_count.clamp(2, 6));
        u.i32("sampleCount", self.sample_count.clamp(8, 24));
        u.f32("strokeFalloff", self.stroke_falloff);
        u.f32("gradientEps", self.gradient_eps);
        u.f32("paperStrength", self.paper_strength);
        u.f32("vignetteStrength", self.vignette_strength);
        u.f32("wobbleTime", wobble.advance(self.wobble_speed, frame.dt));
        u.f32("wobbleAmount", self.wobble_amount);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrossHatchingConfig {
    pub enabled: bool,
    /// Line thickness in pixels.
    pub width: f32,
    pub threshold: f32,
    pub noise: f32,
    pub outline: f32,
}

impl Default for CrossHatchingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 1.5,
            threshold: 1.0,
            noise: 0.5,
            outline: 0.5,
        }
    }
}

effect_settings!(CrossHatchingConfig {
    width: "width" => 0.5, 4.0;
    threshold: "threshold" => 0.0, 2.0;
    noise: "noise" => 0.0, 1.0;
    outline: "outline" => 0.0, 1.0;
});

impl TransformEffect for CrossHatchingConfig {
    const KIND: TransformEffectType = TransformEffectType::CrossHatching;
    const SHADER: &'static str = "shaders/cross_hatching.fs";
    const UNIFORMS: &'static [&'static str] = &["resolution", "time", "width", "threshold", "noise", "outline"];
    type State = Phase;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.cross_hatching
    }

    fn setup(&self, time: &mut Phase, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("time", time.advance(1.0, frame.dt));
        u.f32("width", self.width);
        u.f32("threshold", self.threshold);
        u.f32("noise", self.noise);
        u.f32("outline", self.outline);
    }
}
