//! Lens-like effects. Bloom and the anamorphic streak own mip chains and
//! drive their own passes.

use super::{
    EffectFrame, EffectModule, ROTATION_OFFSET_MAX, TransformEffect, TransformEffectType, UniformWriter,
    effect_settings,
};
use crate::effect_config::EffectConfig;
use crate::gpu::{Gpu, GpuError, ProgramId, ShaderProgram, TextureDesc, TextureFormat, TextureId};
use serde::{Deserialize, Serialize};

pub const BLOOM_MIP_COUNT: usize = 5;
pub const STREAK_MIP_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BloomConfig {
    pub enabled: bool,
    pub threshold: f32,
    /// Soft threshold falloff.
    pub knee: f32,
    pub intensity: f32,
    /// Mip chain depth, 3..=5.
    pub iterations: i32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.8,
            knee: 0.5,
            intensity: 0.5,
            iterations: 5,
        }
    }
}

effect_settings!(BloomConfig {
    threshold: "threshold" => 0.0, 2.0;
    intensity: "intensity" => 0.0, 2.0;
});

/// Soft-threshold extraction, dual-filter down/up chain, additive composite.
///
/// Upsampled levels go to a second chain so no pass reads its own target.
pub struct BloomEffect {
    prefilter: ShaderProgram,
    downsample: ShaderProgram,
    upsample: ShaderProgram,
    composite: ShaderProgram,
    mips: Vec<TextureId>,
    ups: Vec<TextureId>,
    iterations: usize,
}

/// Half-size steps starting at half resolution, never below 1×1.
pub fn bloom_mip_sizes(width: u32, height: u32) -> Vec<(u32, u32)> {
    let (mut w, mut h) = ((width / 2).max(1), (height / 2).max(1));
    (0..BLOOM_MIP_COUNT)
        .map(|_| {
            let size = (w, h);
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            size
        })
        .collect()
}

/// Horizontal-only halving from half resolution; height stays at half.
pub fn streak_mip_sizes(width: u32, height: u32) -> Vec<(u32, u32)> {
    let h = (height / 2).max(1);
    let mut w = (width / 2).max(1);
    (0..STREAK_MIP_COUNT)
        .map(|_| {
            let size = (w, h);
            w = (w / 2).max(1);
            size
        })
        .collect()
}

fn alloc_chain(gpu: &mut dyn Gpu, sizes: &[(u32, u32)]) -> Result<Vec<TextureId>, GpuError> {
    let mut chain = Vec::with_capacity(sizes.len());
    for &(w, h) in sizes {
        match gpu.create_texture(TextureDesc::with_format(w, h, TextureFormat::Rgba16F)) {
            Ok(t) => chain.push(t),
            Err(err) => {
                chain.into_iter().for_each(|t| gpu.destroy_texture(t));
                return Err(err);
            }
        }
    }
    Ok(chain)
}

fn free_chain(gpu: &mut dyn Gpu, chain: &mut Vec<TextureId>) {
    chain.drain(..).for_each(|t| gpu.destroy_texture(t));
}

/// Down chain plus a separate up chain of the same sizes.
fn alloc_chains(gpu: &mut dyn Gpu, sizes: &[(u32, u32)]) -> Result<(Vec<TextureId>, Vec<TextureId>), GpuError> {
    let mut mips = alloc_chain(gpu, sizes)?;
    match alloc_chain(gpu, sizes) {
        Ok(ups) => Ok((mips, ups)),
        Err(err) => {
            free_chain(gpu, &mut mips);
            Err(err)
        }
    }
}

/// Loads every program or none.
fn load_programs(gpu: &mut dyn Gpu, specs: &[(&'static str, &[&'static str])]) -> Result<Vec<ShaderProgram>, GpuError> {
    let mut loaded: Vec<ShaderProgram> = Vec::with_capacity(specs.len());
    for &(path, names) in specs {
        match ShaderProgram::fragment(gpu, path, names) {
            Ok(p) => loaded.push(p),
            Err(err) => {
                loaded.into_iter().for_each(|p| p.release(gpu));
                return Err(err);
            }
        }
    }
    Ok(loaded)
}

impl BloomEffect {
    pub fn new(gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<Self> {
        let loaded = load_programs(
            gpu,
            &[
                ("shaders/bloom_prefilter.fs", &["threshold", "knee"]),
                ("shaders/bloom_downsample.fs", &["halfpixel"]),
                ("shaders/bloom_upsample.fs", &["halfpixel", "baseMip"]),
                ("shaders/bloom_composite.fs", &["intensity", "bloomTexture"]),
            ],
        )?;
        let (mips, ups) = match alloc_chains(gpu, &bloom_mip_sizes(width, height)) {
            Ok(c) => c,
            Err(err) => {
                loaded.into_iter().for_each(|p| p.release(gpu));
                return Err(err.into());
            }
        };
        let [prefilter, downsample, upsample, composite]: [ShaderProgram; 4] = loaded
            .try_into()
            .map_err(|_| anyhow::anyhow!("bloom programs incomplete"))?;
        log::debug!("bloom mip chain allocated from {width}x{height}");
        Ok(Self {
            prefilter,
            downsample,
            upsample,
            composite,
            mips,
            ups,
            iterations: BLOOM_MIP_COUNT,
        })
    }

    pub fn mips(&self) -> &[TextureId] {
        &self.mips
    }

    fn halfpixel(gpu: &dyn Gpu, tex: TextureId) -> [f32; 2] {
        let (w, h) = gpu.texture_size(tex).unwrap_or((1, 1));
        [0.5 / w.max(1) as f32, 0.5 / h.max(1) as f32]
    }
}

impl EffectModule for BloomEffect {
    fn kind(&self) -> TransformEffectType {
        TransformEffectType::Bloom
    }

    fn program(&self) -> ProgramId {
        self.composite.id()
    }

    fn setup(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, _frame: &EffectFrame) {
        let cfg = &cfg.bloom;
        self.iterations = cfg.iterations.clamp(1, BLOOM_MIP_COUNT as i32) as usize;
        self.prefilter.set_f32(gpu, "threshold", cfg.threshold);
        self.prefilter.set_f32(gpu, "knee", cfg.knee);
        self.composite.set_f32(gpu, "intensity", cfg.intensity);
    }

    fn render(&mut self, gpu: &mut dyn Gpu, input: TextureId, target: TextureId) -> Result<(), GpuError> {
        let n = self.iterations.min(self.mips.len());
        if n == 0 {
            return gpu.draw_fullscreen(self.composite.id(), input, target);
        }
        gpu.draw_fullscreen(self.prefilter.id(), input, self.mips[0])?;
        for i in 1..n {
            let hp = Self::halfpixel(gpu, self.mips[i - 1]);
            self.downsample.set_vec2(gpu, "halfpixel", hp);
            gpu.draw_fullscreen(self.downsample.id(), self.mips[i - 1], self.mips[i])?;
        }
        let mut top = self.mips[n - 1];
        for i in (1..n).rev() {
            let hp = Self::halfpixel(gpu, top);
            self.upsample.set_vec2(gpu, "halfpixel", hp);
            self.upsample.set_texture(gpu, "baseMip", self.mips[i - 1]);
            gpu.draw_fullscreen(self.upsample.id(), top, self.ups[i - 1])?;
            top = self.ups[i - 1];
        }
        self.composite.set_texture(gpu, "bloomTexture", top);
        gpu.draw_fullscreen(self.composite.id(), input, target)
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        free_chain(gpu, &mut self.mips);
        free_chain(gpu, &mut self.ups);
        (self.mips, self.ups) = alloc_chains(gpu, &bloom_mip_sizes(width, height))?;
        Ok(())
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu) {
        let mut this = *self;
        free_chain(gpu, &mut this.mips);
        free_chain(gpu, &mut this.ups);
        this.prefilter.release(gpu);
        this.downsample.release(gpu);
        this.upsample.release(gpu);
        this.composite.release(gpu);
    }
}

/// Horizontal lens flare: bright pixels smeared sideways through a chain
/// that halves width only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnamorphicStreakConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub knee: f32,
    pub intensity: f32,
    /// Upsample weight toward the wider levels.
    pub stretch: f32,
    pub tint_r: f32,
    pub tint_g: f32,
    pub tint_b: f32,
    /// Mip chain depth, 3..=7.
    pub iterations: i32,
}

impl Default for AnamorphicStreakConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.8,
            knee: 0.5,
            intensity: 0.5,
            stretch: 0.8,
            tint_r: 0.55,
            tint_g: 0.65,
            tint_b: 1.0,
            iterations: 5,
        }
    }
}

effect_settings!(AnamorphicStreakConfig {
    threshold: "threshold" => 0.0, 2.0;
    knee: "knee" => 0.0, 1.0;
    intensity: "intensity" => 0.0, 2.0;
    stretch: "stretch" => 0.0, 1.0;
});

pub struct AnamorphicStreakEffect {
    prefilter: ShaderProgram,
    downsample: ShaderProgram,
    upsample: ShaderProgram,
    composite: ShaderProgram,
    mips: Vec<TextureId>,
    ups: Vec<TextureId>,
    iterations: usize,
}

impl AnamorphicStreakEffect {
    pub fn new(gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<Self> {
        let loaded = load_programs(
            gpu,
            &[
                ("shaders/anamorphic_streak_prefilter.fs", &["threshold", "knee"]),
                ("shaders/anamorphic_streak_downsample.fs", &["texelSize"]),
                ("shaders/anamorphic_streak_upsample.fs", &["texelSize", "highResTex", "stretch"]),
                ("shaders/anamorphic_streak_composite.fs", &["intensity", "tint", "streakTexture"]),
            ],
        )?;
        let (mips, ups) = match alloc_chains(gpu, &streak_mip_sizes(width, height)) {
            Ok(c) => c,
            Err(err) => {
                loaded.into_iter().for_each(|p| p.release(gpu));
                return Err(err.into());
            }
        };
        let [prefilter, downsample, upsample, composite]: [ShaderProgram; 4] = loaded
            .try_into()
            .map_err(|_| anyhow::anyhow!("streak programs incomplete"))?;
        Ok(Self {
            prefilter,
            downsample,
            upsample,
            composite,
            mips,
            ups,
            iterations: 5,
        })
    }

    pub fn mips(&self) -> &[TextureId] {
        &self.mips
    }

    fn texel_width(gpu: &dyn Gpu, tex: TextureId) -> f32 {
        let (w, _) = gpu.texture_size(tex).unwrap_or((1, 1));
        1.0 / w.max(1) as f32
    }
}

impl EffectModule for AnamorphicStreakEffect {
    fn kind(&self) -> TransformEffectType {
        TransformEffectType::AnamorphicStreak
    }

    fn program(&self) -> ProgramId {
        self.composite.id()
    }

    fn setup(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, _frame: &EffectFrame) {
        let cfg = &cfg.anamorphic_streak;
        self.iterations = cfg.iterations.clamp(3, STREAK_MIP_COUNT as i32) as usize;
        self.prefilter.set_f32(gpu, "threshold", cfg.threshold);
        self.prefilter.set_f32(gpu, "knee", cfg.knee);
        self.upsample.set_f32(gpu, "stretch", cfg.stretch);
        self.composite.set_f32(gpu, "intensity", cfg.intensity);
        self.composite
            .set_vec3(gpu, "tint", [cfg.tint_r, cfg.tint_g, cfg.tint_b]);
    }

    fn render(&mut self, gpu: &mut dyn Gpu, input: TextureId, target: TextureId) -> Result<(), GpuError> {
        let n = self.iterations.min(self.mips.len());
        if n == 0 {
            return gpu.draw_fullscreen(self.composite.id(), input, target);
        }
        gpu.draw_fullscreen(self.prefilter.id(), input, self.mips[0])?;
        for i in 1..n {
            let texel = Self::texel_width(gpu, self.mips[i - 1]);
            self.downsample.set_f32(gpu, "texelSize", texel);
            gpu.draw_fullscreen(self.downsample.id(), self.mips[i - 1], self.mips[i])?;
        }
        let mut last = self.mips[n - 1];
        for i in (0..n - 1).rev() {
            let texel = Self::texel_width(gpu, last);
            self.upsample.set_f32(gpu, "texelSize", texel);
            self.upsample.set_texture(gpu, "highResTex", self.mips[i]);
            gpu.draw_fullscreen(self.upsample.id(), last, self.ups[i])?;
            last = self.ups[i];
        }
        self.composite.set_texture(gpu, "streakTexture", last);
        gpu.draw_fullscreen(self.composite.id(), input, target)
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        free_chain(gpu, &mut self.mips);
        free_chain(gpu, &mut self.ups);
        (self.mips, self.ups) = alloc_chains(gpu, &streak_mip_sizes(width, height))?;
        Ok(())
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu) {
        let mut this = *self;
        free_chain(gpu, &mut this.mips);
        free_chain(gpu, &mut this.ups);
        this.prefilter.release(gpu);
        this.downsample.release(gpu);
        this.upsample.release(gpu);
        this.composite.release(gpu);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum BokehShape {
    #[default]
    Disc,
    Box,
    Hex,
    Star,
}

impl From<i32> for BokehShape {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Box,
            2 => Self::Hex,
            3 => Self::Star,
            _ => Self::Disc,
        }
    }
}

impl From<BokehShape> for i32 {
    fn from(s: BokehShape) -> i32 {
        s as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BokehConfig {
    pub enabled: bool,
    /// Disc size in UV space.
    pub radius: f32,
    pub iterations: i32,
    /// Higher values pop the highlights.
    pub brightness_power: f32,
    pub shape: BokehShape,
    pub shape_angle: f32,
    pub star_points: i32,
    pub star_inner_radius: f32,
}

impl Default for BokehConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 0.02,
            iterations: 64,
            brightness_power: 4.0,
            shape: BokehShape::Disc,
            shape_angle: 0.0,
            star_points: 5,
            star_inner_radius: 0.4,
        }
    }
}

effect_settings!(BokehConfig {
    radius: "radius" => 0.0, 0.1;
    brightness_power: "brightnessPower" => 1.0, 8.0;
    shape_angle: "shapeAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    star_inner_radius: "starInnerRadius" => 0.1, 0.9;
});

impl TransformEffect for BokehConfig {
    const KIND: TransformEffectType = TransformEffectType::Bokeh;
    const SHADER: &'static str = "shaders/bokeh.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "radius",
        "iterations",
        "brightnessPower",
        "shape",
        "shapeAngle",
        "starPoints",
        "starInnerRadius",
    ];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.bokeh
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("radius", self.radius);
        u.i32("iterations", self.iterations.clamp(16, 150));
        u.f32("brightnessPower", self.brightness_power);
        u.i32("shape", self.shape.into());
        u.f32("shapeAngle", self.shape_angle);
        u.i32("starPoints", self.star_points.clamp(3, 8));
        u.f32("starInnerRadius", self.star_inner_radius);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeightfieldReliefConfig {
    pub enabled: bool,
    pub intensity: f32,
    /// Higher is subtler.
    pub relief_scale: f32,
    pub light_angle: f32,
    pub light_height: f32,
    pub shininess: f32,
}

impl Default for HeightfieldReliefConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.7,
            relief_scale: 0.2,
            light_angle: 0.785,
            light_height: 0.5,
            shininess: 32.0,
        }
    }
}

effect_settings!(HeightfieldReliefConfig {
    light_angle: "lightAngle" => 0.0, 6.28;
    intensity: "intensity" => 0.0, 1.0;
});

impl TransformEffect for HeightfieldReliefConfig {
    const KIND: TransformEffectType = TransformEffectType::HeightfieldRelief;
    const SHADER: &'static str = "shaders/heightfield_relief.fs";
    const UNIFORMS: &'static [&'static str] =
        &["resolution", "intensity", "reliefScale", "lightDir", "shininess"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.heightfield_relief
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        let (sin, cos) = self.light_angle.sin_cos();
        u.vec2("resolution", frame.resolution());
        u.f32("intensity", self.intensity);
        u.f32("reliefScale", self.relief_scale.max(0.02));
        u.vec3("lightDir", [cos, sin, self.light_height]);
        u.f32("shininess", self.shininess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_sizes_halve_and_floor_at_one() {
        let sizes = bloom_mip_sizes(40, 6);
        assert_eq!(sizes, vec![(20, 3), (10, 1), (5, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn streak_mips_halve_width_only() {
        let sizes = streak_mip_sizes(200, 100);
        assert_eq!(sizes.len(), STREAK_MIP_COUNT);
        assert_eq!(sizes[0], (100, 50));
        assert_eq!(sizes[3], (12, 50));
        assert!(sizes.iter().all(|&(_, h)| h == 50));
        assert_eq!(streak_mip_sizes(8, 2).last().copied(), Some((1, 1)));
    }
}
