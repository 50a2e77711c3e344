use super::ColorConfig;
use crate::gpu::{Gpu, GpuError, TextureDesc, TextureFormat, TextureId};

pub const COLOR_LUT_SIZE: u32 = 256;

/// 1D gradient texture regenerated only when its source config changes.
#[derive(Debug)]
pub struct ColorLut {
    texture: TextureId,
    cached: ColorConfig,
    regenerations: u32,
}

impl ColorLut {
    pub fn new(gpu: &mut dyn Gpu, cfg: &ColorConfig) -> Result<Self, GpuError> {
        let texture = gpu.create_texture(TextureDesc::with_format(
            COLOR_LUT_SIZE,
            1,
            TextureFormat::Rgba8,
        ))?;
        let mut lut = Self {
            texture,
            cached: cfg.clone(),
            regenerations: 0,
        };
        if let Err(err) = lut.generate(gpu, cfg) {
            gpu.destroy_texture(texture);
            return Err(err);
        }
        Ok(lut)
    }

    /// Returns whether the texture was regenerated.
    pub fn update(&mut self, gpu: &mut dyn Gpu, cfg: &ColorConfig) -> bool {
        if self.cached.same_output(cfg) {
            return false;
        }
        self.cached = cfg.clone();
        match self.generate(gpu, cfg) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("color LUT upload failed: {err}");
                false
            }
        }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn regenerations(&self) -> u32 {
        self.regenerations
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.destroy_texture(self.texture);
    }

    fn generate(&mut self, gpu: &mut dyn Gpu, cfg: &ColorConfig) -> Result<(), GpuError> {
        let texels = sample_lut(cfg);
        gpu.upload_texture(self.texture, &texels)?;
        self.regenerations += 1;
        Ok(())
    }
}

/// Evaluates `cfg` at evenly spaced positions from 0 to 1 inclusive.
pub fn sample_lut(cfg: &ColorConfig) -> Vec<[f32; 4]> {
    (0..COLOR_LUT_SIZE)
        .map(|i| {
            let t = i as f32 / (COLOR_LUT_SIZE - 1) as f32;
            let c = cfg.eval(t);
            [c[0], c[1], c[2], 1.0]
        })
        .collect()
}
