use crate::gpu::{
    Barriers, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram, TextureDesc,
    TextureId, group_count,
};
use anyhow::Context;
use std::f32::consts::LN_2;

const TRAIL_SHADER: &str = "shaders/trail_diffusion.glsl";
const TILE: u32 = 16;

/// Framerate-independent per-step decay for a half-life in seconds.
pub fn decay_factor(dt: f32, half_life: f32) -> f32 {
    (-LN_2 * dt / half_life.max(0.001)).exp()
}

/// Screen-sized deposit surface with separable diffusion and decay.
///
/// `primary` holds the readable trail after every [`TrailMap::process`];
/// `temp` is scratch for the horizontal pass.
#[derive(Debug)]
pub struct TrailMap {
    primary: TextureId,
    temp: TextureId,
    program: ShaderProgram,
    width: u32,
    height: u32,
}

impl TrailMap {
    pub fn new(gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<Self> {
        let (primary, temp) = alloc_pair(gpu, width, height)
            .with_context(|| format!("trail map surfaces {width}x{height}"))?;
        let program = match ShaderProgram::compute(
            gpu,
            TRAIL_SHADER,
            &["direction", "diffusionScale", "decayFactor", "resolution", "inputMap"],
        ) {
            Ok(p) => p,
            Err(err) => {
                gpu.destroy_texture(primary);
                gpu.destroy_texture(temp);
                return Err(err).context("trail diffusion program");
            }
        };
        log::debug!("trail map initialised at {width}x{height}");
        Ok(Self {
            primary,
            temp,
            program,
            width,
            height,
        })
    }

    pub fn texture(&self) -> TextureId {
        self.primary
    }

    /// Render target for external additive drawing.
    pub fn draw_target(&self) -> TextureId {
        self.primary
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Horizontal pass into `temp` without decay, then vertical pass back
    /// into `primary` with decay applied. `diffusion == 0` only decays.
    pub fn process(
        &mut self,
        gpu: &mut dyn Gpu,
        dt: f32,
        half_life: f32,
        diffusion: i32,
    ) -> Result<(), GpuError> {
        let decay = decay_factor(dt, half_life);
        let groups = [
            group_count(self.width, TILE),
            group_count(self.height, TILE),
            1,
        ];
        self.program.set_vec2(gpu, "resolution", [self.width as f32, self.height as f32]);
        self.program.set_i32(gpu, "diffusionScale", diffusion.max(0));

        let passes = [(self.primary, self.temp, 1.0), (self.temp, self.primary, decay)];
        for (direction, (src, dst, factor)) in passes.into_iter().enumerate() {
            self.program.set_i32(gpu, "direction", direction as i32);
            self.program.set_f32(gpu, "decayFactor", factor);
            self.program.set_texture(gpu, "inputMap", src);
            let images = [ImageBinding {
                unit: 0,
                texture: dst,
                access: ImageAccess::Write,
            }];
            gpu.dispatch_compute(&ComputeDispatch {
                program: self.program.id(),
                groups,
                images: &images,
                buffers: &[],
            })?;
            gpu.memory_barrier(Barriers::IMAGE_ACCESS | Barriers::TEXTURE_FETCH);
        }
        Ok(())
    }

    pub fn clear(&mut self, gpu: &mut dyn Gpu) {
        gpu.clear_texture(self.primary, [0.0; 4]);
        gpu.clear_texture(self.temp, [0.0; 4]);
    }

    /// Reallocates both surfaces when the size changes. On failure the old
    /// surfaces and dimensions are kept.
    pub fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let (primary, temp) = alloc_pair(gpu, width, height)
            .with_context(|| format!("resizing trail map to {width}x{height}"))?;
        gpu.destroy_texture(self.primary);
        gpu.destroy_texture(self.temp);
        self.primary = primary;
        self.temp = temp;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.destroy_texture(self.primary);
        gpu.destroy_texture(self.temp);
        self.program.release(gpu);
    }
}

fn alloc_pair(gpu: &mut dyn Gpu, width: u32, height: u32) -> Result<(TextureId, TextureId), GpuError> {
    let primary = gpu.create_texture(TextureDesc::screen(width, height))?;
    let temp = match gpu.create_texture(TextureDesc::screen(width, height)) {
        Ok(t) => t,
        Err(err) => {
            gpu.destroy_texture(primary);
            return Err(err);
        }
    };
    gpu.clear_texture(primary, [0.0; 4]);
    gpu.clear_texture(temp, [0.0; 4]);
    Ok((primary, temp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_life_halves_in_one_half_life() {
        assert!((decay_factor(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert!((decay_factor(0.0, 0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_half_life_is_clamped() {
        let d = decay_factor(1.0 / 60.0, 0.0);
        assert!(d.is_finite() && d >= 0.0 && d < 1e-3);
    }
}
