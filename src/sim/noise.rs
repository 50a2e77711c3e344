use crate::gpu::{Gpu, GpuError, TextureDesc, TextureFormat, TextureId};

pub const NOISE_TEXTURE_SIZE: u32 = 32;
const LATTICE: usize = 8;
const NOISE_SEED: u64 = 0x5eed_c0de;

/// Tileable 3D noise volume sampled by the curl-flow kernel.
///
/// Channel 0 holds the scalar potential in [-1, 1]; channels 1 and 2 hold
/// its 2D curl `(dP/dy, -dP/dx)` in texel units.
#[derive(Debug)]
pub struct NoiseTexture3d {
    texture: TextureId,
    size: u32,
}

impl NoiseTexture3d {
    pub fn new(gpu: &mut dyn Gpu, size: u32) -> Result<Self, GpuError> {
        let texture = gpu.create_texture(TextureDesc::volume(size, TextureFormat::Rgba16F))?;
        let data = generate(size as usize, NOISE_SEED);
        if let Err(err) = gpu.upload_texture(texture, &data) {
            gpu.destroy_texture(texture);
            return Err(err);
        }
        log::debug!("noise volume {size}^3 generated");
        Ok(Self { texture, size })
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.destroy_texture(self.texture);
    }
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Value noise on a wrapped lattice, two octaves.
pub(crate) fn generate(size: usize, seed: u64) -> Vec<[f32; 4]> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let lattice: Vec<f32> = (0..LATTICE * LATTICE * LATTICE)
        .map(|_| rng.f32() * 2.0 - 1.0)
        .collect();
    let at = |x: usize, y: usize, z: usize, period: usize| {
        lattice[((z % period) * LATTICE + (y % period)) * LATTICE + (x % period)]
    };
    let octave = |fx: f32, fy: f32, fz: f32, freq: usize| {
        let (px, py, pz) = (fx * freq as f32, fy * freq as f32, fz * freq as f32);
        let (x0, y0, z0) = (px.floor(), py.floor(), pz.floor());
        let (tx, ty, tz) = (smooth(px - x0), smooth(py - y0), smooth(pz - z0));
        let (x0, y0, z0) = (x0 as usize, y0 as usize, z0 as usize);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let plane = |z: usize| {
            let a = lerp(at(x0, y0, z, freq), at(x0 + 1, y0, z, freq), tx);
            let b = lerp(at(x0, y0 + 1, z, freq), at(x0 + 1, y0 + 1, z, freq), tx);
            lerp(a, b, ty)
        };
        lerp(plane(z0), plane(z0 + 1), tz)
    };

    let mut potential = vec![0.0f32; size * size * size];
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let f = |v: usize| v as f32 / size as f32;
                // Each octave wraps at its own frequency so the volume tiles.
                let p = octave(f(x), f(y), f(z), LATTICE / 2) * 0.67
                    + octave(f(x), f(y), f(z), LATTICE) * 0.33;
                potential[(z * size + y) * size + x] = p;
            }
        }
    }

    let idx = |x: usize, y: usize, z: usize| ((z % size) * size + (y % size)) * size + (x % size);
    let mut out = Vec::with_capacity(potential.len());
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let dx = (potential[idx(x + 1, y, z)] - potential[idx(x + size - 1, y, z)]) * 0.5;
                let dy = (potential[idx(x, y + 1, z)] - potential[idx(x, y + size - 1, z)]) * 0.5;
                out.push([potential[idx(x, y, z)], dy, -dx, 1.0]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_deterministic_and_bounded() {
        let a = generate(8, 7);
        let b = generate(8, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|t| t[0].abs() <= 1.0));
    }
}
