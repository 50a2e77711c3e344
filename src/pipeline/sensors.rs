use crate::audio::{FFT_BIN_COUNT, WAVEFORM_SIZE};
use crate::gpu::{Gpu, GpuError, TextureDesc, TextureId};

/// Running-max scaler for FFT magnitudes.
///
/// The peak decays by 1% per frame and jumps to any larger current max, so
/// quiet passages slowly gain back to full scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FftNormalizer {
    max: f32,
}

impl FftNormalizer {
    pub const DECAY: f32 = 0.99;
    const FLOOR: f32 = 1e-6;

    /// Writes `fft / running_max` into `out`.
    pub fn normalize(&mut self, fft: &[f32], out: &mut Vec<f32>) {
        let current = fft.iter().copied().fold(0.0f32, f32::max);
        self.max = (self.max * Self::DECAY).max(current);
        let scale = self.scale();
        out.clear();
        out.extend(fft.iter().map(|m| (m * scale).max(0.0)));
    }

    pub fn running_max(&self) -> f32 {
        self.max
    }

    /// Multiplier applied this frame; 0 while nothing has been heard.
    pub fn scale(&self) -> f32 {
        if self.max > Self::FLOOR {
            1.0 / self.max
        } else {
            0.0
        }
    }
}

/// FFT and waveform samplers, written once per frame.
#[derive(Debug)]
pub(crate) struct SensorTextures {
    pub fft: TextureId,
    pub waveform: TextureId,
    pub normalizer: FftNormalizer,
    pub normalized: Vec<f32>,
    texels: Vec<[f32; 4]>,
}

impl SensorTextures {
    pub fn new(gpu: &mut dyn Gpu) -> Result<Self, GpuError> {
        let fft = gpu.create_texture(TextureDesc::screen(FFT_BIN_COUNT as u32, 1))?;
        let waveform = match gpu.create_texture(TextureDesc::screen(WAVEFORM_SIZE as u32, 1)) {
            Ok(t) => t,
            Err(err) => {
                gpu.destroy_texture(fft);
                return Err(err);
            }
        };
        gpu.clear_texture(fft, [0.0; 4]);
        gpu.clear_texture(waveform, [0.0; 4]);
        Ok(Self {
            fft,
            waveform,
            normalizer: FftNormalizer::default(),
            normalized: Vec::with_capacity(FFT_BIN_COUNT),
            texels: Vec::with_capacity(WAVEFORM_SIZE),
        })
    }

    pub fn normalize_fft(&mut self, fft: &[f32]) {
        self.normalizer.normalize(fft, &mut self.normalized);
    }

    /// Uploads the normalised FFT and the raw waveform ring.
    pub fn upload(&mut self, gpu: &mut dyn Gpu, waveform: &[f32]) -> Result<(), GpuError> {
        fill_row(&mut self.texels, &self.normalized, FFT_BIN_COUNT);
        gpu.upload_texture(self.fft, &self.texels)?;
        fill_row(&mut self.texels, waveform, WAVEFORM_SIZE);
        gpu.upload_texture(self.waveform, &self.texels)
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.destroy_texture(self.fft);
        gpu.destroy_texture(self.waveform);
    }
}

/// Values in the red channel, zero padded or truncated to `width`.
fn fill_row(texels: &mut Vec<[f32; 4]>, values: &[f32], width: usize) {
    texels.clear();
    texels.extend(
        (0..width).map(|i| [values.get(i).copied().unwrap_or(0.0), 0.0, 0.0, 1.0]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_max_decays_then_follows_peaks() {
        let mut n = FftNormalizer::default();
        let mut out = Vec::new();
        n.normalize(&[0.0, 2.0, 1.0], &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.5]);
        n.normalize(&[0.0, 0.5, 0.0], &mut out);
        assert!((n.running_max() - 1.98).abs() < 1e-5);
        n.normalize(&[4.0], &mut out);
        assert_eq!(n.running_max(), 4.0);
    }

    #[test]
    fn silence_normalises_to_zero() {
        let mut n = FftNormalizer::default();
        let mut out = Vec::new();
        n.normalize(&[0.0; 8], &mut out);
        assert!(out.iter().all(|&v| v == 0.0));
        assert_eq!(n.scale(), 0.0);
    }
}
