//! Blend compositor: one program, sixteen pixel combiners.

use crate::gpu::{Gpu, GpuError, ProgramId, TextureId, UniformValue, bind_sampler};
use serde::{Deserialize, Serialize};

pub const BLEND_SHADER: &str = "shaders/effect_blend.fs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum EffectBlendMode {
    #[default]
    Boost,
    TintedBoost,
    Screen,
    Mix,
    SoftLight,
    Overlay,
    ColorBurn,
    LinearBurn,
    VividLight,
    LinearLight,
    PinLight,
    Difference,
    Negation,
    Subtract,
    Reflect,
    Phoenix,
}

impl EffectBlendMode {
    pub const ALL: [Self; 16] = [
        Self::Boost,
        Self::TintedBoost,
        Self::Screen,
        Self::Mix,
        Self::SoftLight,
        Self::Overlay,
        Self::ColorBurn,
        Self::LinearBurn,
        Self::VividLight,
        Self::LinearLight,
        Self::PinLight,
        Self::Difference,
        Self::Negation,
        Self::Subtract,
        Self::Reflect,
        Self::Phoenix,
    ];

    pub fn from_index(i: i32) -> Self {
        usize::try_from(i)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0) as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boost => "Boost",
            Self::TintedBoost => "Tinted Boost",
            Self::Screen => "Screen",
            Self::Mix => "Mix",
            Self::SoftLight => "Soft Light",
            Self::Overlay => "Overlay",
            Self::ColorBurn => "Color Burn",
            Self::LinearBurn => "Linear Burn",
            Self::VividLight => "Vivid Light",
            Self::LinearLight => "Linear Light",
            Self::PinLight => "Pin Light",
            Self::Difference => "Difference",
            Self::Negation => "Negation",
            Self::Subtract => "Subtract",
            Self::Reflect => "Reflect",
            Self::Phoenix => "Phoenix",
        }
    }

    fn channel(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Boost | Self::TintedBoost | Self::Mix => b,
            Self::Screen => 1.0 - (1.0 - a) * (1.0 - b),
            Self::SoftLight => {
                if b < 0.5 {
                    a - (1.0 - 2.0 * b) * a * (1.0 - a)
                } else {
                    let d = if a <= 0.25 {
                        ((16.0 * a - 12.0) * a + 4.0) * a
                    } else {
                        a.max(0.0).sqrt()
                    };
                    a + (2.0 * b - 1.0) * (d - a)
                }
            }
            Self::Overlay => {
                if a < 0.5 {
                    2.0 * a * b
                } else {
                    1.0 - 2.0 * (1.0 - a) * (1.0 - b)
                }
            }
            Self::ColorBurn => {
                if b <= 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - a) / b).max(0.0)
                }
            }
            Self::LinearBurn => (a + b - 1.0).max(0.0),
            Self::VividLight => {
                if b < 0.5 {
                    Self::ColorBurn.channel(a, 2.0 * b)
                } else {
                    let d = 2.0 * (b - 0.5);
                    if d >= 1.0 { 1.0 } else { (a / (1.0 - d)).min(1.0) }
                }
            }
            Self::LinearLight => (a + 2.0 * b - 1.0).clamp(0.0, 1.0),
            Self::PinLight => {
                if b < 0.5 {
                    a.min(2.0 * b)
                } else {
                    a.max(2.0 * (b - 0.5))
                }
            }
            Self::Difference => (a - b).abs(),
            Self::Negation => 1.0 - (1.0 - a - b).abs(),
            Self::Subtract => (a - b).max(0.0),
            Self::Reflect => {
                if b >= 1.0 { 1.0 } else { (a * a / (1.0 - b)).min(1.0) }
            }
            Self::Phoenix => a.min(b) - a.max(b) + 1.0,
        }
    }

    /// Blends `top` over `base`. Boost modes add; the rest mix towards the
    /// combined value by `intensity`.
    pub fn composite(self, base: [f32; 3], top: [f32; 3], intensity: f32) -> [f32; 3] {
        match self {
            Self::Boost => std::array::from_fn(|i| base[i] + top[i] * intensity),
            Self::TintedBoost => {
                let luma = 0.299 * base[0] + 0.587 * base[1] + 0.114 * base[2];
                std::array::from_fn(|i| base[i] + top[i] * intensity * (0.5 + luma))
            }
            _ => std::array::from_fn(|i| {
                let blended = self.channel(base[i], top[i]);
                base[i] + (blended - base[i]) * intensity.clamp(0.0, 1.0)
            }),
        }
    }
}

impl From<i32> for EffectBlendMode {
    fn from(i: i32) -> Self {
        Self::from_index(i)
    }
}

impl From<EffectBlendMode> for i32 {
    fn from(m: EffectBlendMode) -> Self {
        m.index()
    }
}

/// Composites auxiliary textures over the accumulator.
#[derive(Debug)]
pub struct BlendCompositor {
    program: ProgramId,
    intensity_loc: i32,
    mode_loc: i32,
}

impl BlendCompositor {
    pub fn new(gpu: &mut dyn Gpu) -> Result<Self, GpuError> {
        let program = gpu.load_shader(BLEND_SHADER)?;
        Ok(Self {
            program,
            intensity_loc: gpu.uniform_location(program, "intensity"),
            mode_loc: gpu.uniform_location(program, "blendMode"),
        })
    }

    /// One full-screen pass: `input` with `aux` blended on top, into `target`.
    pub fn apply(
        &self,
        gpu: &mut dyn Gpu,
        input: TextureId,
        aux: TextureId,
        target: TextureId,
        intensity: f32,
        mode: EffectBlendMode,
    ) -> Result<(), GpuError> {
        bind_sampler(gpu, self.program, "blendTexture", aux);
        gpu.set_uniform(self.program, self.intensity_loc, UniformValue::Float(intensity));
        gpu.set_uniform(self.program, self.mode_loc, UniformValue::Int(mode.index()));
        gpu.draw_fullscreen(self.program, input, target)
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.unload_program(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_every_mode() {
        for mode in EffectBlendMode::ALL {
            assert_eq!(EffectBlendMode::from_index(mode.index()), mode);
        }
        assert_eq!(EffectBlendMode::from_index(99), EffectBlendMode::Boost);
    }

    #[test]
    fn zero_intensity_keeps_base() {
        let base = [0.2, 0.4, 0.6];
        for mode in EffectBlendMode::ALL {
            let out = mode.composite(base, [0.9, 0.1, 0.5], 0.0);
            for c in 0..3 {
                assert!((out[c] - base[c]).abs() < 1e-6, "{} changed base", mode.name());
            }
        }
    }
}
