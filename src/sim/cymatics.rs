use super::{ConfigChange, SimFrame, Simulation, TrailMap, impl_simulation_config};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, ColorLut};
use crate::effects::{ROTATION_OFFSET_MAX, param_table};
use crate::gpu::{
    Barriers, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    UniformValue, group_count,
};
use crate::lissajous::DualLissajousConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};

const CYMATICS_SHADER: &str = "shaders/cymatics.glsl";
const TILE: u32 = 16;
pub const MAX_CYMATICS_SOURCES: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CymaticsConfig {
    pub enabled: bool,
    pub wave_scale: f32,
    pub falloff: f32,
    pub visual_gain: f32,
    /// 0 renders a smooth field; otherwise the number of bands.
    pub contour_count: i32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub source_count: i32,
    pub base_radius: f32,
    pub lissajous: DualLissajousConfig,
    pub pattern_angle: f32,
    pub boundaries: bool,
    pub reflection_gain: f32,
    pub blend_mode: EffectBlendMode,
    pub debug_overlay: bool,
    pub color: ColorConfig,
}

impl Default for CymaticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wave_scale: 10.0,
            falloff: 1.0,
            visual_gain: 2.0,
            contour_count: 0,
            decay_half_life: 0.5,
            diffusion_scale: 1,
            boost_intensity: 1.0,
            source_count: 5,
            base_radius: 0.4,
            lissajous: DualLissajousConfig {
                amplitude: 0.1,
                ..DualLissajousConfig::default()
            },
            pattern_angle: 0.0,
            boundaries: false,
            reflection_gain: 1.0,
            blend_mode: EffectBlendMode::Screen,
            debug_overlay: false,
            color: ColorConfig::default(),
        }
    }
}

impl CymaticsConfig {
    fn sources(&self) -> usize {
        self.source_count.clamp(1, MAX_CYMATICS_SOURCES as i32) as usize
    }
}

impl_simulation_config!(CymaticsConfig);

param_table!(CymaticsConfig {
    wave_scale: "waveScale" => 1.0, 50.0;
    falloff: "falloff" => 0.0, 5.0;
    visual_gain: "visualGain" => 0.5, 5.0;
    base_radius: "baseRadius" => 0.0, 0.5;
    lissajous.amplitude: "lissajous.amplitude" => 0.0, 0.5;
    lissajous.motion_speed: "lissajous.motionSpeed" => 0.0, 5.0;
    pattern_angle: "patternAngle" => -ROTATION_OFFSET_MAX, ROTATION_OFFSET_MAX;
    reflection_gain: "reflectionGain" => 0.0, 1.0;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// Interference of delayed waveform samples radiating from moving sources.
pub struct Cymatics {
    program: ShaderProgram,
    lut: ColorLut,
    trail: TrailMap,
    width: u32,
    height: u32,
    motion: DualLissajousConfig,
    sources: Vec<(f32, f32)>,
    config: CymaticsConfig,
}

/// Rotates `p` about the screen centre.
fn rotate_about_center(p: (f32, f32), angle: f32) -> (f32, f32) {
    let (s, c) = angle.sin_cos();
    let (dx, dy) = (p.0 - 0.5, p.1 - 0.5);
    (0.5 + dx * c - dy * s, 0.5 + dx * s + dy * c)
}

impl Cymatics {
    /// Source positions in UV space from the last update.
    pub fn sources(&self) -> &[(f32, f32)] {
        &self.sources
    }

    pub fn color_lut(&self) -> &ColorLut {
        &self.lut
    }
}

impl Simulation for Cymatics {
    type Config = CymaticsConfig;
    const NAME: &'static str = "cymatics";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &CymaticsConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("cymatics requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            CYMATICS_SHADER,
            &[
                "waveScale",
                "falloff",
                "visualGain",
                "contourCount",
                "sources",
                "writeIndex",
                "boundaries",
                "reflectionGain",
                "waveformTexture",
                "colorLUT",
            ],
        )
        .context("cymatics program")?;
        let lut = match ColorLut::new(gpu, &cfg.color) {
            Ok(l) => l,
            Err(err) => {
                program.release(gpu);
                return Err(err).context("cymatics color LUT");
            }
        };
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                lut.release(gpu);
                program.release(gpu);
                return Err(err);
            }
        };
        log::info!("cymatics initialised at {width}x{height}");
        Ok(Self {
            program,
            lut,
            trail,
            width,
            height,
            motion: cfg.lissajous.clone(),
            sources: Vec::new(),
            config: cfg.clone(),
        })
    }

    /// Colour edits only regenerate the LUT; nothing is reseeded.
    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &CymaticsConfig) -> ConfigChange {
        self.lut.update(gpu, &cfg.color);
        self.config = cfg.clone();
        ConfigChange::default()
    }

    fn update(&mut self, gpu: &mut dyn Gpu, dt: f32, frame: &SimFrame) -> Result<(), GpuError> {
        let cfg = &self.config;
        let phase = self.motion.phase;
        self.motion = cfg.lissajous.clone();
        self.motion.phase = phase;
        let angle = cfg.pattern_angle;
        self.sources = self
            .motion
            .update_multi(dt, cfg.sources(), cfg.base_radius, (0.5, 0.5))
            .into_iter()
            .map(|p| rotate_about_center(p, angle))
            .collect();
        let flat: Vec<f32> = self.sources.iter().flat_map(|&(x, y)| [x, y]).collect();

        let p = &self.program;
        p.set_f32(gpu, "waveScale", cfg.wave_scale);
        p.set_f32(gpu, "falloff", cfg.falloff);
        p.set_f32(gpu, "visualGain", cfg.visual_gain);
        p.set_i32(gpu, "contourCount", cfg.contour_count);
        p.set(gpu, "sources", UniformValue::FloatArray(flat));
        p.set_i32(gpu, "writeIndex", frame.waveform_write_index as i32);
        p.set_i32(gpu, "boundaries", i32::from(cfg.boundaries));
        p.set_f32(gpu, "reflectionGain", cfg.reflection_gain);
        p.set_texture(gpu, "waveformTexture", frame.waveform);
        p.set_texture(gpu, "colorLUT", self.lut.texture());

        let images = [ImageBinding {
            unit: 0,
            texture: self.trail.texture(),
            access: ImageAccess::ReadWrite,
        }];
        gpu.dispatch_compute(&ComputeDispatch {
            program: self.program.id(),
            groups: [group_count(self.width, TILE), group_count(self.height, TILE), 1],
            images: &images,
            buffers: &[],
        })?;
        gpu.memory_barrier(Barriers::IMAGE_ACCESS | Barriers::TEXTURE_FETCH);
        Ok(())
    }

    fn trail_map(&self) -> &TrailMap {
        &self.trail
    }

    fn trail_map_mut(&mut self) -> &mut TrailMap {
        &mut self.trail
    }

    fn config(&self) -> &CymaticsConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        0
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        self.motion.phase = 0.0;
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.trail.resize(gpu, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn release(self, gpu: &mut dyn Gpu) {
        self.trail.release(gpu);
        self.lut.release(gpu);
        self.program.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_about_center() {
        let (x, y) = rotate_about_center((0.9, 0.5), std::f32::consts::FRAC_PI_2);
        assert!((x - 0.5).abs() < 1e-5 && (y - 0.9).abs() < 1e-5);
    }

    #[test]
    fn source_count_is_clamped() {
        let cfg = CymaticsConfig {
            source_count: 20,
            ..CymaticsConfig::default()
        };
        assert_eq!(cfg.sources(), MAX_CYMATICS_SOURCES);
    }
}
