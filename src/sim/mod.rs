//! Compute-driven agent simulations and the GPU primitives they share.
//!
//! Every simulation owns an agent storage buffer (except cymatics) and a
//! [`TrailMap`]. Agents are 32-byte records; see [`AgentRecord`].

mod attractor_flow;
mod boids;
mod curl_advection;
mod curl_flow;
mod cymatics;
mod noise;
mod particle_life;
mod physarum;
mod spatial_hash;
mod trail_map;

pub use attractor_flow::{AttractorFlow, AttractorFlowConfig, AttractorType};
pub use boids::{Boids, BoidsConfig};
pub use curl_advection::{CurlAdvection, CurlAdvectionConfig};
pub use curl_flow::{CurlFlow, CurlFlowConfig};
pub use cymatics::{Cymatics, CymaticsConfig, MAX_CYMATICS_SOURCES};
pub use noise::{NOISE_TEXTURE_SIZE, NoiseTexture3d};
pub use particle_life::{MAX_SPECIES, ParticleLife, ParticleLifeConfig, attraction_matrix};
pub use physarum::{Physarum, PhysarumBoundsMode, PhysarumConfig, PhysarumWalkMode};
pub use spatial_hash::{SpatialHash, cell_size_for};
pub use trail_map::{TrailMap, decay_factor};

use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, agent_hue};
use crate::gpu::{Barriers, BufferId, Gpu, GpuError, TextureId};

pub const AGENT_WORDS: usize = 8;
pub const AGENT_WORKGROUP: u32 = 1024;

/// GPU-side agent layout, eight 32-bit words.
///
/// Simulations reuse the slots: physarum keeps its heading in `vx`,
/// particle life keeps its species index in `aux`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub hue: f32,
    pub aux: f32,
}

impl AgentRecord {
    pub fn from_words(w: &[u32]) -> Self {
        let f = |i: usize| w.get(i).copied().map(f32::from_bits).unwrap_or(0.0);
        Self {
            x: f(0),
            y: f(1),
            z: f(2),
            vx: f(3),
            vy: f(4),
            vz: f(5),
            hue: f(6),
            aux: f(7),
        }
    }

    pub fn write_words(&self, out: &mut [u32]) {
        let vals = [
            self.x, self.y, self.z, self.vx, self.vy, self.vz, self.hue, self.aux,
        ];
        for (dst, v) in out.iter_mut().zip(vals) {
            *dst = v.to_bits();
        }
    }
}

pub fn encode_agents(agents: &[AgentRecord]) -> Vec<u32> {
    let mut words = vec![0u32; agents.len() * AGENT_WORDS];
    for (a, chunk) in agents.iter().zip(words.chunks_exact_mut(AGENT_WORDS)) {
        a.write_words(chunk);
    }
    words
}

pub fn decode_agents(words: &[u32]) -> Vec<AgentRecord> {
    words
        .chunks_exact(AGENT_WORDS)
        .map(AgentRecord::from_words)
        .collect()
}

/// Integer avalanche hash (lowbias32).
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Uniform float in [0, 1) from a seed.
pub fn hash_float(x: u32) -> f32 {
    (hash_u32(x) >> 8) as f32 / 16_777_216.0
}

/// What an `apply_config` call had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigChange {
    pub reallocated: bool,
    pub reseeded: bool,
    pub trails_cleared: bool,
}

impl ConfigChange {
    pub fn any(&self) -> bool {
        self.reallocated || self.reseeded || self.trails_cleared
    }
}

/// Per-frame inputs shared by all simulations.
#[derive(Debug, Clone, Copy)]
pub struct SimFrame {
    pub accum: TextureId,
    pub fft: TextureId,
    pub waveform: TextureId,
    pub waveform_write_index: usize,
    pub frame: u32,
}

/// Fields every simulation config carries.
pub trait SimulationConfig {
    fn enabled(&self) -> bool;
    fn debug_overlay(&self) -> bool;
    fn boost_intensity(&self) -> f32;
    fn blend_mode(&self) -> EffectBlendMode;
    fn decay_half_life(&self) -> f32;
    fn diffusion_scale(&self) -> i32;
    fn color(&self) -> &ColorConfig;
}

macro_rules! impl_simulation_config {
    ($ty:ty) => {
        impl $crate::sim::SimulationConfig for $ty {
            fn enabled(&self) -> bool {
                self.enabled
            }
            fn debug_overlay(&self) -> bool {
                self.debug_overlay
            }
            fn boost_intensity(&self) -> f32 {
                self.boost_intensity
            }
            fn blend_mode(&self) -> $crate::blend::EffectBlendMode {
                self.blend_mode
            }
            fn decay_half_life(&self) -> f32 {
                self.decay_half_life
            }
            fn diffusion_scale(&self) -> i32 {
                self.diffusion_scale
            }
            fn color(&self) -> &$crate::color::ColorConfig {
                &self.color
            }
        }
    };
}
pub(crate) use impl_simulation_config;

/// Shared lifecycle of the compute simulations.
pub trait Simulation: Sized {
    type Config: SimulationConfig + Clone;
    const NAME: &'static str;

    fn supported(gpu: &dyn Gpu) -> bool {
        gpu.supports_compute()
    }

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &Self::Config) -> anyhow::Result<Self>;
    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &Self::Config) -> ConfigChange;
    fn update(&mut self, gpu: &mut dyn Gpu, dt: f32, frame: &SimFrame) -> Result<(), GpuError>;
    fn trail_map(&self) -> &TrailMap;
    fn trail_map_mut(&mut self) -> &mut TrailMap;
    fn config(&self) -> &Self::Config;
    fn agent_count(&self) -> usize;
    fn reset(&mut self, gpu: &mut dyn Gpu);
    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()>;
    fn release(self, gpu: &mut dyn Gpu);

    fn process_trails(&mut self, gpu: &mut dyn Gpu, dt: f32) -> Result<(), GpuError> {
        let half_life = self.config().decay_half_life();
        let diffusion = self.config().diffusion_scale();
        self.trail_map_mut().process(gpu, dt, half_life, diffusion)
    }
}

/// Agent storage buffer with its tracked count.
#[derive(Debug)]
pub(crate) struct AgentBuffer {
    pub buffer: BufferId,
    pub count: usize,
}

impl AgentBuffer {
    pub fn new(gpu: &mut dyn Gpu, agents: &[AgentRecord]) -> Result<Self, GpuError> {
        let buffer = gpu.create_buffer(&encode_agents(agents))?;
        Ok(Self {
            buffer,
            count: agents.len(),
        })
    }

    pub fn upload(&mut self, gpu: &mut dyn Gpu, agents: &[AgentRecord]) -> Result<(), GpuError> {
        gpu.update_buffer(self.buffer, &encode_agents(agents))?;
        self.count = agents.len();
        Ok(())
    }

    /// Replaces the buffer with a freshly sized one.
    pub fn reallocate(&mut self, gpu: &mut dyn Gpu, agents: &[AgentRecord]) -> Result<(), GpuError> {
        let fresh = gpu.create_buffer(&encode_agents(agents))?;
        gpu.destroy_buffer(self.buffer);
        self.buffer = fresh;
        self.count = agents.len();
        Ok(())
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.destroy_buffer(self.buffer);
    }
}

/// Hues for `count` agents from the colour config.
pub fn agent_hues(color: &ColorConfig, count: usize) -> impl Iterator<Item = f32> + '_ {
    (0..count).map(move |i| agent_hue(color, i, count))
}

/// Whether switching colour config requires re-sampling agent hues.
pub(crate) fn hue_reinit_needed(old: &ColorConfig, new: &ColorConfig) -> bool {
    !old.same_output(new)
}

pub(crate) fn agent_barriers() -> Barriers {
    Barriers::IMAGE_ACCESS | Barriers::TEXTURE_FETCH | Barriers::SHADER_STORAGE
}

/// Column-major rotation from XYZ Euler angles.
pub fn rotation_matrix(ax: f32, ay: f32, az: f32) -> [f32; 9] {
    let (sx, cx) = ax.sin_cos();
    let (sy, cy) = ay.sin_cos();
    let (sz, cz) = az.sin_cos();
    // R = Rz * Ry * Rx
    [
        cy * cz,
        cy * sz,
        -sy,
        sx * sy * cz - cx * sz,
        sx * sy * sz + cx * cz,
        sx * cy,
        cx * sy * cz + sx * sz,
        cx * sy * sz - sx * cz,
        cx * cy,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_record_survives_word_encoding() {
        let a = AgentRecord {
            x: 1.5,
            y: -2.0,
            z: 0.25,
            vx: 3.0,
            vy: 0.0,
            vz: -1.0,
            hue: 0.75,
            aux: 2.0,
        };
        let words = encode_agents(&[a]);
        assert_eq!(words.len(), AGENT_WORDS);
        assert_eq!(decode_agents(&words), vec![a]);
    }

    #[test]
    fn hash_float_stays_in_unit_interval() {
        for i in 0..10_000u32 {
            let v = hash_float(i);
            assert!((0.0..1.0).contains(&v));
        }
    }
}
