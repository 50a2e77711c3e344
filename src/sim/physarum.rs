use super::{
    AGENT_WORKGROUP, AgentBuffer, AgentRecord, ConfigChange, SimFrame, Simulation, TrailMap,
    agent_barriers, agent_hues, hue_reinit_needed, impl_simulation_config,
};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, saturation_value};
use crate::effects::param_table;
use crate::gpu::{
    BufferBinding, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    UniformValue, group_count,
};
use crate::lissajous::DualLissajousConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

const PHYSARUM_SHADER: &str = "shaders/physarum_agents.glsl";
const MAX_ATTRACTORS: usize = 8;

/// What an agent does when it steps off the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PhysarumBoundsMode {
    #[default]
    Toroidal,
    Reflect,
    /// Turn towards an attractor (or teleport there with `respawnMode`).
    Redirect,
    Scatter,
    Random,
    Fixed,
}

impl PhysarumBoundsMode {
    pub const ALL: [Self; 6] = [
        Self::Toroidal,
        Self::Reflect,
        Self::Redirect,
        Self::Scatter,
        Self::Random,
        Self::Fixed,
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
}

impl From<i32> for PhysarumBoundsMode {
    fn from(i: i32) -> Self {
        Self::from_index(i)
    }
}

impl From<PhysarumBoundsMode> for i32 {
    fn from(m: PhysarumBoundsMode) -> Self {
        m.index()
    }
}

/// Step-length strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PhysarumWalkMode {
    #[default]
    Normal,
    Levy,
    Adaptive,
    Cauchy,
    Exponential,
    Gaussian,
    Sprint,
    Gradient,
}

impl PhysarumWalkMode {
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::Levy,
        Self::Adaptive,
        Self::Cauchy,
        Self::Exponential,
        Self::Gaussian,
        Self::Sprint,
        Self::Gradient,
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
}

impl From<i32> for PhysarumWalkMode {
    fn from(i: i32) -> Self {
        Self::from_index(i)
    }
}

impl From<PhysarumWalkMode> for i32 {
    fn from(m: PhysarumWalkMode) -> Self {
        m.index()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysarumConfig {
    pub enabled: bool,
    pub bounds_mode: PhysarumBoundsMode,
    pub agent_count: i32,
    pub sensor_distance: f32,
    pub sensor_distance_variance: f32,
    pub sensor_angle: f32,
    pub turning_angle: f32,
    pub step_size: f32,
    pub walk_mode: PhysarumWalkMode,
    pub levy_alpha: f32,
    pub density_response: f32,
    pub cauchy_scale: f32,
    pub exp_scale: f32,
    pub gaussian_variance: f32,
    pub sprint_factor: f32,
    pub gradient_boost: f32,
    pub deposit_amount: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub accum_sense_blend: f32,
    pub repulsion_strength: f32,
    pub sampling_exponent: f32,
    pub vector_steering: bool,
    pub respawn_mode: bool,
    pub gravity_strength: f32,
    pub orbit_offset: f32,
    pub attractor_count: i32,
    pub attractor_base_radius: f32,
    pub attractor_motion: DualLissajousConfig,
    pub debug_overlay: bool,
    pub color: ColorConfig,
}

impl Default for PhysarumConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bounds_mode: PhysarumBoundsMode::Toroidal,
            agent_count: 100_000,
            sensor_distance: 20.0,
            sensor_distance_variance: 0.0,
            sensor_angle: 0.5,
            turning_angle: 0.3,
            step_size: 1.5,
            walk_mode: PhysarumWalkMode::Normal,
            levy_alpha: 1.5,
            density_response: 1.5,
            cauchy_scale: 0.5,
            exp_scale: 1.0,
            gaussian_variance: 0.3,
            sprint_factor: 2.0,
            gradient_boost: 3.0,
            deposit_amount: 0.05,
            decay_half_life: 0.5,
            diffusion_scale: 1,
            boost_intensity: 1.0,
            blend_mode: EffectBlendMode::Screen,
            accum_sense_blend: 0.0,
            repulsion_strength: 0.0,
            sampling_exponent: 0.0,
            vector_steering: false,
            respawn_mode: false,
            gravity_strength: 0.0,
            orbit_offset: 0.0,
            attractor_count: 4,
            attractor_base_radius: 0.3,
            attractor_motion: DualLissajousConfig {
                amplitude: 0.1,
                ..DualLissajousConfig::default()
            },
            debug_overlay: false,
            color: ColorConfig::default(),
        }
    }
}

impl_simulation_config!(PhysarumConfig);

param_table!(PhysarumConfig {
    sensor_distance: "sensorDistance" => 1.0, 100.0;
    sensor_distance_variance: "sensorDistanceVariance" => 0.0, 20.0;
    sensor_angle: "sensorAngle" => 0.0, 6.28;
    turning_angle: "turningAngle" => 0.0, 6.28;
    step_size: "stepSize" => 0.1, 100.0;
    levy_alpha: "levyAlpha" => 0.1, 3.0;
    density_response: "densityResponse" => 0.1, 5.0;
    cauchy_scale: "cauchyScale" => 0.1, 2.0;
    exp_scale: "expScale" => 0.1, 3.0;
    gaussian_variance: "gaussianVariance" => 0.0, 1.0;
    sprint_factor: "sprintFactor" => 0.0, 5.0;
    gradient_boost: "gradientBoost" => 0.0, 10.0;
    deposit_amount: "depositAmount" => 0.01, 5.0;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
    accum_sense_blend: "accumSenseBlend" => 0.0, 1.0;
    repulsion_strength: "repulsionStrength" => 0.0, 1.0;
    sampling_exponent: "samplingExponent" => 0.0, 10.0;
    gravity_strength: "gravityStrength" => 0.0, 1.0;
    orbit_offset: "orbitOffset" => 0.0, 1.0;
    attractor_base_radius: "attractorBaseRadius" => 0.1, 0.5;
});

/// Slime-mould agents steering along their own trail.
pub struct Physarum {
    program: ShaderProgram,
    agents: AgentBuffer,
    trail: TrailMap,
    width: u32,
    height: u32,
    motion: DualLissajousConfig,
    attractors: Vec<(f32, f32)>,
    rng: fastrand::Rng,
    config: PhysarumConfig,
}

impl Physarum {
    fn seed_agents(&mut self) -> Vec<AgentRecord> {
        seed(&mut self.rng, self.width, self.height, &self.config)
    }

    /// Normalised attractor positions from the last update.
    pub fn attractors(&self) -> &[(f32, f32)] {
        &self.attractors
    }

    pub fn agent_buffer(&self) -> crate::gpu::BufferId {
        self.agents.buffer
    }
}

fn seed(rng: &mut fastrand::Rng, width: u32, height: u32, cfg: &PhysarumConfig) -> Vec<AgentRecord> {
    let count = cfg.agent_count.max(1) as usize;
    agent_hues(&cfg.color, count)
        .map(|hue| AgentRecord {
            x: rng.u32(0..width.max(1)) as f32,
            y: rng.u32(0..height.max(1)) as f32,
            vx: rng.f32() * TAU,
            hue,
            ..AgentRecord::default()
        })
        .collect()
}

impl Simulation for Physarum {
    type Config = PhysarumConfig;
    const NAME: &'static str = "physarum";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &PhysarumConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("physarum requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            PHYSARUM_SHADER,
            &[
                "sensorDistance",
                "sensorDistanceVariance",
                "sensorAngle",
                "turningAngle",
                "stepSize",
                "walkMode",
                "depositAmount",
                "boundsMode",
                "attractorCount",
                "attractors",
                "frame",
                "saturationValue",
                "accumTexture",
            ],
        )
        .context("physarum program")?;
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                program.release(gpu);
                return Err(err);
            }
        };
        let mut rng = fastrand::Rng::new();
        let agents = seed(&mut rng, width, height, cfg);
        let agents = match AgentBuffer::new(gpu, &agents) {
            Ok(b) => b,
            Err(err) => {
                trail.release(gpu);
                program.release(gpu);
                return Err(err).context("physarum agent buffer");
            }
        };
        log::info!("physarum initialised with {} agents at {width}x{height}", agents.count);
        Ok(Self {
            program,
            agents,
            trail,
            width,
            height,
            motion: cfg.attractor_motion.clone(),
            attractors: Vec::new(),
            rng,
            config: cfg.clone(),
        })
    }

    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &PhysarumConfig) -> ConfigChange {
        let count = cfg.agent_count.max(1) as usize;
        let realloc = count != self.agents.count;
        let hue_changed = hue_reinit_needed(&self.config.color, &cfg.color);
        self.config = cfg.clone();

        if realloc {
            let agents = self.seed_agents();
            if let Err(err) = self.agents.reallocate(gpu, &agents) {
                log::warn!("physarum: agent reallocation failed: {err}");
                return ConfigChange::default();
            }
            self.trail.clear(gpu);
            log::info!("physarum: reallocated buffer for {count} agents");
            return ConfigChange {
                reallocated: true,
                reseeded: true,
                trails_cleared: true,
            };
        }
        if hue_changed {
            self.reset(gpu);
            return ConfigChange {
                reallocated: false,
                reseeded: true,
                trails_cleared: true,
            };
        }
        ConfigChange::default()
    }

    fn update(&mut self, gpu: &mut dyn Gpu, dt: f32, frame: &SimFrame) -> Result<(), GpuError> {
        let cfg = &self.config;
        let count = (cfg.attractor_count.max(0) as usize).min(MAX_ATTRACTORS);
        let phase = self.motion.phase;
        self.motion = cfg.attractor_motion.clone();
        self.motion.phase = phase;
        self.attractors = self
            .motion
            .update_multi(dt, count, cfg.attractor_base_radius, (0.5, 0.5));
        let packed: Vec<f32> = self.attractors.iter().flat_map(|&(x, y)| [x, y]).collect();
        let (sat, val) = saturation_value(&cfg.color);

        let p = &self.program;
        p.set_f32(gpu, "sensorDistance", cfg.sensor_distance);
        p.set_f32(gpu, "sensorDistanceVariance", cfg.sensor_distance_variance);
        p.set_f32(gpu, "sensorAngle", cfg.sensor_angle);
        p.set_f32(gpu, "turningAngle", cfg.turning_angle);
        p.set_f32(gpu, "stepSize", cfg.step_size);
        p.set_i32(gpu, "walkMode", cfg.walk_mode.index());
        p.set_f32(gpu, "levyAlpha", cfg.levy_alpha);
        p.set_f32(gpu, "densityResponse", cfg.density_response);
        p.set_f32(gpu, "cauchyScale", cfg.cauchy_scale);
        p.set_f32(gpu, "expScale", cfg.exp_scale);
        p.set_f32(gpu, "gaussianVariance", cfg.gaussian_variance);
        p.set_f32(gpu, "sprintFactor", cfg.sprint_factor);
        p.set_f32(gpu, "gradientBoost", cfg.gradient_boost);
        p.set_f32(gpu, "depositAmount", cfg.deposit_amount);
        p.set_f32(gpu, "accumSenseBlend", cfg.accum_sense_blend);
        p.set_f32(gpu, "repulsionStrength", cfg.repulsion_strength);
        p.set_f32(gpu, "samplingExponent", cfg.sampling_exponent);
        p.set_i32(gpu, "vectorSteering", i32::from(cfg.vector_steering));
        p.set_i32(gpu, "boundsMode", cfg.bounds_mode.index());
        p.set_i32(gpu, "respawnMode", i32::from(cfg.respawn_mode));
        p.set_f32(gpu, "gravityStrength", cfg.gravity_strength);
        p.set_f32(gpu, "orbitOffset", cfg.orbit_offset);
        p.set_i32(gpu, "attractorCount", count as i32);
        p.set(gpu, "attractors", UniformValue::FloatArray(packed));
        p.set_i32(gpu, "frame", frame.frame as i32);
        p.set_vec2(gpu, "saturationValue", [sat, val]);
        p.set_texture(gpu, "accumTexture", frame.accum);

        let images = [ImageBinding {
            unit: 0,
            texture: self.trail.texture(),
            access: ImageAccess::ReadWrite,
        }];
        let buffers = [BufferBinding {
            binding: 0,
            buffer: self.agents.buffer,
        }];
        gpu.dispatch_compute(&ComputeDispatch {
            program: self.program.id(),
            groups: [group_count(self.agents.count as u32, AGENT_WORKGROUP), 1, 1],
            images: &images,
            buffers: &buffers,
        })?;
        gpu.memory_barrier(agent_barriers());
        Ok(())
    }

    fn trail_map(&self) -> &TrailMap {
        &self.trail
    }

    fn trail_map_mut(&mut self) -> &mut TrailMap {
        &mut self.trail
    }

    fn config(&self) -> &PhysarumConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        self.agents.count
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        let agents = self.seed_agents();
        if let Err(err) = self.agents.upload(gpu, &agents) {
            log::warn!("physarum: reseed failed: {err}");
        }
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.trail.resize(gpu, width, height)?;
        self.width = width;
        self.height = height;
        self.reset(gpu);
        Ok(())
    }

    fn release(self, gpu: &mut dyn Gpu) {
        self.agents.release(gpu);
        self.trail.release(gpu);
        self.program.release(gpu);
    }
}
