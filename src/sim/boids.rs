use super::{
    AGENT_WORKGROUP, AgentBuffer, AgentRecord, ConfigChange, SimFrame, Simulation, SpatialHash,
    TrailMap, agent_barriers, agent_hues, hue_reinit_needed, impl_simulation_config,
};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, saturation_value};
use crate::effects::param_table;
use crate::gpu::{
    BufferBinding, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    UniformValue, group_count,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

const BOIDS_SHADER: &str = "shaders/boids_agents.glsl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoidsConfig {
    pub enabled: bool,
    pub agent_count: i32,
    pub perception_radius: f32,
    pub separation_radius: f32,
    pub cohesion_weight: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    /// 0 flocks regardless of colour.
    pub hue_affinity: f32,
    pub max_speed: f32,
    pub min_speed: f32,
    pub deposit_amount: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub debug_overlay: bool,
    pub color: ColorConfig,
}

impl Default for BoidsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_count: 10_000,
            perception_radius: 50.0,
            separation_radius: 20.0,
            cohesion_weight: 1.0,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            hue_affinity: 1.0,
            max_speed: 4.0,
            min_speed: 0.5,
            deposit_amount: 0.05,
            decay_half_life: 0.5,
            diffusion_scale: 1,
            boost_intensity: 0.0,
            blend_mode: EffectBlendMode::Boost,
            debug_overlay: false,
            color: ColorConfig::default(),
        }
    }
}

impl_simulation_config!(BoidsConfig);

param_table!(BoidsConfig {
    perception_radius: "perceptionRadius" => 10.0, 100.0;
    separation_radius: "separationRadius" => 5.0, 50.0;
    cohesion_weight: "cohesionWeight" => 0.0, 2.0;
    separation_weight: "separationWeight" => 0.0, 2.0;
    alignment_weight: "alignmentWeight" => 0.0, 2.0;
    hue_affinity: "hueAffinity" => 0.0, 2.0;
    max_speed: "maxSpeed" => 1.0, 10.0;
    min_speed: "minSpeed" => 0.0, 2.0;
    deposit_amount: "depositAmount" => 0.01, 0.5;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// Flocking agents; neighbours come from a spatial hash rebuilt each frame.
pub struct Boids {
    program: ShaderProgram,
    agents: AgentBuffer,
    hash: SpatialHash,
    trail: TrailMap,
    width: u32,
    height: u32,
    rng: fastrand::Rng,
    config: BoidsConfig,
}

fn seed(rng: &mut fastrand::Rng, width: u32, height: u32, cfg: &BoidsConfig) -> Vec<AgentRecord> {
    let count = cfg.agent_count.max(1) as usize;
    agent_hues(&cfg.color, count)
        .map(|hue| {
            let (sin, cos) = (rng.f32() * TAU).sin_cos();
            AgentRecord {
                x: rng.u32(0..width.max(1)) as f32,
                y: rng.u32(0..height.max(1)) as f32,
                vx: cos,
                vy: sin,
                hue,
                ..AgentRecord::default()
            }
        })
        .collect()
}

impl Boids {
    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.hash
    }
}

impl Simulation for Boids {
    type Config = BoidsConfig;
    const NAME: &'static str = "boids";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &BoidsConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("boids requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            BOIDS_SHADER,
            &[
                "resolution",
                "perceptionRadius",
                "separationRadius",
                "cohesionWeight",
                "separationWeight",
                "alignmentWeight",
                "hueAffinity",
                "maxSpeed",
                "minSpeed",
                "depositAmount",
                "gridSize",
                "cellSize",
                "saturationValue",
            ],
        )
        .context("boids program")?;
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                program.release(gpu);
                return Err(err);
            }
        };
        let mut rng = fastrand::Rng::new();
        let agents = match AgentBuffer::new(gpu, &seed(&mut rng, width, height, cfg)) {
            Ok(b) => b,
            Err(err) => {
                trail.release(gpu);
                program.release(gpu);
                return Err(err).context("boids agent buffer");
            }
        };
        let hash = match SpatialHash::new(gpu, agents.count, width, height) {
            Ok(h) => h,
            Err(err) => {
                agents.release(gpu);
                trail.release(gpu);
                program.release(gpu);
                return Err(err);
            }
        };
        log::info!("boids initialised with {} agents at {width}x{height}", agents.count);
        Ok(Self {
            program,
            agents,
            hash,
            trail,
            width,
            height,
            rng,
            config: cfg.clone(),
        })
    }

    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &BoidsConfig) -> ConfigChange {
        let count = cfg.agent_count.max(1) as usize;
        let realloc = count != self.agents.count;
        let hue_changed = hue_reinit_needed(&self.config.color, &cfg.color);
        self.config = cfg.clone();
        if realloc {
            let agents = seed(&mut self.rng, self.width, self.height, &self.config);
            let grown = self
                .agents
                .reallocate(gpu, &agents)
                .and_then(|()| self.hash.ensure_capacity(gpu, count));
            if let Err(err) = grown {
                log::warn!("boids: agent reallocation failed: {err}");
                return ConfigChange::default();
            }
            self.trail.clear(gpu);
            log::info!("boids: reallocated buffer for {count} agents");
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

    fn update(&mut self, gpu: &mut dyn Gpu, _dt: f32, _frame: &SimFrame) -> Result<(), GpuError> {
        self.hash.build(gpu, self.agents.buffer, self.agents.count, false)?;

        let cfg = &self.config;
        let (sat, val) = saturation_value(&cfg.color);
        let (gw, gh) = self.hash.grid_size();
        let p = &self.program;
        p.set_vec2(gpu, "resolution", [self.width as f32, self.height as f32]);
        p.set_f32(gpu, "perceptionRadius", cfg.perception_radius);
        p.set_f32(gpu, "separationRadius", cfg.separation_radius);
        p.set_f32(gpu, "cohesionWeight", cfg.cohesion_weight);
        p.set_f32(gpu, "separationWeight", cfg.separation_weight);
        p.set_f32(gpu, "alignmentWeight", cfg.alignment_weight);
        p.set_f32(gpu, "hueAffinity", cfg.hue_affinity);
        p.set_f32(gpu, "maxSpeed", cfg.max_speed);
        p.set_f32(gpu, "minSpeed", cfg.min_speed);
        p.set_f32(gpu, "depositAmount", cfg.deposit_amount);
        p.set(gpu, "gridSize", UniformValue::IVec2([gw as i32, gh as i32]));
        p.set_f32(gpu, "cellSize", self.hash.cell_size() as f32);
        p.set_vec2(gpu, "saturationValue", [sat, val]);

        let images = [ImageBinding {
            unit: 0,
            texture: self.trail.texture(),
            access: ImageAccess::ReadWrite,
        }];
        let buffers = [
            BufferBinding {
                binding: 0,
                buffer: self.agents.buffer,
            },
            BufferBinding {
                binding: 1,
                buffer: self.hash.offsets(),
            },
            BufferBinding {
                binding: 2,
                buffer: self.hash.sorted(),
            },
        ];
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

    fn config(&self) -> &BoidsConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        self.agents.count
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        let agents = seed(&mut self.rng, self.width, self.height, &self.config);
        if let Err(err) = self.agents.upload(gpu, &agents) {
            log::warn!("boids: reseed failed: {err}");
        }
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.trail.resize(gpu, width, height)?;
        self.hash.resize(gpu, width, height)?;
        self.width = width;
        self.height = height;
        self.reset(gpu);
        Ok(())
    }

    fn release(self, gpu: &mut dyn Gpu) {
        self.hash.release(gpu);
        self.agents.release(gpu);
        self.trail.release(gpu);
        self.program.release(gpu);
    }
}
