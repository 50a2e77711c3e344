use super::{
    AGENT_WORKGROUP, AgentBuffer, AgentRecord, ConfigChange, SimFrame, Simulation, SpatialHash,
    TrailMap, agent_barriers, hash_float, hash_u32, hue_reinit_needed, impl_simulation_config,
    rotation_matrix,
};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, agent_hue, saturation_value};
use crate::effects::{ROTATION_SPEED_MAX, param_table};
use crate::gpu::{
    BufferBinding, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    UniformValue, group_count,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

const PARTICLE_LIFE_SHADER: &str = "shaders/particle_life_agents.glsl";
pub const MAX_SPECIES: usize = 16;
const SPAWN_RADIUS: f32 = 0.5;

/// Row-major `species x species` attraction table in [-1, 1], derived
/// deterministically from `seed`. `symmetric` mirrors the upper triangle.
pub fn attraction_matrix(seed: i32, species: usize, symmetric: bool) -> Vec<f32> {
    let n = species.clamp(1, MAX_SPECIES);
    let mut m = vec![0.0f32; n * n];
    for from in 0..n {
        for to in 0..n {
            let key = (seed as u32)
                .wrapping_mul(MAX_SPECIES as u32)
                .wrapping_add((from * MAX_SPECIES + to) as u32);
            m[from * n + to] = hash_float(hash_u32(key)) * 2.0 - 1.0;
        }
    }
    if symmetric {
        mirror_upper(&mut m, n);
    }
    m
}

fn mirror_upper(m: &mut [f32], n: usize) {
    for from in 0..n {
        for to in from + 1..n {
            m[to * n + from] = m[from * n + to];
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleLifeConfig {
    pub enabled: bool,
    pub agent_count: i32,
    pub species_count: i32,
    pub r_max: f32,
    pub force_factor: f32,
    pub momentum: f32,
    pub beta: f32,
    pub attraction_seed: i32,
    /// Random-walk magnitude per second; 0 freezes the matrix.
    pub evolution_speed: f32,
    pub symmetric_forces: bool,
    pub bounds_radius: f32,
    pub boundary_stiffness: f32,
    pub x: f32,
    pub y: f32,
    pub rotation_angle_x: f32,
    pub rotation_angle_y: f32,
    pub rotation_angle_z: f32,
    pub rotation_speed_x: f32,
    pub rotation_speed_y: f32,
    pub rotation_speed_z: f32,
    pub projection_scale: f32,
    pub deposit_amount: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub color: ColorConfig,
    pub debug_overlay: bool,
}

impl Default for ParticleLifeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_count: 50_000,
            species_count: 6,
            r_max: 0.3,
            force_factor: 0.5,
            momentum: 0.8,
            beta: 0.3,
            attraction_seed: 12345,
            evolution_speed: 0.0,
            symmetric_forces: false,
            bounds_radius: 1.0,
            boundary_stiffness: 1.0,
            x: 0.5,
            y: 0.5,
            rotation_angle_x: 0.0,
            rotation_angle_y: 0.0,
            rotation_angle_z: 0.0,
            rotation_speed_x: 0.0,
            rotation_speed_y: 0.0,
            rotation_speed_z: 0.0,
            projection_scale: 0.4,
            deposit_amount: 0.1,
            decay_half_life: 1.0,
            diffusion_scale: 1,
            boost_intensity: 1.0,
            blend_mode: EffectBlendMode::Screen,
            color: ColorConfig::default(),
            debug_overlay: false,
        }
    }
}

impl ParticleLifeConfig {
    fn species(&self) -> usize {
        self.species_count.clamp(1, MAX_SPECIES as i32) as usize
    }
}

impl_simulation_config!(ParticleLifeConfig);

param_table!(ParticleLifeConfig {
    r_max: "rMax" => 0.05, 0.5;
    force_factor: "forceFactor" => 0.1, 20.0;
    momentum: "momentum" => 0.1, 0.99;
    beta: "beta" => 0.1, 0.9;
    evolution_speed: "evolutionSpeed" => 0.0, 5.0;
    bounds_radius: "boundsRadius" => 0.5, 2.0;
    boundary_stiffness: "boundaryStiffness" => 0.0, 10.0;
    x: "x" => 0.0, 1.0;
    y: "y" => 0.0, 1.0;
    rotation_speed_x: "rotationSpeedX" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_speed_y: "rotationSpeedY" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_speed_z: "rotationSpeedZ" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    projection_scale: "projectionScale" => 0.1, 1.0;
    deposit_amount: "depositAmount" => 0.01, 0.5;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// Multi-species particles in a 3D ball with pairwise attraction rules.
pub struct ParticleLife {
    program: ShaderProgram,
    agents: AgentBuffer,
    hash: SpatialHash,
    trail: TrailMap,
    width: u32,
    height: u32,
    matrix: Vec<f32>,
    evolution_step: u32,
    spin: [f32; 3],
    rng: fastrand::Rng,
    config: ParticleLifeConfig,
}

/// Uniform in a ball of radius 0.5, species assigned round-robin.
fn seed(rng: &mut fastrand::Rng, cfg: &ParticleLifeConfig) -> Vec<AgentRecord> {
    let count = cfg.agent_count.max(1) as usize;
    let species = cfg.species();
    (0..count)
        .map(|i| {
            let theta = rng.f32() * TAU;
            let phi = (1.0 - 2.0 * rng.f32()).acos();
            let r = SPAWN_RADIUS * rng.f32().cbrt();
            let s = i % species;
            AgentRecord {
                x: r * phi.sin() * theta.cos(),
                y: r * phi.sin() * theta.sin(),
                z: r * phi.cos(),
                hue: agent_hue(&cfg.color, s, species),
                aux: s as f32,
                ..AgentRecord::default()
            }
        })
        .collect()
}

impl ParticleLife {
    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    fn regenerate_matrix(&mut self) {
        let cfg = &self.config;
        self.matrix = attraction_matrix(cfg.attraction_seed, cfg.species(), cfg.symmetric_forces);
        self.evolution_step = 0;
    }

    /// Bounded random walk over every entry, keyed by the step counter.
    fn evolve(&mut self, dt: f32) {
        let speed = self.config.evolution_speed;
        if speed <= 0.0 {
            return;
        }
        let n = self.config.species();
        for (idx, v) in self.matrix.iter_mut().enumerate() {
            let noise = hash_float(hash_u32(self.evolution_step.wrapping_mul(256).wrapping_add(idx as u32)));
            *v = (*v + (noise - 0.5) * 2.0 * speed * dt).clamp(-1.0, 1.0);
        }
        if self.config.symmetric_forces {
            mirror_upper(&mut self.matrix, n);
        }
        self.evolution_step = self.evolution_step.wrapping_add(1);
    }

    fn reseed_into_new_buffer(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        let agents = seed(&mut self.rng, &self.config);
        self.agents.reallocate(gpu, &agents)?;
        self.hash.ensure_capacity(gpu, agents.len())
    }
}

impl Simulation for ParticleLife {
    type Config = ParticleLifeConfig;
    const NAME: &'static str = "particleLife";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &ParticleLifeConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("particle life requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            PARTICLE_LIFE_SHADER,
            &[
                "speciesCount",
                "attractionMatrix",
                "rMax",
                "forceFactor",
                "momentum",
                "beta",
                "boundaryRadius",
                "boundaryStiffness",
                "center",
                "projectionScale",
                "rotationMatrix",
                "timeStep",
                "depositAmount",
                "gridSize",
                "cellSize",
                "saturationValue",
            ],
        )
        .context("particle life program")?;
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                program.release(gpu);
                return Err(err);
            }
        };
        let mut rng = fastrand::Rng::new();
        let agents = match AgentBuffer::new(gpu, &seed(&mut rng, cfg)) {
            Ok(b) => b,
            Err(err) => {
                trail.release(gpu);
                program.release(gpu);
                return Err(err).context("particle life agent buffer");
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
        log::info!(
            "particle life initialised with {} agents ({} species) at {width}x{height}",
            agents.count,
            cfg.species()
        );
        Ok(Self {
            program,
            agents,
            hash,
            trail,
            width,
            height,
            matrix: attraction_matrix(cfg.attraction_seed, cfg.species(), cfg.symmetric_forces),
            evolution_step: 0,
            spin: [0.0; 3],
            rng,
            config: cfg.clone(),
        })
    }

    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &ParticleLifeConfig) -> ConfigChange {
        let count = cfg.agent_count.max(1) as usize;
        let realloc = count != self.agents.count;
        let species_changed = cfg.species() != self.config.species();
        let matrix_changed = species_changed
            || cfg.attraction_seed != self.config.attraction_seed
            || cfg.symmetric_forces != self.config.symmetric_forces;
        let hue_changed = hue_reinit_needed(&self.config.color, &cfg.color);
        self.config = cfg.clone();

        if matrix_changed {
            self.regenerate_matrix();
        }
        // Species live in the agent records, so a species change reseeds too.
        if realloc || species_changed {
            if let Err(err) = self.reseed_into_new_buffer(gpu) {
                log::warn!("particle life: agent reallocation failed: {err}");
                return ConfigChange::default();
            }
            self.trail.clear(gpu);
            log::info!(
                "particle life: reallocated buffer for {count} agents ({} species)",
                self.config.species()
            );
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

    fn update(&mut self, gpu: &mut dyn Gpu, dt: f32, _frame: &SimFrame) -> Result<(), GpuError> {
        self.evolve(dt);
        let cfg = &self.config;
        self.spin[0] += cfg.rotation_speed_x * dt;
        self.spin[1] += cfg.rotation_speed_y * dt;
        self.spin[2] += cfg.rotation_speed_z * dt;

        self.hash.build(gpu, self.agents.buffer, self.agents.count, true)?;

        let rotation = rotation_matrix(
            cfg.rotation_angle_x + self.spin[0],
            cfg.rotation_angle_y + self.spin[1],
            cfg.rotation_angle_z + self.spin[2],
        );
        let (sat, val) = saturation_value(&cfg.color);
        let (gw, gh) = self.hash.grid_size();
        let p = &self.program;
        p.set_i32(gpu, "speciesCount", cfg.species() as i32);
        p.set(gpu, "attractionMatrix", UniformValue::FloatArray(self.matrix.clone()));
        p.set_f32(gpu, "rMax", cfg.r_max);
        p.set_f32(gpu, "forceFactor", cfg.force_factor);
        p.set_f32(gpu, "momentum", cfg.momentum);
        p.set_f32(gpu, "beta", cfg.beta);
        p.set_f32(gpu, "boundaryRadius", cfg.bounds_radius);
        p.set_f32(gpu, "boundaryStiffness", cfg.boundary_stiffness);
        p.set_vec2(gpu, "center", [cfg.x, cfg.y]);
        p.set_f32(gpu, "projectionScale", cfg.projection_scale);
        p.set(gpu, "rotationMatrix", UniformValue::Mat3(rotation));
        p.set_f32(gpu, "timeStep", dt);
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

    fn config(&self) -> &ParticleLifeConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        self.agents.count
    }

    /// Reseeds agents and restores the matrix from its seed.
    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        self.regenerate_matrix();
        let agents = seed(&mut self.rng, &self.config);
        if let Err(err) = self.agents.upload(gpu, &agents) {
            log::warn!("particle life: reseed failed: {err}");
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
        Ok(())
    }

    fn release(self, gpu: &mut dyn Gpu) {
        self.hash.release(gpu);
        self.agents.release(gpu);
        self.trail.release(gpu);
        self.program.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_seeded_and_bounded() {
        let a = attraction_matrix(12345, 6, false);
        assert_eq!(a.len(), 36);
        assert_eq!(a, attraction_matrix(12345, 6, false));
        assert_ne!(a, attraction_matrix(54321, 6, false));
        assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn symmetric_matrix_mirrors_upper_triangle() {
        let m = attraction_matrix(7, 5, true);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(m[i * 5 + j], m[j * 5 + i]);
            }
        }
    }

    #[test]
    fn species_count_is_capped() {
        assert_eq!(attraction_matrix(1, 40, false).len(), MAX_SPECIES * MAX_SPECIES);
    }
}
