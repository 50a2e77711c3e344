use super::{
    AGENT_WORKGROUP, AgentBuffer, AgentRecord, ConfigChange, SimFrame, Simulation, TrailMap,
    agent_barriers, agent_hues, hue_reinit_needed, impl_simulation_config, rotation_matrix,
};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, saturation_value};
use crate::effects::{ROTATION_SPEED_MAX, param_table};
use crate::gpu::{
    BufferBinding, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    UniformValue, group_count,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const ATTRACTOR_SHADER: &str = "shaders/attractor_agents.glsl";

/// Chaotic system integrated by the agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum AttractorType {
    #[default]
    Lorenz,
    Rossler,
    Aizawa,
    Thomas,
    Dadras,
}

impl AttractorType {
    pub const ALL: [Self; 5] = [
        Self::Lorenz,
        Self::Rossler,
        Self::Aizawa,
        Self::Thomas,
        Self::Dadras,
    ];

    pub fn from_index(i: i32) -> Self {
        usize::try_from(i)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0) as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lorenz => "Lorenz",
            Self::Rossler => "Rossler",
            Self::Aizawa => "Aizawa",
            Self::Thomas => "Thomas",
            Self::Dadras => "Dadras",
        }
    }

    /// A starting point inside the basin of the attractor.
    fn seed_point(self, rng: &mut fastrand::Rng) -> [f32; 3] {
        let mut r = |half: f32| (rng.f32() * 2.0 - 1.0) * half;
        match self {
            Self::Lorenz => {
                let wing = if r(1.0) < 0.0 { -1.0 } else { 1.0 };
                [wing * 8.5 + r(2.5), wing * 8.5 + r(2.5), 27.0 + r(5.0)]
            }
            Self::Rossler => [r(2.0), r(2.0), r(1.0)],
            Self::Aizawa => [r(0.5), r(0.5), r(0.5)],
            Self::Thomas | Self::Dadras => [r(1.0), r(1.0), r(1.0)],
        }
    }
}

impl From<i32> for AttractorType {
    fn from(i: i32) -> Self {
        Self::from_index(i)
    }
}

impl From<AttractorType> for i32 {
    fn from(t: AttractorType) -> Self {
        t.index()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttractorFlowConfig {
    pub enabled: bool,
    pub attractor_type: AttractorType,
    pub agent_count: i32,
    pub time_scale: f32,
    pub attractor_scale: f32,
    pub sigma: f32,
    pub rho: f32,
    pub beta: f32,
    pub rossler_c: f32,
    pub thomas_b: f32,
    pub dadras_a: f32,
    pub dadras_b: f32,
    pub dadras_c: f32,
    pub dadras_d: f32,
    pub dadras_e: f32,
    pub x: f32,
    pub y: f32,
    pub rotation_angle_x: f32,
    pub rotation_angle_y: f32,
    pub rotation_angle_z: f32,
    /// Radians per second.
    pub rotation_speed_x: f32,
    pub rotation_speed_y: f32,
    pub rotation_speed_z: f32,
    pub deposit_amount: f32,
    pub max_speed: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub color: ColorConfig,
    pub debug_overlay: bool,
}

impl Default for AttractorFlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            attractor_type: AttractorType::Lorenz,
            agent_count: 100_000,
            time_scale: 0.01,
            attractor_scale: 0.02,
            sigma: 10.0,
            rho: 28.0,
            beta: 2.666_667,
            rossler_c: 5.7,
            thomas_b: 0.208_186,
            dadras_a: 3.0,
            dadras_b: 2.7,
            dadras_c: 1.7,
            dadras_d: 2.0,
            dadras_e: 9.0,
            x: 0.5,
            y: 0.5,
            rotation_angle_x: 0.0,
            rotation_angle_y: 0.0,
            rotation_angle_z: 0.0,
            rotation_speed_x: 0.0,
            rotation_speed_y: 0.0,
            rotation_speed_z: 0.0,
            deposit_amount: 0.1,
            max_speed: 50.0,
            decay_half_life: 1.0,
            diffusion_scale: 1,
            boost_intensity: 1.0,
            blend_mode: EffectBlendMode::Screen,
            color: ColorConfig::default(),
            debug_overlay: false,
        }
    }
}

impl_simulation_config!(AttractorFlowConfig);

param_table!(AttractorFlowConfig {
    time_scale: "timeScale" => 0.001, 0.1;
    attractor_scale: "attractorScale" => 0.001, 0.1;
    sigma: "sigma" => 1.0, 20.0;
    rho: "rho" => 10.0, 50.0;
    beta: "beta" => 0.5, 5.0;
    rossler_c: "rosslerC" => 4.0, 7.0;
    thomas_b: "thomasB" => 0.1, 0.3;
    x: "x" => 0.0, 1.0;
    y: "y" => 0.0, 1.0;
    rotation_speed_x: "rotationSpeedX" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_speed_y: "rotationSpeedY" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    rotation_speed_z: "rotationSpeedZ" => -ROTATION_SPEED_MAX, ROTATION_SPEED_MAX;
    deposit_amount: "depositAmount" => 0.01, 0.2;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// 3D agents tracing a strange attractor, projected onto the trail map.
pub struct AttractorFlow {
    program: ShaderProgram,
    agents: AgentBuffer,
    trail: TrailMap,
    width: u32,
    height: u32,
    /// Accumulated spin, added to the configured base angles.
    spin: [f32; 3],
    rng: fastrand::Rng,
    config: AttractorFlowConfig,
}

fn seed(rng: &mut fastrand::Rng, cfg: &AttractorFlowConfig) -> Vec<AgentRecord> {
    let count = cfg.agent_count.max(1) as usize;
    agent_hues(&cfg.color, count)
        .map(|hue| {
            let [x, y, z] = cfg.attractor_type.seed_point(rng);
            AgentRecord {
                x,
                y,
                z,
                hue,
                ..AgentRecord::default()
            }
        })
        .collect()
}

impl AttractorFlow {
    /// Effective rotation angles (base plus accumulated spin).
    pub fn rotation(&self) -> [f32; 3] {
        [
            self.config.rotation_angle_x + self.spin[0],
            self.config.rotation_angle_y + self.spin[1],
            self.config.rotation_angle_z + self.spin[2],
        ]
    }
}

impl Simulation for AttractorFlow {
    type Config = AttractorFlowConfig;
    const NAME: &'static str = "attractorFlow";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &AttractorFlowConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("attractor flow requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            ATTRACTOR_SHADER,
            &[
                "attractorType",
                "timeScale",
                "attractorScale",
                "sigma",
                "rho",
                "beta",
                "rosslerC",
                "thomasB",
                "dadrasA",
                "dadrasB",
                "dadrasC",
                "dadrasD",
                "dadrasE",
                "center",
                "rotationMatrix",
                "maxSpeed",
                "depositAmount",
                "frame",
                "saturationValue",
            ],
        )
        .context("attractor flow program")?;
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
                return Err(err).context("attractor flow agent buffer");
            }
        };
        log::info!(
            "attractor flow initialised with {} agents ({}) at {width}x{height}",
            agents.count,
            cfg.attractor_type.as_str()
        );
        Ok(Self {
            program,
            agents,
            trail,
            width,
            height,
            spin: [0.0; 3],
            rng,
            config: cfg.clone(),
        })
    }

    /// Switching systems also reseeds, since points of one attractor sit
    /// far outside the basin of another.
    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &AttractorFlowConfig) -> ConfigChange {
        let count = cfg.agent_count.max(1) as usize;
        let realloc = count != self.agents.count;
        let reseed = hue_reinit_needed(&self.config.color, &cfg.color)
            || cfg.attractor_type != self.config.attractor_type;
        self.config = cfg.clone();
        if realloc {
            let agents = seed(&mut self.rng, &self.config);
            if let Err(err) = self.agents.reallocate(gpu, &agents) {
                log::warn!("attractor flow: agent reallocation failed: {err}");
                return ConfigChange::default();
            }
            self.trail.clear(gpu);
            log::info!("attractor flow: reallocated buffer for {count} agents");
            return ConfigChange {
                reallocated: true,
                reseeded: true,
                trails_cleared: true,
            };
        }
        if reseed {
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
        self.spin[0] += cfg.rotation_speed_x * dt;
        self.spin[1] += cfg.rotation_speed_y * dt;
        self.spin[2] += cfg.rotation_speed_z * dt;
        let [ax, ay, az] = self.rotation();
        let (sat, val) = saturation_value(&cfg.color);

        let p = &self.program;
        p.set_i32(gpu, "attractorType", cfg.attractor_type.index());
        p.set_f32(gpu, "timeScale", cfg.time_scale);
        p.set_f32(gpu, "attractorScale", cfg.attractor_scale);
        p.set_f32(gpu, "sigma", cfg.sigma);
        p.set_f32(gpu, "rho", cfg.rho);
        p.set_f32(gpu, "beta", cfg.beta);
        p.set_f32(gpu, "rosslerC", cfg.rossler_c);
        p.set_f32(gpu, "thomasB", cfg.thomas_b);
        p.set_f32(gpu, "dadrasA", cfg.dadras_a);
        p.set_f32(gpu, "dadrasB", cfg.dadras_b);
        p.set_f32(gpu, "dadrasC", cfg.dadras_c);
        p.set_f32(gpu, "dadrasD", cfg.dadras_d);
        p.set_f32(gpu, "dadrasE", cfg.dadras_e);
        p.set_vec2(gpu, "center", [cfg.x, cfg.y]);
        p.set(gpu, "rotationMatrix", UniformValue::Mat3(rotation_matrix(ax, ay, az)));
        p.set_f32(gpu, "maxSpeed", cfg.max_speed);
        p.set_f32(gpu, "depositAmount", cfg.deposit_amount);
        p.set_i32(gpu, "frame", frame.frame as i32);
        p.set_vec2(gpu, "saturationValue", [sat, val]);

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

    fn config(&self) -> &AttractorFlowConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        self.agents.count
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        let agents = seed(&mut self.rng, &self.config);
        if let Err(err) = self.agents.upload(gpu, &agents) {
            log::warn!("attractor flow: reseed failed: {err}");
        }
    }

    /// Agents live in attractor space, so only the trail follows the screen.
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
        self.agents.release(gpu);
        self.trail.release(gpu);
        self.program.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorenz_seeds_sit_on_a_wing() {
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..200 {
            let [x, y, z] = AttractorType::Lorenz.seed_point(&mut rng);
            assert!(x.abs() >= 6.0 && x.abs() <= 11.0, "x {x} off wing");
            assert_eq!(x.signum(), y.signum());
            assert!((22.0..=32.0).contains(&z));
        }
    }

    #[test]
    fn unknown_index_falls_back_to_lorenz() {
        assert_eq!(AttractorType::from_index(9), AttractorType::Lorenz);
        assert_eq!(AttractorType::from_index(4), AttractorType::Dadras);
    }
}
