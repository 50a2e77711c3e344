use super::{
    AGENT_WORKGROUP, AgentBuffer, AgentRecord, ConfigChange, NOISE_TEXTURE_SIZE, NoiseTexture3d,
    SimFrame, Simulation, TrailMap, agent_barriers, agent_hues, hue_reinit_needed,
    impl_simulation_config,
};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, saturation_value};
use crate::effects::param_table;
use crate::gpu::{
    BufferBinding, ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram,
    group_count,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const CURL_FLOW_SHADER: &str = "shaders/curl_flow_agents.glsl";
/// Volume depth traversed per unit of `noiseEvolution` per second.
const EVOLUTION_RATE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurlFlowConfig {
    pub enabled: bool,
    pub agent_count: i32,
    pub noise_frequency: f32,
    pub noise_evolution: f32,
    pub momentum: f32,
    pub trail_influence: f32,
    pub accum_sense_blend: f32,
    pub gradient_radius: f32,
    pub step_size: f32,
    pub respawn_probability: f32,
    pub deposit_amount: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub color: ColorConfig,
    pub debug_overlay: bool,
}

impl Default for CurlFlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_count: 100_000,
            noise_frequency: 0.005,
            noise_evolution: 0.5,
            momentum: 0.0,
            trail_influence: 0.3,
            accum_sense_blend: 0.0,
            gradient_radius: 4.0,
            step_size: 2.0,
            respawn_probability: 0.0,
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

impl_simulation_config!(CurlFlowConfig);

param_table!(CurlFlowConfig {
    noise_frequency: "noiseFrequency" => 0.001, 0.1;
    noise_evolution: "noiseEvolution" => 0.0, 2.0;
    momentum: "momentum" => 0.0, 0.99;
    trail_influence: "trailInfluence" => 0.0, 1.0;
    accum_sense_blend: "accumSenseBlend" => 0.0, 1.0;
    gradient_radius: "gradientRadius" => 1.0, 32.0;
    step_size: "stepSize" => 0.1, 5.0;
    respawn_probability: "respawnProbability" => 0.0, 0.1;
    deposit_amount: "depositAmount" => 0.01, 0.2;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// Agents advected along the curl of a slowly evolving noise volume.
pub struct CurlFlow {
    program: ShaderProgram,
    noise: NoiseTexture3d,
    agents: AgentBuffer,
    trail: TrailMap,
    width: u32,
    height: u32,
    noise_phase: f32,
    rng: fastrand::Rng,
    config: CurlFlowConfig,
}

fn seed(rng: &mut fastrand::Rng, width: u32, height: u32, cfg: &CurlFlowConfig) -> Vec<AgentRecord> {
    let count = cfg.agent_count.max(1) as usize;
    agent_hues(&cfg.color, count)
        .map(|hue| AgentRecord {
            x: rng.f32() * width as f32,
            y: rng.f32() * height as f32,
            hue,
            ..AgentRecord::default()
        })
        .collect()
}

impl CurlFlow {
    /// Depth coordinate into the noise volume.
    pub fn noise_phase(&self) -> f32 {
        self.noise_phase
    }
}

impl Simulation for CurlFlow {
    type Config = CurlFlowConfig;
    const NAME: &'static str = "curlFlow";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &CurlFlowConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("curl flow requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            CURL_FLOW_SHADER,
            &[
                "noiseFrequency",
                "noiseTime",
                "momentum",
                "trailInfluence",
                "accumSenseBlend",
                "gradientRadius",
                "stepSize",
                "respawnProbability",
                "depositAmount",
                "frame",
                "saturationValue",
                "noiseTexture",
                "accumTexture",
            ],
        )
        .context("curl flow program")?;
        let noise = match NoiseTexture3d::new(gpu, NOISE_TEXTURE_SIZE) {
            Ok(n) => n,
            Err(err) => {
                program.release(gpu);
                return Err(err).context("curl flow noise volume");
            }
        };
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                noise.release(gpu);
                program.release(gpu);
                return Err(err);
            }
        };
        let mut rng = fastrand::Rng::new();
        let agents = match AgentBuffer::new(gpu, &seed(&mut rng, width, height, cfg)) {
            Ok(b) => b,
            Err(err) => {
                trail.release(gpu);
                noise.release(gpu);
                program.release(gpu);
                return Err(err).context("curl flow agent buffer");
            }
        };
        log::info!("curl flow initialised with {} agents at {width}x{height}", agents.count);
        Ok(Self {
            program,
            noise,
            agents,
            trail,
            width,
            height,
            noise_phase: 0.0,
            rng,
            config: cfg.clone(),
        })
    }

    fn apply_config(&mut self, gpu: &mut dyn Gpu, cfg: &CurlFlowConfig) -> ConfigChange {
        let count = cfg.agent_count.max(1) as usize;
        let realloc = count != self.agents.count;
        let hue_changed = hue_reinit_needed(&self.config.color, &cfg.color);
        self.config = cfg.clone();
        if realloc {
            let agents = seed(&mut self.rng, self.width, self.height, &self.config);
            if let Err(err) = self.agents.reallocate(gpu, &agents) {
                log::warn!("curl flow: agent reallocation failed: {err}");
                return ConfigChange::default();
            }
            self.trail.clear(gpu);
            log::info!("curl flow: reallocated buffer for {count} agents");
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
        self.noise_phase = (self.noise_phase + dt * cfg.noise_evolution * EVOLUTION_RATE).rem_euclid(1.0);
        let (sat, val) = saturation_value(&cfg.color);

        let p = &self.program;
        p.set_f32(gpu, "noiseFrequency", cfg.noise_frequency);
        p.set_f32(gpu, "noiseTime", self.noise_phase);
        p.set_f32(gpu, "momentum", cfg.momentum);
        p.set_f32(gpu, "trailInfluence", cfg.trail_influence);
        p.set_f32(gpu, "accumSenseBlend", cfg.accum_sense_blend);
        p.set_f32(gpu, "gradientRadius", cfg.gradient_radius);
        p.set_f32(gpu, "stepSize", cfg.step_size);
        p.set_f32(gpu, "respawnProbability", cfg.respawn_probability);
        p.set_f32(gpu, "depositAmount", cfg.deposit_amount);
        p.set_i32(gpu, "frame", frame.frame as i32);
        p.set_vec2(gpu, "saturationValue", [sat, val]);
        p.set_texture(gpu, "noiseTexture", self.noise.texture());
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

    fn config(&self) -> &CurlFlowConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        self.agents.count
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        let agents = seed(&mut self.rng, self.width, self.height, &self.config);
        if let Err(err) = self.agents.upload(gpu, &agents) {
            log::warn!("curl flow: reseed failed: {err}");
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
        self.noise.release(gpu);
        self.program.release(gpu);
    }
}
