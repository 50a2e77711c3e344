use super::{ConfigChange, SimFrame, Simulation, TrailMap, agent_barriers, impl_simulation_config};
use crate::blend::EffectBlendMode;
use crate::color::{ColorConfig, saturation_value};
use crate::effects::param_table;
use crate::gpu::{
    ComputeDispatch, Gpu, GpuError, ImageAccess, ImageBinding, ShaderProgram, TextureDesc,
    TextureFormat, TextureId, group_count,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const CURL_ADVECTION_SHADER: &str = "shaders/curl_advection.glsl";
const TILE: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurlAdvectionConfig {
    pub enabled: bool,
    pub steps: i32,
    pub advection_curl: f32,
    pub curl_scale: f32,
    pub laplacian_scale: f32,
    pub pressure_scale: f32,
    pub divergence_scale: f32,
    pub divergence_update: f32,
    pub divergence_smoothing: f32,
    pub self_amp: f32,
    pub update_smoothing: f32,
    pub injection_intensity: f32,
    pub injection_threshold: f32,
    pub deposit_amount: f32,
    pub decay_half_life: f32,
    pub diffusion_scale: i32,
    pub boost_intensity: f32,
    pub blend_mode: EffectBlendMode,
    pub color: ColorConfig,
    pub debug_overlay: bool,
}

impl Default for CurlAdvectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            steps: 40,
            advection_curl: 0.2,
            curl_scale: -2.0,
            laplacian_scale: 0.05,
            pressure_scale: -2.0,
            divergence_scale: -0.4,
            divergence_update: -0.03,
            divergence_smoothing: 0.3,
            self_amp: 1.0,
            update_smoothing: 0.4,
            injection_intensity: 0.0,
            injection_threshold: 0.1,
            deposit_amount: 0.05,
            decay_half_life: 0.5,
            diffusion_scale: 0,
            boost_intensity: 1.0,
            blend_mode: EffectBlendMode::Screen,
            color: ColorConfig::default(),
            debug_overlay: false,
        }
    }
}

impl_simulation_config!(CurlAdvectionConfig);

param_table!(CurlAdvectionConfig {
    advection_curl: "advectionCurl" => 0.0, 1.0;
    curl_scale: "curlScale" => -4.0, 4.0;
    laplacian_scale: "laplacianScale" => 0.0, 0.2;
    pressure_scale: "pressureScale" => -4.0, 4.0;
    divergence_scale: "divergenceScale" => -1.0, 1.0;
    divergence_update: "divergenceUpdate" => -0.1, 0.1;
    divergence_smoothing: "divergenceSmoothing" => 0.0, 0.5;
    self_amp: "selfAmp" => 0.5, 2.0;
    update_smoothing: "updateSmoothing" => 0.25, 0.9;
    injection_intensity: "injectionIntensity" => 0.0, 1.0;
    injection_threshold: "injectionThreshold" => 0.0, 1.0;
    decay_half_life: "decayHalfLife" => 0.1, 5.0;
    boost_intensity: "boostIntensity" => 0.0, 5.0;
});

/// Grid fluid: velocity in rg, divergence in b, ping-ponged every step.
pub struct CurlAdvection {
    program: ShaderProgram,
    state: [TextureId; 2],
    current: usize,
    trail: TrailMap,
    width: u32,
    height: u32,
    rng: fastrand::Rng,
    config: CurlAdvectionConfig,
}

fn alloc_state(gpu: &mut dyn Gpu, width: u32, height: u32) -> Result<[TextureId; 2], GpuError> {
    let desc = TextureDesc::with_format(width, height, TextureFormat::Rgba16F);
    let a = gpu.create_texture(desc)?;
    match gpu.create_texture(desc) {
        Ok(b) => Ok([a, b]),
        Err(err) => {
            gpu.destroy_texture(a);
            Err(err)
        }
    }
}

/// Random velocity in [-0.1, 0.1], zero divergence.
fn seed_state(gpu: &mut dyn Gpu, rng: &mut fastrand::Rng, state: [TextureId; 2], width: u32, height: u32) {
    let texels = width as usize * height as usize;
    for tex in state {
        let data: Vec<[f32; 4]> = (0..texels)
            .map(|_| [rng.f32() * 0.2 - 0.1, rng.f32() * 0.2 - 0.1, 0.0, 1.0])
            .collect();
        if let Err(err) = gpu.upload_texture(tex, &data) {
            log::warn!("curl advection: state upload failed: {err}");
        }
    }
}

impl CurlAdvection {
    /// State texture holding the latest velocity field.
    pub fn state_texture(&self) -> TextureId {
        self.state[self.current]
    }
}

impl Simulation for CurlAdvection {
    type Config = CurlAdvectionConfig;
    const NAME: &'static str = "curlAdvection";

    fn new(gpu: &mut dyn Gpu, width: u32, height: u32, cfg: &CurlAdvectionConfig) -> anyhow::Result<Self> {
        if !Self::supported(gpu) {
            anyhow::bail!("curl advection requires compute shader support");
        }
        let program = ShaderProgram::compute(
            gpu,
            CURL_ADVECTION_SHADER,
            &[
                "steps",
                "advectionCurl",
                "curlScale",
                "laplacianScale",
                "pressureScale",
                "divergenceScale",
                "divergenceUpdate",
                "divergenceSmoothing",
                "selfAmp",
                "updateSmoothing",
                "injectionIntensity",
                "injectionThreshold",
                "depositAmount",
                "saturationValue",
                "stateTexture",
                "accumTexture",
            ],
        )
        .context("curl advection program")?;
        let state = match alloc_state(gpu, width, height) {
            Ok(s) => s,
            Err(err) => {
                program.release(gpu);
                return Err(err).context("curl advection state textures");
            }
        };
        let trail = match TrailMap::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                state.into_iter().for_each(|t| gpu.destroy_texture(t));
                program.release(gpu);
                return Err(err);
            }
        };
        let mut rng = fastrand::Rng::new();
        seed_state(gpu, &mut rng, state, width, height);
        log::info!("curl advection initialised at {width}x{height}");
        Ok(Self {
            program,
            state,
            current: 0,
            trail,
            width,
            height,
            rng,
            config: cfg.clone(),
        })
    }

    /// Nothing here is count-dependent, so config changes never reallocate.
    fn apply_config(&mut self, _gpu: &mut dyn Gpu, cfg: &CurlAdvectionConfig) -> ConfigChange {
        self.config = cfg.clone();
        ConfigChange::default()
    }

    fn update(&mut self, gpu: &mut dyn Gpu, _dt: f32, frame: &SimFrame) -> Result<(), GpuError> {
        let cfg = &self.config;
        let (sat, val) = saturation_value(&cfg.color);
        let read = self.state[self.current];
        let write = self.state[1 - self.current];

        let p = &self.program;
        p.set_i32(gpu, "steps", cfg.steps);
        p.set_f32(gpu, "advectionCurl", cfg.advection_curl);
        p.set_f32(gpu, "curlScale", cfg.curl_scale);
        p.set_f32(gpu, "laplacianScale", cfg.laplacian_scale);
        p.set_f32(gpu, "pressureScale", cfg.pressure_scale);
        p.set_f32(gpu, "divergenceScale", cfg.divergence_scale);
        p.set_f32(gpu, "divergenceUpdate", cfg.divergence_update);
        p.set_f32(gpu, "divergenceSmoothing", cfg.divergence_smoothing);
        p.set_f32(gpu, "selfAmp", cfg.self_amp);
        p.set_f32(gpu, "updateSmoothing", cfg.update_smoothing);
        p.set_f32(gpu, "injectionIntensity", cfg.injection_intensity);
        p.set_f32(gpu, "injectionThreshold", cfg.injection_threshold);
        p.set_f32(gpu, "depositAmount", cfg.deposit_amount);
        p.set_vec2(gpu, "saturationValue", [sat, val]);
        p.set_texture(gpu, "stateTexture", read);
        p.set_texture(gpu, "accumTexture", frame.accum);

        let images = [
            ImageBinding {
                unit: 0,
                texture: write,
                access: ImageAccess::Write,
            },
            ImageBinding {
                unit: 1,
                texture: self.trail.texture(),
                access: ImageAccess::ReadWrite,
            },
        ];
        gpu.dispatch_compute(&ComputeDispatch {
            program: self.program.id(),
            groups: [group_count(self.width, TILE), group_count(self.height, TILE), 1],
            images: &images,
            buffers: &[],
        })?;
        gpu.memory_barrier(agent_barriers());
        self.current = 1 - self.current;
        Ok(())
    }

    fn trail_map(&self) -> &TrailMap {
        &self.trail
    }

    fn trail_map_mut(&mut self) -> &mut TrailMap {
        &mut self.trail
    }

    fn config(&self) -> &CurlAdvectionConfig {
        &self.config
    }

    fn agent_count(&self) -> usize {
        0
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        self.trail.clear(gpu);
        seed_state(gpu, &mut self.rng, self.state, self.width, self.height);
        self.current = 0;
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let state = alloc_state(gpu, width, height)
            .with_context(|| format!("curl advection state at {width}x{height}"))?;
        if let Err(err) = self.trail.resize(gpu, width, height) {
            state.into_iter().for_each(|t| gpu.destroy_texture(t));
            return Err(err);
        }
        self.state.into_iter().for_each(|t| gpu.destroy_texture(t));
        self.state = state;
        self.width = width;
        self.height = height;
        self.reset(gpu);
        Ok(())
    }

    fn release(self, gpu: &mut dyn Gpu) {
        self.state.into_iter().for_each(|t| gpu.destroy_texture(t));
        self.trail.release(gpu);
        self.program.release(gpu);
    }
}
