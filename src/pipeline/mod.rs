//! The per-frame controller.
//!
//! [`PostEffect`] owns every screen-sized surface, the sensor textures, the
//! effect modules and the simulations, and drives them in fixed phases:
//! modulation, sensor upload, simulations, feedback, drawables, then the
//! output chain (trail composites, chromatic, transforms in the configured
//! order, snapshot, clarity, FXAA, gamma).

mod passes;
mod profiler;
mod sensors;
mod simulations;
mod targets;

pub use profiler::{PROFILE_HISTORY, ProfileZone, Profiler, ZoneTiming};
pub use sensors::FftNormalizer;
pub use simulations::SimulationStatus;
pub use targets::half_size;

use crate::blend::BlendCompositor;
use crate::capability::{CapabilityReport, probe_gpu};
use crate::config::ComputeMode;
use crate::effect_config::EffectConfig;
use crate::effects::{EffectFlags, EffectFrame, EffectModule, TransformEffectType, create_effect};
use crate::gpu::{Gpu, GpuError, TextureId};
use crate::modulation::{ModSource, ModSources, ModulationEngine};
use crate::preset::Preset;
use crate::sim::SimFrame;
use anyhow::Context;
use passes::{CorePass, CorePasses};
use sensors::SensorTextures;
use simulations::{SimulationSlot, simulation_slots};
use std::time::Instant;
use targets::{PingPong, RenderTargets};

/// What the host hands over each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub dt: f32,
    /// Raw FFT magnitudes; normalised by the pipeline's running max.
    pub fft: &'a [f32],
    /// Waveform ring in buffer order.
    pub waveform: &'a [f32],
    /// Slot the next sample will be written to.
    pub waveform_write_index: usize,
    /// Beat envelope in 0..1.
    pub beat: f32,
}

impl<'a> FrameInput<'a> {
    pub fn silent(dt: f32) -> Self {
        Self {
            dt,
            fft: &[],
            waveform: &[],
            waveform_write_index: 0,
            beat: 0.0,
        }
    }
}

/// Surfaces available to a drawable.
#[derive(Debug, Clone, Copy)]
pub struct DrawContext {
    pub dt: f32,
    pub width: u32,
    pub height: u32,
    /// Render target: the accumulator, after feedback.
    pub target: TextureId,
    /// Post-transform snapshot of the previous frame.
    pub previous_output: TextureId,
    pub fft: TextureId,
    pub waveform: TextureId,
}

/// A host layer drawn into the accumulator between feedback and output.
pub trait DrawableLayer {
    fn name(&self) -> &str;
    fn draw(&mut self, gpu: &mut dyn Gpu, ctx: &DrawContext) -> anyhow::Result<()>;
}

pub struct PostEffect {
    config: EffectConfig,
    targets: RenderTargets,
    sensors: SensorTextures,
    passes: CorePasses,
    compositor: BlendCompositor,
    effects: Vec<Option<Box<dyn EffectModule>>>,
    unavailable: Vec<TransformEffectType>,
    sims: Vec<Box<dyn SimulationSlot>>,
    drawables: Vec<Box<dyn DrawableLayer>>,
    modulation: Option<ModulationEngine>,
    sources: ModSources,
    capability: CapabilityReport,
    compute_warned: bool,
    final_texture: TextureId,
    profiler: Profiler,
    frame: u32,
}

impl PostEffect {
    /// Builds every resource. Effects whose programs fail to load are
    /// recorded as unavailable; failures of the core passes are fatal.
    pub fn new(
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
        config: EffectConfig,
        compute: ComputeMode,
    ) -> anyhow::Result<Self> {
        let capability = probe_gpu(gpu, compute);
        for note in capability.notes() {
            log::info!("capability: {note}");
        }

        let targets = RenderTargets::new(gpu, width, height)?;
        let sensors = match SensorTextures::new(gpu) {
            Ok(s) => s,
            Err(err) => {
                targets.release(gpu);
                return Err(err).context("allocate sensor textures");
            }
        };
        let passes = match CorePasses::new(gpu) {
            Ok(p) => p,
            Err(err) => {
                sensors.release(gpu);
                targets.release(gpu);
                return Err(err);
            }
        };
        let compositor = match BlendCompositor::new(gpu) {
            Ok(c) => c,
            Err(err) => {
                passes.release(gpu);
                sensors.release(gpu);
                targets.release(gpu);
                return Err(err).context("load blend compositor");
            }
        };

        let mut effects = Vec::with_capacity(TransformEffectType::COUNT);
        let mut unavailable = Vec::new();
        for kind in TransformEffectType::ALL {
            match create_effect(kind, gpu, &config, width, height) {
                Ok(module) => effects.push(Some(module)),
                Err(err) => {
                    log::warn!("{}: unavailable: {err:#}", kind.id());
                    unavailable.push(kind);
                    effects.push(None);
                }
            }
        }
        log::info!(
            "pipeline ready at {width}x{height}: {} effects, {} unavailable",
            TransformEffectType::COUNT - unavailable.len(),
            unavailable.len()
        );

        let final_texture = targets.accumulator;
        Ok(Self {
            config,
            targets,
            sensors,
            passes,
            compositor,
            effects,
            unavailable,
            sims: simulation_slots(),
            drawables: Vec::new(),
            modulation: None,
            sources: ModSources::default(),
            capability,
            compute_warned: false,
            final_texture,
            profiler: Profiler::default(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Direct edits. Params with a modulation route are rewritten every
    /// frame; change their base through the engine instead.
    pub fn config_mut(&mut self) -> &mut EffectConfig {
        &mut self.config
    }

    /// Replaces the config wholesale; simulations pick it up next frame.
    pub fn set_config(&mut self, config: EffectConfig) {
        self.config = config;
        if let Some(engine) = self.modulation.as_mut() {
            engine.register_all(&self.config);
            engine.sync_bases(&self.config);
        }
    }

    pub fn set_effect_enabled(&mut self, kind: TransformEffectType, on: bool) {
        self.config.set_effect_enabled(kind, on);
    }

    pub fn load_preset(&mut self, preset: &Preset) {
        match self.modulation.as_mut() {
            Some(engine) => preset.apply(&mut self.config, engine),
            None => {
                self.config = preset.effects.clone();
                if !preset.modulation.routes.is_empty() {
                    let mut engine = ModulationEngine::new();
                    preset.apply(&mut self.config, &mut engine);
                    self.modulation = Some(engine);
                }
            }
        }
        log::info!("preset '{}' applied", preset.name);
    }

    pub fn capture_preset(&self, name: &str) -> Preset {
        match self.modulation.as_ref() {
            Some(engine) => Preset::capture(name, &self.config, engine),
            None => Preset {
                name: name.to_string(),
                effects: self.config.clone(),
                ..Preset::default()
            },
        }
    }

    /// Registers every param of the current config with `engine`.
    pub fn attach_modulation(&mut self, mut engine: ModulationEngine) {
        engine.register_all(&self.config);
        self.modulation = Some(engine);
    }

    /// Detaches the engine after restoring routed params to their bases.
    pub fn detach_modulation(&mut self) -> Option<ModulationEngine> {
        let mut engine = self.modulation.take()?;
        engine.write_base_values(&mut self.config);
        engine.clear_routes(&mut self.config);
        Some(engine)
    }

    pub fn modulation(&self) -> Option<&ModulationEngine> {
        self.modulation.as_ref()
    }

    /// The engine together with the config it writes into.
    pub fn modulation_mut(&mut self) -> Option<(&mut ModulationEngine, &mut EffectConfig)> {
        self.modulation.as_mut().map(|e| (e, &mut self.config))
    }

    /// Host-fed sources (bass/mid/treb, spectral features, custom values).
    pub fn sources_mut(&mut self) -> &mut ModSources {
        &mut self.sources
    }

    pub fn sources(&self) -> &ModSources {
        &self.sources
    }

    pub fn add_drawable(&mut self, layer: Box<dyn DrawableLayer>) {
        self.drawables.push(layer);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    pub fn accumulator(&self) -> TextureId {
        self.targets.accumulator
    }

    pub fn ping_pong(&self) -> [TextureId; 2] {
        self.targets.ping_pong
    }

    pub fn output_texture(&self) -> TextureId {
        self.targets.output
    }

    /// Presented surface of the last executed frame.
    pub fn final_texture(&self) -> TextureId {
        self.final_texture
    }

    pub fn fft_texture(&self) -> TextureId {
        self.sensors.fft
    }

    pub fn waveform_texture(&self) -> TextureId {
        self.sensors.waveform
    }

    /// Current FFT multiplier of the running-max normaliser.
    pub fn fft_scale(&self) -> f32 {
        self.sensors.normalizer.scale()
    }

    pub fn fft_normalizer(&self) -> &FftNormalizer {
        &self.sensors.normalizer
    }

    pub fn unavailable_effects(&self) -> &[TransformEffectType] {
        &self.unavailable
    }

    pub fn unavailable_simulations(&self) -> Vec<&'static str> {
        self.sims
            .iter()
            .filter(|s| s.failed())
            .map(|s| s.name())
            .collect()
    }

    pub fn capability(&self) -> &CapabilityReport {
        &self.capability
    }

    pub fn simulation_status(&self, name: &str) -> Option<SimulationStatus> {
        self.sims
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.status())
    }

    /// CPU time of each phase over recent frames.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn frame_count(&self) -> u32 {
        self.frame
    }

    /// Clears every pixel surface and reseeds running simulations.
    pub fn reset(&mut self, gpu: &mut dyn Gpu) {
        for t in self.targets.all() {
            gpu.clear_texture(t, [0.0; 4]);
        }
        for sim in &mut self.sims {
            sim.reset(gpu);
        }
    }

    /// Runs one frame and returns the presented texture.
    pub fn execute(&mut self, gpu: &mut dyn Gpu, input: &FrameInput<'_>) -> TextureId {
        let dt = input.dt.max(0.0);
        self.sensors.normalize_fft(input.fft);

        if let Some(engine) = self.modulation.as_mut() {
            self.sources.update_fft_bands(&self.sensors.normalized, dt);
            self.sources.set(ModSource::Beat, input.beat.clamp(0.0, 1.0));
            engine.update(dt, &mut self.sources, &mut self.config);
        }

        if let Err(err) = self.sensors.upload(gpu, input.waveform) {
            log::warn!("sensor upload failed: {err}");
        }
        self.passes.advance(&self.config, dt);

        let t = Instant::now();
        self.simulation_phase(gpu, dt, input.waveform_write_index);
        self.profiler.record(ProfileZone::Simulation, t.elapsed());

        let t = Instant::now();
        self.feedback_phase(gpu, dt);
        self.profiler.record(ProfileZone::Feedback, t.elapsed());

        let t = Instant::now();
        self.drawable_phase(gpu, dt);
        self.profiler.record(ProfileZone::Drawables, t.elapsed());

        let t = Instant::now();
        self.final_texture = self.output_phase(gpu, dt, input.waveform_write_index);
        self.profiler.record(ProfileZone::Output, t.elapsed());

        self.profiler.end_frame();
        self.frame = self.frame.wrapping_add(1);
        self.final_texture
    }

    fn simulation_phase(&mut self, gpu: &mut dyn Gpu, dt: f32, write_index: usize) {
        let frame = SimFrame {
            accum: self.targets.accumulator,
            fft: self.sensors.fft,
            waveform: self.sensors.waveform,
            waveform_write_index: write_index,
            frame: self.frame,
        };
        let (width, height) = self.size();
        for sim in &mut self.sims {
            if !sim.enabled(&self.config) {
                continue;
            }
            if !self.capability.compute {
                if !self.compute_warned {
                    log::warn!("{}: enabled but compute is unavailable", sim.name());
                    self.compute_warned = true;
                }
                continue;
            }
            if sim.ensure(gpu, &self.config, width, height) {
                sim.step(gpu, &self.config, dt, &frame);
            }
        }
    }

    fn feedback_phase(&mut self, gpu: &mut dyn Gpu, dt: f32) {
        let t = &self.targets;
        let res = [t.width as f32, t.height as f32];
        self.passes.setup_feedback(gpu, &self.config, dt, res);
        self.passes.setup_blur(gpu, &self.config, dt);
        let steps = [
            (CorePass::Feedback, t.accumulator, t.ping_pong[0]),
            (CorePass::BlurH, t.ping_pong[0], t.ping_pong[1]),
            (CorePass::BlurV, t.ping_pong[1], t.accumulator),
        ];
        for (pass, input, target) in steps {
            if let Err(err) = self.passes.draw(gpu, pass, input, target) {
                log::warn!("{pass:?} pass failed: {err}");
                return;
            }
        }
    }

    fn drawable_phase(&mut self, gpu: &mut dyn Gpu, dt: f32) {
        let ctx = DrawContext {
            dt,
            width: self.targets.width,
            height: self.targets.height,
            target: self.targets.accumulator,
            previous_output: self.targets.output,
            fft: self.sensors.fft,
            waveform: self.sensors.waveform,
        };
        for layer in &mut self.drawables {
            if let Err(err) = layer.draw(gpu, &ctx) {
                log::warn!("drawable '{}' failed: {err:#}", layer.name());
            }
        }
    }

    fn output_phase(&mut self, gpu: &mut dyn Gpu, dt: f32, write_index: usize) -> TextureId {
        let mut pp = PingPong::start(self.targets.accumulator, self.targets.ping_pong);

        for sim in &self.sims {
            let Some(trail) = sim.composite(&self.config) else {
                continue;
            };
            let result = self.compositor.apply(
                gpu,
                pp.source(),
                trail.texture,
                pp.target(),
                trail.intensity,
                trail.mode,
            );
            advance(&mut pp, result, sim.name());
        }

        self.passes.setup_output(gpu, &self.config);
        let result = self.passes.draw(gpu, CorePass::Chromatic, pp.source(), pp.target());
        advance(&mut pp, result, "chromatic");

        let frame = EffectFrame {
            dt,
            width: self.targets.width,
            height: self.targets.height,
            fft: self.sensors.fft,
            waveform: self.sensors.waveform,
            waveform_write_index: write_index,
        };
        let order = self.config.transform_order;
        for kind in order.iter() {
            if !self.config.is_active(kind) {
                continue;
            }
            let Some(module) = self.effects[kind.index()].as_mut() else {
                continue;
            };
            let result = run_transform(
                gpu,
                module.as_mut(),
                &self.config,
                &frame,
                &pp,
                &self.targets,
                &self.passes,
                &self.compositor,
            );
            advance(&mut pp, result, kind.id());
        }

        // Output-chain results never reach the accumulator.
        let snapshot = self
            .passes
            .draw(gpu, CorePass::Copy, pp.source(), self.targets.output);
        if let Err(err) = snapshot {
            log::warn!("output snapshot failed: {err}");
        }

        if self.config.clarity > 0.0 {
            let result = self.passes.draw(gpu, CorePass::Clarity, pp.source(), pp.target());
            advance(&mut pp, result, "clarity");
        }
        let result = self.passes.draw(gpu, CorePass::Fxaa, pp.source(), pp.target());
        advance(&mut pp, result, "fxaa");
        let result = self.passes.draw(gpu, CorePass::Gamma, pp.source(), pp.target());
        advance(&mut pp, result, "gamma");
        pp.source()
    }

    /// Reallocates every screen-sized surface. On failure the previous
    /// surfaces and size stay in place and `false` is returned.
    pub fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> bool {
        if (width, height) == self.size() {
            return true;
        }
        let fresh = match RenderTargets::new(gpu, width, height) {
            Ok(t) => t,
            Err(err) => {
                log::warn!("resize to {width}x{height} failed, keeping {:?}: {err:#}", self.size());
                return false;
            }
        };
        let old = std::mem::replace(&mut self.targets, fresh);
        old.release(gpu);
        self.final_texture = self.targets.accumulator;

        for kind in TransformEffectType::ALL {
            if !kind.flags().contains(EffectFlags::NEEDS_RESIZE) {
                continue;
            }
            let slot = &mut self.effects[kind.index()];
            let Some(module) = slot.as_mut() else {
                continue;
            };
            if let Err(err) = module.resize(gpu, width, height) {
                log::warn!("{}: resize failed, disabling: {err:#}", kind.id());
                if let Some(module) = slot.take() {
                    module.release(gpu);
                }
                self.unavailable.push(kind);
            }
        }
        for sim in &mut self.sims {
            if let Err(err) = sim.resize(gpu, width, height) {
                log::warn!("{}: resize failed: {err:#}", sim.name());
            }
        }
        log::info!("pipeline resized to {width}x{height}");
        true
    }

    /// Releases everything in reverse order of construction.
    pub fn release(self, gpu: &mut dyn Gpu) {
        for sim in self.sims.into_iter().rev() {
            sim.release(gpu);
        }
        for module in self.effects.into_iter().rev().flatten() {
            module.release(gpu);
        }
        self.compositor.release(gpu);
        self.passes.release(gpu);
        self.sensors.release(gpu);
        self.targets.release(gpu);
    }
}

fn advance(pp: &mut PingPong, result: Result<(), GpuError>, label: &str) {
    match result {
        Ok(()) => pp.swap(),
        Err(err) => log::warn!("{label} pass failed: {err}"),
    }
}

/// One transform from `pp.source()` into `pp.target()`.
///
/// Generators render to scratch and are blended over the source;
/// half-resolution effects go through the half-size pair.
#[allow(clippy::too_many_arguments)]
fn run_transform(
    gpu: &mut dyn Gpu,
    module: &mut dyn EffectModule,
    cfg: &EffectConfig,
    frame: &EffectFrame,
    pp: &PingPong,
    targets: &RenderTargets,
    passes: &CorePasses,
    compositor: &BlendCompositor,
) -> Result<(), GpuError> {
    let flags = module.kind().flags();
    if flags.contains(EffectFlags::BLEND) {
        module.setup(gpu, cfg, frame);
        module.render(gpu, pp.source(), targets.scratch)?;
        let (mode, intensity) = module.blend(cfg).unwrap_or_default();
        return compositor.apply(gpu, pp.source(), targets.scratch, pp.target(), intensity, mode);
    }
    if flags.contains(EffectFlags::HALF_RES) {
        let (width, height) = half_size(frame.width, frame.height);
        let half_frame = EffectFrame {
            width,
            height,
            ..*frame
        };
        module.setup(gpu, cfg, &half_frame);
        passes.draw(gpu, CorePass::Copy, pp.source(), targets.half[0])?;
        module.render(gpu, targets.half[0], targets.half[1])?;
        return passes.draw(gpu, CorePass::Copy, targets.half[1], pp.target());
    }
    module.setup(gpu, cfg, frame);
    module.render(gpu, pp.source(), pp.target())
}
