use crate::blend::EffectBlendMode;
use crate::effect_config::EffectConfig;
use crate::gpu::{DrawBlend, Gpu, TextureId};
use crate::sim::{
    AttractorFlow, Boids, ConfigChange, CurlAdvection, CurlFlow, Cymatics, ParticleLife, Physarum,
    SimFrame, Simulation, SimulationConfig,
};

/// Observable state of one simulation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationStatus {
    pub name: &'static str,
    pub running: bool,
    pub agent_count: usize,
    pub trail_size: (u32, u32),
    pub last_change: ConfigChange,
}

/// One trail to composite in the output chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrailComposite {
    pub texture: TextureId,
    pub intensity: f32,
    pub mode: EffectBlendMode,
}

/// Object-safe face of a [`Simulation`] and its config selector.
pub(crate) trait SimulationSlot {
    fn name(&self) -> &'static str;
    fn enabled(&self, cfg: &EffectConfig) -> bool;
    /// Constructs on first enable. Returns whether the simulation is live.
    fn ensure(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, width: u32, height: u32) -> bool;
    /// `ApplyConfig`, `Update`, `ProcessTrails`, then the optional debug overlay.
    fn step(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, dt: f32, frame: &SimFrame);
    fn composite(&self, cfg: &EffectConfig) -> Option<TrailComposite>;
    fn status(&self) -> SimulationStatus;
    fn failed(&self) -> bool;
    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()>;
    fn reset(&mut self, gpu: &mut dyn Gpu);
    fn release(self: Box<Self>, gpu: &mut dyn Gpu);
}

struct Slot<S: Simulation> {
    sim: Option<S>,
    select: fn(&EffectConfig) -> &S::Config,
    failed: bool,
    last_change: ConfigChange,
}

impl<S: Simulation + 'static> Slot<S> {
    fn boxed(select: fn(&EffectConfig) -> &S::Config) -> Box<dyn SimulationSlot> {
        Box::new(Self {
            sim: None,
            select,
            failed: false,
            last_change: ConfigChange::default(),
        })
    }
}

impl<S: Simulation + 'static> SimulationSlot for Slot<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn enabled(&self, cfg: &EffectConfig) -> bool {
        (self.select)(cfg).enabled()
    }

    fn ensure(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, width: u32, height: u32) -> bool {
        if self.sim.is_some() {
            return true;
        }
        if self.failed {
            return false;
        }
        match S::new(gpu, width, height, (self.select)(cfg)) {
            Ok(sim) => {
                log::info!("{}: started with {} agents", S::NAME, sim.agent_count());
                self.sim = Some(sim);
                true
            }
            Err(err) => {
                log::warn!("{}: unavailable: {err:#}", S::NAME);
                self.failed = true;
                false
            }
        }
    }

    fn step(&mut self, gpu: &mut dyn Gpu, cfg: &EffectConfig, dt: f32, frame: &SimFrame) {
        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        let sim_cfg = (self.select)(cfg);
        self.last_change = sim.apply_config(gpu, sim_cfg);
        if self.last_change.any() {
            log::debug!("{}: config change {:?}", S::NAME, self.last_change);
        }
        if let Err(err) = sim.update(gpu, dt, frame) {
            log::warn!("{}: update failed: {err}", S::NAME);
            return;
        }
        if let Err(err) = sim.process_trails(gpu, dt) {
            log::warn!("{}: trail processing failed: {err}", S::NAME);
            return;
        }
        if sim_cfg.debug_overlay() {
            let trail = sim.trail_map().texture();
            if let Err(err) = gpu.draw_texture(trail, frame.accum, DrawBlend::Additive) {
                log::warn!("{}: debug overlay failed: {err}", S::NAME);
            }
        }
    }

    fn composite(&self, cfg: &EffectConfig) -> Option<TrailComposite> {
        let sim = self.sim.as_ref()?;
        let sim_cfg = (self.select)(cfg);
        if !sim_cfg.enabled() || sim_cfg.boost_intensity() <= 0.0 {
            return None;
        }
        Some(TrailComposite {
            texture: sim.trail_map().texture(),
            intensity: sim_cfg.boost_intensity(),
            mode: sim_cfg.blend_mode(),
        })
    }

    fn status(&self) -> SimulationStatus {
        SimulationStatus {
            name: S::NAME,
            running: self.sim.is_some(),
            agent_count: self.sim.as_ref().map_or(0, S::agent_count),
            trail_size: self
                .sim
                .as_ref()
                .map_or((0, 0), |s| s.trail_map().size()),
            last_change: self.last_change,
        }
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        match self.sim.as_mut() {
            Some(sim) => sim.resize(gpu, width, height),
            None => Ok(()),
        }
    }

    fn reset(&mut self, gpu: &mut dyn Gpu) {
        if let Some(sim) = self.sim.as_mut() {
            sim.reset(gpu);
        }
    }

    fn release(self: Box<Self>, gpu: &mut dyn Gpu) {
        if let Some(sim) = self.sim {
            sim.release(gpu);
        }
    }
}

/// All simulations in their fixed per-frame order.
pub(crate) fn simulation_slots() -> Vec<Box<dyn SimulationSlot>> {
    vec![
        Slot::<Physarum>::boxed(|c| &c.physarum),
        Slot::<CurlFlow>::boxed(|c| &c.curl_flow),
        Slot::<CurlAdvection>::boxed(|c| &c.curl_advection),
        Slot::<AttractorFlow>::boxed(|c| &c.attractor_flow),
        Slot::<Boids>::boxed(|c| &c.boids),
        Slot::<ParticleLife>::boxed(|c| &c.particle_life),
        Slot::<Cymatics>::boxed(|c| &c.cymatics),
    ]
}
