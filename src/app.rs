//! Headless host: a synthetic sweep drives the analysers, the pipeline runs
//! on the software device, and per-frame statistics go to the log.

use crate::audio::{
    BandEnergies, BeatDetector, SAMPLE_RATE, SpectralFeatures, SpectrumAnalyzer, WaveformRing,
    sine_sweep,
};
use crate::config::Config;
use crate::effects::TransformEffectType;
use crate::gpu::software::SoftwareGpu;
use crate::gpu::{DrawBlend, Gpu};
use crate::lissajous::DualLissajousConfig;
use crate::modulation::{ModSources, ModulationEngine};
use crate::pipeline::{DrawContext, DrawableLayer, FrameInput, PostEffect, ProfileZone};
use crate::preset::Preset;
use anyhow::Context;
use std::path::Path;
use std::time::Instant;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let mut gpu = SoftwareGpu::new();
    let mut effect_config = crate::effect_config::EffectConfig::default();
    let mut startup_preset = None;
    if let Some(path) = cfg.preset.as_deref() {
        let preset = Preset::load(Path::new(path)).with_context(|| format!("load preset {path}"))?;
        effect_config = preset.effects.clone();
        startup_preset = Some(preset);
    }
    apply_enables(&mut effect_config, &cfg.enable);

    let mut pipeline = PostEffect::new(&mut gpu, cfg.width, cfg.height, effect_config, cfg.compute)
        .context("build pipeline")?;
    log::info!("compute: {}", pipeline.capability().status_label());

    let mut engine = ModulationEngine::new();
    for (slot, lfo) in &cfg.lfos {
        engine.set_lfo(*slot, *lfo);
    }
    pipeline.attach_modulation(engine);
    if let Some(preset) = startup_preset.as_ref() {
        pipeline.load_preset(preset);
        // Flags override what the preset enabled.
        apply_enables(pipeline.config_mut(), &cfg.enable);
    }
    if let Some((engine, _)) = pipeline.modulation_mut() {
        for route in &cfg.routes {
            if let Err(err) = engine.set_route(route.clone()) {
                log::warn!("route {}: {err}", route.param_id);
            }
        }
    }

    if cfg.orbit_dots > 0 {
        pipeline.add_drawable(Box::new(OrbitLayer::new(cfg.orbit_dots as usize)));
    }

    let mut feed = AudioFeed::new(cfg.sweep_start, cfg.sweep_end);
    let dt = 1.0 / cfg.fps.max(1) as f32;
    let mut stats = FrameStats::new();

    for frame in 0..cfg.frames {
        if cfg.trace && frame + 1 == cfg.frames {
            gpu.set_tracing(true);
        }
        feed.advance(dt);
        feed.publish(pipeline.sources_mut());

        let waveform = feed.ring.snapshot();
        let input = FrameInput {
            dt,
            fft: feed.analyzer.magnitudes(),
            waveform: &waveform,
            waveform_write_index: feed.ring.write_index(),
            beat: feed.beat.intensity(),
        };
        let start = Instant::now();
        let presented = pipeline.execute(&mut gpu, &input);
        stats.push(start.elapsed().as_secs_f32() * 1000.0);

        let luma = mean_luma(&gpu, presented);
        log::debug!(
            "frame {frame}: {:.2} ms, luma {luma:.4}, fft scale {:.3}, beat {:.2}",
            stats.last(),
            pipeline.fft_scale(),
            feed.beat.intensity()
        );
    }

    if cfg.trace {
        for pass in gpu.take_trace() {
            log::info!(
                "pass {}: reads {:?} writes {:?}{}",
                pass.label,
                pass.reads,
                pass.writes,
                if pass.aliases() { " ALIASED" } else { "" }
            );
        }
        gpu.set_tracing(false);
    }

    let (avg, p95, max) = stats.snapshot();
    log::info!(
        "{} frames at {}x{}: avg {avg:.2} ms, p95 {p95:.2} ms, max {max:.2} ms",
        cfg.frames,
        cfg.width,
        cfg.height
    );
    for zone in ProfileZone::ALL {
        let timing = pipeline.profiler().zone(zone);
        log::info!(
            "{}: {:.2} ms smoothed, {:.2} ms max",
            zone.name(),
            timing.smoothed_ms,
            timing.max_ms()
        );
    }
    let enabled: Vec<&str> = pipeline
        .config()
        .enabled_transforms()
        .map(TransformEffectType::id)
        .collect();
    log::info!("enabled transforms: {enabled:?}");
    for name in crate::effect_config::EffectConfig::SIMULATION_IDS {
        if let Some(status) = pipeline.simulation_status(name).filter(|s| s.running) {
            log::info!(
                "{name}: {} agents, trail {:?}",
                status.agent_count,
                status.trail_size
            );
        }
    }
    if !pipeline.unavailable_effects().is_empty() {
        log::warn!("unavailable effects: {:?}", pipeline.unavailable_effects());
    }

    if let Some(path) = cfg.save_preset.as_deref() {
        let path = Path::new(path);
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        pipeline
            .capture_preset(name)
            .save(path)
            .with_context(|| format!("save preset {}", path.display()))?;
        log::info!("saved preset to {}", path.display());
    }

    pipeline.release(&mut gpu);
    Ok(())
}

/// Enables transforms by effect id and simulations by group id.
fn apply_enables(cfg: &mut crate::effect_config::EffectConfig, ids: &[String]) {
    for id in ids {
        let id = id.trim();
        if let Some(kind) = TransformEffectType::parse(id) {
            cfg.set_effect_enabled(kind, true);
        } else if !cfg.set_simulation_enabled(id, true) {
            log::warn!("--enable: unknown effect or simulation '{id}'");
        }
    }
}

fn mean_luma(gpu: &dyn Gpu, texture: crate::gpu::TextureId) -> f32 {
    match gpu.read_texture(texture) {
        Ok(px) if !px.is_empty() => {
            let sum: f32 = px
                .iter()
                .map(|p| 0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2])
                .sum();
            sum / px.len() as f32
        }
        _ => 0.0,
    }
}

/// The synthetic input and every analyser that reads it.
struct AudioFeed {
    start_hz: f32,
    end_hz: f32,
    time: f32,
    analyzer: SpectrumAnalyzer,
    ring: WaveformRing,
    bands: BandEnergies,
    features: SpectralFeatures,
    beat: BeatDetector,
}

impl AudioFeed {
    const SWEEP_SECONDS: f32 = 8.0;

    fn new(start_hz: f32, end_hz: f32) -> Self {
        Self {
            start_hz: start_hz.max(1.0),
            end_hz: end_hz.max(start_hz.max(1.0) + 1.0),
            time: 0.0,
            analyzer: SpectrumAnalyzer::new(),
            ring: WaveformRing::new(),
            bands: BandEnergies::default(),
            features: SpectralFeatures::default(),
            beat: BeatDetector::default(),
        }
    }

    fn advance(&mut self, dt: f32) {
        let count = (SAMPLE_RATE as f32 * dt).round() as usize;
        let samples = sine_sweep(self.start_hz, self.end_hz, Self::SWEEP_SECONDS, self.time, count);
        self.time += dt;
        self.ring.push(&samples);
        let mags = self.analyzer.process(&samples);
        self.bands.process(mags, dt);
        self.features.process(mags, &samples, dt);
        self.beat.process(mags, dt);
    }

    fn publish(&self, sources: &mut ModSources) {
        sources.update_audio(&self.bands, self.beat.intensity(), &self.features);
    }
}

/// Dots orbiting the centre on a shared Lissajous path.
struct OrbitLayer {
    motion: DualLissajousConfig,
    count: usize,
}

impl OrbitLayer {
    fn new(count: usize) -> Self {
        Self {
            motion: DualLissajousConfig {
                amplitude: 0.08,
                motion_speed: 2.0,
                freq_x1: 0.7,
                freq_y1: 1.1,
                ..DualLissajousConfig::default()
            },
            count,
        }
    }
}

impl DrawableLayer for OrbitLayer {
    fn name(&self) -> &str {
        "orbit"
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, ctx: &DrawContext) -> anyhow::Result<()> {
        let (w, h) = (ctx.width as f32, ctx.height as f32);
        let size = (w.min(h) * 0.02).max(1.0);
        let points = self.motion.update_multi(ctx.dt, self.count, 0.25, (0.5, 0.5));
        for (i, (x, y)) in points.into_iter().enumerate() {
            let hue = i as f32 / self.count.max(1) as f32;
            let color = [0.5 + 0.5 * hue, 0.6, 1.0 - 0.5 * hue, 1.0];
            let rect = [x * w - size * 0.5, y * h - size * 0.5, size, size];
            gpu.fill_rect(ctx.target, rect, color, DrawBlend::Additive)?;
        }
        Ok(())
    }
}

/// Frame-time ring with average, 95th percentile and max.
struct FrameStats {
    vals: [f32; 256],
    len: usize,
    pos: usize,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            vals: [0.0; 256],
            len: 0,
            pos: 0,
        }
    }

    fn push(&mut self, v: f32) {
        self.vals[self.pos] = v.max(0.0);
        self.pos = (self.pos + 1) % self.vals.len();
        if self.len < self.vals.len() {
            self.len += 1;
        }
    }

    fn last(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        self.vals[(self.pos + self.vals.len() - 1) % self.vals.len()]
    }

    fn snapshot(&self) -> (f32, f32, f32) {
        if self.len == 0 {
            return (0.0, 0.0, 0.0);
        }
        let mut sorted = self.vals[..self.len].to_vec();
        sorted.sort_by(f32::total_cmp);
        let avg = sorted.iter().sum::<f32>() / self.len as f32;
        let p95 = sorted[((self.len - 1) as f32 * 0.95).round() as usize];
        (avg, p95, sorted[self.len - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_stats_report_percentiles() {
        let mut s = FrameStats::new();
        for v in 1..=100 {
            s.push(v as f32);
        }
        let (avg, p95, max) = s.snapshot();
        assert!((avg - 50.5).abs() < 1e-3);
        assert_eq!(p95, 95.0);
        assert_eq!(max, 100.0);
        assert_eq!(s.last(), 100.0);
    }

    #[test]
    fn enables_accept_effects_and_simulations() {
        let mut cfg = crate::effect_config::EffectConfig::default();
        apply_enables(
            &mut cfg,
            &["kaleidoscope".into(), "physarum".into(), "nope".into()],
        );
        assert!(cfg.is_enabled(TransformEffectType::Kaleidoscope));
        assert!(cfg.physarum.enabled);
    }
}
