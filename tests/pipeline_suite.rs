use feedback_synth::audio::{FFT_BIN_COUNT, WAVEFORM_SIZE};
use feedback_synth::config::ComputeMode;
use feedback_synth::effect_config::EffectConfig;
use feedback_synth::effects::TransformEffectType;
use feedback_synth::gpu::software::SoftwareGpu;
use feedback_synth::gpu::{Gpu, TextureId};
use feedback_synth::pipeline::{DrawContext, DrawableLayer, FrameInput, PostEffect, ProfileZone};
use feedback_synth::sim::decay_factor;

const DT: f32 = 1.0 / 60.0;

fn pipeline(gpu: &mut SoftwareGpu, w: u32, h: u32, cfg: EffectConfig) -> PostEffect {
    PostEffect::new(gpu, w, h, cfg, ComputeMode::Auto).expect("pipeline init should succeed")
}

fn run_frames(p: &mut PostEffect, gpu: &mut SoftwareGpu, frames: usize) {
    let fft = vec![0.0; FFT_BIN_COUNT];
    let wave = vec![0.0; WAVEFORM_SIZE];
    for _ in 0..frames {
        let input = FrameInput {
            dt: DT,
            fft: &fft,
            waveform: &wave,
            waveform_write_index: 0,
            beat: 0.0,
        };
        p.execute(gpu, &input);
    }
}

fn max_channel(gpu: &SoftwareGpu, t: TextureId) -> f32 {
    gpu.read_texture(t)
        .expect("readback should succeed")
        .iter()
        .flat_map(|p| [p[0], p[1], p[2]])
        .fold(0.0, f32::max)
}

#[test]
fn blank_preset_stays_black() {
    let mut gpu = SoftwareGpu::new();
    let mut p = pipeline(&mut gpu, 64, 36, EffectConfig::default());
    run_frames(&mut p, &mut gpu, 120);

    assert!(p.unavailable_effects().is_empty(), "no program should fail to load");
    assert_eq!(max_channel(&gpu, p.accumulator()), 0.0, "accumulator must stay black");
    for t in p.ping_pong() {
        assert_eq!(max_channel(&gpu, t), 0.0, "ping-pong surfaces must stay black");
    }
    assert_eq!(max_channel(&gpu, p.final_texture()), 0.0);
    assert_eq!(p.fft_scale(), 0.0, "silence keeps the fft scale at zero");
}

#[test]
fn generator_output_stays_out_of_the_feedback_loop() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::Plasma, true);
    let mut p = pipeline(&mut gpu, 96, 54, cfg);
    run_frames(&mut p, &mut gpu, 30);

    let pixels = gpu.read_texture(p.output_texture()).expect("readback should succeed");
    let lit = pixels.iter().filter(|px| px[0] + px[1] + px[2] > 0.0).count();
    assert!(lit > 0, "plasma should light the snapshot");
    assert!(
        pixels
            .iter()
            .all(|px| px[..3].iter().all(|c| c.is_finite() && *c >= 0.0)),
        "plasma output must be finite and non-negative"
    );
    assert_eq!(
        max_channel(&gpu, p.accumulator()),
        0.0,
        "transforms must not feed the accumulator"
    );
}

#[test]
fn trail_composites_stay_out_of_the_accumulator() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.physarum.enabled = true;
    cfg.physarum.agent_count = 2000;
    cfg.physarum.boost_intensity = 1.0;
    let mut p = pipeline(&mut gpu, 64, 36, cfg);

    for frame in 0..3 {
        run_frames(&mut p, &mut gpu, 1);
        assert_eq!(
            max_channel(&gpu, p.accumulator()),
            0.0,
            "frame {frame}: trails are composited during output only"
        );
    }
    assert!(max_channel(&gpu, p.final_texture()) > 0.0, "trails should reach the screen");
}

#[test]
fn drawn_content_decays_by_half_life() {
    let mut gpu = SoftwareGpu::new();
    let mut p = pipeline(&mut gpu, 96, 54, EffectConfig::default());
    p.config_mut().half_life = 0.1;
    p.add_drawable(Box::new(Stamp { frames_left: 1 }));
    run_frames(&mut p, &mut gpu, 1);

    let before = max_channel(&gpu, p.accumulator());
    assert!(before > 0.0, "the stamp should land in the accumulator");
    run_frames(&mut p, &mut gpu, 10);
    let after = max_channel(&gpu, p.accumulator());

    let bound = decay_factor(DT, 0.1).powi(10);
    assert!((bound - 0.317).abs() < 0.01, "ten frames at 0.1s half-life keep ~31.7%");
    assert!(
        after <= before * bound + 1e-4,
        "max channel {after} should fall below {bound} of {before}"
    );
}

#[test]
fn no_pass_reads_its_own_target() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    for kind in [
        TransformEffectType::Plasma,
        TransformEffectType::Kaleidoscope,
        TransformEffectType::Watercolor,
        TransformEffectType::Bloom,
        TransformEffectType::Toon,
    ] {
        cfg.set_effect_enabled(kind, true);
    }
    cfg.physarum.enabled = true;
    cfg.physarum.agent_count = 2000;
    cfg.clarity = 0.5;
    cfg.chromatic_offset = 4.0;
    let mut p = pipeline(&mut gpu, 64, 36, cfg);
    run_frames(&mut p, &mut gpu, 2);

    gpu.set_tracing(true);
    run_frames(&mut p, &mut gpu, 1);
    let trace = gpu.take_trace();
    assert!(trace.len() > 10, "a full frame should record many passes");
    for pass in &trace {
        assert!(!pass.aliases(), "pass {} reads its own target", pass.label);
    }
}

#[test]
fn resize_keeps_simulation_agents_and_matches_trail_size() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.physarum.enabled = true;
    let agents = cfg.physarum.agent_count as usize;
    let mut p = pipeline(&mut gpu, 1280, 720, cfg);

    run_frames(&mut p, &mut gpu, 30);
    assert!(p.resize(&mut gpu, 1920, 1080), "growing should succeed");
    run_frames(&mut p, &mut gpu, 30);
    assert!(p.resize(&mut gpu, 1280, 720), "shrinking should succeed");
    run_frames(&mut p, &mut gpu, 1);

    let status = p
        .simulation_status("physarum")
        .expect("physarum status should exist");
    assert!(status.running);
    assert_eq!(status.agent_count, agents, "agent count must match config");
    assert_eq!(status.trail_size, p.size(), "trail map must follow the window");
    assert_eq!(
        gpu.texture_size(p.accumulator()),
        Some((1280, 720)),
        "accumulator must follow the window"
    );
}

#[test]
fn failed_resize_keeps_previous_size() {
    let mut gpu = SoftwareGpu::new();
    let mut p = pipeline(&mut gpu, 64, 36, EffectConfig::default());
    let live = gpu.live_textures();
    gpu.set_allocation_limit(Some(100 * 100));

    assert!(!p.resize(&mut gpu, 200, 200), "oversized resize should fail");
    assert_eq!(p.size(), (64, 36));
    assert_eq!(gpu.live_textures(), live, "partial allocations must be freed");
    run_frames(&mut p, &mut gpu, 2);
    assert_eq!(gpu.texture_size(p.final_texture()), Some((64, 36)));
}

#[test]
fn broken_shader_only_disables_its_effect() {
    let mut gpu = SoftwareGpu::new();
    gpu.fail_shader("shaders/kifs.fs");
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::Kifs, true);
    cfg.set_effect_enabled(TransformEffectType::Kaleidoscope, true);
    let mut p = pipeline(&mut gpu, 48, 27, cfg);

    assert_eq!(p.unavailable_effects(), &[TransformEffectType::Kifs]);
    gpu.set_tracing(true);
    run_frames(&mut p, &mut gpu, 1);
    let programs: Vec<String> = gpu
        .take_trace()
        .iter()
        .filter_map(|r| r.program.and_then(|id| gpu.program_path(id)).map(str::to_string))
        .collect();
    assert!(programs.iter().any(|p| p == "shaders/kaleidoscope.fs"));
    assert!(!programs.iter().any(|p| p == "shaders/kifs.fs"));
}

#[test]
fn generator_without_blend_intensity_adds_no_pass() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::Plasma, true);
    cfg.set_effect_enabled(TransformEffectType::Kaleidoscope, true);
    cfg.plasma.blend_intensity = 0.0;
    assert!(cfg.is_enabled(TransformEffectType::Plasma));
    assert!(!cfg.is_active(TransformEffectType::Plasma));
    assert!(cfg.is_active(TransformEffectType::Kaleidoscope));
    let mut p = pipeline(&mut gpu, 48, 27, cfg);

    gpu.set_tracing(true);
    run_frames(&mut p, &mut gpu, 1);
    let programs: Vec<String> = gpu
        .take_trace()
        .iter()
        .filter_map(|r| r.program.and_then(|id| gpu.program_path(id)).map(str::to_string))
        .collect();
    assert!(programs.iter().any(|p| p == "shaders/kaleidoscope.fs"));
    assert!(
        !programs.iter().any(|p| p == "shaders/plasma.fs"),
        "a zero-intensity generator must not render"
    );
    assert_eq!(max_channel(&gpu, p.final_texture()), 0.0);
}

#[test]
fn every_profile_zone_is_timed_each_frame() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::Plasma, true);
    let mut p = pipeline(&mut gpu, 32, 18, cfg);
    assert_eq!(p.profiler().frames(), 0);

    run_frames(&mut p, &mut gpu, 1);
    assert_eq!(p.profiler().frames(), 1);
    for zone in ProfileZone::ALL {
        let timing = p.profiler().zone(zone);
        assert_eq!(timing.samples(), 1, "{} should be recorded once", zone.name());
        assert!(timing.last_ms.is_finite() && timing.last_ms >= 0.0);
    }

    run_frames(&mut p, &mut gpu, 2);
    assert_eq!(p.profiler().frames(), 3);
    for zone in ProfileZone::ALL {
        assert_eq!(p.profiler().zone(zone).history().len(), 3);
    }
}

#[test]
fn every_effect_builds_runs_and_releases() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    for kind in TransformEffectType::ALL {
        cfg.set_effect_enabled(kind, true);
    }
    let mut p = pipeline(&mut gpu, 32, 18, cfg);
    assert!(p.unavailable_effects().is_empty(), "every effect should load");

    gpu.set_tracing(true);
    run_frames(&mut p, &mut gpu, 2);
    for pass in gpu.take_trace() {
        assert!(!pass.aliases(), "pass {} reads its own target", pass.label);
    }
    assert!(p.resize(&mut gpu, 40, 24), "resize with every effect should succeed");
    run_frames(&mut p, &mut gpu, 1);
    assert!(
        gpu.read_texture(p.final_texture())
            .expect("readback should succeed")
            .iter()
            .all(|px| px.iter().all(|c| c.is_finite())),
        "the full chain must stay finite"
    );
    p.release(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.live_programs(), 0);
}

#[test]
fn anamorphic_streak_brightens_and_survives_resize() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::AnamorphicStreak, true);
    cfg.anamorphic_streak.threshold = 0.2;
    let mut p = pipeline(&mut gpu, 64, 36, cfg);
    p.add_drawable(Box::new(Stamp { frames_left: usize::MAX }));
    run_frames(&mut p, &mut gpu, 1);
    let lit = max_channel(&gpu, p.final_texture());
    assert!(lit > 0.5, "streak should add over the 0.5 stamp, got {lit}");

    assert!(p.resize(&mut gpu, 96, 54), "resize should succeed");
    run_frames(&mut p, &mut gpu, 1);
    assert_eq!(gpu.texture_size(p.final_texture()), Some((96, 54)));
    assert!(max_channel(&gpu, p.final_texture()) > 0.5);
}

#[test]
fn fireworks_accumulate_trails_through_the_blend_path() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(TransformEffectType::Fireworks, true);
    cfg.fireworks.base_bright = 1.0;
    cfg.fireworks.particle_size = 0.03;
    let mut p = pipeline(&mut gpu, 64, 36, cfg);

    gpu.set_tracing(true);
    run_frames(&mut p, &mut gpu, 3);
    let baseline = gpu.live_textures();
    let programs: Vec<String> = gpu
        .take_trace()
        .iter()
        .filter_map(|r| r.program.and_then(|id| gpu.program_path(id)).map(str::to_string))
        .collect();
    assert!(programs.iter().any(|p| p == "shaders/fireworks.fs"));
    assert!(programs.iter().any(|p| p == "shaders/effect_blend.fs"), "generators composite");
    assert!(max_channel(&gpu, p.final_texture()) > 0.0, "bursts should light the screen");
    assert_eq!(
        max_channel(&gpu, p.accumulator()),
        0.0,
        "fireworks stay out of the feedback loop"
    );

    assert!(p.resize(&mut gpu, 80, 45), "resize should succeed");
    assert_eq!(gpu.live_textures(), baseline, "trail pair is replaced, not leaked");
    run_frames(&mut p, &mut gpu, 1);
    assert!(max_channel(&gpu, p.final_texture()) > 0.0);
}

#[test]
fn missing_compute_skips_simulations_only() {
    let mut gpu = SoftwareGpu::new();
    gpu.set_compute_supported(false);
    let mut cfg = EffectConfig::default();
    cfg.physarum.enabled = true;
    cfg.set_effect_enabled(TransformEffectType::SolidColor, true);
    let mut p = PostEffect::new(&mut gpu, 32, 18, cfg, ComputeMode::Enabled)
        .expect("pipeline init should succeed");

    assert!(!p.capability().compute);
    assert!(p.capability().changed(), "forced compute should record a fallback");
    run_frames(&mut p, &mut gpu, 3);
    let status = p
        .simulation_status("physarum")
        .expect("physarum status should exist");
    assert!(!status.running, "physarum must not start without compute");
    assert!(max_channel(&gpu, p.final_texture()) > 0.0, "generators keep running");
}

/// Fills the whole target with mid grey for a limited number of frames.
struct Stamp {
    frames_left: usize,
}

impl DrawableLayer for Stamp {
    fn name(&self) -> &str {
        "stamp"
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, ctx: &DrawContext) -> anyhow::Result<()> {
        if self.frames_left == 0 {
            return Ok(());
        }
        self.frames_left -= 1;
        gpu.fill_rect(
            ctx.target,
            [0.0, 0.0, ctx.width as f32, ctx.height as f32],
            [0.5, 0.5, 0.5, 1.0],
            feedback_synth::gpu::DrawBlend::Replace,
        )?;
        Ok(())
    }
}

#[test]
fn drawables_land_in_the_accumulator_and_the_snapshot() {
    let mut gpu = SoftwareGpu::new();
    let mut p = pipeline(&mut gpu, 32, 18, EffectConfig::default());
    p.add_drawable(Box::new(Stamp { frames_left: usize::MAX }));
    run_frames(&mut p, &mut gpu, 1);

    let acc = max_channel(&gpu, p.accumulator());
    assert!((acc - 0.5).abs() < 1e-3, "drawables render into the accumulator, got {acc}");
    let out = max_channel(&gpu, p.output_texture());
    assert!((out - 0.5).abs() < 1e-3, "snapshot should hold the drawable, got {out}");
}

#[test]
fn release_frees_every_surface() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = EffectConfig::default();
    cfg.boids.enabled = true;
    cfg.boids.agent_count = 500;
    let mut p = pipeline(&mut gpu, 32, 18, cfg);
    run_frames(&mut p, &mut gpu, 2);
    p.release(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.live_buffers(), 0);
    assert_eq!(gpu.live_programs(), 0);
}
