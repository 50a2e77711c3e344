use feedback_synth::audio::{FFT_BIN_COUNT, WAVEFORM_SIZE, band_bin_ranges};
use feedback_synth::config::ComputeMode;
use feedback_synth::effect_config::EffectConfig;
use feedback_synth::gpu::software::SoftwareGpu;
use feedback_synth::modulation::{
    LfoConfig, LfoWaveform, ModCurve, ModRoute, ModSource, ModSources, ModulationConfig,
    ModulationEngine, ModulationError,
};
use feedback_synth::pipeline::{FrameInput, PostEffect};
use std::f32::consts::TAU;

const DT: f32 = 1.0 / 60.0;

#[test]
fn band_route_swings_brightness_through_its_midpoint() {
    let mut gpu = SoftwareGpu::new();
    let mut p = PostEffect::new(&mut gpu, 32, 18, EffectConfig::default(), ComputeMode::Auto)
        .expect("pipeline init should succeed");
    p.attach_modulation(ModulationEngine::new());
    let (engine, _) = p.modulation_mut().expect("engine should be attached");
    engine
        .set_route(ModRoute::new("muons.brightness", ModSource::Band2, 1.0))
        .expect("route should bind");

    let (start, end) = band_bin_ranges(FFT_BIN_COUNT)[2];
    let wave = vec![0.0; WAVEFORM_SIZE];
    let mut samples = Vec::new();
    for frame in 0..180 {
        let t = frame as f32 * DT;
        let level = 0.5 - 0.5 * (TAU * t).cos();
        let mut fft = vec![0.0; FFT_BIN_COUNT];
        fft[start..end].fill(level);
        let input = FrameInput {
            dt: DT,
            fft: &fft,
            waveform: &wave,
            waveform_write_index: 0,
            beat: 0.0,
        };
        p.execute(&mut gpu, &input);
        samples.push(p.config().muons.brightness);
    }

    for &b in &samples {
        assert!((0.5..=3.0).contains(&b), "brightness {b} left its range");
    }
    let tail = &samples[60..];
    let crossings = tail
        .windows(2)
        .filter(|w| (w[0] - 1.75).signum() != (w[1] - 1.75).signum())
        .count();
    assert!(
        (3..=5).contains(&crossings),
        "expected ~4 midpoint crossings in 2s, got {crossings}"
    );
}

#[test]
fn max_amplitude_never_leaves_param_ranges() {
    let mut cfg = EffectConfig::default();
    let mut engine = ModulationEngine::new();
    engine.register_all(&cfg);
    let params = cfg.params();
    assert!(params.len() > 100, "every group should register params");

    let curves = ModCurve::ALL;
    for (i, info) in params.iter().enumerate() {
        let amount = if i % 2 == 0 { 1.0 } else { -1.0 };
        let route = ModRoute::new(&info.id, ModSource::Bass, amount).with_curve(curves[i % curves.len()]);
        engine.set_route(route).expect("registered param should accept a route");
    }

    let mut sources = ModSources::default();
    for extreme in [1.0, -1.0, 1e9, -1e9, f32::NAN] {
        sources.set(ModSource::Bass, extreme);
        engine.update(DT, &mut sources, &mut cfg);
        for info in &params {
            let v = cfg.get_param(&info.id).expect("registered param should read back");
            assert!(
                v >= info.min && v <= info.max,
                "{} = {v} outside [{}, {}] for source {extreme}",
                info.id,
                info.min,
                info.max
            );
        }
    }
}

#[test]
fn removing_a_route_restores_the_base() {
    let mut cfg = EffectConfig::default();
    let mut engine = ModulationEngine::new();
    engine.register_all(&cfg);
    let base = cfg.gamma;
    engine
        .set_route(ModRoute::new("effect.gamma", ModSource::Constant, 1.0))
        .expect("route should bind");

    engine.update(DT, &mut ModSources::default(), &mut cfg);
    assert_eq!(cfg.gamma, 2.5, "constant source at full depth pins the max");
    assert!((engine.get_offset("effect.gamma") - (2.5 - base)).abs() < 1e-6);

    assert!(engine.remove_route("effect.gamma", &mut cfg));
    assert_eq!(cfg.gamma, base);
    assert_eq!(engine.get_offset("effect.gamma"), 0.0);
    assert!(!engine.has_route("effect.gamma"));
}

#[test]
fn unregistered_params_are_rejected() {
    let mut engine = ModulationEngine::new();
    let err = engine
        .set_route(ModRoute::new("nope.value", ModSource::Mid, 1.0))
        .expect_err("unregistered param should fail");
    assert!(matches!(err, ModulationError::UnknownParam(_)));
}

#[test]
fn prefix_removal_clears_a_whole_effect() {
    let mut cfg = EffectConfig::default();
    let mut engine = ModulationEngine::new();
    engine.register_all(&cfg);
    for id in ["muons.brightness", "muons.exposure", "plasma.driftSpeed"] {
        engine
            .set_route(ModRoute::new(id, ModSource::Treb, 0.5))
            .expect("route should bind");
    }
    assert_eq!(engine.remove_routes_matching("muons.", &mut cfg), 2);
    assert_eq!(engine.routes().count(), 1);
    assert!(engine.has_route("plasma.driftSpeed"));
}

#[test]
fn global_lfo_drives_its_source() {
    let mut cfg = EffectConfig::default();
    let mut engine = ModulationEngine::new();
    engine.register_all(&cfg);
    engine.set_lfo(
        0,
        LfoConfig {
            enabled: true,
            rate: 1.0,
            waveform: LfoWaveform::Square,
        },
    );
    let mut sources = ModSources::default();
    engine.update(0.25, &mut sources, &mut cfg);
    assert_eq!(sources.get(ModSource::Lfo1), 1.0, "first half of a square is high");
    engine.update(0.5, &mut sources, &mut cfg);
    assert_eq!(sources.get(ModSource::Lfo1), -1.0, "second half is low");
    assert_eq!(sources.get(ModSource::Lfo2), 0.0, "disabled slots output zero");
}

#[test]
fn route_json_accepts_ids_and_legacy_indices() {
    let json = serde_json::json!({
        "routes": [
            {"paramId": "muons.brightness", "source": "band2", "amount": 0.5, "curve": "easeIn"},
            {"paramId": "effect.gamma", "source": ModSource::Beat.index(), "curve": 0},
            {"paramId": "effect.clarity", "source": "nonsense"},
        ]
    });
    let cfg: ModulationConfig = serde_json::from_value(json).expect("routes should parse");
    assert_eq!(cfg.routes.len(), 2, "unknown sources are skipped");
    assert_eq!(cfg.routes[0].source, ModSource::Band2);
    assert_eq!(cfg.routes[0].curve, ModCurve::EaseIn);
    assert_eq!(cfg.routes[1].source, ModSource::Beat);
    assert_eq!(cfg.routes[1].amount, 1.0, "amount defaults to full depth");

    let saved = serde_json::to_value(&cfg).expect("routes should serialize");
    assert_eq!(saved["routes"][1]["source"], "beat");
}
