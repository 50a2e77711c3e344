use feedback_synth::color::{ColorConfig, ColorMode, default_gradient};
use feedback_synth::effect_config::EffectConfig;
use feedback_synth::effects::TransformEffectType as T;
use feedback_synth::modulation::{ModRoute, ModSource, ModSources, ModulationEngine};
use feedback_synth::preset::Preset;
use feedback_synth::transform_order::TransformOrderConfig;
use serde_json::json;

fn round_trip(cfg: &EffectConfig) -> EffectConfig {
    let preset = Preset {
        name: "rt".into(),
        effects: cfg.clone(),
        ..Preset::default()
    };
    let text = preset.to_json().expect("save should succeed");
    Preset::from_json(&text)
        .expect("load should succeed")
        .effects
}

#[test]
fn reorder_survives_save_load_and_disable() {
    let mut cfg = EffectConfig::default();
    cfg.transform_order.move_to(T::Kifs, 0);
    cfg.transform_order.move_to(T::Kaleidoscope, 0);
    cfg.set_effect_enabled(T::Kaleidoscope, true);
    cfg.set_effect_enabled(T::Kifs, true);
    let original = cfg.transform_order;

    let loaded = round_trip(&cfg);
    let enabled: Vec<T> = loaded.enabled_transforms().collect();
    assert_eq!(enabled, vec![T::Kaleidoscope, T::Kifs]);
    assert_eq!(loaded.transform_order, original);

    let mut edited = loaded;
    edited.set_effect_enabled(T::Kaleidoscope, false);
    let reloaded = round_trip(&edited);
    assert!(!reloaded.is_enabled(T::Kaleidoscope));
    assert_eq!(
        reloaded.transform_order, original,
        "order must survive the enable flag"
    );
}

#[test]
fn arbitrary_order_round_trips() {
    let mut cfg = EffectConfig::default();
    for (i, kind) in T::ALL.iter().rev().enumerate() {
        cfg.transform_order.move_to(*kind, i);
    }
    assert_eq!(cfg.transform_order.as_slice()[0], T::ALL[T::COUNT - 1]);

    let loaded = round_trip(&cfg);
    assert_eq!(loaded.transform_order, cfg.transform_order);
    let mut sorted = loaded.transform_order.as_slice().to_vec();
    sorted.sort();
    assert_eq!(sorted, T::ALL.to_vec(), "each id appears exactly once");
}

#[test]
fn saved_order_is_emitted_as_string_ids() {
    let value = serde_json::to_value(EffectConfig::default()).expect("save should succeed");
    let order = value["transformOrder"]
        .as_array()
        .expect("transformOrder should be an array");
    assert_eq!(order.len(), T::COUNT);
    assert_eq!(order[0], T::ALL[0].id());
}

#[test]
fn partial_order_appends_omitted_in_default_order() {
    let saved = json!([
        T::Nebula.id(),
        15,
        "bogus",
        T::Toon.id(),
        T::Kifs.id(),
        3.5,
    ]);
    let order = TransformOrderConfig::from_json(&saved);
    let slice = order.as_slice();
    assert_eq!(slice.len(), T::COUNT);
    assert_eq!(&slice[..3], &[T::Nebula, T::Kifs, T::Toon], "saved entries lead, once each");

    let appended: Vec<T> = slice[3..].to_vec();
    let expected: Vec<T> = T::ALL
        .into_iter()
        .filter(|k| ![T::Nebula, T::Kifs, T::Toon].contains(k))
        .collect();
    assert_eq!(appended, expected, "omitted ids keep their default relative order");
}

#[test]
fn legacy_integer_order_maps_through_the_old_numbering() {
    // 33 was the last transform before a run of simulation boosts; 43 sits
    // after them.
    let order = TransformOrderConfig::from_json(&json!([33, 34, 43, 40, 57]));
    let slice = order.as_slice();
    assert_eq!(
        &slice[..3],
        &[T::Phyllotaxis, T::PencilSketch, T::RelativisticDoppler],
        "boost slots are skipped"
    );
    let expected: Vec<T> = T::ALL
        .into_iter()
        .filter(|k| ![T::Phyllotaxis, T::PencilSketch, T::RelativisticDoppler].contains(k))
        .collect();
    assert_eq!(slice[3..].to_vec(), expected);
}

#[test]
fn added_effects_round_trip_under_their_ids() {
    let mut cfg = EffectConfig::default();
    cfg.phyllotaxis.enabled = true;
    cfg.phyllotaxis.scale = 0.09;
    cfg.anamorphic_streak.enabled = true;
    cfg.anamorphic_streak.stretch = 0.4;
    cfg.moire_generator.enabled = true;
    cfg.moire_generator.layer2.frequency = 40.0;
    cfg.fireworks.enabled = true;
    cfg.fireworks.gravity = 1.5;

    let value = serde_json::to_value(&cfg).expect("save should succeed");
    for id in ["phyllotaxis", "anamorphicStreak", "moireGenerator", "fireworks"] {
        assert!(value.get(id).is_some(), "{id} should be saved under its id");
    }
    assert_eq!(value["moireGenerator"]["layer2"]["frequency"], 40.0);

    let back = round_trip(&cfg);
    assert_eq!(back.phyllotaxis, cfg.phyllotaxis);
    assert_eq!(back.anamorphic_streak, cfg.anamorphic_streak);
    assert_eq!(back.moire_generator, cfg.moire_generator);
    assert_eq!(back.fireworks, cfg.fireworks);
    assert!(back.is_enabled(T::Fireworks));
}

#[test]
fn gradient_stops_are_normalised_on_load() {
    let json = json!({
        "mode": 2,
        "gradientStopCount": 3,
        "gradientStops": [
            {"position": 0.9, "color": {"r": 255, "g": 0, "b": 0, "a": 255}},
            {"position": 0.2, "color": {"r": 0, "g": 255, "b": 0, "a": 255}},
            {"position": 0.5, "color": {"r": 0, "g": 0, "b": 255, "a": 255}},
        ]
    });
    let cfg: ColorConfig = serde_json::from_value(json).expect("colour should parse");
    assert_eq!(cfg.mode, ColorMode::Gradient);
    assert!(cfg.gradient.len() >= 2);
    for pair in cfg.gradient.windows(2) {
        assert!(pair[0].position <= pair[1].position, "stops must be sorted");
    }
    assert_eq!(cfg.gradient[0].position, 0.0);
    assert_eq!(cfg.gradient[cfg.gradient.len() - 1].position, 1.0);

    let lonely = json!({
        "mode": 2,
        "gradientStops": [{"position": 0.4, "color": {"r": 1, "g": 2, "b": 3, "a": 255}}]
    });
    let cfg: ColorConfig = serde_json::from_value(lonely).expect("colour should parse");
    assert_eq!(cfg.gradient, default_gradient(), "one stop falls back to the default");
}

#[test]
fn bare_config_loads_with_defaults_and_clamps() {
    let preset = Preset::from_json(r#"{"halfLife": 9.0, "gamma": 1.2, "mystery": true}"#)
        .expect("bare config should load");
    assert_eq!(preset.effects.half_life, 2.0, "out-of-range values are clamped");
    assert_eq!(preset.effects.gamma, 1.2);
    assert_eq!(preset.effects.blur_scale, EffectConfig::default().blur_scale);
    assert!(preset.modulation.routes.is_empty());

    assert!(Preset::from_json("[1, 2]").is_err(), "non-object must be rejected");
    assert!(Preset::from_json("{").is_err());
}

#[test]
fn disabled_effects_are_not_saved() {
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(T::Plasma, true);
    cfg.kaleidoscope.segments = 9;
    let value = serde_json::to_value(&cfg).expect("save should succeed");
    assert!(value.get("plasma").is_some());
    assert!(value.get("kaleidoscope").is_none(), "disabled effects are omitted");

    let loaded = round_trip(&cfg);
    assert_eq!(
        loaded.kaleidoscope.segments,
        EffectConfig::default().kaleidoscope.segments,
        "a disabled effect comes back with defaults"
    );
}

#[test]
fn capture_saves_base_values_and_routes() {
    let mut cfg = EffectConfig::default();
    cfg.set_effect_enabled(T::Muons, true);
    let mut engine = ModulationEngine::new();
    engine.register_all(&cfg);
    let base = cfg.muons.brightness;
    engine
        .set_route(ModRoute::new("muons.brightness", ModSource::Constant, 1.0))
        .expect("route should bind");
    engine.update(1.0 / 60.0, &mut ModSources::default(), &mut cfg);
    assert_eq!(cfg.muons.brightness, 3.0);

    let preset = Preset::capture("live", &cfg, &engine);
    assert_eq!(preset.effects.muons.brightness, base, "the base is saved, not the output");
    assert_eq!(preset.modulation.routes.len(), 1);

    let text = preset.to_json().expect("save should succeed");
    let loaded = Preset::from_json(&text).expect("load should succeed");
    let mut target = EffectConfig::default();
    let mut fresh = ModulationEngine::new();
    loaded.apply(&mut target, &mut fresh);
    assert!(fresh.has_route("muons.brightness"));
    assert_eq!(fresh.get_base("muons.brightness"), Some(base));
    assert!(target.is_enabled(T::Muons));
}

#[test]
fn file_save_and_load_use_the_stem_as_name() {
    let dir = std::env::temp_dir().join(format!("feedback_synth_presets_{}", std::process::id()));
    let path = dir.join("dusk.json");
    let mut cfg = EffectConfig::default();
    cfg.half_life = 1.25;
    let preset = Preset {
        effects: cfg,
        ..Preset::default()
    };
    preset.save(&path).expect("save should succeed");
    let loaded = Preset::load(&path).expect("load should succeed");
    assert_eq!(loaded.name, "dusk");
    assert_eq!(loaded.effects.half_life, 1.25);
    assert!(!path.with_extension("json.tmp").exists(), "temp file is renamed away");
    let _ = std::fs::remove_dir_all(&dir);
}
