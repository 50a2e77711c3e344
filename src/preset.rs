//! Preset documents: effect config plus modulation routes and LFOs.
//!
//! A bare `EffectConfig` object is accepted on load and becomes a preset
//! with no routes.

use crate::effect_config::EffectConfig;
use crate::modulation::{LfoConfig, ModulationConfig, ModulationEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub name: String,
    pub effects: EffectConfig,
    pub modulation: ModulationConfig,
    pub lfos: Vec<LfoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    Io(String),
    Parse(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for PresetError {}

impl Preset {
    /// Snapshot of `cfg` with routed params at their base values.
    pub fn capture(name: &str, cfg: &EffectConfig, engine: &ModulationEngine) -> Self {
        let mut effects = cfg.clone();
        engine.write_base_values(&mut effects);
        Self {
            name: name.to_string(),
            effects,
            modulation: engine.to_config(),
            lfos: engine.lfo_configs(),
        }
    }

    /// Replaces `cfg` wholesale and rebinds `engine` to it.
    pub fn apply(&self, cfg: &mut EffectConfig, engine: &mut ModulationEngine) {
        engine.clear_routes(cfg);
        *cfg = self.effects.clone();
        engine.register_all(cfg);
        engine.sync_bases(cfg);
        for (slot, lfo) in self.lfos.iter().enumerate() {
            engine.set_lfo(slot, *lfo);
        }
        engine.apply_config(&self.modulation, cfg);
    }

    pub fn from_json(text: &str) -> Result<Self, PresetError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| PresetError::Parse(e.to_string()))?;
        if !value.is_object() {
            return Err(PresetError::Parse("preset must be a JSON object".to_string()));
        }
        let wrapped = value.get("effects").is_some_and(serde_json::Value::is_object);
        if wrapped {
            serde_json::from_value(value).map_err(|e| PresetError::Parse(e.to_string()))
        } else {
            let effects: EffectConfig =
                serde_json::from_value(value).map_err(|e| PresetError::Parse(e.to_string()))?;
            Ok(Self {
                effects,
                ..Self::default()
            })
        }
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        serde_json::to_string_pretty(self).map_err(|e| PresetError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let text = std::fs::read_to_string(path).map_err(|e| PresetError::Io(e.to_string()))?;
        let mut preset = Self::from_json(&text)?;
        if preset.name.is_empty() {
            preset.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        log::info!("loaded preset '{}' from {}", preset.name, path.display());
        Ok(preset)
    }

    /// Writes through a temp file so a failed save leaves the old file intact.
    pub fn save(&self, path: &Path) -> Result<(), PresetError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PresetError::Io(e.to_string()))?;
        }
        let body = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| PresetError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PresetError::Io(e.to_string()))
    }
}

/// `$XDG_CONFIG_HOME/feedback_synth/presets`, falling back to `~/.config`.
pub fn preset_directory() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("feedback_synth").join("presets"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedback_synth")
            .join("presets"),
    )
}
