//! Parameter modulation: sources, curves, LFOs and the engine that writes
//! modulated values back into an [`EffectConfig`](crate::effect_config::EffectConfig).

mod curves;
mod engine;
mod lfo;
mod sources;

pub use curves::ModCurve;
pub use engine::ModulationEngine;
pub use lfo::{LfoConfig, LfoState, LfoWaveform, NUM_LFOS, evaluate_waveform};
pub use sources::{ModSource, ModSources};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ModulationError {
    UnknownSource(String),
    UnknownCurve(String),
    UnknownParam(String),
}

impl fmt::Display for ModulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSource(id) => write!(f, "unknown modulation source '{id}'"),
            Self::UnknownCurve(id) => write!(f, "unknown modulation curve '{id}'"),
            Self::UnknownParam(id) => write!(f, "parameter '{id}' is not registered"),
        }
    }
}

impl std::error::Error for ModulationError {}

/// Wire form of sources and curves: string id, or a legacy integer index.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum IdOrIndex {
    Index(i64),
    Id(String),
}

/// One source bound to one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModRoute {
    pub param_id: String,
    pub source: ModSource,
    /// Blend from base (0) to the fully mapped source (1). Negative pulls the other way.
    #[serde(default = "default_amount")]
    pub amount: f32,
    #[serde(default)]
    pub curve: ModCurve,
    /// Oscillator for [`ModSource::RouteLfo`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lfo: Option<LfoConfig>,
}

fn default_amount() -> f32 {
    1.0
}

impl ModRoute {
    pub fn new(param_id: impl Into<String>, source: ModSource, amount: f32) -> Self {
        Self {
            param_id: param_id.into(),
            source,
            amount: amount.clamp(-1.0, 1.0),
            curve: ModCurve::Linear,
            lfo: None,
        }
    }

    pub fn with_curve(mut self, curve: ModCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_lfo(mut self, lfo: LfoConfig) -> Self {
        self.lfo = Some(lfo);
        self
    }
}

/// Routes as saved in a preset. Routes that fail to parse are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModulationConfigRepr")]
pub struct ModulationConfig {
    pub routes: Vec<ModRoute>,
}

#[derive(Deserialize)]
struct ModulationConfigRepr {
    #[serde(default)]
    routes: Vec<serde_json::Value>,
}

impl From<ModulationConfigRepr> for ModulationConfig {
    fn from(repr: ModulationConfigRepr) -> Self {
        let routes = repr
            .routes
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<ModRoute>(v) {
                Ok(route) => Some(route),
                Err(e) => {
                    log::warn!("skipping modulation route: {e}");
                    None
                }
            })
            .collect();
        Self { routes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_accept_ids_and_indices() {
        let cfg: ModulationConfig = serde_json::from_value(json!({
            "routes": [
                {"paramId": "muons.brightness", "source": "band2", "amount": 1.0, "curve": "easeIn"},
                {"paramId": "plasma.glowRadius", "source": 3, "curve": 2},
                {"paramId": "bad.source", "source": "nope"},
                {"paramId": "bad.curve", "source": "bass", "curve": 99}
            ]
        }))
        .expect("config should parse");
        assert_eq!(cfg.routes.len(), 2, "bad routes should be dropped");
        assert_eq!(cfg.routes[0].source, ModSource::Band2);
        assert_eq!(cfg.routes[0].curve, ModCurve::EaseIn);
        assert_eq!(cfg.routes[1].source, ModSource::Beat);
        assert_eq!(cfg.routes[1].curve, ModCurve::EaseOut);
        assert_eq!(cfg.routes[1].amount, 1.0);
    }

    #[test]
    fn routes_save_string_ids() {
        let route = ModRoute::new("muons.brightness", ModSource::Lfo3, 0.5).with_curve(ModCurve::Bounce);
        let v = serde_json::to_value(&route).expect("route should serialize");
        assert_eq!(v["source"], "lfo3");
        assert_eq!(v["curve"], "bounce");
        assert_eq!(v["paramId"], "muons.brightness");
        assert!(v.get("lfo").is_none());
    }
}
