use super::lfo::{LfoConfig, LfoState, NUM_LFOS};
use super::sources::{ModSource, ModSources};
use super::{ModRoute, ModulationConfig, ModulationError};
use crate::effect_config::EffectConfig;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParamEntry {
    min: f32,
    max: f32,
    base: f32,
}

#[derive(Debug, Clone)]
struct ActiveRoute {
    route: ModRoute,
    lfo: LfoState,
}

/// Registry of modulatable params keyed by dotted id (`"muons.brightness"`).
///
/// Routed params are rewritten every [`update`](Self::update) from their
/// base value; the config value of a routed param is therefore output,
/// and edits go through [`set_base`](Self::set_base).
#[derive(Debug, Clone)]
pub struct ModulationEngine {
    params: BTreeMap<String, ParamEntry>,
    routes: BTreeMap<String, ActiveRoute>,
    offsets: BTreeMap<String, f32>,
    lfos: [(LfoConfig, LfoState); NUM_LFOS],
}

impl Default for ModulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModulationEngine {
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
            routes: BTreeMap::new(),
            offsets: BTreeMap::new(),
            lfos: std::array::from_fn(|i| (LfoConfig::default(), LfoState::with_seed(i as u64 + 1))),
        }
    }

    /// Registers or re-ranges a param. An existing base is kept.
    pub fn register_param(&mut self, id: &str, min: f32, max: f32, base: f32) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        match self.params.get_mut(id) {
            Some(entry) => {
                entry.min = min;
                entry.max = max;
                entry.base = entry.base.clamp(min, max);
            }
            None => {
                self.params.insert(
                    id.to_string(),
                    ParamEntry {
                        min,
                        max,
                        base: base.clamp(min, max),
                    },
                );
            }
        }
    }

    /// Registers every param of `cfg` with its current value as base.
    pub fn register_all(&mut self, cfg: &EffectConfig) {
        for info in cfg.params() {
            let base = cfg.get_param(&info.id).unwrap_or(info.min);
            self.register_param(&info.id, info.min, info.max, base);
        }
        log::debug!("modulation: {} params registered", self.params.len());
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.params.contains_key(id)
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Adds or replaces the route of `route.param_id`.
    pub fn set_route(&mut self, route: ModRoute) -> Result<(), ModulationError> {
        if !self.params.contains_key(&route.param_id) {
            return Err(ModulationError::UnknownParam(route.param_id));
        }
        let seed = self.routes.len() as u64 + 101;
        let lfo = match self.routes.remove(&route.param_id) {
            Some(prev) => prev.lfo,
            None => LfoState::with_seed(seed),
        };
        self.routes.insert(route.param_id.clone(), ActiveRoute { route, lfo });
        Ok(())
    }

    /// Drops the route on `id` and restores its base value.
    pub fn remove_route(&mut self, id: &str, target: &mut EffectConfig) -> bool {
        if self.routes.remove(id).is_none() {
            return false;
        }
        self.offsets.remove(id);
        if let (Some(entry), Some(v)) = (self.params.get(id), target.get_param_mut(id)) {
            *v = entry.base;
        }
        true
    }

    pub fn remove_routes_matching(&mut self, prefix: &str, target: &mut EffectConfig) -> usize {
        let ids: Vec<String> = self
            .routes
            .keys()
            .filter(|id| id.starts_with(prefix))
            .cloned()
            .collect();
        for id in &ids {
            self.remove_route(id, target);
        }
        ids.len()
    }

    /// Unregisters every param under `prefix`, dropping its routes.
    pub fn remove_params_matching(&mut self, prefix: &str, target: &mut EffectConfig) -> usize {
        self.remove_routes_matching(prefix, target);
        let before = self.params.len();
        self.params.retain(|id, _| !id.starts_with(prefix));
        before - self.params.len()
    }

    pub fn has_route(&self, id: &str) -> bool {
        self.routes.contains_key(id)
    }

    pub fn get_route(&self, id: &str) -> Option<&ModRoute> {
        self.routes.get(id).map(|r| &r.route)
    }

    pub fn routes(&self) -> impl Iterator<Item = &ModRoute> {
        self.routes.values().map(|r| &r.route)
    }

    pub fn clear_routes(&mut self, target: &mut EffectConfig) {
        let ids: Vec<String> = self.routes.keys().cloned().collect();
        for id in &ids {
            self.remove_route(id, target);
        }
    }

    /// Offset from base written by the last update; 0 when unrouted.
    pub fn get_offset(&self, id: &str) -> f32 {
        self.offsets.get(id).copied().unwrap_or(0.0)
    }

    pub fn get_base(&self, id: &str) -> Option<f32> {
        self.params.get(id).map(|p| p.base)
    }

    pub fn get_bounds(&self, id: &str) -> Option<(f32, f32)> {
        self.params.get(id).map(|p| (p.min, p.max))
    }

    pub fn set_base(&mut self, id: &str, value: f32) -> bool {
        match self.params.get_mut(id) {
            Some(p) => {
                p.base = value.clamp(p.min, p.max);
                true
            }
            None => false,
        }
    }

    pub fn lfo(&self, slot: usize) -> Option<&LfoConfig> {
        self.lfos.get(slot).map(|(cfg, _)| cfg)
    }

    pub fn set_lfo(&mut self, slot: usize, cfg: LfoConfig) {
        if let Some((c, _)) = self.lfos.get_mut(slot) {
            *c = cfg;
        }
    }

    pub fn lfo_configs(&self) -> Vec<LfoConfig> {
        self.lfos.iter().map(|(cfg, _)| *cfg).collect()
    }

    /// Writes base values of routed params into `target`, e.g. before saving.
    pub fn write_base_values(&self, target: &mut EffectConfig) {
        for id in self.routes.keys() {
            if let (Some(entry), Some(v)) = (self.params.get(id), target.get_param_mut(id)) {
                *v = entry.base;
            }
        }
    }

    /// Takes every registered param's base from `target`, e.g. after loading.
    pub fn sync_bases(&mut self, target: &EffectConfig) {
        for (id, entry) in self.params.iter_mut() {
            if let Some(v) = target.get_param(id) {
                entry.base = v.clamp(entry.min, entry.max);
            }
        }
        self.offsets.clear();
    }

    /// Advances LFOs, then writes every routed param.
    pub fn update(&mut self, dt: f32, sources: &mut ModSources, target: &mut EffectConfig) {
        let mut outputs = [0.0; NUM_LFOS];
        for (out, (cfg, state)) in outputs.iter_mut().zip(self.lfos.iter_mut()) {
            *out = state.process(cfg, dt);
        }
        sources.set_lfos(&outputs);

        for (id, active) in self.routes.iter_mut() {
            let Some(entry) = self.params.get(id) else {
                continue;
            };
            let raw = match active.route.source {
                ModSource::RouteLfo => {
                    let cfg = active.route.lfo.unwrap_or(LfoConfig {
                        enabled: true,
                        ..LfoConfig::default()
                    });
                    active.lfo.process(&cfg, dt)
                }
                s => sources.get(s),
            };
            let value = modulate(entry, &active.route, raw);
            self.offsets.insert(id.clone(), value - entry.base);
            match target.get_param_mut(id) {
                Some(v) => *v = value,
                None => log::debug!("modulation: '{id}' has no field in this config"),
            }
        }
    }

    pub fn to_config(&self) -> ModulationConfig {
        ModulationConfig {
            routes: self.routes().cloned().collect(),
        }
    }

    /// Replaces all routes. Routes naming unknown params are skipped.
    pub fn apply_config(&mut self, cfg: &ModulationConfig, target: &mut EffectConfig) {
        self.clear_routes(target);
        for route in &cfg.routes {
            if let Err(e) = self.set_route(route.clone()) {
                log::warn!("modulation: {e}");
            }
        }
    }
}

/// `lerp(base, curved * span + min, amount)`, clamped to the param range.
fn modulate(entry: &ParamEntry, route: &ModRoute, raw: f32) -> f32 {
    let curved = route.curve.apply(raw);
    let mapped = curved * (entry.max - entry.min) + entry.min;
    let blended = entry.base + (mapped - entry.base) * route.amount;
    if blended.is_finite() {
        blended.clamp(entry.min, entry.max)
    } else {
        entry.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_depth_maps_source_onto_range() {
        let entry = ParamEntry {
            min: 0.5,
            max: 3.0,
            base: 1.0,
        };
        let route = ModRoute::new("muons.brightness", ModSource::Band2, 1.0);
        assert!((modulate(&entry, &route, 0.0) - 0.5).abs() < 1e-6);
        assert!((modulate(&entry, &route, 0.5) - 1.75).abs() < 1e-6);
        assert!((modulate(&entry, &route, 1.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_depth_holds_base() {
        let entry = ParamEntry {
            min: 0.0,
            max: 1.0,
            base: 0.3,
        };
        let route = ModRoute::new("x.y", ModSource::Constant, 0.0);
        assert_eq!(modulate(&entry, &route, 1.0), 0.3);
    }
}
