//! Processing order of the output chain.
//!
//! Saved as an array of string ids. Loading accepts ids, display names and
//! legacy integer indices, skips unknown entries and duplicates, then
//! appends every missing effect in default order.

use crate::effects::TransformEffectType;
use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A permutation of every [`TransformEffectType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformOrderConfig {
    order: [TransformEffectType; TransformEffectType::COUNT],
}

impl Default for TransformOrderConfig {
    fn default() -> Self {
        Self {
            order: TransformEffectType::ALL,
        }
    }
}

impl TransformOrderConfig {
    /// Saved entries first, in saved order, then the rest in default order.
    pub fn merged<I>(saved: I) -> Self
    where
        I: IntoIterator<Item = TransformEffectType>,
    {
        let mut seen = [false; TransformEffectType::COUNT];
        let mut order = Vec::with_capacity(TransformEffectType::COUNT);
        let all = TransformEffectType::ALL;
        for t in saved.into_iter().chain(all) {
            if !seen[t.index()] {
                seen[t.index()] = true;
                order.push(t);
            }
        }
        // Every variant went through the chain, so the vec is full.
        let mut out = Self::default();
        out.order.copy_from_slice(&order);
        out
    }

    /// Parses one saved entry.
    pub fn parse_entry(v: &Value) -> Option<TransformEffectType> {
        match v {
            Value::String(s) => TransformEffectType::parse(s),
            Value::Number(n) => n.as_i64().and_then(TransformEffectType::from_legacy_index),
            _ => None,
        }
    }

    /// Lenient load; a non-array value yields the default order.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Array(items) => {
                let mut unknown = 0usize;
                let parsed: Vec<_> = items
                    .iter()
                    .filter_map(|item| {
                        let t = Self::parse_entry(item);
                        unknown += usize::from(t.is_none());
                        t
                    })
                    .collect();
                if unknown > 0 {
                    log::debug!("transform order: skipped {unknown} unknown entries");
                }
                Self::merged(parsed)
            }
            other => {
                log::warn!("transform order is not an array ({other}); using default");
                Self::default()
            }
        }
    }

    pub fn as_slice(&self) -> &[TransformEffectType] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = TransformEffectType> + '_ {
        self.order.iter().copied()
    }

    pub fn position(&self, kind: TransformEffectType) -> usize {
        self.order
            .iter()
            .position(|&t| t == kind)
            .unwrap_or(kind.index())
    }

    /// Moves `kind` to `index`, shifting the effects between.
    pub fn move_to(&mut self, kind: TransformEffectType, index: usize) {
        let from = self.position(kind);
        let to = index.min(TransformEffectType::COUNT - 1);
        if from < to {
            self.order[from..=to].rotate_left(1);
        } else if to < from {
            self.order[to..=from].rotate_right(1);
        }
    }

    pub fn move_to_end(&mut self, kind: TransformEffectType) {
        self.move_to(kind, TransformEffectType::COUNT - 1);
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        if a < self.order.len() && b < self.order.len() {
            self.order.swap(a, b);
        }
    }
}

impl Serialize for TransformOrderConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.order.len()))?;
        for t in &self.order {
            seq.serialize_element(t.id())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TransformOrderConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransformEffectType as T;

    #[test]
    fn move_keeps_a_permutation() {
        let mut o = TransformOrderConfig::default();
        o.move_to_end(T::Kaleidoscope);
        o.move_to(T::Nebula, 0);
        assert_eq!(o.as_slice()[0], T::Nebula);
        assert_eq!(o.as_slice()[T::COUNT - 1], T::Kaleidoscope);
        let mut sorted = o.as_slice().to_vec();
        sorted.sort();
        assert_eq!(sorted, T::ALL.to_vec());
    }

    #[test]
    fn non_array_loads_default() {
        let o = TransformOrderConfig::from_json(&serde_json::json!({"a": 1}));
        assert_eq!(o, TransformOrderConfig::default());
    }
}
