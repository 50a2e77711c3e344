use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Two-harmonic Lissajous motion driven by a CPU-accumulated phase.
///
/// A secondary frequency of zero disables that harmonic. Incommensurate
/// frequencies give quasi-periodic paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DualLissajousConfig {
    pub amplitude: f32,
    pub motion_speed: f32,
    pub freq_x1: f32,
    pub freq_y1: f32,
    pub freq_x2: f32,
    pub freq_y2: f32,
    pub offset_x2: f32,
    pub offset_y2: f32,
    #[serde(skip)]
    pub phase: f32,
}

impl Default for DualLissajousConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.2,
            motion_speed: 1.0,
            freq_x1: 0.05,
            freq_y1: 0.08,
            freq_x2: 0.0,
            freq_y2: 0.0,
            offset_x2: 0.3,
            offset_y2: 3.48,
            phase: 0.0,
        }
    }
}

impl DualLissajousConfig {
    /// Advances the phase by `dt * motion_speed` and returns the offset.
    pub fn update(&mut self, dt: f32) -> (f32, f32) {
        self.phase += dt * self.motion_speed;
        self.offset_at(0.0)
    }

    /// Offset at the current phase, shifted by `source_offset` radians.
    pub fn offset_at(&self, source_offset: f32) -> (f32, f32) {
        let mut x = (self.phase * self.freq_x1 + source_offset).sin();
        let mut y = (self.phase * self.freq_y1 + source_offset).cos();
        if self.freq_x2 > 0.0 {
            x += (self.phase * self.freq_x2 + self.offset_x2 + source_offset).sin();
        }
        if self.freq_y2 > 0.0 {
            y += (self.phase * self.freq_y2 + self.offset_y2 + source_offset).cos();
        }
        let sx = if self.freq_x2 > 0.0 { 0.5 } else { 1.0 };
        let sy = if self.freq_y2 > 0.0 { 0.5 } else { 1.0 };
        (self.amplitude * x * sx, self.amplitude * y * sy)
    }

    /// Offset for a phase held by the caller.
    pub fn offset_for(&self, phase: f32) -> (f32, f32) {
        Self {
            phase,
            ..self.clone()
        }
        .offset_at(0.0)
    }

    /// `count` points on a circle of `radius` around `center`, each moving
    /// with the shared phase staggered by its index. The phase advances once.
    pub fn update_multi(
        &mut self,
        dt: f32,
        count: usize,
        radius: f32,
        center: (f32, f32),
    ) -> Vec<(f32, f32)> {
        self.phase += dt * self.motion_speed;
        (0..count)
            .map(|i| {
                let frac = i as f32 / count as f32;
                let angle = TAU * frac;
                let (ox, oy) = self.offset_at(frac * TAU);
                (
                    center.0 + radius * angle.cos() + ox,
                    center.1 + radius * angle.sin() + oy,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_bounds_offset() {
        let mut l = DualLissajousConfig {
            freq_x2: 0.3,
            freq_y2: 0.7,
            ..DualLissajousConfig::default()
        };
        for _ in 0..500 {
            let (x, y) = l.update(0.1);
            assert!(x.abs() <= l.amplitude + 1e-6 && y.abs() <= l.amplitude + 1e-6);
        }
    }

    #[test]
    fn multi_advances_phase_once() {
        let mut l = DualLissajousConfig::default();
        let pts = l.update_multi(0.5, 4, 0.25, (0.5, 0.5));
        assert_eq!(pts.len(), 4);
        assert!((l.phase - 0.5).abs() < 1e-6);
    }
}
