use serde::{Deserialize, Serialize};

/// Global LFO slots addressable as `lfo1`..`lfo8`.
pub const NUM_LFOS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
    SampleHold,
    SmoothRandom,
}

impl From<i32> for LfoWaveform {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Triangle,
            2 => Self::Sawtooth,
            3 => Self::Square,
            4 => Self::SampleHold,
            5 => Self::SmoothRandom,
            _ => Self::Sine,
        }
    }
}

impl From<LfoWaveform> for i32 {
    fn from(w: LfoWaveform) -> i32 {
        w as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LfoConfig {
    pub enabled: bool,
    /// Cycles per second.
    pub rate: f32,
    pub waveform: LfoWaveform,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.1,
            waveform: LfoWaveform::Sine,
        }
    }
}

/// Phase and random holds of one oscillator. Output is bipolar.
#[derive(Debug, Clone)]
pub struct LfoState {
    phase: f32,
    output: f32,
    held: f32,
    prev_held: f32,
    rng: fastrand::Rng,
}

impl Default for LfoState {
    fn default() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }
}

impl LfoState {
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(mut rng: fastrand::Rng) -> Self {
        let held = bipolar(&mut rng);
        let prev_held = bipolar(&mut rng);
        Self {
            phase: 0.0,
            output: 0.0,
            held,
            prev_held,
            rng,
        }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    /// Advances by `rate * dt`; random holds refresh on every wrap.
    pub fn process(&mut self, cfg: &LfoConfig, dt: f32) -> f32 {
        if !cfg.enabled {
            self.output = 0.0;
            return 0.0;
        }
        self.phase += cfg.rate * dt;
        if self.phase >= 1.0 {
            self.phase = self.phase.fract();
            self.prev_held = self.held;
            self.held = bipolar(&mut self.rng);
        }
        self.output = match cfg.waveform {
            LfoWaveform::SampleHold => self.held,
            LfoWaveform::SmoothRandom => self.prev_held + (self.held - self.prev_held) * self.phase,
            w => evaluate_waveform(w, self.phase),
        };
        self.output
    }
}

/// Deterministic shapes at `phase` in [0, 1). Random shapes evaluate to 0.
pub fn evaluate_waveform(waveform: LfoWaveform, phase: f32) -> f32 {
    match waveform {
        LfoWaveform::Sine => (phase * std::f32::consts::TAU).sin(),
        LfoWaveform::Triangle if phase < 0.5 => phase * 4.0 - 1.0,
        LfoWaveform::Triangle => 3.0 - phase * 4.0,
        LfoWaveform::Sawtooth => phase * 2.0 - 1.0,
        LfoWaveform::Square if phase < 0.5 => 1.0,
        LfoWaveform::Square => -1.0,
        LfoWaveform::SampleHold | LfoWaveform::SmoothRandom => 0.0,
    }
}

fn bipolar(rng: &mut fastrand::Rng) -> f32 {
    rng.f32() * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_lfo_is_silent() {
        let mut s = LfoState::with_seed(7);
        let cfg = LfoConfig::default();
        assert_eq!(s.process(&cfg, 0.5), 0.0);
        assert_eq!(s.phase(), 0.0);
    }

    #[test]
    fn sample_hold_changes_only_on_wrap() {
        let cfg = LfoConfig {
            enabled: true,
            rate: 1.0,
            waveform: LfoWaveform::SampleHold,
        };
        let mut s = LfoState::with_seed(3);
        let first = s.process(&cfg, 0.3);
        assert_eq!(s.process(&cfg, 0.3), first);
        s.process(&cfg, 0.5);
        assert!(s.phase() < 0.2, "phase should have wrapped");
        for _ in 0..50 {
            let v = s.process(&cfg, 0.37);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn triangle_peaks_mid_cycle() {
        assert_eq!(evaluate_waveform(LfoWaveform::Triangle, 0.0), -1.0);
        assert_eq!(evaluate_waveform(LfoWaveform::Triangle, 0.5), 1.0);
        assert_eq!(evaluate_waveform(LfoWaveform::Sawtooth, 0.75), 0.5);
    }
}
