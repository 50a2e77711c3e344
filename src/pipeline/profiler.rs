use std::time::Duration;

/// Samples kept per zone.
pub const PROFILE_HISTORY: usize = 64;
/// Weight of the newest sample in the smoothed value.
const SMOOTHING: f32 = 0.05;

/// CPU-timed phases of [`super::PostEffect::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileZone {
    Simulation,
    Feedback,
    Drawables,
    Output,
}

impl ProfileZone {
    pub const ALL: [Self; 4] = [Self::Simulation, Self::Feedback, Self::Drawables, Self::Output];

    pub fn name(self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Feedback => "feedback",
            Self::Drawables => "drawables",
            Self::Output => "output",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneTiming {
    pub last_ms: f32,
    pub smoothed_ms: f32,
    history: [f32; PROFILE_HISTORY],
    len: usize,
    pos: usize,
}

impl Default for ZoneTiming {
    fn default() -> Self {
        Self {
            last_ms: 0.0,
            smoothed_ms: 0.0,
            history: [0.0; PROFILE_HISTORY],
            len: 0,
            pos: 0,
        }
    }
}

impl ZoneTiming {
    fn push(&mut self, ms: f32) {
        let ms = ms.max(0.0);
        self.last_ms = ms;
        self.smoothed_ms = if self.len == 0 {
            ms
        } else {
            self.smoothed_ms + SMOOTHING * (ms - self.smoothed_ms)
        };
        self.history[self.pos] = ms;
        self.pos = (self.pos + 1) % PROFILE_HISTORY;
        if self.len < PROFILE_HISTORY {
            self.len += 1;
        }
    }

    /// Number of recorded samples, capped at [`PROFILE_HISTORY`].
    pub fn samples(&self) -> usize {
        self.len
    }

    /// Recorded samples, oldest first.
    pub fn history(&self) -> Vec<f32> {
        let start = if self.len < PROFILE_HISTORY { 0 } else { self.pos };
        (0..self.len)
            .map(|i| self.history[(start + i) % PROFILE_HISTORY])
            .collect()
    }

    pub fn max_ms(&self) -> f32 {
        self.history[..self.len].iter().copied().fold(0.0, f32::max)
    }
}

/// Per-zone timings with a rolling history.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    zones: [ZoneTiming; 4],
    frames: u64,
}

impl Profiler {
    pub fn record(&mut self, zone: ProfileZone, elapsed: Duration) {
        self.zones[zone as usize].push(elapsed.as_secs_f32() * 1000.0);
    }

    pub fn end_frame(&mut self) {
        self.frames += 1;
        log::trace!(
            "zones: sim {:.2} ms, feedback {:.2} ms, drawables {:.2} ms, output {:.2} ms",
            self.zone(ProfileZone::Simulation).last_ms,
            self.zone(ProfileZone::Feedback).last_ms,
            self.zone(ProfileZone::Drawables).last_ms,
            self.zone(ProfileZone::Output).last_ms
        );
    }

    pub fn zone(&self, zone: ProfileZone) -> &ZoneTiming {
        &self.zones[zone as usize]
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sum of the last sample of every zone.
    pub fn last_total_ms(&self) -> f32 {
        self.zones.iter().map(|z| z.last_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_wraps_and_keeps_order() {
        let mut p = Profiler::default();
        for i in 0..(PROFILE_HISTORY + 3) {
            p.record(ProfileZone::Output, Duration::from_millis(i as u64));
            p.end_frame();
        }
        let out = p.zone(ProfileZone::Output);
        assert_eq!(out.samples(), PROFILE_HISTORY);
        let h = out.history();
        assert_eq!(h.first().copied(), Some(3.0));
        assert_eq!(h.last().copied(), Some((PROFILE_HISTORY + 2) as f32));
        assert_eq!(out.max_ms(), (PROFILE_HISTORY + 2) as f32);
        assert_eq!(p.zone(ProfileZone::Feedback).samples(), 0);
        assert_eq!(p.frames(), (PROFILE_HISTORY + 3) as u64);
    }

    #[test]
    fn smoothing_starts_at_first_sample() {
        let mut p = Profiler::default();
        p.record(ProfileZone::Feedback, Duration::from_millis(10));
        assert!((p.zone(ProfileZone::Feedback).smoothed_ms - 10.0).abs() < 1e-4);
        p.record(ProfileZone::Feedback, Duration::from_millis(20));
        let s = p.zone(ProfileZone::Feedback).smoothed_ms;
        assert!(s > 10.0 && s < 20.0, "smoothed {s} should move toward the new sample");
    }
}
