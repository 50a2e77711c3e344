//! Host-side audio analysis that feeds the pipeline and modulation sources.
//!
//! None of this runs inside the pipeline: a host turns captured samples into
//! FFT magnitudes and a waveform ring, then hands both to
//! [`crate::pipeline::PostEffect::execute`].

use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Observer as _, RingBuffer as _};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const SAMPLE_RATE: u32 = 48_000;
pub const FFT_SIZE: usize = 2048;
pub const FFT_BIN_COUNT: usize = FFT_SIZE / 2 + 1;
pub const WAVEFORM_SIZE: usize = 2048;

/// Edges of the eight FFT bands exposed as `band0`..`band7`.
pub const BAND_EDGES_HZ: [f32; 9] = [20.0, 60.0, 150.0, 400.0, 1000.0, 2500.0, 6000.0, 12000.0, 20000.0];

const ATTACK_TIME: f32 = 0.010;
const RELEASE_TIME: f32 = 0.150;
const AVG_DECAY: f32 = 0.999;
const AVG_ATTACK: f32 = 0.001;
const MIN_DENOM: f32 = 1e-6;

/// Attack/release follower: fast rise, slower fall.
pub fn apply_envelope(smoothed: &mut f32, raw: f32, dt: f32) {
    let tau = if raw > *smoothed { ATTACK_TIME } else { RELEASE_TIME };
    let alpha = 1.0 - (-dt / tau).exp();
    *smoothed += alpha * (raw - *smoothed);
}

fn update_running_avg(avg: &mut f32, raw: f32) {
    *avg = *avg * AVG_DECAY + raw * AVG_ATTACK;
}

fn hz_per_bin() -> f32 {
    SAMPLE_RATE as f32 / FFT_SIZE as f32
}

/// Bin ranges of [`BAND_EDGES_HZ`] for a spectrum of `bin_count` bins.
/// Every band covers at least one bin.
pub fn band_bin_ranges(bin_count: usize) -> [(usize, usize); 8] {
    let last = bin_count.max(2);
    let scale = (last - 1) as f32 / (FFT_BIN_COUNT - 1) as f32;
    let bin = |hz: f32| ((hz / hz_per_bin() * scale).round() as usize).clamp(1, last - 1);
    std::array::from_fn(|i| {
        let start = bin(BAND_EDGES_HZ[i]);
        let end = bin(BAND_EDGES_HZ[i + 1]).max(start + 1).min(last);
        (start.min(end - 1), end)
    })
}

/// Mean magnitude per band.
pub fn band_levels(magnitudes: &[f32]) -> [f32; 8] {
    if magnitudes.is_empty() {
        return [0.0; 8];
    }
    band_bin_ranges(magnitudes.len()).map(|(start, end)| {
        let slice = &magnitudes[start.min(magnitudes.len())..end.min(magnitudes.len())];
        if slice.is_empty() {
            0.0
        } else {
            slice.iter().sum::<f32>() / slice.len() as f32
        }
    })
}

/// Hann-windowed forward FFT over a sliding window of the latest samples.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    window: Vec<f32>,
    write_pos: usize,
    buf: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let n = FFT_SIZE;
        let hann = (0..n)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
            .collect();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(n),
            hann,
            window: vec![0.0; n],
            write_pos: 0,
            buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            magnitudes: vec![0.0; FFT_BIN_COUNT],
        }
    }

    /// Appends samples and recomputes the spectrum of the newest window.
    pub fn process(&mut self, samples: &[f32]) -> &[f32] {
        let n = self.window.len();
        for &s in samples {
            self.window[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % n;
        }
        for (i, c) in self.buf.iter_mut().enumerate() {
            let s = self.window[(self.write_pos + i) % n];
            *c = Complex {
                re: s * self.hann[i],
                im: 0.0,
            };
        }
        self.fft.process(&mut self.buf);
        // Hann gain is 0.5, so a full-scale sine peaks near 1.
        let norm = 4.0 / n as f32;
        for (m, c) in self.magnitudes.iter_mut().zip(&self.buf) {
            *m = c.norm() * norm;
        }
        &self.magnitudes
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }
}

/// The latest [`WAVEFORM_SIZE`] samples plus the slot the next one lands in.
///
/// [`WaveformRing::snapshot`] lays samples out circularly so that slot
/// `write_index - 1` holds the newest one, matching how the waveform
/// texture is sampled.
pub struct WaveformRing {
    rb: HeapRb<f32>,
    write_index: usize,
}

impl Default for WaveformRing {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformRing {
    pub fn new() -> Self {
        Self {
            rb: HeapRb::new(WAVEFORM_SIZE),
            write_index: 0,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        for &s in samples {
            self.rb.push_overwrite(s.clamp(-1.0, 1.0));
            self.write_index = (self.write_index + 1) % WAVEFORM_SIZE;
        }
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn snapshot(&self) -> Vec<f32> {
        let mut out = vec![0.0; WAVEFORM_SIZE];
        let len = self.rb.occupied_len();
        let start = (self.write_index + WAVEFORM_SIZE - len) % WAVEFORM_SIZE;
        for (k, &s) in self.rb.iter().enumerate() {
            out[(start + k) % WAVEFORM_SIZE] = s;
        }
        out
    }
}

/// Bass, mid and treble RMS energies with envelopes and running averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub mid: f32,
    pub treb: f32,
    pub bass_smooth: f32,
    pub mid_smooth: f32,
    pub treb_smooth: f32,
    pub bass_avg: f32,
    pub mid_avg: f32,
    pub treb_avg: f32,
    /// Spectral centroid mapped from 200..8000 Hz to 0..1.
    pub centroid: f32,
    pub centroid_smooth: f32,
}

impl BandEnergies {
    const BASS_BINS: (usize, usize) = (1, 10);
    const MID_BINS: (usize, usize) = (11, 170);
    const TREB_BINS: (usize, usize) = (171, 853);

    pub fn process(&mut self, magnitudes: &[f32], dt: f32) {
        if magnitudes.is_empty() {
            return;
        }
        self.bass = band_rms(magnitudes, Self::BASS_BINS);
        self.mid = band_rms(magnitudes, Self::MID_BINS);
        self.treb = band_rms(magnitudes, Self::TREB_BINS);
        apply_envelope(&mut self.bass_smooth, self.bass, dt);
        apply_envelope(&mut self.mid_smooth, self.mid, dt);
        apply_envelope(&mut self.treb_smooth, self.treb, dt);

        let (mut weighted, mut total) = (0.0f32, 0.0f32);
        for (i, &m) in magnitudes.iter().enumerate().skip(1) {
            weighted += i as f32 * m;
            total += m;
        }
        self.centroid = if total > MIN_DENOM {
            let hz = weighted / total * hz_per_bin();
            ((hz - 200.0) / (8000.0 - 200.0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        apply_envelope(&mut self.centroid_smooth, self.centroid, dt);

        update_running_avg(&mut self.bass_avg, self.bass);
        update_running_avg(&mut self.mid_avg, self.mid);
        update_running_avg(&mut self.treb_avg, self.treb);
    }

    /// Smoothed energies over their running averages; 1 means twice the average.
    pub fn normalized(&self) -> [f32; 3] {
        let n = |smooth: f32, avg: f32| (smooth / avg.max(MIN_DENOM) / 2.0).min(1.0);
        [
            n(self.bass_smooth, self.bass_avg),
            n(self.mid_smooth, self.mid_avg),
            n(self.treb_smooth, self.treb_avg),
        ]
    }
}

fn band_rms(magnitudes: &[f32], (start, end): (usize, usize)) -> f32 {
    let end = (end + 1).min(magnitudes.len());
    if start >= end {
        return 0.0;
    }
    let sum: f32 = magnitudes[start..end].iter().map(|m| m * m).sum();
    (sum / (end - start) as f32).sqrt()
}

/// Timbre descriptors, each in 0..1 with an attack/release envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFeatures {
    /// 0 for a pure tone, 1 for white noise.
    pub flatness: f32,
    pub flatness_smooth: f32,
    pub spread: f32,
    pub spread_smooth: f32,
    /// Bin below which 85% of the energy sits, normalised.
    pub rolloff: f32,
    pub rolloff_smooth: f32,
    pub flux: f32,
    pub flux_smooth: f32,
    flux_avg: f32,
    /// Peak over RMS of the time-domain block, divided by 6.
    pub crest: f32,
    pub crest_smooth: f32,
    prev: Vec<f32>,
}

impl SpectralFeatures {
    pub fn process(&mut self, magnitudes: &[f32], samples: &[f32], dt: f32) {
        let bins = magnitudes.len();
        if bins < 2 {
            return;
        }
        let body = &magnitudes[1..];
        let total: f32 = body.iter().sum();

        self.flatness = if total > MIN_DENOM {
            let log_sum: f32 = body.iter().map(|m| (m + 1e-10).ln()).sum();
            let geometric = (log_sum / body.len() as f32).exp();
            (geometric / (total / body.len() as f32)).min(1.0)
        } else {
            0.0
        };

        self.spread = if total > MIN_DENOM {
            let centroid: f32 = body.iter().enumerate().map(|(i, m)| (i + 1) as f32 * m).sum::<f32>() / total;
            let var: f32 = body
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let d = (i + 1) as f32 - centroid;
                    m * d * d
                })
                .sum::<f32>()
                / total;
            (var.sqrt() / (bins / 2) as f32).min(1.0)
        } else {
            0.0
        };

        let energy: f32 = body.iter().map(|m| m * m).sum();
        let threshold = 0.85 * energy;
        let mut cumulative = 0.0;
        let mut rolloff_bin = bins - 1;
        for (i, m) in body.iter().enumerate() {
            cumulative += m * m;
            if cumulative >= threshold {
                rolloff_bin = i + 1;
                break;
            }
        }
        self.rolloff = rolloff_bin as f32 / (bins - 1) as f32;

        self.prev.resize(bins, 0.0);
        let mut flux = 0.0;
        for (p, &m) in self.prev.iter_mut().zip(magnitudes).skip(1) {
            flux += (m - *p).max(0.0);
            *p = m;
        }
        update_running_avg(&mut self.flux_avg, flux);
        self.flux = if self.flux_avg > MIN_DENOM {
            (flux / (self.flux_avg * 3.0)).min(1.0)
        } else {
            0.0
        };

        self.crest = if samples.is_empty() {
            0.0
        } else {
            let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
            if rms > MIN_DENOM { (peak / rms / 6.0).min(1.0) } else { 0.0 }
        };

        apply_envelope(&mut self.flatness_smooth, self.flatness, dt);
        apply_envelope(&mut self.spread_smooth, self.spread, dt);
        apply_envelope(&mut self.rolloff_smooth, self.rolloff, dt);
        apply_envelope(&mut self.flux_smooth, self.flux, dt);
        apply_envelope(&mut self.crest_smooth, self.crest, dt);
    }
}

/// Kick-range spectral flux peak picker.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    /// Standard deviations above the mean flux that count as a beat.
    pub sensitivity: f32,
    prev: Vec<f32>,
    history: [f32; Self::HISTORY],
    cursor: usize,
    since_beat: f32,
    beat: bool,
    intensity: f32,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self {
            sensitivity: 1.5,
            prev: Vec::new(),
            history: [0.0; Self::HISTORY],
            cursor: 0,
            since_beat: Self::DEBOUNCE,
            beat: false,
            intensity: 0.0,
        }
    }
}

impl BeatDetector {
    const HISTORY: usize = 80;
    const DEBOUNCE: f32 = 0.15;
    const KICK_BINS: std::ops::RangeInclusive<usize> = 1..=8;
    /// Fraction of intensity left after one second without a beat.
    const DECAY_PER_SEC: f32 = 0.001;

    pub fn process(&mut self, magnitudes: &[f32], dt: f32) {
        self.beat = false;
        self.since_beat += dt;
        self.prev.resize(magnitudes.len(), 0.0);
        let mut flux = 0.0;
        for k in Self::KICK_BINS {
            if let (Some(&m), Some(p)) = (magnitudes.get(k), self.prev.get(k)) {
                flux += (m - p).max(0.0);
            }
        }
        self.prev.copy_from_slice(magnitudes);

        self.history[self.cursor] = flux;
        self.cursor = (self.cursor + 1) % Self::HISTORY;
        let mean = self.history.iter().sum::<f32>() / Self::HISTORY as f32;
        let std_dev = (self.history.iter().map(|f| (f - mean).powi(2)).sum::<f32>() / Self::HISTORY as f32).sqrt();

        let threshold = mean + self.sensitivity * std_dev;
        if flux > threshold && self.since_beat >= Self::DEBOUNCE && mean > 0.001 {
            self.beat = true;
            self.since_beat = 0.0;
            let excess = (flux - mean) / (std_dev + 1e-4);
            self.intensity = (excess / (self.sensitivity * 2.0)).min(1.0);
        } else {
            self.intensity *= Self::DECAY_PER_SEC.powf(dt);
        }
    }

    pub fn beat(&self) -> bool {
        self.beat
    }

    /// 0..1, jumps on a beat and decays afterwards.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

/// Test and demo signal: a sine whose frequency sweeps exponentially.
pub fn sine_sweep(start_hz: f32, end_hz: f32, seconds: f32, t0: f32, count: usize) -> Vec<f32> {
    let k = (end_hz / start_hz).ln() / seconds.max(1e-3);
    (0..count)
        .map(|i| {
            let t = (t0 + i as f32 / SAMPLE_RATE as f32) % seconds.max(1e-3);
            let phase = 2.0 * PI * start_hz * ((k * t).exp() - 1.0) / k;
            0.5 * phase.sin()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let mut a = SpectrumAnalyzer::new();
        let bin = 64usize;
        let hz = bin as f32 * hz_per_bin();
        let samples: Vec<f32> = (0..FFT_SIZE)
            .map(|i| (2.0 * PI * hz * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        let mags = a.process(&samples);
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(peak, bin);
        assert!(mags[bin] > 0.8 && mags[bin] < 1.2, "peak magnitude {}", mags[bin]);
    }

    #[test]
    fn ring_places_newest_before_write_index() {
        let mut r = WaveformRing::new();
        r.push(&[0.1, 0.2, 0.3]);
        let snap = r.snapshot();
        assert_eq!(r.write_index(), 3);
        assert_eq!(&snap[..3], &[0.1, 0.2, 0.3]);
        let more: Vec<f32> = (0..WAVEFORM_SIZE).map(|i| if i == WAVEFORM_SIZE - 1 { 0.9 } else { 0.0 }).collect();
        r.push(&more);
        let snap = r.snapshot();
        assert_eq!(snap[(r.write_index() + WAVEFORM_SIZE - 1) % WAVEFORM_SIZE], 0.9);
    }

    #[test]
    fn band_ranges_cover_distinct_bins() {
        let ranges = band_bin_ranges(FFT_BIN_COUNT);
        for w in ranges.windows(2) {
            assert!(w[0].1 <= w[1].0 + 1, "{ranges:?}");
        }
        assert!(ranges.iter().all(|(s, e)| e > s));
    }

    #[test]
    fn beat_fires_on_kick_onset() {
        let mut bd = BeatDetector::default();
        let quiet = vec![0.01f32; FFT_BIN_COUNT];
        let mut kick = quiet.clone();
        kick[1..=8].iter_mut().for_each(|m| *m = 1.0);
        for _ in 0..60 {
            bd.process(&quiet, 1.0 / 60.0);
        }
        bd.process(&kick, 1.0 / 60.0);
        assert!(bd.beat(), "kick should register");
        assert!(bd.intensity() > 0.0);
    }
}
