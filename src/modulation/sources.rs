use super::lfo::NUM_LFOS;
use super::{IdOrIndex, ModulationError};
use crate::audio::{BandEnergies, SpectralFeatures, apply_envelope, band_levels};
use serde::{Deserialize, Serialize};

/// What a route reads. Values are 0..1 except LFOs, which are bipolar.
///
/// Serialized as its string id; integer indices load too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IdOrIndex", into = "String")]
pub enum ModSource {
    Bass,
    Mid,
    Treb,
    Beat,
    Lfo1,
    Lfo2,
    Lfo3,
    Lfo4,
    Lfo5,
    Lfo6,
    Lfo7,
    Lfo8,
    Centroid,
    Flatness,
    Spread,
    Rolloff,
    Flux,
    Crest,
    Band0,
    Band1,
    Band2,
    Band3,
    Band4,
    Band5,
    Band6,
    Band7,
    /// Always 1.
    Constant,
    /// The route's own oscillator.
    RouteLfo,
}

/// Sources held in [`ModSources`]; the two synthetic ones are computed per route.
pub const SOURCE_SLOTS: usize = 26;

impl ModSource {
    /// Index order; integers in older route files use it.
    pub const ALL: [Self; 28] = [
        Self::Bass,
        Self::Mid,
        Self::Treb,
        Self::Beat,
        Self::Lfo1,
        Self::Lfo2,
        Self::Lfo3,
        Self::Lfo4,
        Self::Lfo5,
        Self::Lfo6,
        Self::Lfo7,
        Self::Lfo8,
        Self::Centroid,
        Self::Flatness,
        Self::Spread,
        Self::Rolloff,
        Self::Flux,
        Self::Crest,
        Self::Band0,
        Self::Band1,
        Self::Band2,
        Self::Band3,
        Self::Band4,
        Self::Band5,
        Self::Band6,
        Self::Band7,
        Self::Constant,
        Self::RouteLfo,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bass" => Some(Self::Bass),
            "mid" => Some(Self::Mid),
            "treb" | "treble" => Some(Self::Treb),
            "beat" => Some(Self::Beat),
            "lfo1" => Some(Self::Lfo1),
            "lfo2" => Some(Self::Lfo2),
            "lfo3" => Some(Self::Lfo3),
            "lfo4" => Some(Self::Lfo4),
            "lfo5" => Some(Self::Lfo5),
            "lfo6" => Some(Self::Lfo6),
            "lfo7" => Some(Self::Lfo7),
            "lfo8" => Some(Self::Lfo8),
            "centroid" => Some(Self::Centroid),
            "flatness" => Some(Self::Flatness),
            "spread" => Some(Self::Spread),
            "rolloff" => Some(Self::Rolloff),
            "flux" => Some(Self::Flux),
            "crest" => Some(Self::Crest),
            "band0" => Some(Self::Band0),
            "band1" => Some(Self::Band1),
            "band2" => Some(Self::Band2),
            "band3" => Some(Self::Band3),
            "band4" => Some(Self::Band4),
            "band5" => Some(Self::Band5),
            "band6" => Some(Self::Band6),
            "band7" => Some(Self::Band7),
            "constant" => Some(Self::Constant),
            "lfo" => Some(Self::RouteLfo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bass => "bass",
            Self::Mid => "mid",
            Self::Treb => "treb",
            Self::Beat => "beat",
            Self::Lfo1 => "lfo1",
            Self::Lfo2 => "lfo2",
            Self::Lfo3 => "lfo3",
            Self::Lfo4 => "lfo4",
            Self::Lfo5 => "lfo5",
            Self::Lfo6 => "lfo6",
            Self::Lfo7 => "lfo7",
            Self::Lfo8 => "lfo8",
            Self::Centroid => "centroid",
            Self::Flatness => "flatness",
            Self::Spread => "spread",
            Self::Rolloff => "rolloff",
            Self::Flux => "flux",
            Self::Crest => "crest",
            Self::Band0 => "band0",
            Self::Band1 => "band1",
            Self::Band2 => "band2",
            Self::Band3 => "band3",
            Self::Band4 => "band4",
            Self::Band5 => "band5",
            Self::Band6 => "band6",
            Self::Band7 => "band7",
            Self::Constant => "constant",
            Self::RouteLfo => "lfo",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: i64) -> Option<Self> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn lfo(slot: usize) -> Option<Self> {
        (slot < NUM_LFOS).then(|| Self::ALL[Self::Lfo1.index() + slot])
    }

    pub fn band(band: usize) -> Option<Self> {
        (band < 8).then(|| Self::ALL[Self::Band0.index() + band])
    }

    pub fn is_bipolar(self) -> bool {
        (Self::Lfo1.index()..=Self::Lfo8.index()).contains(&self.index()) || self == Self::RouteLfo
    }
}

impl TryFrom<IdOrIndex> for ModSource {
    type Error = ModulationError;

    fn try_from(v: IdOrIndex) -> Result<Self, Self::Error> {
        match v {
            IdOrIndex::Id(s) => Self::parse(&s).ok_or(ModulationError::UnknownSource(s)),
            IdOrIndex::Index(i) => {
                Self::from_index(i).ok_or_else(|| ModulationError::UnknownSource(i.to_string()))
            }
        }
    }
}

impl From<ModSource> for String {
    fn from(s: ModSource) -> String {
        s.as_str().to_string()
    }
}

/// Current value of every stored source.
#[derive(Debug, Clone, PartialEq)]
pub struct ModSources {
    values: [f32; SOURCE_SLOTS],
}

impl Default for ModSources {
    fn default() -> Self {
        Self {
            values: [0.0; SOURCE_SLOTS],
        }
    }
}

impl ModSources {
    /// Value of `source`; the per-route LFO reads 0 here.
    pub fn get(&self, source: ModSource) -> f32 {
        match source {
            ModSource::Constant => 1.0,
            ModSource::RouteLfo => 0.0,
            s => self.values[s.index()],
        }
    }

    pub fn set(&mut self, source: ModSource, value: f32) {
        if let Some(v) = self.values.get_mut(source.index()) {
            *v = value;
        }
    }

    /// Audio-derived sources from a host's analysers.
    pub fn update_audio(&mut self, bands: &BandEnergies, beat_intensity: f32, features: &SpectralFeatures) {
        let [bass, mid, treb] = bands.normalized();
        self.set(ModSource::Bass, bass);
        self.set(ModSource::Mid, mid);
        self.set(ModSource::Treb, treb);
        self.set(ModSource::Beat, beat_intensity.clamp(0.0, 1.0));
        self.set(ModSource::Centroid, bands.centroid_smooth);
        self.set(ModSource::Flatness, features.flatness_smooth);
        self.set(ModSource::Spread, features.spread_smooth);
        self.set(ModSource::Rolloff, features.rolloff_smooth);
        self.set(ModSource::Flux, features.flux_smooth);
        self.set(ModSource::Crest, features.crest_smooth);
    }

    /// Band envelopes from normalised FFT magnitudes.
    pub fn update_fft_bands(&mut self, fft: &[f32], dt: f32) {
        for (i, level) in band_levels(fft).into_iter().enumerate() {
            if let Some(src) = ModSource::band(i) {
                let slot = &mut self.values[src.index()];
                apply_envelope(slot, level.clamp(0.0, 1.0), dt);
            }
        }
    }

    pub fn set_lfos(&mut self, outputs: &[f32; NUM_LFOS]) {
        for (i, &v) in outputs.iter().enumerate() {
            if let Some(src) = ModSource::lfo(i) {
                self.set(src, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_legacy_indices_hold() {
        for s in ModSource::ALL {
            assert_eq!(ModSource::parse(s.as_str()), Some(s));
            assert_eq!(ModSource::from_index(s.index() as i64), Some(s));
        }
        assert_eq!(ModSource::from_index(4), Some(ModSource::Lfo1));
        assert_eq!(ModSource::from_index(17), Some(ModSource::Crest));
    }

    #[test]
    fn constant_reads_one() {
        let s = ModSources::default();
        assert_eq!(s.get(ModSource::Constant), 1.0);
        assert_eq!(s.get(ModSource::Band3), 0.0);
    }
}
