//! # Reference Tuning Module
//!
//! Holds the reference strings the detector matches against and the small
//! amount of musical arithmetic the renderer needs (percent in tune, cents).
//!
//! ## Features
//! - Six-string guitar standard tuning (E2 A2 D3 G3 B3 E4)
//! - Validated custom tunings (ascending, positive frequencies)
//! - Lag (period in samples) calculations for a given sample rate

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{TunerError, TunerResult};

/// A single open string: display label and target frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceString {
    /// Label shown to the player (e.g. "E", "A")
    pub label: String,
    /// Target frequency in Hz
    pub frequency: f32,
}

/// Ordered set of reference strings, lowest frequency first.
///
/// The position of a string in this list is its "string index", which is
/// what [`Detection::Detected`](crate::Detection::Detected) reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tuning {
    strings: Vec<ReferenceString>,
}

/// Frequencies and labels of guitar standard tuning.
const STANDARD_STRINGS: [(&str, f32); 6] = [
    ("E", 82.4069),
    ("A", 110.000),
    ("D", 146.832),
    ("G", 195.998),
    ("B", 246.942),
    ("E", 329.628),
];

/// Guitar standard tuning, built once on first use.
pub static STANDARD: Lazy<Tuning> = Lazy::new(|| Tuning {
    strings: STANDARD_STRINGS
        .iter()
        .map(|&(label, frequency)| ReferenceString {
            label: label.to_string(),
            frequency,
        })
        .collect(),
});

impl Tuning {
    /// Builds a tuning from reference strings.
    ///
    /// # Errors
    /// * `InvalidTuning` - fewer than two strings, a non-positive or
    ///   non-finite frequency, or frequencies not strictly ascending
    pub fn new(strings: Vec<ReferenceString>) -> TunerResult<Self> {
        if strings.len() < 2 {
            return Err(TunerError::InvalidTuning(format!(
                "need at least 2 strings, got {}",
                strings.len()
            )));
        }
        if let Some(bad) = strings
            .iter()
            .find(|s| !s.frequency.is_finite() || s.frequency <= 0.0)
        {
            return Err(TunerError::InvalidTuning(format!(
                "string {:?} has frequency {} Hz",
                bad.label, bad.frequency
            )));
        }
        if strings.windows(2).any(|w| w[0].frequency >= w[1].frequency) {
            return Err(TunerError::InvalidTuning(
                "frequencies must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { strings })
    }

    /// All strings, lowest first.
    pub fn strings(&self) -> &[ReferenceString] {
        &self.strings
    }

    /// Number of strings in the tuning.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when the tuning has no strings.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Returns the string at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&ReferenceString> {
        self.strings.get(index)
    }

    /// Period of string `index` in (fractional) samples.
    ///
    /// # Panics
    /// * If `index` is out of range
    pub fn period(&self, index: usize, sample_rate: f32) -> f32 {
        sample_rate / self.strings[index].frequency
    }

    /// Integer lag used by the coarse match: `floor(sample_rate / f)`.
    pub fn lag(&self, index: usize, sample_rate: f32) -> usize {
        self.period(index, sample_rate).floor() as usize
    }

    /// Longest lag of any string, i.e. the lag of the lowest string.
    pub fn max_lag(&self, sample_rate: f32) -> usize {
        self.lag(0, sample_rate)
    }
}

// Deserialize through `Tuning::new` so a loaded tuning is always valid.
impl<'de> Deserialize<'de> for Tuning {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            strings: Vec<ReferenceString>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Tuning::new(raw.strings).map_err(serde::de::Error::custom)
    }
}

/// How close a frequency is to its target, as a percentage.
///
/// `100 - |freq - target| * 100 / target`. Exactly 100 when in tune; drops by
/// one point per percent of error and can go negative for wild estimates.
pub fn percent_in_tune(freq: f32, target_freq: f32) -> f32 {
    100.0 - (freq - target_freq).abs() * 100.0 / target_freq
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat. 100 cents = 1 semitone.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(label: &str, frequency: f32) -> ReferenceString {
        ReferenceString {
            label: label.to_string(),
            frequency,
        }
    }

    #[test]
    fn standard_tuning_is_six_ascending_strings() {
        let labels: Vec<&str> = STANDARD.strings().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["E", "A", "D", "G", "B", "E"]);
        assert!(Tuning::new(STANDARD.strings().to_vec()).is_ok());
    }

    #[test]
    fn lags_at_44100() {
        let lags: Vec<usize> = (0..6).map(|i| STANDARD.lag(i, 44_100.0)).collect();
        assert_eq!(lags, [535, 400, 300, 225, 178, 133]);
        assert_eq!(STANDARD.max_lag(44_100.0), 535);
    }

    #[test]
    fn rejects_bad_tunings() {
        assert!(matches!(
            Tuning::new(vec![string("E", 82.0)]),
            Err(TunerError::InvalidTuning(_))
        ));
        assert!(matches!(
            Tuning::new(vec![string("A", 110.0), string("E", 82.0)]),
            Err(TunerError::InvalidTuning(_))
        ));
        assert!(matches!(
            Tuning::new(vec![string("E", 0.0), string("A", 110.0)]),
            Err(TunerError::InvalidTuning(_))
        ));
        assert!(matches!(
            Tuning::new(vec![string("A", 110.0), string("A", 110.0)]),
            Err(TunerError::InvalidTuning(_))
        ));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Tuning = serde_json::from_str(
            r#"{"strings":[{"label":"D","frequency":73.42},{"label":"A","frequency":110.0}]}"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 2);

        let bad = serde_json::from_str::<Tuning>(
            r#"{"strings":[{"label":"A","frequency":110.0},{"label":"D","frequency":73.42}]}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn percent_in_tune_formula() {
        assert_eq!(percent_in_tune(110.0, 110.0), 100.0);
        assert!((percent_in_tune(99.0, 110.0) - 90.0).abs() < 1e-4);
        assert!((percent_in_tune(121.0, 110.0) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn cents_deviation() {
        assert!(calculate_cents_deviation(110.0, 110.0).abs() < 1e-4);
        assert!((calculate_cents_deviation(220.0, 110.0) - 1200.0).abs() < 1e-3);
        assert!(calculate_cents_deviation(108.0, 110.0) < 0.0);
    }
}
