//! Detector configuration.
//!
//! Every threshold the analyzer uses lives here. The defaults are tuned for
//! guitar at the usual 44.1–48 kHz sample rates.

use serde::{Deserialize, Serialize};

use crate::error::{TunerError, TunerResult};

/// How the signal gate measures the level of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateMode {
    /// Arithmetic mean of the signed samples.
    ///
    /// Only approximates loudness when the input carries a positive DC bias;
    /// a zero-centred tone averages out to roughly zero and is gated away.
    #[default]
    SignedMean,
    /// Mean of absolute sample values.
    MeanAbsolute,
    /// Root mean square.
    Rms,
}

/// Analysis configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Gate threshold (default: 0.00025).
    /// A buffer whose level is at or below this is treated as silence.
    pub amplitude_threshold: f32,

    /// Level measure used by the gate (default: `SignedMean`).
    pub gate_mode: GateMode,

    /// Exclusive lower bound on an accepted lag, in samples (default: 120).
    /// About 367 Hz at 44.1 kHz, a little above the high E string.
    pub plausible_lag_min: usize,

    /// Exclusive upper bound on an accepted lag, in samples (default: 630).
    /// About 70 Hz at 44.1 kHz, a little below the low E string.
    pub plausible_lag_max: usize,

    /// Upper end of the refinement window when the lowest string matched
    /// (default: 650). There is no lower neighbour to take a midpoint with.
    pub lowest_string_upper_limit: usize,

    /// Lower end of the refinement window when the highest string matched
    /// (default: 100).
    pub highest_string_lower_limit: usize,

    /// Sub-harmonic guard for the coarse match (default: off).
    ///
    /// When set, coarse differences are normalised by the buffer's mean
    /// absolute deviation and the highest string whose difference is within
    /// this margin of the best one wins.
    ///
    /// Left off, a pure high E tone at 44.1 or 48 kHz coarse-matches the low
    /// E string. Each standard string is only detected as itself with the
    /// guard on (`0.05` works).
    pub subharmonic_tolerance: Option<f32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            amplitude_threshold: 0.00025,
            gate_mode: GateMode::SignedMean,
            plausible_lag_min: 120,
            plausible_lag_max: 630,
            lowest_string_upper_limit: 650,
            highest_string_lower_limit: 100,
            subharmonic_tolerance: None,
        }
    }
}

impl DetectorConfig {
    /// Parses a (possibly partial) JSON object; missing fields keep their
    /// defaults. The result is validated.
    pub fn from_json_str(json: &str) -> TunerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the parameters describe a usable detector.
    pub fn validate(&self) -> TunerResult<()> {
        if !self.amplitude_threshold.is_finite() {
            return Err(TunerError::InvalidConfig(
                "amplitude_threshold must be finite".to_string(),
            ));
        }
        if self.plausible_lag_min >= self.plausible_lag_max {
            return Err(TunerError::InvalidConfig(format!(
                "plausible lag range ({}, {}) is empty",
                self.plausible_lag_min, self.plausible_lag_max
            )));
        }
        if self.highest_string_lower_limit == 0 {
            return Err(TunerError::InvalidConfig(
                "highest_string_lower_limit must be at least 1".to_string(),
            ));
        }
        if self.highest_string_lower_limit > self.lowest_string_upper_limit {
            return Err(TunerError::InvalidConfig(format!(
                "window limits inverted: lower {} > upper {}",
                self.highest_string_lower_limit, self.lowest_string_upper_limit
            )));
        }
        if let Some(tolerance) = self.subharmonic_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(TunerError::InvalidConfig(format!(
                    "subharmonic_tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }

    /// True when `lag` lies strictly inside the plausible range.
    pub fn accepts_lag(&self, lag: usize) -> bool {
        lag > self.plausible_lag_min && lag < self.plausible_lag_max
    }
}
