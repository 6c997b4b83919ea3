// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for gating, pitch detection and string
//! matching. It is completely headless: it performs no audio capture
//! and contains no rendering code.
//!
//! The entry points are [`analyze`] for a one-off call with the standard
//! tuning, and [`Analyzer`] when the tuning or thresholds are configured.

pub mod config;
pub mod driver;
pub mod error;
pub mod gate;
pub mod pitch;
pub mod reading;
pub mod tuning;

pub use config::{DetectorConfig, GateMode};
pub use error::{TunerError, TunerResult};
pub use tuning::{ReferenceString, Tuning};

use serde::Serialize;

/// Result of analysing a single buffer.
///
/// With the default config a pure high E (E4) tone is reported as string 0,
/// two octaves down, because its lag nearly divides the low E lag. Set
/// [`DetectorConfig::subharmonic_tolerance`] for every string to be reported
/// by its own index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    /// Too quiet, or the estimate fell outside the plausible lag range.
    NoSignal,
    /// A string was matched and its frequency estimated.
    Detected {
        /// Index into the tuning the analyzer was built with.
        string_index: usize,
        /// Estimated frequency in Hz, always > 0.
        frequency_hz: f32,
    },
}

impl Detection {
    /// The detected string index, if any.
    pub fn string_index(&self) -> Option<usize> {
        match self {
            Detection::NoSignal => None,
            Detection::Detected { string_index, .. } => Some(*string_index),
        }
    }

    /// The detected frequency, if any.
    pub fn frequency_hz(&self) -> Option<f32> {
        match self {
            Detection::NoSignal => None,
            Detection::Detected { frequency_hz, .. } => Some(*frequency_hz),
        }
    }
}

/// Outcome of one analysis cycle, including which string to display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleOutcome {
    /// What this buffer produced.
    pub detection: Detection,
    /// String the display should show after this cycle.
    ///
    /// The coarse match whenever the gate opened, even if refinement found no
    /// lag or its lag was rejected; otherwise the previous string carried
    /// forward.
    pub current_string: Option<usize>,
}

/// Gate plus two-phase pitch estimator over a fixed tuning.
///
/// Immutable after construction, so one instance can be shared across
/// threads and called any number of times.
#[derive(Debug, Clone)]
pub struct Analyzer {
    tuning: Tuning,
    config: DetectorConfig,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            tuning: (*tuning::STANDARD).clone(),
            config: DetectorConfig::default(),
        }
    }
}

impl Analyzer {
    /// Creates an analyzer, validating the config.
    pub fn new(tuning: Tuning, config: DetectorConfig) -> TunerResult<Self> {
        config.validate()?;
        Ok(Self { tuning, config })
    }

    /// Standard tuning with a custom config.
    pub fn with_config(config: DetectorConfig) -> TunerResult<Self> {
        Self::new((*tuning::STANDARD).clone(), config)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyses one buffer.
    ///
    /// # Arguments
    /// * `signal` - Time-domain samples, longer than the lowest string's lag
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Errors
    /// * `InvalidSampleRate` - rate is not a positive finite number
    /// * `EmptyBuffer` / `BufferTooShort` - buffer cannot hold the longest lag
    pub fn analyze(&self, signal: &[f32], sample_rate: f32) -> TunerResult<Detection> {
        self.analyze_cycle(signal, sample_rate, None)
            .map(|outcome| outcome.detection)
    }

    /// Analyses one buffer and works out which string to display.
    ///
    /// `previous_string_index` is the `current_string` of the last cycle; it
    /// is returned unchanged when the gate stays closed. An index that is not
    /// valid for this tuning is dropped.
    pub fn analyze_cycle(
        &self,
        signal: &[f32],
        sample_rate: f32,
        previous_string_index: Option<usize>,
    ) -> TunerResult<CycleOutcome> {
        self.validate_input(signal, sample_rate)?;
        let previous = previous_string_index.filter(|&i| i < self.tuning.len());

        if !gate::is_open(signal, &self.config) {
            return Ok(CycleOutcome {
                detection: Detection::NoSignal,
                current_string: previous,
            });
        }

        let Some(estimate) = pitch::estimate(signal, sample_rate, &self.tuning, &self.config)
        else {
            return Ok(CycleOutcome {
                detection: Detection::NoSignal,
                current_string: previous,
            });
        };

        let detection = match (estimate.lag, estimate.frequency_hz) {
            (Some(lag), Some(frequency_hz))
                if self.config.accepts_lag(lag) && frequency_hz > 0.0 =>
            {
                Detection::Detected {
                    string_index: estimate.string_index,
                    frequency_hz,
                }
            }
            (lag, _) => {
                log::debug!(
                    "Lag {:?} outside ({}, {}), discarding",
                    lag,
                    self.config.plausible_lag_min,
                    self.config.plausible_lag_max
                );
                Detection::NoSignal
            }
        };

        Ok(CycleOutcome {
            detection,
            current_string: Some(estimate.string_index),
        })
    }

    fn validate_input(&self, signal: &[f32], sample_rate: f32) -> TunerResult<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(TunerError::InvalidSampleRate(sample_rate));
        }
        if signal.is_empty() {
            return Err(TunerError::EmptyBuffer);
        }
        let required = self.tuning.max_lag(sample_rate);
        if signal.len() <= required {
            return Err(TunerError::BufferTooShort {
                len: signal.len(),
                required,
            });
        }
        Ok(())
    }
}

/// Analyses one buffer against standard tuning with the default config.
pub fn analyze(signal: &[f32], sample_rate: f32) -> TunerResult<Detection> {
    Analyzer::default().analyze(signal, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biased_sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.1 + 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn a_string_at_44100() {
        let detection = analyze(&biased_sine(110.0, 44_100.0, 2048), 44_100.0).unwrap();
        assert_eq!(detection.string_index(), Some(1));
        let freq = detection.frequency_hz().unwrap();
        assert!((108.0..=112.0).contains(&freq), "got {} Hz", freq);
    }

    #[test]
    fn silence_is_no_signal() {
        assert_eq!(analyze(&[0.0; 2048], 44_100.0).unwrap(), Detection::NoSignal);
    }

    #[test]
    fn rejects_bad_sample_rates() {
        let signal = vec![0.1; 2048];
        for rate in [0.0, -44_100.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                analyze(&signal, rate),
                Err(TunerError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(matches!(analyze(&[], 44_100.0), Err(TunerError::EmptyBuffer)));
        assert!(matches!(
            analyze(&[0.1; 535], 44_100.0),
            Err(TunerError::BufferTooShort { len: 535, required: 535 })
        ));
        assert!(analyze(&[0.1; 536], 44_100.0).is_ok());
    }

    #[test]
    fn closed_gate_carries_previous_string() {
        let analyzer = Analyzer::default();
        let outcome = analyzer.analyze_cycle(&[0.0; 2048], 44_100.0, Some(3)).unwrap();
        assert_eq!(outcome.detection, Detection::NoSignal);
        assert_eq!(outcome.current_string, Some(3));

        let outcome = analyzer.analyze_cycle(&[0.0; 2048], 44_100.0, Some(42)).unwrap();
        assert_eq!(outcome.current_string, None);
    }

    #[test]
    fn rejected_lag_still_updates_current_string() {
        // 63 Hz at 44.1 kHz has a 700-sample period, longer than any accepted lag.
        let analyzer = Analyzer::default();
        let outcome = analyzer
            .analyze_cycle(&biased_sine(63.0, 44_100.0, 2048), 44_100.0, Some(1))
            .unwrap();
        assert_eq!(outcome.detection, Detection::NoSignal);
        assert!(outcome.current_string.is_some());
    }

    #[test]
    fn empty_window_still_updates_current_string() {
        // Low E at 96 kHz: the refinement window (1018, 650) is inverted, so
        // no lag is found, but the coarse match must still reach the display.
        let analyzer = Analyzer::default();
        let outcome = analyzer
            .analyze_cycle(&biased_sine(82.4069, 96_000.0, 4096), 96_000.0, Some(3))
            .unwrap();
        assert_eq!(outcome.detection, Detection::NoSignal);
        assert_eq!(outcome.current_string, Some(0));
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = DetectorConfig {
            plausible_lag_min: 700,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            Analyzer::with_config(config),
            Err(TunerError::InvalidConfig(_))
        ));
    }
}
