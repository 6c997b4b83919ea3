//! # Signal Gate
//!
//! Cheap O(N) level check that runs before the autocorrelation search, so
//! silent buffers never pay for the double loop.

use crate::config::{DetectorConfig, GateMode};

/// Measures the level of `signal` with the given mode.
///
/// Returns 0.0 for an empty buffer.
pub fn signal_level(signal: &[f32], mode: GateMode) -> f32 {
    let len = signal.len();
    if len == 0 {
        return 0.0;
    }
    match mode {
        GateMode::SignedMean => signal.iter().sum::<f32>() / len as f32,
        GateMode::MeanAbsolute => signal.iter().map(|s| s.abs()).sum::<f32>() / len as f32,
        GateMode::Rms => (signal.iter().map(|&s| s * s).sum::<f32>() / len as f32).sqrt(),
    }
}

/// True when the buffer is loud enough to analyse.
///
/// The comparison is strict: a level exactly at the threshold is silence.
pub fn is_open(signal: &[f32], config: &DetectorConfig) -> bool {
    let level = signal_level(signal, config.gate_mode);
    log::debug!(
        "Gate level {:.6} ({:?}), threshold {}",
        level,
        config.gate_mode,
        config.amplitude_threshold
    );
    level > config.amplitude_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: GateMode) -> DetectorConfig {
        DetectorConfig {
            gate_mode: mode,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn levels_per_mode() {
        let signal = [0.5, -0.5, 0.5, -0.5];
        assert_eq!(signal_level(&signal, GateMode::SignedMean), 0.0);
        assert_eq!(signal_level(&signal, GateMode::MeanAbsolute), 0.5);
        assert_eq!(signal_level(&signal, GateMode::Rms), 0.5);
        assert_eq!(signal_level(&[], GateMode::Rms), 0.0);
    }

    #[test]
    fn zeros_are_gated() {
        let silence = vec![0.0; 2048];
        for mode in [GateMode::SignedMean, GateMode::MeanAbsolute, GateMode::Rms] {
            assert!(!is_open(&silence, &config(mode)));
        }
    }

    #[test]
    fn level_at_threshold_is_gated() {
        let cfg = DetectorConfig {
            amplitude_threshold: 0.25,
            ..DetectorConfig::default()
        };
        assert!(!is_open(&[0.25; 64], &cfg));
        assert!(is_open(&[0.5; 64], &cfg));
    }

    #[test]
    fn signed_mean_rejects_centred_square_wave() {
        // Known limitation of the signed-mean gate: a loud but zero-centred
        // signal averages to nothing. Magnitude-based modes let it through.
        let square: Vec<f32> = (0..2048).map(|i| if i % 256 < 128 { 0.5 } else { -0.5 }).collect();
        assert!(!is_open(&square, &config(GateMode::SignedMean)));
        assert!(is_open(&square, &config(GateMode::MeanAbsolute)));
        assert!(is_open(&square, &config(GateMode::Rms)));
    }
}
