//! # Pitch Estimation Module
//!
//! Two-phase lag search over the average magnitude difference of a buffer
//! against a shifted copy of itself. A periodic signal matches itself when
//! shifted by one period, so the lag with the smallest difference
//! approximates the period.
//!
//! ## Phases
//! 1. Coarse string match: score one lag per reference string and keep the best
//! 2. Fine refinement: scan every integer lag between the midpoints to the
//!    neighbouring strings and convert the best one to a frequency

use crate::config::DetectorConfig;
use crate::tuning::Tuning;

/// Outcome of the lag search, before the plausibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Index of the coarse-matched reference string.
    pub string_index: usize,
    /// Refinement window that was searched, inclusive.
    pub window: (usize, usize),
    /// Winning lag in samples; `None` when the window is empty or lies
    /// outside the buffer.
    pub lag: Option<usize>,
    /// `floor(sample_rate / lag)` in Hz.
    pub frequency_hz: Option<f32>,
}

/// Mean absolute difference between `signal` and itself shifted by `lag`.
///
/// Normalised by the number of overlapping samples (`len - lag`) so scores
/// for different lags are comparable.
///
/// # Returns
/// * `None` - `lag` is 0 or leaves no overlap
pub fn mean_abs_difference(signal: &[f32], lag: usize) -> Option<f32> {
    if lag == 0 || lag >= signal.len() {
        return None;
    }
    let overlap = signal.len() - lag;
    let sum: f32 = signal[..overlap]
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| (a - b).abs())
        .sum();
    Some(sum / overlap as f32)
}

/// Mean absolute deviation from the buffer mean. Used to put coarse scores on
/// a level-independent scale.
fn mean_abs_deviation(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    signal.iter().map(|s| (s - mean).abs()).sum::<f32>() / signal.len() as f32
}

/// Finds the reference string whose period best matches the buffer.
///
/// Each string is scored at `floor(sample_rate / f)`. Strings whose lag does
/// not fit in the buffer are skipped. Ties go to the lowest index.
///
/// With a `subharmonic_tolerance`, the highest string scoring within the
/// tolerance of the best (on a scale normalised by signal deviation) wins
/// instead. Without it, a pure high E tone tends to match the low E string,
/// whose lag is almost exactly four of its periods.
///
/// # Returns
/// * `None` - no string's lag fits in the buffer
pub fn coarse_string_match(
    signal: &[f32],
    sample_rate: f32,
    tuning: &Tuning,
    subharmonic_tolerance: Option<f32>,
) -> Option<usize> {
    let scores: Vec<(usize, f32)> = (0..tuning.len())
        .filter_map(|i| {
            let lag = tuning.lag(i, sample_rate);
            mean_abs_difference(signal, lag).map(|diff| (i, diff))
        })
        .collect();

    // First minimum in scan order.
    let mut best: Option<(usize, f32)> = None;
    for &(i, diff) in &scores {
        if best.is_none_or(|(_, min)| diff < min) {
            best = Some((i, diff));
        }
    }
    let (best_index, min_diff) = best?;

    let Some(tolerance) = subharmonic_tolerance else {
        return Some(best_index);
    };
    let scale = mean_abs_deviation(signal);
    if scale <= f32::EPSILON {
        return Some(best_index);
    }
    let limit = min_diff / scale + tolerance;
    let chosen = scores
        .iter()
        .rev()
        .find(|(_, diff)| diff / scale <= limit)
        .map_or(best_index, |&(i, _)| i);
    if chosen != best_index {
        log::debug!(
            "Sub-harmonic guard moved coarse match from string {} to {}",
            best_index,
            chosen
        );
    }
    Some(chosen)
}

/// Lag window `(lower, upper)` to refine in, for the matched string.
///
/// Bounds are the midpoints between this string's period and its
/// neighbours'. The lowest and highest strings have only one neighbour, so
/// the open side comes from `config`.
///
/// # Panics
/// * If `string_index` is not a valid index into `tuning`
pub fn search_window(
    string_index: usize,
    sample_rate: f32,
    tuning: &Tuning,
    config: &DetectorConfig,
) -> (usize, usize) {
    let period = tuning.period(string_index, sample_rate);
    let upper = if string_index == 0 {
        config.lowest_string_upper_limit
    } else {
        ((tuning.period(string_index - 1, sample_rate) + period) / 2.0).floor() as usize
    };
    let lower = if string_index + 1 == tuning.len() {
        config.highest_string_lower_limit
    } else {
        ((period + tuning.period(string_index + 1, sample_rate)) / 2.0).floor() as usize
    };
    (lower, upper)
}

/// Scans every lag in `lower..=upper` and returns the one with the smallest
/// mean absolute difference. The first minimum wins.
///
/// # Returns
/// * `None` - the window is empty or lies entirely outside the buffer
pub fn refine_lag(signal: &[f32], lower: usize, upper: usize) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for lag in lower.max(1)..=upper {
        let Some(diff) = mean_abs_difference(signal, lag) else {
            break; // every longer lag is out of the buffer too
        };
        if best.is_none_or(|(_, min)| diff < min) {
            best = Some((lag, diff));
        }
    }
    best.map(|(lag, _)| lag)
}

/// Runs both phases and converts the winning lag to a frequency.
///
/// Does not apply the gate or the plausibility check; see
/// [`Analyzer`](crate::Analyzer) for the full pipeline.
///
/// # Returns
/// * `None` - no string's lag fits in the buffer
/// * `Some` with `lag: None` - a string matched but refinement found no lag
pub fn estimate(
    signal: &[f32],
    sample_rate: f32,
    tuning: &Tuning,
    config: &DetectorConfig,
) -> Option<PitchEstimate> {
    let string_index =
        coarse_string_match(signal, sample_rate, tuning, config.subharmonic_tolerance)?;
    let window = search_window(string_index, sample_rate, tuning, config);
    let lag = refine_lag(signal, window.0, window.1);
    let frequency_hz = lag.map(|lag| (sample_rate / lag as f32).floor());

    log::debug!(
        "Coarse string {}, window [{}, {}], lag {:?}, {:?} Hz",
        string_index,
        window.0,
        window.1,
        lag,
        frequency_hz
    );

    Some(PitchEstimate {
        string_index,
        window,
        lag,
        frequency_hz,
    })
}
