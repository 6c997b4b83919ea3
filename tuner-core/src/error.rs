//! Error types for the tuner core.
//!
//! A quiet or implausible buffer is not an error: it yields
//! [`Detection::NoSignal`](crate::Detection::NoSignal). The variants here are
//! setup faults the caller has to fix before the next cycle can succeed.

use thiserror::Error;

/// Result type for tuner operations.
pub type TunerResult<T> = Result<T, TunerError>;

/// Errors that can occur while configuring or running the analyzer.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The sample buffer has no samples.
    #[error("sample buffer is empty")]
    EmptyBuffer,

    /// The buffer cannot hold the longest lag needed by the tuning.
    #[error("sample buffer too short: {len} samples, need more than {required}")]
    BufferTooShort {
        /// Length of the buffer that was passed in.
        len: usize,
        /// Longest lag that must fit inside the buffer.
        required: usize,
    },

    /// Sample rate is zero, negative or not finite.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// The reference tuning cannot be used for matching.
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    /// A detector parameter is out of range.
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),

    /// Config JSON could not be parsed.
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
