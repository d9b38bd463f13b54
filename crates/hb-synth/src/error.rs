//! Synthesis error types.

use thiserror::Error;

/// Error raised when a write would fall outside the sample buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthError {
    #[error("region of {length} samples at {offset} exceeds buffer of {len} samples")]
    OutOfBounds {
        offset: usize,
        length: usize,
        len: usize,
    },
}

/// Invalid pulse schedule parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("burst length must be positive")]
    EmptyBurst,
    #[error("period of {period} samples must exceed burst length of {burst} samples")]
    PeriodTooShort { period: usize, burst: usize },
    #[error("bit count must be positive")]
    NoBits,
}
