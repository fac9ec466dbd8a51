//! Error types for cron parsing and scheduling.

use tether_runloop::RunLoopError;
use thiserror::Error;

use crate::field::FieldKind;

/// Why a single cron field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("empty expression")]
    Empty,

    #[error("not a number")]
    NotANumber,

    #[error("more than one '/'")]
    MultipleDivisors,

    #[error("divisor must be a positive integer")]
    InvalidDivisor,

    #[error("more than one '-'")]
    MultipleRanges,

    #[error("range start is greater than range end")]
    ReversedRange,
}

/// Errors that can occur while parsing or scheduling cron tasks.
#[derive(Debug, Error)]
pub enum CronError {
    /// The expression did not split into exactly five fields.
    #[error("Expected 5 cron fields, found {found}")]
    FieldCount { found: usize },

    /// One field failed to parse.
    #[error("Invalid {field} field '{token}': {reason}")]
    InvalidField {
        field: FieldKind,
        token: String,
        reason: FieldErrorKind,
    },

    /// Queueing on the scheduler's invoker failed.
    #[error(transparent)]
    Runtime(#[from] RunLoopError),
}

/// Result type for cron operations.
pub type CronResult<T> = Result<T, CronError>;
