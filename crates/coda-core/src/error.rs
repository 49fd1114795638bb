//! Engine error taxonomy.

use thiserror::Error;

/// Input errors raised by column edits and the algebra/statistics operations.
///
/// Every variant aborts the operation that detected it. Nothing is ever
/// silently corrected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The provided name was empty (or sanitized to nothing).
    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },

    /// Two code names sanitize to the same string.
    #[error("code `{code}` collides with an existing code in column `{column}`")]
    CodeCollision { column: String, code: String },

    /// A code was referenced that the column schema does not define.
    #[error("column `{column}` has no code named `{code}`")]
    NoSuchCode { column: String, code: String },

    /// A cell was given the wrong number of code values.
    #[error("column `{column}` expects {expected} code values, got {found}")]
    ValueCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A cell whose onset is after its offset.
    #[error("cell {ordinal} in column `{column}` is inverted ({onset} > {offset})")]
    InvertedInterval {
        column: String,
        ordinal: u32,
        onset: i64,
        offset: i64,
    },

    /// A cell with a negative timestamp.
    #[error("cell {ordinal} in column `{column}` has a negative timestamp")]
    NegativeTime { column: String, ordinal: u32 },

    /// A cell whose offset was never set, found while merging.
    #[error("cell {ordinal} in column `{column}` has an unset offset")]
    UnsetOffset { column: String, ordinal: u32 },

    /// A named column the caller required does not exist.
    #[error("column `{name}` not found")]
    ColumnNotFound { name: String },

    /// An operation that needs at least one source column got none.
    #[error("{operation} requires at least one column")]
    NoColumns { operation: &'static str },

    /// Resample step must be positive.
    #[error("step must be positive, got {step}")]
    InvalidStep { step: i64 },

    /// A time range whose start is after its stop.
    #[error("invalid time range: start {start} is after stop {stop}")]
    InvalidRange { start: i64, stop: i64 },

    /// Time tolerances cannot be negative.
    #[error("tolerance must not be negative, got {tolerance}")]
    NegativeTolerance { tolerance: i64 },

    /// A validator pattern failed to compile.
    #[error("invalid pattern for code `{code}`: {message}")]
    InvalidPattern { code: String, message: String },
}
