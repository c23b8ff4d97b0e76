//! Error types for cotejar
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Every failure in this crate is a data-shape problem to be fixed by the
//! caller, not a transient condition. There are no retries anywhere.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Cotejar error types
#[derive(Error, Debug)]
pub enum Error {
    /// Rescaling range collapsed to a point (max == min)
    #[error("Degenerate score range: min == max == {min}\nMin-max scaling would divide by zero. Supply an explicit range or check the input column.")]
    DegenerateRange {
        /// Observed (or supplied) minimum
        min: f64,
        /// Observed (or supplied) maximum
        max: f64,
    },

    /// Expected column absent from an ingested table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Fewer than 2 paired observations available for a statistical test
    #[error("Insufficient samples for class '{class}': {observed} observation(s)\nt-tests need at least 2 paired observations per class.")]
    InsufficientSamples {
        /// Class label with too few observations
        class: String,
        /// Number of paired observations found
        observed: usize,
    },

    /// Malformed caller input (empty table, mismatched grid lengths, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
