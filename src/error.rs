//! Error types for loading and scoring transaction tables

use thiserror::Error;

/// Failures that abort a run before any flag or score is computed.
#[derive(Debug, Error)]
pub enum InputError {
    /// Malformed CSV, or a cell that could not be coerced (e.g. a non-numeric Amount)
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    /// One or more of TransactionID, UserID, Timestamp, Amount is missing from the header
    #[error("missing required column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<&'static str> },

    /// Timestamp cell in a data row (1-based) could not be parsed
    #[error("row {row}: unparseable Timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("failed to open input: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the scoring pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// A user group with no rows reached the aggregator. Cannot happen for
    /// groups built from loaded rows; treated as an invariant violation.
    #[error("invariant violated: user {user_id:?} has no transactions")]
    EmptyUserGroup { user_id: String },

    #[error("invalid rule configuration: {0}")]
    Config(String),
}
