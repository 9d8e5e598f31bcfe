//! Statement construction error types

use thiserror::Error;

/// Errors raised while building the typed statement graph from raw documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatementError {
    /// The document does not have the shape of an xAPI statement
    #[error("Malformed statement: {0}")]
    Malformed(String),

    /// A document inside a fetched batch is malformed
    #[error("Malformed statement at index {index}: {message}")]
    MalformedAt { index: usize, message: String },

    /// A `timestamp` or `stored` value could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A `duration` value is neither an ISO-8601 string nor a number of seconds
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

impl From<serde_json::Error> for StatementError {
    fn from(err: serde_json::Error) -> Self {
        StatementError::Malformed(err.to_string())
    }
}

/// Result type alias for statement construction
pub type StatementResult<T> = Result<T, StatementError>;
