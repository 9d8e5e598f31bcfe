//! Query error types
//!
//! Defines all error conditions that can occur while building and executing
//! statement queries. Callers can tell "store unreachable" (`Source`), "bad
//! data" (`Statement`), "bad query" (`InvalidPeriod`, `InvalidAggregation`)
//! and "no data" (`EmptyAverage`) apart.

use crate::model::StatementError;
use crate::source::{SourceError, StoreError};
use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// The statement source failed (transport, status, decoding)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A fetched document could not be turned into a statement
    #[error("Statement error: {0}")]
    Statement(#[from] StatementError),

    /// Grouping period other than day, week or month
    #[error("Invalid grouping period: {0}")]
    InvalidPeriod(String),

    /// Invalid aggregation request (e.g. average without a field)
    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),

    /// Sort direction other than asc or desc
    #[error("Invalid sort direction: {0}")]
    InvalidOrder(String),

    /// Projection requested without a `select` path
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Average over zero matching statements
    #[error("Cannot average `{0}` over zero statements")]
    EmptyAverage(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Source(e) => QueryError::Source(e),
            StoreError::Statement(e) => QueryError::Statement(e),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
