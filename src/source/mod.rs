//! Statement Sources
//!
//! Where statement documents come from:
//! - `LrsClient`: one remote Learning Record Store over HTTP
//! - `MultiSource`: several stores fetched concurrently and merged
//! - `MemorySource`: an in-memory batch or a local JSON dump
//!
//! A `StatementStore` sits on top of any source and caches the parsed
//! statements until it is refreshed.

mod lrs;
mod memory;
mod multi;
mod store;

pub use lrs::{LrsClient, LrsConfig};
pub use memory::MemorySource;
pub use multi::MultiSource;
pub use store::{StatementStore, StoreError};

use crate::config::StoreConfig;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Common trait for all statement sources
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Fetch every statement document, in store order
    async fn fetch(&self) -> Result<Vec<Value>, SourceError>;
}

/// Errors that can occur while fetching statements
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No record store configured")]
    NotConfigured,

    #[error("Record store unavailable")]
    Unavailable,

    #[error("Request timed out")]
    Timeout,

    #[error("Record store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the source described by the configured stores: a single client for
/// one store, a merging source for several
pub fn from_config(stores: &[StoreConfig]) -> Result<Box<dyn StatementSource>, SourceError> {
    let mut clients = stores
        .iter()
        .map(|store| LrsClient::new(LrsConfig::from(store)))
        .collect::<Result<Vec<_>, _>>()?;

    match clients.len() {
        0 => Err(SourceError::NotConfigured),
        1 => Ok(Box::new(clients.remove(0))),
        _ => Ok(Box::new(MultiSource::new(
            clients
                .into_iter()
                .map(|client| Box::new(client) as Box<dyn StatementSource>)
                .collect(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str) -> StoreConfig {
        StoreConfig {
            endpoint: endpoint.to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_from_config_single_and_multi() {
        let single = from_config(&[store("http://lrs.example.com/xapi")]).unwrap();
        assert_eq!(single.name(), "http://lrs.example.com/xapi");

        let multi = from_config(&[
            store("http://a.example.com/xapi"),
            store("http://b.example.com/xapi"),
        ])
        .unwrap();
        assert_eq!(multi.name(), "multi");
    }

    #[test]
    fn test_from_config_requires_a_store() {
        let err = from_config(&[]).err().unwrap();
        assert!(matches!(err, SourceError::NotConfigured));
        assert_eq!(err.to_string(), "No record store configured");
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "Record store returned 401: Unauthorized");
    }
}
