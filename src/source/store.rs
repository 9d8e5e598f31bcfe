//! Cached statement store
//!
//! Holds the parsed statements of one source as an immutable `Arc<[Statement]>`
//! snapshot. The first reader loads it; `refresh` fetches a new batch without
//! holding the lock and swaps the snapshot in one step, so readers see either
//! the old or the new collection, never a mix.

use super::{SourceError, StatementSource};
use crate::model::{Statement, StatementError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Errors that can occur while loading the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Statement(#[from] StatementError),
}

pub struct StatementStore {
    source: Box<dyn StatementSource>,
    cache: RwLock<Option<Arc<[Statement]>>>,
}

impl StatementStore {
    pub fn new(source: impl StatementSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn StatementSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    /// The current snapshot, loading it on first use
    pub async fn statements(&self) -> Result<Arc<[Statement]>, StoreError> {
        if let Some(snapshot) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut cache = self.cache.write().await;
        // another reader may have loaded it while we waited
        if let Some(snapshot) = cache.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = self.load().await?;
        *cache = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Re-fetch and replace the snapshot. On failure the old snapshot stays.
    pub async fn refresh(&self) -> Result<Arc<[Statement]>, StoreError> {
        let snapshot = self.load().await?;
        *self.cache.write().await = Some(Arc::clone(&snapshot));
        info!(source = self.source.name(), statements = snapshot.len(), "Store refreshed");
        Ok(snapshot)
    }

    /// Drop the snapshot; the next read loads again
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    async fn load(&self) -> Result<Arc<[Statement]>, StoreError> {
        let start = Instant::now();
        let documents = self.source.fetch().await?;
        let statements = Statement::parse_many(documents)?;

        info!(
            source = self.source.name(),
            statements = statements.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statements loaded"
        );
        Ok(statements.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns one more statement on every fetch
    struct GrowingSource {
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StatementSource for GrowingSource {
        fn name(&self) -> &str {
            "growing"
        }

        async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((0..n)
                .map(|_| {
                    json!({
                        "actor": {"mbox": "mailto:alice@example.com"},
                        "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
                        "object": {"id": "http://example.com/course"}
                    })
                })
                .collect())
        }
    }

    struct StaticSource(Result<Vec<Value>, u16>);

    #[async_trait]
    impl StatementSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
            match &self.0 {
                Ok(documents) => Ok(documents.clone()),
                Err(status) => Err(SourceError::Api {
                    status: *status,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    fn growing() -> (StatementStore, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let store = StatementStore::new(GrowingSource {
            fetches: Arc::clone(&fetches),
        });
        (store, fetches)
    }

    #[tokio::test]
    async fn test_loads_lazily_once() {
        let (store, fetches) = growing();
        assert!(!store.is_loaded().await);

        assert_eq!(store.statements().await.unwrap().len(), 1);
        assert_eq!(store.statements().await.unwrap().len(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(store.is_loaded().await);
    }

    #[tokio::test]
    async fn test_refresh_swaps_snapshot() {
        let (store, fetches) = growing();
        let old = store.statements().await.unwrap();

        let new = store.refresh().await.unwrap();
        assert_eq!(new.len(), 2);
        assert_eq!(store.statements().await.unwrap().len(), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);

        // readers holding the old snapshot keep it intact
        assert_eq!(old.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reloads() {
        let (store, fetches) = growing();
        store.statements().await.unwrap();
        store.invalidate().await;
        assert_eq!(store.statements().await.unwrap().len(), 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_reads_fetch_once() {
        let (store, fetches) = growing();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.statements().await.map(|s| s.len()) })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_error_is_surfaced() {
        let store = StatementStore::new(StaticSource(Err(503)));
        let err = store.statements().await.unwrap_err();
        assert!(matches!(err, StoreError::Source(SourceError::Api { status: 503, .. })));
        assert!(!store.is_loaded().await);
    }

    #[tokio::test]
    async fn test_malformed_document_is_statement_error() {
        let store = StatementStore::new(StaticSource(Ok(vec![json!({"actor": {}})])));
        let err = store.statements().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Statement(StatementError::MalformedAt { index: 0, .. })
        ));
    }
}
