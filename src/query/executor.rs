//! Query Executor
//!
//! Runs built queries against the cached snapshot of a [`StatementStore`]:
//!
//! ```text
//! Query → Snapshot (fetch on first use) → Pipeline → Rows | Values | Aggregate
//! ```

use crate::locale::LocaleResolver;
use crate::model::Statement;
use crate::query::ast::{Count, Query};
use crate::query::error::QueryResult;
use crate::query::path::{resolve, FieldPath, FieldValue};
use crate::query::pipeline::Aggregate;
use crate::source::StatementStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Query executor
pub struct QueryExecutor {
    store: Arc<StatementStore>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(store: Arc<StatementStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StatementStore> {
        &self.store
    }

    /// Matching statements, owned
    pub async fn statements(&self, query: &Query) -> QueryResult<Vec<Statement>> {
        let snapshot = self.store.statements().await?;
        let start = Instant::now();

        let rows: Vec<Statement> = query.statements(&snapshot).into_iter().cloned().collect();

        debug!(
            scanned = snapshot.len(),
            rows = rows.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Executed statements query"
        );
        Ok(rows)
    }

    /// Projected `select` values
    pub async fn values(&self, query: &Query) -> QueryResult<Vec<FieldValue>> {
        let snapshot = self.store.statements().await?;
        let start = Instant::now();

        let values = query.values(&snapshot)?;

        debug!(
            scanned = snapshot.len(),
            values = values.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Executed values query"
        );
        Ok(values)
    }

    pub async fn count(&self, query: &Query, count: &Count) -> QueryResult<Aggregate<usize>> {
        let snapshot = self.store.statements().await?;
        let start = Instant::now();

        let result = query.count(&snapshot, count);

        debug!(
            scanned = snapshot.len(),
            grouped = result.groups().is_some(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Executed count query"
        );
        Ok(result)
    }

    pub async fn average(&self, query: &Query, field: &str) -> QueryResult<Aggregate<f64>> {
        let snapshot = self.store.statements().await?;
        let start = Instant::now();

        let result = query.average(&snapshot, field)?;

        debug!(
            scanned = snapshot.len(),
            field,
            grouped = result.groups().is_some(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Executed average query"
        );
        Ok(result)
    }

    /// Display text at `path` for each matching statement, resolved for
    /// `locale`. Language maps go through the locale resolver; other values
    /// use their plain text form; absent values read `"undefined"`.
    pub async fn texts(
        &self,
        query: &Query,
        path: &str,
        locale: Option<&str>,
    ) -> QueryResult<Vec<String>> {
        let snapshot = self.store.statements().await?;
        let path = FieldPath::parse(path);
        let resolver = LocaleResolver::global();

        Ok(query
            .statements(&snapshot)
            .into_iter()
            .map(|statement| match resolve(statement, &path) {
                Some(FieldValue::Texts(map)) => resolver.resolve(Some(&map), locale),
                Some(FieldValue::Json(value)) if value.is_object() => {
                    resolver.resolve_json(&value, locale)
                }
                Some(value) => value
                    .key_text()
                    .unwrap_or_else(|| crate::locale::UNDEFINED.to_string()),
                None => crate::locale::UNDEFINED.to_string(),
            })
            .collect())
    }

    /// Re-fetch the store; returns the new statement count
    pub async fn refresh(&self) -> QueryResult<usize> {
        Ok(self.store.refresh().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{Conditions, Direction};
    use crate::query::error::QueryError;
    use crate::source::{MemorySource, SourceError, StatementSource};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn executor() -> QueryExecutor {
        let documents = vec![
            json!({
                "actor": {"name": "Alice", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
                "object": {"id": "http://example.com/a", "definition": {
                    "name": {"en-US": "Intro", "fr-FR": "Introduction"}
                }},
                "result": {"score": {"raw": 10}},
                "timestamp": "2025-01-01T08:00:00Z"
            }),
            json!({
                "actor": {"name": "Bob", "mbox": "mailto:bob@example.com"},
                "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
                "object": {"id": "http://example.com/b"},
                "result": {"score": {"raw": 20}},
                "timestamp": "2025-01-02T08:00:00Z"
            }),
        ];
        QueryExecutor::new(Arc::new(StatementStore::new(MemorySource::new(documents))))
    }

    #[tokio::test]
    async fn test_statements_and_values() {
        let executor = executor();
        let query = Query::order("timestamp", Direction::Desc).build();
        let rows = executor.statements(&query).await.unwrap();
        assert_eq!(rows[0].actor.name(), Some("Bob"));

        let query = Query::select("object.id").build();
        assert_eq!(
            executor.values(&query).await.unwrap(),
            vec![
                FieldValue::Text("http://example.com/a".into()),
                FieldValue::Text("http://example.com/b".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_count_and_average() {
        let executor = executor();
        let query = Query::all().build();
        assert_eq!(
            executor.count(&query, &Count::rows()).await.unwrap(),
            Aggregate::Total(2)
        );
        assert_eq!(
            executor.average(&query, "result.score.raw").await.unwrap(),
            Aggregate::Total(15.0)
        );

        let query = Query::filter(Conditions::new().eq("actor.name", "Nobody")).build();
        assert!(matches!(
            executor.average(&query, "result.score.raw").await,
            Err(QueryError::EmptyAverage(_))
        ));
    }

    #[tokio::test]
    async fn test_texts_resolve_language_maps() {
        let executor = executor();
        let query = Query::all().build();
        let texts = executor
            .texts(&query, "object.definition.name", Some("fr-FR"))
            .await
            .unwrap();
        assert_eq!(texts, vec!["Introduction".to_string(), "undefined".to_string()]);

        let names = executor.texts(&query, "actor.name", None).await.unwrap();
        assert_eq!(names, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    struct DownSource;

    #[async_trait]
    impl StatementSource for DownSource {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
            Err(SourceError::Unavailable)
        }
    }

    #[tokio::test]
    async fn test_source_errors_surface_unchanged() {
        let executor = QueryExecutor::new(Arc::new(StatementStore::new(DownSource)));
        let err = executor
            .count(&Query::all().build(), &Count::rows())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Source(SourceError::Unavailable)));
    }

    #[tokio::test]
    async fn test_refresh_reports_count() {
        let executor = executor();
        assert_eq!(executor.refresh().await.unwrap(), 2);
    }
}
