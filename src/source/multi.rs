//! Several stores behind one source
//!
//! Children are fetched concurrently. Any failure fails the whole fetch, so a
//! result never silently covers only some of the stores. Documents are merged
//! in child order and a statement id seen earlier is dropped.

use super::{SourceError, StatementSource};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

pub struct MultiSource {
    sources: Vec<Box<dyn StatementSource>>,
}

impl MultiSource {
    pub fn new(sources: Vec<Box<dyn StatementSource>>) -> Self {
        Self { sources }
    }

    /// Builder method: add another source
    pub fn with(mut self, source: impl StatementSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn statement_id(document: &Value) -> Option<String> {
    document
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
}

#[async_trait]
impl StatementSource for MultiSource {
    fn name(&self) -> &str {
        "multi"
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let batches = try_join_all(self.sources.iter().map(|source| source.fetch())).await?;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (source, batch) in self.sources.iter().zip(batches) {
            let before = merged.len();
            for document in batch {
                if let Some(id) = statement_id(&document) {
                    if !seen.insert(id) {
                        continue;
                    }
                }
                merged.push(document);
            }
            debug!(source = source.name(), added = merged.len() - before, "Merged batch");
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;

    struct FailingSource;

    #[async_trait]
    impl StatementSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
            Err(SourceError::Unavailable)
        }
    }

    fn doc(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "actor": {"name": name, "mbox": "mailto:x@example.com"},
            "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
            "object": {"id": "http://example.com/course"}
        })
    }

    #[tokio::test]
    async fn test_merge_drops_repeated_ids() {
        let a = MemorySource::new(vec![
            doc("6690e6c9-3ef0-4ed3-8b37-7f3964730bee", "first"),
            doc("d1f0b0a4-6a4e-4c4f-9a1f-0c8b3d9f2a11", "first"),
        ]);
        let b = MemorySource::new(vec![
            doc("6690E6C9-3EF0-4ED3-8B37-7F3964730BEE", "second"),
            doc("0b9c7ad6-2f4e-4d7e-8f57-9e4d1c2b3a44", "second"),
        ]);

        let merged = MultiSource::new(Vec::new()).with(a).with(b).fetch().await.unwrap();
        let names: Vec<_> = merged.iter().map(|d| d["actor"]["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["first", "first", "second"]);
    }

    #[tokio::test]
    async fn test_documents_without_id_are_kept() {
        let mut anonymous = doc("x", "anon");
        anonymous.as_object_mut().unwrap().remove("id");

        let merged = MultiSource::new(Vec::new())
            .with(MemorySource::new(vec![anonymous.clone()]))
            .with(MemorySource::new(vec![anonymous]))
            .fetch()
            .await
            .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_any_failure_fails_the_fetch() {
        let source = MultiSource::new(Vec::new())
            .with(MemorySource::new(vec![doc("6690e6c9-3ef0-4ed3-8b37-7f3964730bee", "ok")]))
            .with(FailingSource);

        assert!(matches!(source.fetch().await, Err(SourceError::Unavailable)));
    }
}
