//! In-memory statement source
//!
//! Serves a fixed batch of documents, either given directly or read from a
//! local JSON dump (a bare array, or an LRS result object with a
//! `statements` array).

use super::{SourceError, StatementSource};
use crate::model::Statement;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub struct MemorySource {
    name: String,
    documents: Vec<Value>,
}

impl MemorySource {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            name: "memory".to_string(),
            documents,
        }
    }

    /// Serve already-built statements
    pub fn from_statements(statements: &[Statement]) -> Result<Self, SourceError> {
        let documents = statements
            .iter()
            .map(|statement| {
                statement
                    .to_value()
                    .map_err(|e| SourceError::Parse(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(documents))
    }

    /// Load a JSON dump from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))?;

        let documents = match value {
            Value::Array(documents) => documents,
            Value::Object(mut object) => match object.remove("statements") {
                Some(Value::Array(documents)) => documents,
                _ => {
                    return Err(SourceError::Parse(format!(
                        "{}: expected a `statements` array",
                        path.display()
                    )))
                }
            },
            _ => {
                return Err(SourceError::Parse(format!(
                    "{}: expected an array of statements",
                    path.display()
                )))
            }
        };

        Ok(Self {
            name: path.display().to_string(),
            documents,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl StatementSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        Ok(self.documents.clone())
    }
}
