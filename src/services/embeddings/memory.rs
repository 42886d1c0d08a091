use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;

use super::{record, EmbeddingStore, EmbeddingStream, StoreResult};
use crate::models::Embedding;

/// Embedding store over an in-memory snapshot
///
/// Records go through the same validation as the persistent backends; invalid ones are
/// dropped with a warning when the store is built.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<Vec<Embedding>>,
}

impl InMemoryStore {
    pub fn new(records: Vec<Embedding>) -> Self {
        let records = records
            .into_iter()
            .filter_map(|e| match record::validate(e.movie_id, e.title, e.vector) {
                Ok(embedding) => Some(embedding),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping malformed embedding record");
                    None
                }
            })
            .collect();

        Self {
            records: Arc::new(records),
        }
    }

    /// Builds a store from raw ingestion records
    pub fn from_json_records(records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .filter_map(|value| match record::parse_record(value) {
                Ok(embedding) => Some(embedding),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping malformed embedding record");
                    None
                }
            })
            .collect();

        Self {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl EmbeddingStore for InMemoryStore {
    async fn lookup_by_id(&self, movie_id: &str) -> StoreResult<Option<Embedding>> {
        Ok(self
            .records
            .iter()
            .find(|e| e.movie_id == movie_id)
            .cloned())
    }

    async fn scan_all(&self) -> StoreResult<EmbeddingStream> {
        let records = Arc::clone(&self.records);
        let len = records.len();
        Ok(stream::iter(0..len)
            .map(move |i| Ok(records[i].clone()))
            .boxed())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
