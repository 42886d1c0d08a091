//! Postgres-backed embedding store
//!
//! Embeddings live in `movie_embeddings(movie_id TEXT PRIMARY KEY, title TEXT,
//! embedding REAL[])`. Scans walk a server-side row cursor on a dedicated connection and
//! forward rows through a bounded channel, so the corpus is never collected client-side.

use futures::StreamExt;
use std::sync::Arc;
use tracing::instrument;

use super::{
    producer_stream, record, scan_channel, EmbeddingStore, EmbeddingStream, ScanStats,
    StoreError, StoreResult,
};
use crate::{db::SharedPool, models::Embedding};

const LOOKUP_SQL: &str = "SELECT movie_id, title, embedding FROM movie_embeddings WHERE movie_id = $1";
const SCAN_SQL: &str = "SELECT movie_id, title, embedding FROM movie_embeddings ORDER BY movie_id";

#[derive(Debug, sqlx::FromRow)]
struct EmbeddingRow {
    movie_id: String,
    title: Option<String>,
    embedding: Option<Vec<f32>>,
}

impl EmbeddingRow {
    fn into_embedding(self) -> StoreResult<Embedding> {
        let Some(vector) = self.embedding else {
            return Err(StoreError::Malformed {
                movie_id: Some(self.movie_id),
                reason: "missing embedding".to_string(),
            });
        };
        record::validate(self.movie_id, self.title.unwrap_or_default(), vector)
    }
}

/// Row-level decode failures are bad data, not a broken connection
fn is_row_error(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_))
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("embedding query failed: {}", err))
}

pub struct PgEmbeddingStore {
    pool: Arc<SharedPool>,
    buffer: usize,
}

impl PgEmbeddingStore {
    pub fn new(pool: Arc<SharedPool>, buffer: usize) -> Self {
        Self { pool, buffer }
    }
}

#[async_trait::async_trait]
impl EmbeddingStore for PgEmbeddingStore {
    #[instrument(skip(self))]
    async fn lookup_by_id(&self, movie_id: &str) -> StoreResult<Option<Embedding>> {
        let pool = self.pool.get().await?;

        let row = sqlx::query_as::<_, EmbeddingRow>(LOOKUP_SQL)
            .bind(movie_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                if is_row_error(&e) {
                    StoreError::Malformed {
                        movie_id: Some(movie_id.to_string()),
                        reason: e.to_string(),
                    }
                } else {
                    unavailable(e)
                }
            })?;

        row.map(EmbeddingRow::into_embedding).transpose()
    }

    async fn scan_all(&self) -> StoreResult<EmbeddingStream> {
        let pool = self.pool.get().await?;
        let mut conn = pool.acquire().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to acquire connection for embedding scan");
            unavailable(e)
        })?;
        let (tx, rx) = scan_channel(self.buffer);

        let task = tokio::spawn(async move {
            let mut stats = ScanStats::default();
            let mut rows = sqlx::query_as::<_, EmbeddingRow>(SCAN_SQL).fetch(&mut *conn);

            while let Some(row) = rows.next().await {
                let item = match row {
                    Ok(row) => row.into_embedding(),
                    Err(e) if is_row_error(&e) => Err(StoreError::Malformed {
                        movie_id: None,
                        reason: e.to_string(),
                    }),
                    Err(e) => {
                        tracing::error!(error = %e, "Embedding scan failed mid-stream");
                        let _ = tx.send(Err(unavailable(e))).await;
                        return;
                    }
                };

                match item {
                    Ok(embedding) => {
                        if tx.send(Ok(embedding)).await.is_err() {
                            tracing::debug!(yielded = stats.yielded, "Embedding scan abandoned by consumer");
                            return;
                        }
                        stats.yielded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping malformed embedding row");
                        stats.skipped += 1;
                    }
                }
            }

            tracing::debug!(
                yielded = stats.yielded,
                skipped = stats.skipped,
                "Embedding table scan complete"
            );
        });

        Ok(producer_stream(rx, task))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_into_embedding() {
        let row = EmbeddingRow {
            movie_id: "1".to_string(),
            title: None,
            embedding: Some(vec![0.5, 0.5]),
        };
        let embedding = row.into_embedding().unwrap();
        assert_eq!(embedding.title, "");
        assert_eq!(embedding.vector, vec![0.5, 0.5]);
    }

    #[test]
    fn test_row_without_embedding_is_malformed() {
        let row = EmbeddingRow {
            movie_id: "1".to_string(),
            title: Some("Toy Story (1995)".to_string()),
            embedding: None,
        };
        assert!(matches!(
            row.into_embedding(),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_row_error_classification() {
        assert!(is_row_error(&sqlx::Error::Decode("bad float".into())));
        assert!(!is_row_error(&sqlx::Error::PoolTimedOut));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let shared = Arc::new(SharedPool::new("postgres://localhost:1/unused", 1));
        shared.close().await;
        let store = PgEmbeddingStore::new(shared, 8);

        assert!(matches!(
            store.lookup_by_id("1").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.scan_all().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
