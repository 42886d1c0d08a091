//! Embedding store abstraction
//!
//! The similarity engine only needs two capabilities from storage: a point lookup by movie
//! id and a single forward pass over the whole corpus. Every backend (JSON file, Postgres,
//! in-memory) implements both behind [`EmbeddingStore`], so the engine never knows which
//! one it is talking to.

use futures::stream::{self, BoxStream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::models::Embedding;

pub mod json_file;
pub mod memory;
pub mod postgres;
pub mod record;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;
pub use postgres::PgEmbeddingStore;

/// Errors raised by embedding storage
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Storage could not be opened or failed while being read
    #[error("{0}")]
    Unavailable(String),

    /// A stored record is structurally invalid
    #[error("malformed record {}: {reason}", .movie_id.as_deref().unwrap_or("<unknown>"))]
    Malformed {
        movie_id: Option<String>,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-pass stream over the corpus. Malformed records are never yielded; an `Err` item
/// means the scan failed and no further items follow.
pub type EmbeddingStream = BoxStream<'static, StoreResult<Embedding>>;

/// Trait for embedding storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Fetch one embedding by movie id
    ///
    /// A missing id is `Ok(None)`, never an error.
    async fn lookup_by_id(&self, movie_id: &str) -> StoreResult<Option<Embedding>>;

    /// Open a forward-only stream over every embedding in the corpus
    ///
    /// Fails with [`StoreError::Unavailable`] before yielding anything when the underlying
    /// resource cannot be opened.
    async fn scan_all(&self) -> StoreResult<EmbeddingStream>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Counters kept by corpus producers and logged when a scan ends
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ScanStats {
    pub yielded: usize,
    pub skipped: usize,
}

/// Channel pair a producer task writes embeddings into
pub(crate) fn scan_channel(
    capacity: usize,
) -> (
    mpsc::Sender<StoreResult<Embedding>>,
    mpsc::Receiver<StoreResult<Embedding>>,
) {
    mpsc::channel(capacity.max(1))
}

struct ProducerState {
    rx: mpsc::Receiver<StoreResult<Embedding>>,
    task: Option<JoinHandle<()>>,
}

/// Wraps the receiving end of a producer channel as an [`EmbeddingStream`]
///
/// When the channel closes the producer task is joined. A producer that panicked or was
/// aborted surfaces as a final `Unavailable` item, so a dead producer never looks like the
/// end of the corpus.
pub(crate) fn producer_stream(
    rx: mpsc::Receiver<StoreResult<Embedding>>,
    task: JoinHandle<()>,
) -> EmbeddingStream {
    let state = ProducerState {
        rx,
        task: Some(task),
    };

    stream::unfold(state, |mut state| async move {
        if let Some(item) = state.rx.recv().await {
            return Some((item, state));
        }

        let task = state.task.take()?;
        match task.await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(error = %e, "Embedding producer task failed");
                Some((
                    Err(StoreError::Unavailable(format!(
                        "embedding producer stopped unexpectedly: {}",
                        e
                    ))),
                    state,
                ))
            }
        }
    })
    .boxed()
}

/// Scans `stream` until the first embedding for `movie_id`, dropping the rest unread
pub(crate) async fn find_in_stream(
    mut stream: EmbeddingStream,
    movie_id: &str,
) -> StoreResult<Option<Embedding>> {
    while let Some(item) = stream.next().await {
        let embedding = item?;
        if embedding.movie_id == movie_id {
            return Ok(Some(embedding));
        }
    }
    Ok(None)
}
