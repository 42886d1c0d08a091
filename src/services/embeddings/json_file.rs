//! File-backed embedding store
//!
//! Reads a JSON array of embedding records. The array is parsed element by element on a
//! blocking task, and each valid record is pushed through a bounded channel, so only
//! `buffer` records are ever held in memory regardless of file size.

use serde::de::{self, Deserializer as _, SeqAccess, Visitor};
use serde_json::Value;
use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tokio::sync::mpsc;
use tracing::instrument;

use super::{
    find_in_stream, producer_stream, record, scan_channel, EmbeddingStore, EmbeddingStream,
    ScanStats, StoreError, StoreResult,
};
use crate::models::Embedding;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    buffer: usize,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, buffer: usize) -> Self {
        Self {
            path: path.into(),
            buffer,
        }
    }

    async fn open(&self) -> StoreResult<File> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to open embeddings file");
            StoreError::Unavailable(format!(
                "cannot open embeddings file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(file.into_std().await)
    }
}

#[async_trait::async_trait]
impl EmbeddingStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn lookup_by_id(&self, movie_id: &str) -> StoreResult<Option<Embedding>> {
        let found = find_in_stream(self.scan_all().await?, movie_id).await?;
        match &found {
            Some(_) => tracing::debug!(movie_id, "Embedding found"),
            None => tracing::debug!(movie_id, "No embedding found"),
        }
        Ok(found)
    }

    async fn scan_all(&self) -> StoreResult<EmbeddingStream> {
        let file = self.open().await?;
        let path = self.path.clone();
        let (tx, rx) = scan_channel(self.buffer);

        let task = tokio::task::spawn_blocking(move || read_records(file, &path, tx));

        Ok(producer_stream(rx, task))
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// Parses the file and forwards records until the array ends, the consumer goes away,
/// or the file turns out to be corrupt
fn read_records(file: File, path: &Path, tx: mpsc::Sender<StoreResult<Embedding>>) {
    let mut stats = ScanStats::default();
    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));

    let result = (&mut deserializer)
        .deserialize_seq(RecordForwarder {
            tx: &tx,
            stats: &mut stats,
        })
        .and_then(|()| deserializer.end());

    match result {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            yielded = stats.yielded,
            skipped = stats.skipped,
            "Embeddings file scan complete"
        ),
        Err(_) if tx.is_closed() => tracing::debug!(
            path = %path.display(),
            yielded = stats.yielded,
            "Embeddings file scan abandoned by consumer"
        ),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Embeddings file is corrupt");
            let _ = tx.blocking_send(Err(StoreError::Unavailable(format!(
                "failed to read embeddings file {}: {}",
                path.display(),
                e
            ))));
        }
    }
}

struct RecordForwarder<'a> {
    tx: &'a mpsc::Sender<StoreResult<Embedding>>,
    stats: &'a mut ScanStats,
}

impl<'de, 'a> Visitor<'de> for RecordForwarder<'a> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of embedding records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(value) = seq.next_element::<Value>()? {
            match record::parse_record(value) {
                Ok(embedding) => {
                    if self.tx.blocking_send(Ok(embedding)).is_err() {
                        return Err(de::Error::custom("embedding consumer dropped"));
                    }
                    self.stats.yielded += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed embedding record");
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(())
    }
}
