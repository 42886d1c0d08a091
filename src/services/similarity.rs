//! Similarity search engine
//!
//! Resolves seed movies to embeddings, averages them, and ranks the rest of the corpus by
//! cosine similarity to that average with an exact, single-pass scan. There is no index
//! and no result cache: every request re-resolves its seeds and re-scans the corpus.

use futures::{future::join_all, StreamExt};
use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Embedding, SimilarMovie, SimilarityResult},
    services::{
        embeddings::{EmbeddingStore, StoreError},
        vector_math,
    },
};

/// A scored corpus movie awaiting ranking
///
/// Orders by score, then by earlier scan position, so "greater" means "ranks higher".
#[derive(Debug)]
struct Candidate {
    score: f32,
    position: usize,
    movie_id: String,
    title: String,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Keeps the best `limit` candidates seen so far
///
/// Yields the same order as a stable descending sort by score over the whole scan followed
/// by truncation, while holding at most `limit` candidates.
struct TopCandidates {
    limit: usize,
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl TopCandidates {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(1024) + 1),
        }
    }

    fn offer(&mut self, candidate: Candidate) {
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(candidate));
            return;
        }
        if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    fn into_ranked(self) -> Vec<SimilarMovie> {
        // Ascending order of `Reverse` is descending order of candidates
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(c)| SimilarMovie {
                movie_id: c.movie_id,
                title: c.title,
                similarity: c.score,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct ScanSummary {
    scanned: usize,
    seeds_skipped: usize,
    duplicates: usize,
    non_finite: usize,
}

/// Finds the movies closest to the average of a set of seed movies
#[derive(Clone)]
pub struct SimilarityEngine {
    store: Arc<dyn EmbeddingStore>,
}

impl SimilarityEngine {
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EmbeddingStore> {
        &self.store
    }

    /// Ranks the corpus against the averaged embeddings of `seed_ids`
    ///
    /// Seeds without an embedding are reported in `missing_ids` and do not take part in
    /// the average. Duplicate seeds count once. Seeds never appear in the ranking. Fails
    /// with `NoValidSeeds` when no seed resolves, and with `StoreUnavailable` when the
    /// store breaks at any point, including mid-scan.
    #[instrument(skip(self, seed_ids), fields(store = self.store.name(), seeds = seed_ids.len()))]
    pub async fn find_top_similar(
        &self,
        seed_ids: &[String],
        top_n: usize,
    ) -> AppResult<SimilarityResult> {
        let start = Instant::now();
        let seeds = distinct_seeds(seed_ids, top_n)?;

        let (resolved, missing_ids) = self.resolve_seeds(&seeds).await?;
        if resolved.is_empty() {
            tracing::info!(missing = ?missing_ids, "None of the seed movies has an embedding");
            return Err(AppError::NoValidSeeds);
        }
        if !missing_ids.is_empty() {
            tracing::warn!(
                count = missing_ids.len(),
                missing = ?missing_ids,
                "Some seed movies have no embedding"
            );
        }

        let vectors: Vec<&[f32]> = resolved.iter().map(|e| e.vector.as_slice()).collect();
        let aggregated = vector_math::average(&vectors)?;

        let seed_set: HashSet<&str> = seeds.iter().copied().collect();
        let ranked = self.rank_corpus(&aggregated, &seed_set, top_n).await?;

        tracing::info!(
            resolved = resolved.len(),
            missing = missing_ids.len(),
            ranked = ranked.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Similarity search completed"
        );

        Ok(SimilarityResult {
            ranked,
            missing_ids,
        })
    }

    /// Same as [`find_top_similar`](Self::find_top_similar), failing with `Cancelled` when
    /// the whole request takes longer than `deadline`
    pub async fn find_top_similar_with_deadline(
        &self,
        seed_ids: &[String],
        top_n: usize,
        deadline: Duration,
    ) -> AppResult<SimilarityResult> {
        match tokio::time::timeout(deadline, self.find_top_similar(seed_ids, top_n)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Similarity search timed out");
                Err(AppError::Cancelled(format!(
                    "similarity search exceeded {}ms",
                    deadline.as_millis()
                )))
            }
        }
    }

    /// Looks every seed up concurrently and waits for all of them
    async fn resolve_seeds(&self, seeds: &[&str]) -> AppResult<(Vec<Embedding>, Vec<String>)> {
        let lookups = seeds.iter().map(|id| self.store.lookup_by_id(id));
        let outcomes = join_all(lookups).await;

        let mut resolved = Vec::with_capacity(seeds.len());
        let mut missing = Vec::new();
        let mut failure = None;

        for (id, outcome) in seeds.iter().zip(outcomes) {
            match outcome {
                Ok(Some(embedding)) => resolved.push(embedding),
                Ok(None) => missing.push(id.to_string()),
                Err(StoreError::Malformed { reason, .. }) => {
                    tracing::warn!(movie_id = *id, reason = %reason, "Seed embedding is malformed");
                    missing.push(id.to_string());
                }
                Err(e) => {
                    tracing::error!(movie_id = *id, error = %e, "Seed lookup failed");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok((resolved, missing)),
        }
    }

    /// Streams the corpus once, keeping the `top_n` best non-seed candidates
    async fn rank_corpus(
        &self,
        aggregated: &[f32],
        seed_set: &HashSet<&str>,
        top_n: usize,
    ) -> AppResult<Vec<SimilarMovie>> {
        let mut stream = self.store.scan_all().await?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut top = TopCandidates::new(top_n);
        let mut summary = ScanSummary::default();

        while let Some(item) = stream.next().await {
            let candidate = item.map_err(|e| {
                tracing::error!(
                    error = %e,
                    scanned = summary.scanned,
                    "Corpus scan failed, discarding partial ranking"
                );
                AppError::from(e)
            })?;
            let position = summary.scanned;
            summary.scanned += 1;

            if seed_set.contains(candidate.movie_id.as_str()) {
                summary.seeds_skipped += 1;
                continue;
            }
            if !seen.insert(candidate.movie_id.clone()) {
                summary.duplicates += 1;
                continue;
            }

            let score = vector_math::cosine_similarity(aggregated, &candidate.vector).map_err(|e| {
                tracing::error!(movie_id = %candidate.movie_id, error = %e, "Corpus embedding has the wrong dimension");
                e
            })?;
            if !score.is_finite() {
                summary.non_finite += 1;
                continue;
            }

            top.offer(Candidate {
                // -0.0 and 0.0 rank as ties
                score: score + 0.0,
                position,
                movie_id: candidate.movie_id,
                title: candidate.title,
            });
        }

        if summary.duplicates > 0 || summary.non_finite > 0 {
            tracing::warn!(
                duplicates = summary.duplicates,
                non_finite = summary.non_finite,
                "Corpus contains unrankable entries"
            );
        }
        tracing::debug!(
            scanned = summary.scanned,
            seeds_skipped = summary.seeds_skipped,
            "Corpus scan complete"
        );

        Ok(top.into_ranked())
    }
}

/// Validates the request and collapses duplicate seeds to their first occurrence
fn distinct_seeds(seed_ids: &[String], top_n: usize) -> AppResult<Vec<&str>> {
    if seed_ids.is_empty() {
        return Err(AppError::InvalidInput("Movie IDs are required".to_string()));
    }
    if top_n == 0 {
        return Err(AppError::InvalidInput("topN must be positive".to_string()));
    }
    if seed_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(AppError::InvalidInput(
            "Movie IDs must not be blank".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(seed_ids.len());
    Ok(seed_ids
        .iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect())
}
