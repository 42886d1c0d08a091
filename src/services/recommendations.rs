use std::{collections::HashMap, time::Duration};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        EmbeddingLookupEntry, SimilarMovieResponse, SimilarityRequest, SimilarityResponse,
    },
    services::{catalog::TitleCatalog, embeddings::StoreError, similarity::SimilarityEngine},
};

/// Request limits applied around the similarity engine
#[derive(Debug, Clone, Copy)]
pub struct RecommendationSettings {
    pub default_top_n: usize,
    pub max_top_n: usize,
    pub deadline: Duration,
}

impl From<&Config> for RecommendationSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_top_n: config.default_top_n,
            max_top_n: config.max_top_n,
            deadline: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            default_top_n: 10,
            max_top_n: 100,
            deadline: Duration::from_secs(30),
        }
    }
}

impl RecommendationSettings {
    fn top_n(&self, requested: Option<usize>) -> AppResult<usize> {
        match requested {
            None => Ok(self.default_top_n),
            Some(0) => Err(AppError::InvalidInput("topN must be positive".to_string())),
            Some(n) => Ok(n.min(self.max_top_n)),
        }
    }
}

/// Finds movies similar to the user's picks
///
/// The ranking comes entirely from the similarity engine, titles included. The catalog is
/// only consulted afterwards for IMDB/TMDB ids and release years; if it is unreachable
/// the ranking is returned without them.
pub async fn get_recommendations(
    engine: &SimilarityEngine,
    catalog: &dyn TitleCatalog,
    settings: RecommendationSettings,
    request: SimilarityRequest,
) -> AppResult<SimilarityResponse> {
    let top_n = settings.top_n(request.top_n)?;

    let result = engine
        .find_top_similar_with_deadline(&request.movie_ids, top_n, settings.deadline)
        .await?;

    let ranked_ids: Vec<String> = result.ranked.iter().map(|m| m.movie_id.clone()).collect();
    let details = match catalog.details(&ranked_ids).await {
        Ok(rows) => rows
            .into_iter()
            .map(|row| (row.movie_id.clone(), row))
            .collect::<HashMap<_, _>>(),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog enrichment failed, returning bare ranking");
            HashMap::new()
        }
    };

    let similar_movies = result
        .ranked
        .into_iter()
        .map(|movie| {
            let id = movie.movie_id.clone();
            let response = SimilarMovieResponse::from(movie);
            match details.get(&id) {
                Some(row) => response.with_details(row),
                None => response,
            }
        })
        .collect();

    Ok(SimilarityResponse {
        similar_movies,
        missing_movies: result.missing_ids,
    })
}

/// Raw embedding lookup, one entry per requested id in request order
///
/// Unknown and malformed ids come back with null fields. A store that cannot be reached
/// fails the whole lookup.
pub async fn lookup_embeddings(
    engine: &SimilarityEngine,
    movie_ids: &[String],
) -> AppResult<Vec<EmbeddingLookupEntry>> {
    if movie_ids.is_empty() {
        return Err(AppError::InvalidInput("movieIds must not be empty".to_string()));
    }

    let store = engine.store();
    let lookups = movie_ids.iter().map(|id| store.lookup_by_id(id));
    let results = futures::future::join_all(lookups).await;

    movie_ids
        .iter()
        .zip(results)
        .map(|(id, result)| match result {
            Ok(Some(embedding)) => Ok(EmbeddingLookupEntry {
                movie_id: id.clone(),
                title: Some(embedding.title),
                embedding: Some(embedding.vector),
            }),
            Ok(None) | Err(StoreError::Malformed { .. }) => Ok(EmbeddingLookupEntry {
                movie_id: id.clone(),
                title: None,
                embedding: None,
            }),
            Err(e) => Err(e.into()),
        })
        .collect()
}
