use serde::{Deserialize, Serialize};

pub mod embedding;
pub mod movie;

pub use embedding::{Embedding, SimilarMovie, SimilarityResult};
pub use movie::{MovieDetails, MovieSummary};

/// Request body for POST /api/similar
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityRequest {
    pub movie_ids: Vec<String>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

/// One ranked movie in a similarity response, with catalog metadata when known
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimilarMovieResponse {
    pub movie_id: String,
    pub title: String,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl From<SimilarMovie> for SimilarMovieResponse {
    fn from(movie: SimilarMovie) -> Self {
        Self {
            movie_id: movie.movie_id,
            title: movie.title,
            similarity: movie.similarity,
            imdb_id: None,
            tmdb_id: None,
            year: None,
        }
    }
}

impl SimilarMovieResponse {
    /// Attaches catalog identifiers. The title stays the one carried by the embedding.
    pub fn with_details(mut self, details: &MovieDetails) -> Self {
        self.imdb_id = details.imdb_id.clone();
        self.tmdb_id = details.tmdb_id.clone();
        self.year = details.year;
        self
    }
}

/// Response body for POST /api/similar
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResponse {
    pub similar_movies: Vec<SimilarMovieResponse>,
    pub missing_movies: Vec<String>,
}

/// Request body for POST /api/embeddings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingLookupRequest {
    pub movie_ids: Vec<String>,
}

/// Per-id result of an embedding lookup; nulls when the id has no embedding
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingLookupEntry {
    pub movie_id: String,
    pub title: Option<String>,
    pub embedding: Option<Vec<f32>>,
}
