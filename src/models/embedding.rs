use serde::{Deserialize, Serialize};

/// A movie's embedding as stored in the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub movie_id: String,
    pub title: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(movie_id: impl Into<String>, title: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            movie_id: movie_id.into(),
            title: title.into(),
            vector,
        }
    }
}

/// A corpus movie ranked against the aggregated seed vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMovie {
    pub movie_id: String,
    pub title: String,
    pub similarity: f32,
}

/// Outcome of one similarity request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimilarityResult {
    /// Best matches first
    pub ranked: Vec<SimilarMovie>,
    /// Seed ids with no resolvable embedding, in request order
    pub missing_ids: Vec<String>,
}
