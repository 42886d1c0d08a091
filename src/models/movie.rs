use serde::{Deserialize, Serialize};

/// Title search hit returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub movie_id: String,
    pub title: String,
}

/// Catalog row used to enrich similarity results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    pub movie_id: String,
    pub title: String,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub year: Option<i32>,
}
