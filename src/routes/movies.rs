use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::MovieSummary,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
}

/// Handler for the movie picker's title search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("query parameter is required".to_string()))?;

    let movies = state.catalog.search(query).await?;
    if movies.is_empty() {
        return Err(AppError::NotFound(format!("no movies match '{}'", query)));
    }

    Ok(Json(movies))
}
