use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::AppState;
use crate::{
    error::AppResult,
    models::{EmbeddingLookupEntry, EmbeddingLookupRequest},
    services::recommendations,
};

/// Debug handler returning stored vectors for the requested ids
pub async fn lookup(
    State(state): State<AppState>,
    payload: Result<Json<EmbeddingLookupRequest>, JsonRejection>,
) -> AppResult<Json<Vec<EmbeddingLookupEntry>>> {
    let Json(request) = payload?;
    let entries = recommendations::lookup_embeddings(&state.engine, &request.movie_ids).await?;
    Ok(Json(entries))
}
