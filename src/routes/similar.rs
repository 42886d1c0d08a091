use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::AppState;
use crate::{
    error::AppResult,
    models::{SimilarityRequest, SimilarityResponse},
    services::recommendations,
};

/// Handler for similarity recommendations
pub async fn find_similar(
    State(state): State<AppState>,
    payload: Result<Json<SimilarityRequest>, JsonRejection>,
) -> AppResult<Json<SimilarityResponse>> {
    let Json(request) = payload?;
    let response = recommendations::get_recommendations(
        &state.engine,
        state.catalog.as_ref(),
        state.settings,
        request,
    )
    .await?;
    Ok(Json(response))
}
