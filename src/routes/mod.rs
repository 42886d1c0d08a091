use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{RecommendationSettings, SimilarityEngine, TitleCatalog},
};

pub mod embeddings;
pub mod movies;
pub mod similar;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: SimilarityEngine,
    pub catalog: Arc<dyn TitleCatalog>,
    pub settings: RecommendationSettings,
}

impl AppState {
    pub fn new(
        engine: SimilarityEngine,
        catalog: Arc<dyn TitleCatalog>,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            engine,
            catalog,
            settings,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        // Outermost first: the request id must exist before the trace span is built
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(movies::search))
        .route("/similar", post(similar::find_similar))
        .route("/embeddings", post(embeddings::lookup))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
