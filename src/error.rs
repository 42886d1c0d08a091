use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::embeddings::StoreError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No valid embeddings found for the provided movie IDs")]
    NoValidSeeds,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name of the error, echoed in response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Cache(_) => "cache",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NoValidSeeds => "no_valid_seeds",
            AppError::DimensionMismatch { .. } => "dimension_mismatch",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Cancelled(_) => "cancelled",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            // Only reachable when a caller propagates instead of skipping
            err @ StoreError::Malformed { .. } => AppError::Internal(err.to_string()),
        }
    }
}

/// Request bodies that fail to parse are caller errors, reported like any other bad input
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NoValidSeeds => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::DimensionMismatch { expected, actual } => {
                tracing::error!(
                    expected,
                    actual,
                    "Embedding dimension mismatch, corpus needs investigation"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::StoreUnavailable(_) | AppError::Cancelled(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
