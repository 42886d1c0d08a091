//! Validation of raw embedding records into [`Embedding`]s.
//!
//! Records look like `{"movieId": "1", "title": "Toy Story (1995)", "embedding": [...]}`.
//! Ingestion tooling has written `movieId` both as a string and as an integer, so both are
//! accepted and normalized to a string.

use serde_json::Value;

use super::{StoreError, StoreResult};
use crate::models::Embedding;

const ID_FIELD: &str = "movieId";
const TITLE_FIELD: &str = "title";
const VECTOR_FIELD: &str = "embedding";

/// Converts one raw JSON record into an [`Embedding`]
pub fn parse_record(record: Value) -> StoreResult<Embedding> {
    let Value::Object(mut fields) = record else {
        return Err(malformed(None, "record is not a JSON object"));
    };

    let movie_id = match fields.remove(ID_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
        Some(_) => return Err(malformed(None, "movieId must be a non-empty string or integer")),
        None => return Err(malformed(None, "missing movieId")),
    };

    let title = match fields.remove(TITLE_FIELD) {
        Some(Value::String(title)) => title,
        Some(Value::Null) | None => String::new(),
        Some(_) => return Err(malformed(Some(movie_id), "title must be a string")),
    };

    let values = match fields.remove(VECTOR_FIELD) {
        Some(Value::Array(values)) => values,
        Some(_) => return Err(malformed(Some(movie_id), "embedding must be an array")),
        None => return Err(malformed(Some(movie_id), "missing embedding")),
    };

    let mut vector = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match value.as_f64() {
            Some(v) => vector.push(v as f32),
            None => {
                return Err(malformed(
                    Some(movie_id),
                    &format!("embedding element {} is not a number", index),
                ))
            }
        }
    }

    validate(movie_id, title, vector)
}

/// Checks an already-typed record: non-blank id, non-empty vector of finite values
pub fn validate(movie_id: String, title: String, vector: Vec<f32>) -> StoreResult<Embedding> {
    if movie_id.trim().is_empty() {
        return Err(malformed(None, "blank movieId"));
    }
    if vector.is_empty() {
        return Err(malformed(Some(movie_id), "empty embedding"));
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(malformed(
            Some(movie_id),
            &format!("embedding element {} is not finite", index),
        ));
    }

    Ok(Embedding {
        movie_id,
        title,
        vector,
    })
}

fn malformed(movie_id: Option<String>, reason: &str) -> StoreError {
    StoreError::Malformed {
        movie_id,
        reason: reason.to_string(),
    }
}
