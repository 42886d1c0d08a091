use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::{io::Write, sync::Arc, time::Duration};

use similar_movies_api::{
    models::{Embedding, MovieDetails},
    routes::{create_router, AppState},
    services::{
        EmbeddingStore, InMemoryCatalog, InMemoryStore, JsonFileStore, RecommendationSettings,
        SimilarityEngine,
    },
};

fn details(id: &str, title: &str, imdb_id: Option<&str>, year: Option<i32>) -> MovieDetails {
    MovieDetails {
        movie_id: id.to_string(),
        title: title.to_string(),
        imdb_id: imdb_id.map(str::to_string),
        tmdb_id: None,
        year,
    }
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::new(
        vec![
            details("1", "Toy Story", Some("0114709"), Some(1995)),
            details("2", "Jumanji", None, Some(1995)),
            details("3", "Toy Story 2", Some("0120363"), Some(1999)),
            details("4", "Heat", None, Some(1995)),
        ],
        25,
    ))
}

fn corpus() -> Vec<Embedding> {
    vec![
        Embedding::new("1", "Toy Story (1995)", vec![1.0, 0.0]),
        Embedding::new("2", "Jumanji (1995)", vec![0.0, 1.0]),
        Embedding::new("3", "Toy Story 2 (1999)", vec![0.9, 0.1]),
        Embedding::new("4", "Heat (1995)", vec![0.5, 0.5]),
    ]
}

fn server_with_store(store: Arc<dyn EmbeddingStore>) -> TestServer {
    let state = AppState::new(
        SimilarityEngine::new(store),
        catalog(),
        RecommendationSettings {
            default_top_n: 10,
            max_top_n: 2,
            deadline: Duration::from_secs(5),
        },
    );
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    server_with_store(Arc::new(InMemoryStore::new(corpus())))
}

fn ids(response: &Value) -> Vec<String> {
    response["similarMovies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movieId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("picker-7"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "picker-7");

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_movie_search() {
    let server = create_test_server();

    let response = server.get("/api/movies").add_query_param("query", "toy").await;
    response.assert_status_ok();
    response.assert_json(&json!([
        { "movieId": "1", "title": "Toy Story" },
        { "movieId": "3", "title": "Toy Story 2" },
    ]));
}

#[tokio::test]
async fn test_movie_search_requires_query() {
    let server = create_test_server();

    let response = server.get("/api/movies").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "invalid_input");

    let response = server.get("/api/movies").add_query_param("query", "  ").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_movie_search_without_hits() {
    let server = create_test_server();

    let response = server
        .get("/api/movies")
        .add_query_param("query", "casablanca")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_similar_movies() {
    let server = create_test_server();

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["1", "2"] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    // topN falls back to the default and is then capped at two
    assert_eq!(ids(&body), vec!["4", "3"]);
    assert_eq!(body["missingMovies"], json!([]));

    let first = &body["similarMovies"][0];
    assert_eq!(first["title"], "Heat (1995)");
    assert!((first["similarity"].as_f64().unwrap() - 1.0).abs() < 1e-5);
    assert_eq!(first["year"], 1995);
    assert!(first.get("imdbId").is_none());

    let second = &body["similarMovies"][1];
    assert_eq!(second["imdbId"], "0120363");
    assert!(second["similarity"].as_f64().unwrap() < first["similarity"].as_f64().unwrap());
}

#[tokio::test]
async fn test_similar_movies_reports_missing_ids() {
    let server = create_test_server();

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["1", "9999"], "topN": 1 }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(ids(&body), vec!["3"]);
    assert_eq!(body["missingMovies"], json!(["9999"]));
}

#[tokio::test]
async fn test_similar_movies_with_no_known_seeds() {
    let server = create_test_server();

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["9998", "9999"] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["kind"], "no_valid_seeds");
}

#[tokio::test]
async fn test_similar_movies_rejects_bad_requests() {
    let server = create_test_server();

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["1"], "topN": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_bodies_are_structured_bad_requests() {
    let server = create_test_server();

    for body in [
        json!({ "movieIds": ["1"], "topN": -1 }),
        json!({ "movieIds": "1" }),
        json!({}),
    ] {
        let response = server.post("/api/similar").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["kind"], "invalid_input", "body: {}", body);
        assert!(error["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    let response = server
        .post("/api/embeddings")
        .json(&json!({ "movieIds": 7 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["kind"], "invalid_input");
}

#[tokio::test]
async fn test_similar_movies_from_embedding_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"movieId": 1, "title": "Toy Story (1995)", "embedding": [1.0, 0.0]}},
            {{"movieId": 2, "title": "Jumanji (1995)", "embedding": [0.0, 1.0]}},
            {{"movieId": 3, "title": "Broken", "embedding": "not a vector"}},
            {{"movieId": 4, "title": "Heat (1995)", "embedding": [0.6, 0.4]}}
        ]"#
    )
    .unwrap();

    let server = server_with_store(Arc::new(JsonFileStore::new(file.path(), 4)));

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["1"] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(ids(&body), vec!["4", "2"]);
}

#[tokio::test]
async fn test_unreadable_embedding_file_is_unavailable() {
    let server = server_with_store(Arc::new(JsonFileStore::new(
        "/nonexistent/movie_embeddings.json",
        4,
    )));

    let response = server
        .post("/api/similar")
        .json(&json!({ "movieIds": ["1"] }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "store_unavailable");
}

#[tokio::test]
async fn test_embedding_lookup() {
    let server = create_test_server();

    let response = server
        .post("/api/embeddings")
        .json(&json!({ "movieIds": ["3", "9999"] }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!([
        { "movieId": "3", "title": "Toy Story 2 (1999)", "embedding": [0.9, 0.1] },
        { "movieId": "9999", "title": null, "embedding": null },
    ]));
}

#[tokio::test]
async fn test_embedding_lookup_requires_ids() {
    let server = create_test_server();

    let response = server
        .post("/api/embeddings")
        .json(&json!({ "movieIds": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
