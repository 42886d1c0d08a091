use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use similar_movies_api::{
    config::{Config, EmbeddingBackend},
    db::{create_redis_client, run_migrations, Cache, SharedPool},
    routes::{create_router, AppState},
    services::{
        EmbeddingStore, JsonFileStore, PgEmbeddingStore, PgTitleCatalog, RecommendationSettings,
        SimilarityEngine, TitleCatalog,
    },
};

const DEFAULT_LOG_FILTER: &str = "similar_movies_api=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;

    // Connects lazily; the file backend without a catalog hit never opens a connection
    let pool = Arc::new(SharedPool::new(
        config.database_url.clone(),
        config.db_max_connections,
    ));

    if config.run_migrations {
        let pg = pool.get().await.context("Database required for migrations")?;
        run_migrations(pg).await?;
    }

    let store: Arc<dyn EmbeddingStore> = match config.embedding_backend {
        EmbeddingBackend::File => {
            tracing::info!(path = %config.embeddings_path.display(), "Using JSON embedding file");
            Arc::new(JsonFileStore::new(
                config.embeddings_path.clone(),
                config.scan_buffer,
            ))
        }
        EmbeddingBackend::Postgres => {
            tracing::info!("Using Postgres embedding table");
            Arc::new(PgEmbeddingStore::new(pool.clone(), config.scan_buffer))
        }
    };

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = create_redis_client(url)?;
            let (cache, writer) = Cache::new(client).await;
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, title search caching disabled");
            (None, None)
        }
    };

    let catalog: Arc<dyn TitleCatalog> =
        Arc::new(PgTitleCatalog::new(pool.clone(), cache, config.search_limit));

    let state = AppState::new(
        SimilarityEngine::new(store),
        catalog,
        RecommendationSettings::from(&config),
    );
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
