//! Relational movie catalog
//!
//! Serves title search for the movie picker and supplies catalog identifiers (IMDB, TMDB,
//! release year) for ranked similarity results. The catalog never decides which movies are
//! similar; it only describes them.

use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey, SharedPool},
    error::AppResult,
    models::{MovieDetails, MovieSummary},
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour

/// Trait for movie catalog backends
#[async_trait::async_trait]
pub trait TitleCatalog: Send + Sync {
    /// Titles containing `query`, exact matches first, then prefix matches, then the rest
    async fn search(&self, query: &str) -> AppResult<Vec<MovieSummary>>;

    /// Catalog rows for the given ids, in no particular order; unknown ids are omitted
    async fn details(&self, movie_ids: &[String]) -> AppResult<Vec<MovieDetails>>;
}

/// Escapes LIKE wildcards so user input only ever matches literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct PgTitleCatalog {
    pool: Arc<SharedPool>,
    cache: Option<Cache>,
    limit: i64,
}

impl PgTitleCatalog {
    pub fn new(pool: Arc<SharedPool>, cache: Option<Cache>, limit: i64) -> Self {
        Self { pool, cache, limit }
    }

    async fn query_titles(&self, query: &str) -> AppResult<Vec<MovieSummary>> {
        let pool = self.pool.get().await?;
        let escaped = escape_like(query);

        let movies = sqlx::query_as::<_, MovieSummary>(
            r#"
            SELECT movie_id, title
            FROM movies
            WHERE title ILIKE $1
            ORDER BY
                CASE
                    WHEN title ILIKE $2 THEN 1
                    WHEN title ILIKE $3 THEN 2
                    ELSE 3
                END,
                title
            LIMIT $4
            "#,
        )
        .bind(format!("%{}%", escaped))
        .bind(&escaped)
        .bind(format!("{}%", escaped))
        .bind(self.limit)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }
}

#[async_trait::async_trait]
impl TitleCatalog for PgTitleCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<MovieSummary>> {
        let key = CacheKey::TitleSearch {
            query: query.to_string(),
            limit: self.limit,
        };

        let movies: Vec<MovieSummary> = cached!(
            self.cache.as_ref(),
            key,
            SEARCH_CACHE_TTL,
            self.query_titles(query)
        )?;

        tracing::debug!(query, results = movies.len(), "Title search complete");
        Ok(movies)
    }

    async fn details(&self, movie_ids: &[String]) -> AppResult<Vec<MovieDetails>> {
        if movie_ids.is_empty() {
            return Ok(vec![]);
        }
        let pool = self.pool.get().await?;

        let rows = sqlx::query_as::<_, MovieDetails>(
            r#"
            SELECT movie_id, title, imdb_id, tmdb_id, year
            FROM movies
            WHERE movie_id = ANY($1)
            "#,
        )
        .bind(movie_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

/// Catalog over a fixed list of movies
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    movies: Vec<MovieDetails>,
    limit: usize,
}

impl InMemoryCatalog {
    pub fn new(movies: Vec<MovieDetails>, limit: usize) -> Self {
        Self { movies, limit }
    }
}

#[async_trait::async_trait]
impl TitleCatalog for InMemoryCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<MovieSummary>> {
        let needle = query.to_lowercase();
        let mut hits: Vec<(u8, &MovieDetails)> = self
            .movies
            .iter()
            .filter_map(|movie| {
                let title = movie.title.to_lowercase();
                if title == needle {
                    Some((1, movie))
                } else if title.starts_with(&needle) {
                    Some((2, movie))
                } else if title.contains(&needle) {
                    Some((3, movie))
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.title.cmp(&b.1.title)));

        Ok(hits
            .into_iter()
            .take(self.limit)
            .map(|(_, movie)| MovieSummary {
                movie_id: movie.movie_id.clone(),
                title: movie.title.clone(),
            })
            .collect())
    }

    async fn details(&self, movie_ids: &[String]) -> AppResult<Vec<MovieDetails>> {
        Ok(self
            .movies
            .iter()
            .filter(|movie| movie_ids.contains(&movie.movie_id))
            .cloned()
            .collect())
    }
}
