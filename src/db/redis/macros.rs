/// Read-through caching around an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`, queues the
/// result for caching with `$ttl` seconds to live, and returns it. `$cache` is an
/// `Option<Cache>`-like value (`Option<&Cache>`); with `None` the block always runs.
/// Cache read failures are logged and treated as a miss, so Redis being down never fails
/// the request.
///
/// # Example
/// ```rust,ignore
/// let movies: Vec<MovieSummary> = cached!(self.cache.as_ref(), key, 3600, async {
///     self.query_titles(query).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache = $cache;
        let key = $key;
        let hit = match cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, falling through");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(value)
            }
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = cache {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
