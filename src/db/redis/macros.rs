/// A macro to simplify optional read-through caching in Redis.
///
/// Checks the cache (when one is configured) and returns a hit directly.
/// On a miss it awaits the provided block, hands the computed value to the
/// background writer if `$keep` accepts it, and returns the value.
///
/// # Arguments
/// * `$cache`: an `Option<&Cache>`; `None` disables caching.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live for stored values, in seconds.
/// * `$block`: future computing the value on a miss, yielding `AppResult<T>`.
/// * `$keep` (optional): predicate deciding whether a computed value is stored.
///
/// # Example
/// ```rust,ignore
/// let page = cached!(self.cache.as_ref(), key, 3600, async move {
///     fetch_page().await
/// }, |page: &SearchPage| page.ok)?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $crate::cached!($cache, $key, $ttl, $block, |_| true)
    };
    ($cache:expr, $key:expr, $ttl:expr, $block:expr, $keep:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key = $key;
        let hit = match cache {
            Some(cache) => cache.get_or_miss(&key).await,
            None => None,
        };
        match hit {
            Some(cached) => Ok(cached),
            None => {
                let value = $block.await?;
                if let Some(cache) = cache {
                    if ($keep)(&value) {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                }
                Ok(value)
            }
        }
    }};
}
