//! In-memory TTL cache for whole result aggregates.
//!
//! Caches the final [`ResultAggregate`] keyed by the (lowercased query,
//! sorted source set, per-source cap) triple. Uses [`moka`] for
//! async-friendly caching with configurable TTL and automatic eviction.

use std::sync::OnceLock;
use std::time::Duration;

use moka::future::Cache;

use crate::types::{ResultAggregate, SourceId};

/// Maximum number of cached aggregates.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Global process-wide aggregate cache.
///
/// Lazily initialised on first access. TTL is set when first created
/// and cannot be changed after initialisation.
static CACHE: OnceLock<Cache<CacheKey, ResultAggregate>> = OnceLock::new();

/// Composite cache key: normalised query + sorted source set + cap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, trimmed query string.
    query: String,
    /// Sorted, deduplicated source set, so `[google, wikipedia]` and
    /// `[wikipedia, google]` produce the same key.
    sources: Vec<SourceId>,
    /// Per-source result cap.
    max_results: usize,
}

impl CacheKey {
    /// Build a deterministic cache key from request fields.
    pub fn new(query: &str, sources: &[SourceId], max_results: usize) -> Self {
        let mut sorted: Vec<SourceId> = sources.to_vec();
        sorted.sort();
        sorted.dedup();
        Self {
            query: query.trim().to_lowercase(),
            sources: sorted,
            max_results,
        }
    }
}

fn get_or_init_cache(ttl_seconds: u64) -> &'static Cache<CacheKey, ResultAggregate> {
    CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build()
    })
}

/// Look up a cached aggregate for the given key.
///
/// Returns `Some(aggregate)` on cache hit, `None` on miss.
pub async fn get(key: &CacheKey, ttl_seconds: u64) -> Option<ResultAggregate> {
    let cache = get_or_init_cache(ttl_seconds);
    cache.get(key).await
}

/// Insert an aggregate into the cache.
pub async fn insert(key: CacheKey, aggregate: ResultAggregate, ttl_seconds: u64) {
    let cache = get_or_init_cache(ttl_seconds);
    cache.insert(key, aggregate).await;
}
