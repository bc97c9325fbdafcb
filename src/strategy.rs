//! Retrieval strategies and the per-source fallback chain.
//!
//! Each source module owns an ordered list of [`RetrievalStrategy`]
//! implementations, tried in priority order until one yields at least one
//! result. Credentialed, structured APIs come first; HTML scraping next;
//! bare link extraction last. A strategy's internal failure is caught at
//! the strategy boundary and never propagates past the chain.

use async_trait::async_trait;

use crate::breaker::global_breaker;
use crate::error::SearchError;
use crate::types::{placeholder_snippet, placeholder_title, SearchResult, SourceId};

/// A single retrieval method for one source.
///
/// Implementations perform their own HTTP requests and parsing, and map
/// upstream failures into [`SearchError`]. Rate limiting or bot blocking
/// should surface as [`SearchError::Blocked`] so the circuit breaker can
/// back the strategy off across orchestration calls.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Stable short name, used for logs and breaker keys.
    fn name(&self) -> &'static str;

    /// Attempt retrieval, returning raw hits in upstream order.
    ///
    /// An `Ok(vec![])` means the strategy genuinely found nothing; the
    /// chain advances past it exactly as it advances past an error.
    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError>;
}

/// The heterogeneous shape a strategy extracts before normalization.
///
/// Different retrieval methods supply different field subsets: an API
/// returns title/link/snippet records, a link-only scrape returns bare
/// URLs. [`FallbackChain::run`] maps all of them into [`SearchResult`].
#[derive(Debug, Clone, Default)]
pub struct RawHit {
    /// Result title, if the retrieval method supplied one.
    pub title: Option<String>,
    /// Result URL. Hits with an empty URL are dropped during normalization.
    pub url: String,
    /// Snippet text, if any.
    pub snippet: Option<String>,
    /// RFC 3339 timestamp, if the upstream carries one.
    pub timestamp: Option<String>,
    /// Source-native relevance score, if the upstream carries one.
    pub relevance: Option<f64>,
}

impl RawHit {
    /// A hit carrying only a URL; title and snippet will be synthesized.
    pub fn url_only(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Map raw hits into canonical [`SearchResult`]s for `source`.
///
/// Hits without a URL are dropped (the non-empty-URL invariant); missing
/// titles and snippets are replaced with synthetic placeholders. Output
/// is truncated to `limit`.
pub fn normalize(
    source: SourceId,
    query: &str,
    hits: Vec<RawHit>,
    limit: usize,
) -> Vec<SearchResult> {
    hits.into_iter()
        .filter(|hit| !hit.url.trim().is_empty())
        .enumerate()
        .map(|(i, hit)| SearchResult {
            source,
            title: hit
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| placeholder_title(source, i)),
            url: hit.url,
            snippet: hit
                .snippet
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| placeholder_snippet(source, query)),
            timestamp: hit.timestamp,
            relevance: hit.relevance,
        })
        .take(limit)
        .collect()
}

/// An ordered chain of retrieval strategies for one source.
///
/// Only as deep as needed: Wikipedia has a single reliable strategy,
/// Google up to four. The chain never errors; exhaustion yields an empty
/// list, which the source module reports as its (empty) outcome.
pub struct FallbackChain {
    source: SourceId,
    strategies: Vec<Box<dyn RetrievalStrategy>>,
}

impl FallbackChain {
    /// Build a chain for `source` from strategies in priority order.
    pub fn new(source: SourceId, strategies: Vec<Box<dyn RetrievalStrategy>>) -> Self {
        Self { source, strategies }
    }

    /// Which source this chain retrieves for.
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Number of strategies in the chain.
    pub fn depth(&self) -> usize {
        self.strategies.len()
    }

    /// Run the chain: first strategy with a non-empty normalized result
    /// set wins. Every failure is logged and absorbed here.
    ///
    /// Strategies whose circuit is open are skipped without an attempt;
    /// blocked and errored attempts trip the breaker, genuinely-empty
    /// outcomes do not.
    pub async fn run(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        for strategy in &self.strategies {
            let key = (self.source, strategy.name());

            let allowed = global_breaker()
                .lock()
                .map(|mut breaker| breaker.should_attempt(key))
                .unwrap_or(true);
            if !allowed {
                tracing::warn!(
                    source = %self.source,
                    strategy = strategy.name(),
                    "strategy circuit open, skipping"
                );
                continue;
            }

            match strategy.attempt(query, limit).await {
                Ok(hits) if !hits.is_empty() => {
                    let results = normalize(self.source, query, hits, limit);
                    if results.is_empty() {
                        // Every hit lacked a URL; treat as a miss.
                        tracing::debug!(
                            source = %self.source,
                            strategy = strategy.name(),
                            "all hits dropped during normalization"
                        );
                        continue;
                    }
                    if let Ok(mut breaker) = global_breaker().lock() {
                        breaker.record_success(key);
                    }
                    tracing::debug!(
                        source = %self.source,
                        strategy = strategy.name(),
                        count = results.len(),
                        "strategy returned results"
                    );
                    return results;
                }
                Ok(_) => {
                    tracing::debug!(
                        source = %self.source,
                        strategy = strategy.name(),
                        "strategy found no results"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        source = %self.source,
                        strategy = strategy.name(),
                        error = %err,
                        "strategy attempt failed"
                    );
                    if let Ok(mut breaker) = global_breaker().lock() {
                        breaker.record_failure(key);
                    }
                }
            }
        }

        tracing::warn!(source = %self.source, "all retrieval strategies exhausted");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubStrategy {
        name: &'static str,
        outcome: Result<Vec<RawHit>, fn() -> SearchError>,
        calls: Arc<AtomicUsize>,
    }

    impl StubStrategy {
        fn hits(name: &'static str, hits: Vec<RawHit>, calls: Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                name,
                outcome: Ok(hits),
                calls,
            })
        }

        fn failing(name: &'static str, err: fn() -> SearchError, calls: Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                name,
                outcome: Err(err),
                calls,
            })
        }
    }

    #[async_trait]
    impl RetrievalStrategy for StubStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _query: &str, _limit: usize) -> Result<Vec<RawHit>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(hits) => Ok(hits.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn full_hit(url: &str) -> RawHit {
        RawHit {
            title: Some("A title".into()),
            url: url.into(),
            snippet: Some("A snippet".into()),
            timestamp: None,
            relevance: None,
        }
    }

    #[test]
    fn normalize_drops_empty_urls() {
        let hits = vec![RawHit::url_only(""), full_hit("https://example.com")];
        let results = normalize(SourceId::Google, "rust", hits, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://example.com");
    }

    #[test]
    fn normalize_synthesizes_title_and_snippet() {
        let hits = vec![RawHit::url_only("https://example.com")];
        let results = normalize(SourceId::Google, "rust ownership", hits, 10);
        assert_eq!(results[0].title, "google result 1");
        assert_eq!(results[0].snippet, "google search result for: rust ownership");
    }

    #[test]
    fn normalize_truncates_to_limit() {
        let hits: Vec<RawHit> = (0..10)
            .map(|i| full_hit(&format!("https://example{i}.com")))
            .collect();
        let results = normalize(SourceId::Wikipedia, "rust", hits, 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn normalize_keeps_real_fields() {
        let hits = vec![RawHit {
            title: Some("Rust".into()),
            url: "https://rust-lang.org".into(),
            snippet: Some("systems language".into()),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            relevance: Some(0.9),
        }];
        let results = normalize(SourceId::Reddit, "rust", hits, 5);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[0].snippet, "systems language");
        assert_eq!(results[0].timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(results[0].relevance, Some(0.9));
    }

    #[tokio::test]
    async fn chain_stops_at_first_non_empty() {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));
        let calls_c = Arc::new(AtomicUsize::new(0));

        let chain = FallbackChain::new(
            SourceId::Google,
            vec![
                StubStrategy::hits("chain-test-a", vec![], calls_a.clone()),
                StubStrategy::hits(
                    "chain-test-b",
                    vec![full_hit("https://b.example.com")],
                    calls_b.clone(),
                ),
                StubStrategy::hits(
                    "chain-test-c",
                    vec![full_hit("https://c.example.com")],
                    calls_c.clone(),
                ),
            ],
        );

        let results = chain.run("rust", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://b.example.com");
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
        assert_eq!(calls_c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chain_advances_past_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            SourceId::Google,
            vec![
                StubStrategy::failing(
                    "chain-test-err",
                    || SearchError::Http("boom".into()),
                    calls.clone(),
                ),
                StubStrategy::hits(
                    "chain-test-ok",
                    vec![full_hit("https://ok.example.com")],
                    calls.clone(),
                ),
            ],
        );

        let results = chain.run("rust", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://ok.example.com");
    }

    #[tokio::test]
    async fn chain_exhaustion_yields_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            SourceId::DuckDuckGo,
            vec![
                StubStrategy::hits("chain-test-empty-1", vec![], calls.clone()),
                StubStrategy::failing(
                    "chain-test-empty-2",
                    || SearchError::Blocked("429".into()),
                    calls.clone(),
                ),
            ],
        );

        let results = chain.run("rust", 5).await;
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chain_trims_winning_strategy_to_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hits: Vec<RawHit> = (0..8)
            .map(|i| full_hit(&format!("https://r{i}.example.com")))
            .collect();
        let chain = FallbackChain::new(
            SourceId::Google,
            vec![StubStrategy::hits("chain-test-limit", hits, calls)],
        );

        let results = chain.run("rust", 3).await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn repeated_blocks_open_the_circuit() {
        // Unique strategy name so the global breaker state does not
        // interfere with other tests.
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            SourceId::Reddit,
            vec![StubStrategy::failing(
                "chain-test-breaker-trip",
                || SearchError::Blocked("HTTP 429".into()),
                calls.clone(),
            )],
        );

        // Default threshold is 3 failures.
        for _ in 0..3 {
            let _ = chain.run("rust", 5).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Circuit is now open: the next run skips the attempt entirely.
        let _ = chain.run("rust", 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
