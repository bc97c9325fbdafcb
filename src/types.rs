//! Core types: source identities, results, requests, and the aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// The closed set of external information sources this crate can query.
///
/// Used as the aggregation key: every orchestration call returns exactly
/// one aggregate entry per requested source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Google web search — deepest fallback chain, slowest budget.
    Google,
    /// DuckDuckGo — scraper-friendly, privacy-aligned.
    DuckDuckGo,
    /// Wikipedia — structured encyclopedia API, single reliable strategy.
    Wikipedia,
    /// Reddit — social discussion threads.
    Reddit,
}

impl SourceId {
    /// Returns the lowercase wire name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::DuckDuckGo => "duckduckgo",
            Self::Wikipedia => "wikipedia",
            Self::Reddit => "reddit",
        }
    }

    /// Returns all supported source variants.
    pub fn all() -> &'static [SourceId] {
        &[
            Self::Google,
            Self::DuckDuckGo,
            Self::Wikipedia,
            Self::Reddit,
        ]
    }

    /// Default per-source deadline for one orchestration call.
    ///
    /// Google gets a longer budget because its scraping strategies pace
    /// requests across domains to avoid being blocked. Deadlines run
    /// concurrently, so the whole call never waits longer than the largest
    /// deadline among the requested sources.
    pub fn default_deadline(&self) -> Duration {
        match self {
            Self::Google => Duration::from_secs(30),
            _ => Duration::from_secs(15),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single normalized search result.
///
/// `url` is always non-empty for emitted results; `title` and `snippet`
/// fall back to synthetic placeholders when the retrieval method cannot
/// supply them (a deliberate lossy normalization, not an error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Which source produced this result.
    pub source: SourceId,
    /// Result title, possibly synthetic.
    pub title: String,
    /// Non-empty URL of the hit.
    pub url: String,
    /// Text snippet, possibly synthetic.
    pub snippet: String,
    /// Optional RFC 3339 timestamp (discussion sources only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Optional source-native relevance score. Not comparable across sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// The synthetic snippet substituted when a retrieval method yields no real one.
pub(crate) fn placeholder_snippet(source: SourceId, query: &str) -> String {
    format!("{source} search result for: {query}")
}

/// The synthetic title substituted when a retrieval method yields only URLs.
pub(crate) fn placeholder_title(source: SourceId, position: usize) -> String {
    format!("{source} result {}", position + 1)
}

/// One orchestration call's input. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The user query. Must be non-empty after trimming.
    pub query: String,
    /// Which sources to fan out to. Duplicates collapse in the aggregate.
    pub sources: Vec<SourceId>,
    /// Soft cap on results per source.
    pub max_results_per_source: usize,
}

impl SearchRequest {
    /// Build a request for `query` against the default source set
    /// (Google, DuckDuckGo, Wikipedia) with a cap of 5 per source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: vec![SourceId::Google, SourceId::DuckDuckGo, SourceId::Wikipedia],
            max_results_per_source: 5,
        }
    }

    /// Replace the requested source set.
    pub fn with_sources(mut self, sources: Vec<SourceId>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the per-source result cap.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results_per_source = max;
        self
    }

    /// Validates this request.
    ///
    /// Checks:
    /// - `query` must be non-empty after trimming
    /// - `sources` must not be empty
    /// - `max_results_per_source` must be greater than 0
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.query.trim().is_empty() {
            return Err(crate::error::SearchError::Config(
                "query must not be empty".into(),
            ));
        }
        if self.sources.is_empty() {
            return Err(crate::error::SearchError::Config(
                "at least one source must be requested".into(),
            ));
        }
        if self.max_results_per_source == 0 {
            return Err(crate::error::SearchError::Config(
                "max_results_per_source must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// The per-call mapping from source identity to that source's results.
///
/// Every requested source is present as a key, even when its value is
/// empty — callers never need a presence check to know whether a source
/// was attempted. Immutable once returned from the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultAggregate {
    entries: BTreeMap<SourceId, Vec<SearchResult>>,
}

impl ResultAggregate {
    pub(crate) fn insert(&mut self, source: SourceId, results: Vec<SearchResult>) {
        self.entries.insert(source, results);
    }

    /// Results for one source. Panics never; returns an empty slice for
    /// sources that were not part of the request.
    pub fn results_for(&self, source: SourceId) -> &[SearchResult] {
        self.entries.get(&source).map_or(&[], Vec::as_slice)
    }

    /// Whether `source` was part of the request this aggregate answers.
    pub fn contains(&self, source: SourceId) -> bool {
        self.entries.contains_key(&source)
    }

    /// The requested source set, in `SourceId` order.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate over `(source, results)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &[SearchResult])> {
        self.entries.iter().map(|(s, r)| (*s, r.as_slice()))
    }

    /// Number of sources in the aggregate.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no sources are present (empty request edge case only).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total result count across all sources.
    pub fn total_results(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Progress status for one source's task within an orchestration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// The source's task has been dispatched.
    Started,
    /// The source settled with results (possibly zero).
    Completed,
    /// The source exceeded its deadline and was abandoned.
    TimedOut,
    /// The source's task faulted unexpectedly.
    Failed,
}

/// A progress event emitted as individual source tasks settle.
///
/// Observation hook only — the aggregate is the authoritative outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProgress {
    /// Which source this event concerns.
    pub source: SourceId,
    /// Lifecycle status.
    pub status: ProgressStatus,
    /// Result count (zero until the source completes).
    pub results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_display_and_name() {
        assert_eq!(SourceId::Google.to_string(), "google");
        assert_eq!(SourceId::DuckDuckGo.name(), "duckduckgo");
        assert_eq!(SourceId::Wikipedia.name(), "wikipedia");
        assert_eq!(SourceId::Reddit.name(), "reddit");
    }

    #[test]
    fn source_id_all_variants() {
        let all = SourceId::all();
        assert_eq!(all.len(), 4);
        assert!(all.contains(&SourceId::Google));
        assert!(all.contains(&SourceId::Reddit));
    }

    #[test]
    fn source_id_serde_lowercase() {
        let json = serde_json::to_string(&SourceId::DuckDuckGo).expect("serialize");
        assert_eq!(json, "\"duckduckgo\"");
        let decoded: SourceId = serde_json::from_str("\"wikipedia\"").expect("deserialize");
        assert_eq!(decoded, SourceId::Wikipedia);
    }

    #[test]
    fn google_deadline_longer_than_others() {
        assert!(SourceId::Google.default_deadline() > SourceId::Wikipedia.default_deadline());
        assert_eq!(SourceId::Google.default_deadline(), Duration::from_secs(30));
        assert_eq!(SourceId::Reddit.default_deadline(), Duration::from_secs(15));
    }

    #[test]
    fn request_defaults() {
        let request = SearchRequest::new("rust ownership");
        assert_eq!(request.max_results_per_source, 5);
        assert_eq!(request.sources.len(), 3);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn request_rejects_empty_query() {
        let request = SearchRequest::new("   ");
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn request_rejects_empty_sources() {
        let request = SearchRequest::new("rust").with_sources(vec![]);
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn request_rejects_zero_cap() {
        let request = SearchRequest::new("rust").with_max_results(0);
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("max_results_per_source"));
    }

    #[test]
    fn aggregate_keeps_empty_entries() {
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(SourceId::Wikipedia, vec![]);
        assert!(aggregate.contains(SourceId::Wikipedia));
        assert!(aggregate.results_for(SourceId::Wikipedia).is_empty());
        assert!(!aggregate.contains(SourceId::Google));
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate.total_results(), 0);
    }

    #[test]
    fn aggregate_total_counts_all_sources() {
        let mut aggregate = ResultAggregate::default();
        let hit = SearchResult {
            source: SourceId::Google,
            title: "Example".into(),
            url: "https://example.com".into(),
            snippet: "snippet".into(),
            timestamp: None,
            relevance: None,
        };
        aggregate.insert(SourceId::Google, vec![hit.clone(), hit]);
        aggregate.insert(SourceId::Reddit, vec![]);
        assert_eq!(aggregate.total_results(), 2);
        let sources: Vec<SourceId> = aggregate.sources().collect();
        assert_eq!(sources, vec![SourceId::Google, SourceId::Reddit]);
    }

    #[test]
    fn aggregate_serde_round_trip() {
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(
            SourceId::Wikipedia,
            vec![SearchResult {
                source: SourceId::Wikipedia,
                title: "Rust".into(),
                url: "https://en.wikipedia.org/wiki/Rust".into(),
                snippet: "A metal oxide".into(),
                timestamp: None,
                relevance: None,
            }],
        );
        let json = serde_json::to_string(&aggregate).expect("serialize");
        let decoded: ResultAggregate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.results_for(SourceId::Wikipedia).len(), 1);
    }

    #[test]
    fn placeholders_mention_source_and_query() {
        let snippet = placeholder_snippet(SourceId::Google, "rust ownership");
        assert_eq!(snippet, "google search result for: rust ownership");
        let title = placeholder_title(SourceId::Google, 0);
        assert_eq!(title, "google result 1");
    }
}
