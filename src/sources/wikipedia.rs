//! Wikipedia source module — structured MediaWiki API, single-strategy chain.
//!
//! One reliable retrieval method means no fallback is needed: a title
//! search (`list=search`) followed by one batched summary fetch
//! (`prop=extracts|info`) for the first `limit` titles.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::source::SourceModule;
use crate::strategy::{FallbackChain, RawHit, RetrievalStrategy};
use crate::types::{SearchResult, SourceId};

/// Summaries are truncated to roughly two sentences' worth of text.
const MAX_SUMMARY_CHARS: usize = 320;

/// Wikipedia source module.
pub struct WikipediaModule {
    chain: FallbackChain,
}

impl WikipediaModule {
    /// Build the module with its single-strategy chain.
    pub fn new(config: &SearchConfig) -> Self {
        let chain = FallbackChain::new(
            SourceId::Wikipedia,
            vec![Box::new(ApiStrategy::new(config.clone()))],
        );
        Self { chain }
    }
}

#[async_trait]
impl SourceModule for WikipediaModule {
    fn source(&self) -> SourceId {
        SourceId::Wikipedia
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.chain.run(query, max_results).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<TitleHit>,
}

#[derive(Debug, Deserialize)]
struct TitleHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    extract: Option<String>,
    fullurl: Option<String>,
}

/// MediaWiki API strategy: title search, then batched summary fetch.
pub struct ApiStrategy {
    config: SearchConfig,
    api_base: String,
}

impl ApiStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            api_base: "https://en.wikipedia.org/w/api.php".into(),
        }
    }

    /// Override the API base URL (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Fallback page URL for titles the info prop did not resolve.
    fn page_url(title: &str) -> String {
        format!(
            "https://en.wikipedia.org/wiki/{}",
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }
}

#[async_trait]
impl RetrievalStrategy for ApiStrategy {
    fn name(&self) -> &'static str {
        "mediawiki-api"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Wikipedia title search");

        let client = http::build_client(&self.config)?;
        let srlimit = limit.to_string();

        let response = client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", srlimit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Wikipedia search request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("Wikipedia HTTP error: {e}")))?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Wikipedia search response: {e}")))?;

        let titles: Vec<String> = body
            .query
            .map(|q| q.search)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|hit| hit.title)
            .collect();

        if titles.is_empty() {
            return Ok(Vec::new());
        }

        // Second round trip: summaries and canonical URLs for the
        // selected titles only, batched into a single request.
        let joined = titles.join("|");
        let response = client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|info"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("inprop", "url"),
                ("redirects", "1"),
                ("titles", joined.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Wikipedia extract request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("Wikipedia HTTP error: {e}")))?;

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Wikipedia extract response: {e}")))?;

        let pages = body.query.map(|q| q.pages).unwrap_or_default();
        let by_title: HashMap<&str, &Page> =
            pages.values().map(|p| (p.title.as_str(), p)).collect();

        // Preserve search-ranking order, not the unordered page map order.
        let hits = titles
            .iter()
            .map(|title| {
                let page = by_title.get(title.as_str());
                RawHit {
                    title: Some(title.clone()),
                    url: page
                        .and_then(|p| p.fullurl.clone())
                        .unwrap_or_else(|| Self::page_url(title)),
                    snippet: page
                        .and_then(|p| p.extract.as_deref())
                        .map(truncate_summary)
                        .filter(|s| !s.is_empty()),
                    timestamp: None,
                    relevance: None,
                }
            })
            .collect();

        Ok(hits)
    }
}

/// Clamp an intro extract to a snippet-sized summary on a char boundary.
fn truncate_summary(extract: &str) -> String {
    let trimmed = extract.trim();
    if trimmed.chars().count() <= MAX_SUMMARY_CHARS {
        return trimmed.to_string();
    }
    let clipped: String = trimmed.chars().take(MAX_SUMMARY_CHARS).collect();
    format!("{}…", clipped.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_encodes_title() {
        assert_eq!(
            ApiStrategy::page_url("Rust (programming language)"),
            "https://en.wikipedia.org/wiki/Rust_%28programming_language%29"
        );
    }

    #[test]
    fn truncate_short_summary_unchanged() {
        assert_eq!(truncate_summary("  A short intro.  "), "A short intro.");
    }

    #[test]
    fn truncate_long_summary_clips_with_ellipsis() {
        let long = "x".repeat(1000);
        let summary = truncate_summary(&long);
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS + 1);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn search_response_parses_titles() {
        let json = r#"{"query":{"search":[{"title":"Rust (programming language)","pageid":1},{"title":"Rust"}]}}"#;
        let body: SearchResponse = serde_json::from_str(json).expect("parse");
        let titles: Vec<String> = body
            .query
            .map(|q| q.search)
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.title)
            .collect();
        assert_eq!(titles, vec!["Rust (programming language)", "Rust"]);
    }

    #[test]
    fn extract_response_parses_pages() {
        let json = r#"{"query":{"pages":{"123":{"title":"Rust","extract":"Rust is a language.","fullurl":"https://en.wikipedia.org/wiki/Rust"}}}}"#;
        let body: ExtractResponse = serde_json::from_str(json).expect("parse");
        let pages = body.query.map(|q| q.pages).unwrap_or_default();
        assert_eq!(pages.len(), 1);
        let page = pages.values().next().expect("page");
        assert_eq!(page.title, "Rust");
        assert_eq!(page.extract.as_deref(), Some("Rust is a language."));
    }

    #[test]
    fn empty_search_response_yields_no_titles() {
        let json = r#"{"batchcomplete":""}"#;
        let body: SearchResponse = serde_json::from_str(json).expect("parse");
        assert!(body.query.is_none());
    }

    #[test]
    fn module_identity_and_single_strategy() {
        let module = WikipediaModule::new(&SearchConfig::default());
        assert_eq!(module.source(), SourceId::Wikipedia);
        assert_eq!(module.chain.depth(), 1);
    }
}
