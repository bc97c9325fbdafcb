//! DuckDuckGo source module — scraper-friendly, privacy-aligned.
//!
//! Two-strategy chain: the HTML-only endpoint at
//! `https://html.duckduckgo.com/html/` (no JavaScript, tolerant of
//! automated requests) first, then the even plainer lite endpoint as a
//! minimal-configuration fallback.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::source::SourceModule;
use crate::strategy::{FallbackChain, RawHit, RetrievalStrategy};
use crate::types::{SearchResult, SourceId};

/// DuckDuckGo source module.
pub struct DuckDuckGoModule {
    chain: FallbackChain,
}

impl DuckDuckGoModule {
    /// Build the module with its two-strategy chain.
    pub fn new(config: &SearchConfig) -> Self {
        let chain = FallbackChain::new(
            SourceId::DuckDuckGo,
            vec![
                Box::new(HtmlStrategy::new(config.clone())),
                Box::new(LiteStrategy::new(config.clone())),
            ],
        );
        Self { chain }
    }
}

#[async_trait]
impl SourceModule for DuckDuckGoModule {
    fn source(&self) -> SourceId {
        SourceId::DuckDuckGo
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.chain.run(query, max_results).await
    }
}

/// Extract the actual URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps URLs like: `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`
/// We parse out the `uddg` query parameter and URL-decode it.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

/// Map a DuckDuckGo HTTP status into the right error variant.
fn classify_status(status: reqwest::StatusCode) -> Option<SearchError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN
    {
        Some(SearchError::Blocked(format!(
            "DuckDuckGo responded {status}"
        )))
    } else if !status.is_success() {
        Some(SearchError::Http(format!("DuckDuckGo HTTP error: {status}")))
    } else {
        None
    }
}

/// Primary strategy: the full HTML endpoint.
pub struct HtmlStrategy {
    config: SearchConfig,
    endpoint: String,
}

impl HtmlStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            endpoint: "https://html.duckduckgo.com/html/".into(),
        }
    }

    /// Override the upstream endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for HtmlStrategy {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "DuckDuckGo html search");

        let client = http::build_client(&self.config)?;
        let params = [("q", query), ("kp", "1")];

        let response = client
            .post(&self.endpoint)
            .form(&params)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo request failed: {e}")))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo response read failed: {e}")))?;

        tracing::trace!(bytes = html.len(), "DuckDuckGo response received");

        // scraper documents are not Send; parse on a blocking worker so
        // sibling source tasks are never stalled by a large document.
        tokio::task::spawn_blocking(move || parse_html_results(&html, limit))
            .await
            .map_err(|e| SearchError::Parse(format!("parser task failed: {e}")))?
    }
}

/// Parse the full HTML endpoint's response into raw hits.
///
/// Extracted as a separate function for testability with mock HTML.
pub(crate) fn parse_html_results(html: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )
    .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let snippet_sel = Selector::parse(".result__snippet")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let mut hits = Vec::new();

    for element in document.select(&result_sel) {
        let title_el = match element.select(&title_sel).next() {
            Some(el) => el,
            None => continue,
        };

        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let href = match title_el.value().attr("href") {
            Some(h) => h,
            None => continue,
        };

        let url = match extract_url(href) {
            Some(u) => u,
            None => continue,
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        hits.push(RawHit {
            title: Some(title),
            url,
            snippet,
            timestamp: None,
            relevance: None,
        });

        if hits.len() >= limit {
            break;
        }
    }

    tracing::debug!(count = hits.len(), "DuckDuckGo html results parsed");
    Ok(hits)
}

/// Last-resort strategy: the lite endpoint, a bare table layout that
/// survives when the full HTML endpoint rate-limits form posts.
pub struct LiteStrategy {
    config: SearchConfig,
    endpoint: String,
}

impl LiteStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            endpoint: "https://lite.duckduckgo.com/lite/".into(),
        }
    }

    /// Override the upstream endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for LiteStrategy {
    fn name(&self) -> &'static str {
        "lite"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "DuckDuckGo lite search");

        let client = http::build_client(&self.config)?;

        let response = client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo lite request failed: {e}")))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo lite read failed: {e}")))?;

        tokio::task::spawn_blocking(move || parse_lite_results(&html, limit))
            .await
            .map_err(|e| SearchError::Parse(format!("parser task failed: {e}")))?
    }
}

/// Parse the lite endpoint's table layout into raw hits.
///
/// Links and snippets live in separate table rows, paired by order.
pub(crate) fn parse_lite_results(html: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
    let document = Html::parse_document(html);

    let link_sel = Selector::parse("a.result-link")
        .map_err(|e| SearchError::Parse(format!("invalid link selector: {e:?}")))?;
    let snippet_sel = Selector::parse("td.result-snippet")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let snippets: Vec<String> = document
        .select(&snippet_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    let mut hits = Vec::new();

    for (i, link) in document.select(&link_sel).enumerate() {
        if hits.len() >= limit {
            break;
        }

        let title = link.text().collect::<String>().trim().to_string();
        let href = match link.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let url = match extract_url(href) {
            Some(u) => u,
            None => continue,
        };

        hits.push(RawHit {
            title: (!title.is_empty()).then_some(title),
            url,
            snippet: snippets.get(i).filter(|s| !s.is_empty()).cloned(),
            timestamp: None,
            relevance: None,
        });
    }

    tracing::debug!(count = hits.len(), "DuckDuckGo lite results parsed");
    Ok(hits)
}
