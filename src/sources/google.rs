//! Google source module — best results, most volatile retrieval.
//!
//! Up to four strategies in priority order:
//!
//! 1. Custom Search JSON API — structured, quota-respecting, needs
//!    `GOOGLE_API_KEY` + `GOOGLE_CSE_ID`
//! 2. SerpAPI — paid aggregator, needs `SERPAPI_KEY`
//! 3. HTML scraping across several Google domains with rotating
//!    User-Agents and pacing delays
//! 4. Link-only scraping of the basic-HTML interface, yielding bare URLs
//!    with synthetic titles/snippets
//!
//! Credentialed strategies are only added to the chain when their
//! credentials are present, so an unconfigured deployment starts at
//! strategy 3.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::config::{SearchConfig, SourceCredentials};
use crate::error::SearchError;
use crate::http;
use crate::source::SourceModule;
use crate::strategy::{FallbackChain, RawHit, RetrievalStrategy};
use crate::types::{SearchResult, SourceId};

/// Google source module.
pub struct GoogleModule {
    chain: FallbackChain,
}

impl GoogleModule {
    /// Build the module, including only the strategies whose credentials
    /// are available.
    pub fn new(config: &SearchConfig, credentials: &SourceCredentials) -> Self {
        let mut strategies: Vec<Box<dyn RetrievalStrategy>> = Vec::new();

        if let (Some(key), Some(cx)) = (
            credentials.google_api_key.clone(),
            credentials.google_cse_id.clone(),
        ) {
            strategies.push(Box::new(CustomSearchStrategy::new(config.clone(), key, cx)));
        }
        if let Some(key) = credentials.serpapi_key.clone() {
            strategies.push(Box::new(SerpApiStrategy::new(config.clone(), key)));
        }
        strategies.push(Box::new(HtmlScrapeStrategy::new(config.clone())));
        strategies.push(Box::new(LinkScrapeStrategy::new(config.clone())));

        Self {
            chain: FallbackChain::new(SourceId::Google, strategies),
        }
    }

    #[cfg(test)]
    pub(crate) fn chain_depth(&self) -> usize {
        self.chain.depth()
    }
}

#[async_trait]
impl SourceModule for GoogleModule {
    fn source(&self) -> SourceId {
        SourceId::Google
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.chain.run(query, max_results).await
    }
}

/// Map a Google-family HTTP status into the right error variant.
fn classify_status(upstream: &str, status: reqwest::StatusCode) -> Option<SearchError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN
    {
        Some(SearchError::Blocked(format!("{upstream} responded {status}")))
    } else if !status.is_success() {
        Some(SearchError::Http(format!("{upstream} HTTP error: {status}")))
    } else {
        None
    }
}

// ── Strategy 1: Custom Search JSON API ─────────────────────────────────

/// The Custom Search API caps `num` at 10 per request.
const CSE_MAX_NUM: usize = 10;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// Google Custom Search JSON API strategy.
pub struct CustomSearchStrategy {
    config: SearchConfig,
    api_key: String,
    cse_id: String,
    endpoint: String,
}

impl CustomSearchStrategy {
    pub fn new(config: SearchConfig, api_key: String, cse_id: String) -> Self {
        Self {
            config,
            api_key,
            cse_id,
            endpoint: "https://www.googleapis.com/customsearch/v1".into(),
        }
    }

    /// Override the upstream endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for CustomSearchStrategy {
    fn name(&self) -> &'static str {
        "custom-search-api"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Google Custom Search API");

        let client = http::build_client(&self.config)?;
        let num = limit.min(CSE_MAX_NUM).to_string();

        let response = client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Custom Search request failed: {e}")))?;

        if let Some(err) = classify_status("Custom Search API", response.status()) {
            return Err(err);
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Custom Search response: {e}")))?;

        let hits = body
            .items
            .into_iter()
            .take(limit)
            .filter_map(|item| {
                item.link.map(|link| RawHit {
                    title: item.title,
                    url: link,
                    snippet: item.snippet,
                    timestamp: None,
                    relevance: None,
                })
            })
            .collect();

        Ok(hits)
    }
}

// ── Strategy 2: SerpAPI ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<SerpItem>,
}

#[derive(Debug, Deserialize)]
struct SerpItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// SerpAPI (hosted Google results) strategy.
pub struct SerpApiStrategy {
    config: SearchConfig,
    api_key: String,
    endpoint: String,
}

impl SerpApiStrategy {
    pub fn new(config: SearchConfig, api_key: String) -> Self {
        Self {
            config,
            api_key,
            endpoint: "https://serpapi.com/search".into(),
        }
    }

    /// Override the upstream endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for SerpApiStrategy {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "SerpAPI search");

        let client = http::build_client(&self.config)?;
        let num = limit.to_string();

        let response = client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("SerpAPI request failed: {e}")))?;

        if let Some(err) = classify_status("SerpAPI", response.status()) {
            return Err(err);
        }

        let body: SerpResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("SerpAPI response: {e}")))?;

        let hits = body
            .organic_results
            .into_iter()
            .take(limit)
            .filter_map(|item| {
                item.link.map(|link| RawHit {
                    title: item.title,
                    url: link,
                    snippet: item.snippet,
                    timestamp: None,
                    relevance: None,
                })
            })
            .collect();

        Ok(hits)
    }
}

// ── Strategy 3: HTML scraping ──────────────────────────────────────────

/// Unwrap Google's `/url?q=...` redirect links; pass direct links through.
fn extract_result_url(href: &str, base: &str) -> Option<String> {
    if href.starts_with("/url") {
        let absolute = Url::parse(base).ok()?.join(href).ok()?;
        return absolute
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
            .filter(|u| u.starts_with("http"));
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    None
}

/// Google result-page HTML scraping strategy.
///
/// Tries several regional domains in sequence with a pacing delay in
/// between; the first domain whose page parses into at least one hit
/// wins. Bot-detection interstitials surface as [`SearchError::Blocked`].
pub struct HtmlScrapeStrategy {
    config: SearchConfig,
    base_urls: Vec<String>,
}

impl HtmlScrapeStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            base_urls: vec![
                "https://www.google.com".into(),
                "https://www.google.co.uk".into(),
                "https://www.google.ca".into(),
            ],
        }
    }

    /// Override the upstream base URLs (tests).
    pub fn with_base_urls(mut self, base_urls: Vec<String>) -> Self {
        self.base_urls = base_urls;
        self
    }
}

#[async_trait]
impl RetrievalStrategy for HtmlScrapeStrategy {
    fn name(&self) -> &'static str {
        "html-scrape"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Google HTML scrape");

        let client = http::build_client(&self.config)?;
        let num = limit.to_string();
        let mut blocked_count = 0usize;

        for (i, base) in self.base_urls.iter().enumerate() {
            if i > 0 {
                http::pacing_delay(&self.config).await;
            }

            let response = match client
                .get(format!("{base}/search"))
                .query(&[("q", query), ("num", num.as_str()), ("hl", "en")])
                .header("Accept", "text/html,application/xhtml+xml")
                .header("Accept-Language", "en-US,en;q=0.9")
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(base, error = %e, "Google domain unreachable");
                    continue;
                }
            };

            if let Some(err) = classify_status("Google", response.status()) {
                tracing::warn!(base, error = %err, "Google domain rejected request");
                if matches!(err, SearchError::Blocked(_)) {
                    blocked_count += 1;
                }
                continue;
            }

            let html = match response.text().await {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!(base, error = %e, "Google response read failed");
                    continue;
                }
            };

            if html.contains("detected unusual traffic") || html.contains("/sorry/") {
                tracing::warn!(base, "Google served a bot-detection interstitial");
                blocked_count += 1;
                continue;
            }

            let base_owned = base.clone();
            let hits =
                tokio::task::spawn_blocking(move || parse_result_page(&html, &base_owned, limit))
                    .await
                    .map_err(|e| SearchError::Parse(format!("parser task failed: {e}")))??;

            if !hits.is_empty() {
                tracing::debug!(base, count = hits.len(), "Google scrape succeeded");
                return Ok(hits);
            }
        }

        if blocked_count == self.base_urls.len() && blocked_count > 0 {
            return Err(SearchError::Blocked(
                "every Google domain blocked the request".into(),
            ));
        }
        Ok(Vec::new())
    }
}

/// Parse a Google result page into raw hits.
///
/// Extracted as a separate function for testability with mock HTML.
pub(crate) fn parse_result_page(
    html: &str,
    base: &str,
    limit: usize,
) -> Result<Vec<RawHit>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse("div.g")
        .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse("h3")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let link_sel = Selector::parse("a")
        .map_err(|e| SearchError::Parse(format!("invalid link selector: {e:?}")))?;
    let snippet_sel = Selector::parse(".VwiC3b, .st")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let mut hits = Vec::new();

    for element in document.select(&result_sel) {
        let title = match element.select(&title_sel).next() {
            Some(el) => el.text().collect::<String>().trim().to_string(),
            None => continue,
        };
        if title.is_empty() {
            continue;
        }

        let href = match element
            .select(&link_sel)
            .find_map(|a| a.value().attr("href"))
        {
            Some(h) => h,
            None => continue,
        };
        let url = match extract_result_url(href, base) {
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

    tracing::debug!(count = hits.len(), "Google results parsed");
    Ok(hits)
}

// ── Strategy 4: link-only scraping ─────────────────────────────────────

/// Last-resort strategy: the basic-HTML interface (`gbv=1`), extracting
/// only wrapped result links. Titles and snippets are synthesized during
/// normalization, mirroring a bare "list of URLs" library call.
pub struct LinkScrapeStrategy {
    config: SearchConfig,
    base_url: String,
}

impl LinkScrapeStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            base_url: "https://www.google.com".into(),
        }
    }

    /// Override the upstream base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for LinkScrapeStrategy {
    fn name(&self) -> &'static str {
        "link-scrape"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Google link-only scrape");

        // This endpoint sits behind the same rate limiter as the full
        // page; pace before touching it at all.
        http::pacing_delay(&self.config).await;

        let client = http::build_client(&self.config)?;

        let response = client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("gbv", "1")])
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google lite request failed: {e}")))?;

        if let Some(err) = classify_status("Google", response.status()) {
            return Err(err);
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Google lite read failed: {e}")))?;

        let base = self.base_url.clone();
        tokio::task::spawn_blocking(move || parse_result_links(&html, &base, limit))
            .await
            .map_err(|e| SearchError::Parse(format!("parser task failed: {e}")))?
    }
}

/// Extract bare result URLs from the basic-HTML page.
pub(crate) fn parse_result_links(
    html: &str,
    base: &str,
    limit: usize,
) -> Result<Vec<RawHit>, SearchError> {
    let document = Html::parse_document(html);

    let link_sel = Selector::parse("a[href^=\"/url\"]")
        .map_err(|e| SearchError::Parse(format!("invalid link selector: {e:?}")))?;

    let mut seen = std::collections::HashSet::new();
    let mut hits = Vec::new();

    for element in document.select(&link_sel) {
        if hits.len() >= limit {
            break;
        }
        let href = match element.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        if let Some(url) = extract_result_url(href, base) {
            if seen.insert(url.clone()) {
                hits.push(RawHit::url_only(url));
            }
        }
    }

    tracing::debug!(count = hits.len(), "Google link-only results parsed");
    Ok(hits)
}
