//! Reddit source module — social discussion threads.
//!
//! Two-strategy chain: the OAuth search API when client credentials are
//! configured (higher rate limits, stable schema), falling back to the
//! public `search.json` endpoint which needs no credentials but is
//! aggressively rate-limited for anonymous clients.
//!
//! Reddit is the only source that fills the optional `timestamp` and
//! `relevance` result fields (post creation time and vote score).

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{SearchConfig, SourceCredentials};
use crate::error::SearchError;
use crate::http;
use crate::source::SourceModule;
use crate::strategy::{FallbackChain, RawHit, RetrievalStrategy};
use crate::types::{SearchResult, SourceId};

/// Self-text snippets are clamped to roughly snippet size.
const MAX_SELFTEXT_CHARS: usize = 280;

/// Reddit source module.
pub struct RedditModule {
    chain: FallbackChain,
}

impl RedditModule {
    /// Build the module; the OAuth strategy is only added when both
    /// client id and secret are present.
    pub fn new(config: &SearchConfig, credentials: &SourceCredentials) -> Self {
        let mut strategies: Vec<Box<dyn RetrievalStrategy>> = Vec::new();

        if let (Some(id), Some(secret)) = (
            credentials.reddit_client_id.clone(),
            credentials.reddit_client_secret.clone(),
        ) {
            strategies.push(Box::new(OauthStrategy::new(config.clone(), id, secret)));
        }
        strategies.push(Box::new(PublicJsonStrategy::new(config.clone())));

        Self {
            chain: FallbackChain::new(SourceId::Reddit, strategies),
        }
    }

    #[cfg(test)]
    pub(crate) fn chain_depth(&self) -> usize {
        self.chain.depth()
    }
}

#[async_trait]
impl SourceModule for RedditModule {
    fn source(&self) -> SourceId {
        SourceId::Reddit
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.chain.run(query, max_results).await
    }
}

// ── Listing schema shared by both strategies ───────────────────────────

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    permalink: Option<String>,
    #[serde(default)]
    selftext: String,
    created_utc: Option<f64>,
    score: Option<i64>,
}

/// Map one listing into raw hits, newest-ranked order preserved.
fn listing_to_hits(listing: Listing, limit: usize) -> Vec<RawHit> {
    listing
        .data
        .children
        .into_iter()
        .take(limit)
        .filter_map(|child| {
            let post = child.data;
            let permalink = post.permalink?;
            Some(RawHit {
                title: post.title,
                url: format!("https://www.reddit.com{permalink}"),
                snippet: snippet_from_selftext(&post.selftext),
                timestamp: post.created_utc.and_then(render_timestamp),
                relevance: post.score.map(|s| s as f64),
            })
        })
        .collect()
}

/// Post body clamped to snippet size; empty bodies yield `None` so the
/// placeholder snippet kicks in during normalization.
fn snippet_from_selftext(selftext: &str) -> Option<String> {
    let trimmed = selftext.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= MAX_SELFTEXT_CHARS {
        return Some(trimmed.to_string());
    }
    let clipped: String = trimmed.chars().take(MAX_SELFTEXT_CHARS).collect();
    Some(format!("{}…", clipped.trim_end()))
}

/// Render a `created_utc` epoch value as RFC 3339.
fn render_timestamp(created_utc: f64) -> Option<String> {
    chrono::DateTime::from_timestamp(created_utc as i64, 0).map(|dt| dt.to_rfc3339())
}

/// Map a Reddit HTTP status into the right error variant.
fn classify_status(status: reqwest::StatusCode) -> Option<SearchError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN
    {
        Some(SearchError::Blocked(format!("Reddit responded {status}")))
    } else if !status.is_success() {
        Some(SearchError::Http(format!("Reddit HTTP error: {status}")))
    } else {
        None
    }
}

// ── Strategy 1: OAuth search API ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth client-credentials strategy.
///
/// Fetches a fresh application token per attempt; tokens are cheap and
/// this keeps the strategy stateless like every other one.
pub struct OauthStrategy {
    config: SearchConfig,
    client_id: String,
    client_secret: String,
    token_endpoint: String,
    api_base: String,
}

impl OauthStrategy {
    pub fn new(config: SearchConfig, client_id: String, client_secret: String) -> Self {
        Self {
            config,
            client_id,
            client_secret,
            token_endpoint: "https://www.reddit.com/api/v1/access_token".into(),
            api_base: "https://oauth.reddit.com".into(),
        }
    }

    /// Override the token endpoint (tests).
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Override the API base URL (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for OauthStrategy {
    fn name(&self) -> &'static str {
        "oauth-api"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Reddit OAuth search");

        let client = http::build_client(&self.config)?;

        let token_response = client
            .post(&self.token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Reddit token request failed: {e}")))?;

        if let Some(err) = classify_status(token_response.status()) {
            return Err(err);
        }

        let token: TokenResponse = token_response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Reddit token response: {e}")))?;

        let limit_str = limit.to_string();
        let response = client
            .get(format!("{}/search", self.api_base))
            .bearer_auth(&token.access_token)
            .query(&[
                ("q", query),
                ("limit", limit_str.as_str()),
                ("sort", "relevance"),
                ("type", "link"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Reddit search request failed: {e}")))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Reddit search response: {e}")))?;

        Ok(listing_to_hits(listing, limit))
    }
}

// ── Strategy 2: public JSON endpoint ───────────────────────────────────

/// Anonymous `search.json` strategy, no credentials required.
pub struct PublicJsonStrategy {
    config: SearchConfig,
    base_url: String,
}

impl PublicJsonStrategy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            base_url: "https://www.reddit.com".into(),
        }
    }

    /// Override the upstream base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RetrievalStrategy for PublicJsonStrategy {
    fn name(&self) -> &'static str {
        "public-json"
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<RawHit>, SearchError> {
        tracing::trace!(query, "Reddit public search");

        let client = http::build_client(&self.config)?;
        let limit_str = limit.to_string();

        let response = client
            .get(format!("{}/search.json", self.base_url))
            .query(&[("q", query), ("limit", limit_str.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Reddit request failed: {e}")))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Reddit response: {e}")))?;

        Ok(listing_to_hits(listing, limit))
    }
}
