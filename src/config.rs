//! Search configuration and source credentials.
//!
//! [`SearchConfig`] controls HTTP behaviour, caching, and per-source
//! deadline overrides. [`SourceCredentials`] is read from the environment
//! once at manager construction; absent credentials simply shorten the
//! affected fallback chains.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::error::SearchError;
use crate::types::SourceId;

/// Configuration for the search orchestration layer.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Per-request HTTP timeout in seconds (inside strategies; the
    /// orchestration-level deadline is separate and per source).
    pub timeout_seconds: u64,
    /// Random delay range in milliseconds `(min, max)` applied between
    /// consecutive scraping targets inside one strategy. Spreads requests
    /// over time to avoid upstream rate limiting.
    pub request_delay_ms: (u64, u64),
    /// Custom User-Agent string. If `None`, rotates through a built-in
    /// list of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// How long to cache whole aggregates in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Per-source deadline overrides. Sources not listed here use
    /// [`SourceId::default_deadline`].
    pub deadline_overrides: HashMap<SourceId, Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            request_delay_ms: (250, 1000),
            user_agent: None,
            cache_ttl_seconds: 0,
            deadline_overrides: HashMap::new(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    /// - deadline overrides must be non-zero
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(SearchError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        if self.deadline_overrides.values().any(|d| d.is_zero()) {
            return Err(SearchError::Config(
                "per-source deadlines must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The orchestration deadline for `source`, honouring overrides.
    pub fn deadline_for(&self, source: SourceId) -> Duration {
        self.deadline_overrides
            .get(&source)
            .copied()
            .unwrap_or_else(|| source.default_deadline())
    }
}

/// API credentials read once at manager construction.
///
/// Every field is optional: a missing credential disables the strategy
/// that needs it rather than failing construction.
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    /// Google Custom Search API key (`GOOGLE_API_KEY`).
    pub google_api_key: Option<String>,
    /// Google Custom Search engine id (`GOOGLE_CSE_ID`).
    pub google_cse_id: Option<String>,
    /// SerpAPI key (`SERPAPI_KEY`).
    pub serpapi_key: Option<String>,
    /// Reddit OAuth client id (`REDDIT_CLIENT_ID`).
    pub reddit_client_id: Option<String>,
    /// Reddit OAuth client secret (`REDDIT_CLIENT_SECRET`).
    pub reddit_client_secret: Option<String>,
}

impl SourceCredentials {
    /// Read credentials from the process environment.
    ///
    /// Empty variables are treated as absent.
    pub fn from_env() -> Self {
        Self {
            google_api_key: non_empty_env("GOOGLE_API_KEY"),
            google_cse_id: non_empty_env("GOOGLE_CSE_ID"),
            serpapi_key: non_empty_env("SERPAPI_KEY"),
            reddit_client_id: non_empty_env("REDDIT_CLIENT_ID"),
            reddit_client_secret: non_empty_env("REDDIT_CLIENT_SECRET"),
        }
    }

    /// Credentials with every field absent. Chains built from this fall
    /// straight through to their scraping strategies.
    pub fn none() -> Self {
        Self::default()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
