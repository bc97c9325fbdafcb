//! Error types for the omnisearch crate.
//!
//! Errors use stable string messages suitable for logs and programmatic
//! handling. Credentials never appear in error messages. Note that most
//! failures in this crate are absorbed rather than propagated: retrieval
//! strategies and source modules degrade to empty result lists, and only
//! request/config validation surfaces an error at the public API.

/// Errors that can occur during search orchestration.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to an upstream source failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse an upstream response (HTML or JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// The upstream rejected the request as rate-limited or bot-blocked.
    ///
    /// Inside one orchestration call this is treated exactly like an empty
    /// result set (the fallback chain advances). It exists as a distinct
    /// variant so the circuit breaker can back off a blocked strategy
    /// before the *next* orchestration call.
    #[error("blocked by upstream: {0}")]
    Blocked(String),

    /// Invalid search request or configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for omnisearch results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_http() {
        let err = SearchError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_parse() {
        let err = SearchError::Parse("unexpected HTML structure".into());
        assert_eq!(err.to_string(), "parse error: unexpected HTML structure");
    }

    #[test]
    fn display_blocked() {
        let err = SearchError::Blocked("HTTP 429 from upstream".into());
        assert_eq!(err.to_string(), "blocked by upstream: HTTP 429 from upstream");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("query must not be empty".into());
        assert_eq!(err.to_string(), "config error: query must not be empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
