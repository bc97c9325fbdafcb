//! # omnisearch
//!
//! Multi-source parallel search orchestration.
//!
//! This crate fans one query out across several external sources —
//! Google, DuckDuckGo, Wikipedia, and Reddit — concurrently, and
//! aggregates whatever each source managed to return. It compiles into
//! a host application as a library dependency.
//!
//! ## Design
//!
//! - One source module per external source, each behind its own
//!   ordered fallback chain of retrieval strategies (official API,
//!   third-party API, HTML scraping) tried until one yields results
//! - Every source runs as its own tokio task with its own deadline;
//!   the call's wall time is bounded by the largest deadline, not the sum
//! - Partial failure is the normal case: a source that exhausts its
//!   chain, times out, or panics contributes an empty entry and never
//!   disturbs its siblings
//! - Per-strategy circuit breaker backs off from upstreams that keep
//!   failing or blocking across calls
//! - Optional TTL cache of whole aggregates, keyed by query, source
//!   set, and cap
//!
//! ## Security
//!
//! - API credentials are read from the environment and never logged
//! - Search queries are logged only at trace level
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> omnisearch::Result<()> {
//! use omnisearch::{ParallelSearchManager, SearchConfig, SearchRequest, SourceCredentials};
//!
//! let manager = ParallelSearchManager::new(
//!     SearchConfig::default(),
//!     &SourceCredentials::from_env(),
//! );
//! let aggregate = manager.search(&SearchRequest::new("rust ownership")).await?;
//! for (source, results) in aggregate.iter() {
//!     println!("{source}: {} results", results.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod source;
pub mod sources;
pub mod strategy;
pub mod synthesis;
pub mod types;

pub use config::{SearchConfig, SourceCredentials};
pub use error::{Result, SearchError};
pub use orchestrator::ParallelSearchManager;
pub use source::SourceModule;
pub use synthesis::Synthesizer;
pub use types::{
    ProgressStatus, ResultAggregate, SearchRequest, SearchResult, SourceId, SourceProgress,
};

/// Run one search with default configuration and credentials from the
/// environment.
///
/// Convenience wrapper for hosts that do not need to hold a manager.
/// Builds the full default module registry per call; long-lived hosts
/// should construct a [`ParallelSearchManager`] once instead.
///
/// # Errors
///
/// Returns an error only when the request fails validation.
pub async fn search(request: &SearchRequest) -> Result<ResultAggregate> {
    let manager = ParallelSearchManager::new(SearchConfig::default(), &SourceCredentials::from_env());
    manager.search(request).await
}
