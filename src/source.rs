//! The source module contract: one implementation per external source.

use async_trait::async_trait;

use crate::types::{SearchResult, SourceId};

/// A component responsible for retrieving results from exactly one
/// external information source.
///
/// The contract is deliberately infallible: any internal failure
/// (network error, parse failure, quota exhaustion, chain exhaustion)
/// degrades to an empty list, logged as a warning inside the module.
/// The orchestrator never sees an error from a well-behaved module;
/// panics are additionally contained at the task-join boundary.
///
/// Modules are stateless aside from fixed configuration (their identity,
/// endpoints, and any credentials read once at construction), so a single
/// instance is safe to share across concurrent orchestration calls.
#[async_trait]
pub trait SourceModule: Send + Sync {
    /// Which source this module retrieves for.
    ///
    /// The identity also determines the module's orchestration deadline
    /// (via [`SourceId::default_deadline`] or a config override): sources
    /// with slower retrieval chains get a longer budget.
    fn source(&self) -> SourceId;

    /// Retrieve up to `max_results` results for `query`.
    ///
    /// Never errors; returns an empty vector on any failure. Output is
    /// truncated to at most `max_results` entries.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModule {
        source: SourceId,
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl SourceModule for FixedModule {
        fn source(&self) -> SourceId {
            self.source
        }

        async fn search(&self, _query: &str, max_results: usize) -> Vec<SearchResult> {
            let mut out = self.results.clone();
            out.truncate(max_results);
            out
        }
    }

    fn make_result(url: &str) -> SearchResult {
        SearchResult {
            source: SourceId::Wikipedia,
            title: "Title".into(),
            url: url.into(),
            snippet: "Snippet".into(),
            timestamp: None,
            relevance: None,
        }
    }

    #[test]
    fn module_is_object_safe() {
        fn assert_dyn(_: &dyn SourceModule) {}
        let module = FixedModule {
            source: SourceId::Wikipedia,
            results: vec![],
        };
        assert_dyn(&module);
    }

    #[tokio::test]
    async fn search_truncates_to_cap() {
        let module = FixedModule {
            source: SourceId::Wikipedia,
            results: (0..10)
                .map(|i| make_result(&format!("https://w{i}.example.com")))
                .collect(),
        };
        let results = module.search("rust", 4).await;
        assert_eq!(results.len(), 4);
    }
}
