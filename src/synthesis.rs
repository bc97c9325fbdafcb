//! Downstream summarization support.
//!
//! The orchestrator hands its aggregate to a summarization collaborator
//! as one plain-text digest. This module owns the digest format and the
//! [`Synthesizer`] trait that collaborator implements; the collaborator
//! itself (an LLM client, typically) lives outside this crate.

use async_trait::async_trait;

use crate::types::{ResultAggregate, SourceId};

/// Digest entries per source, independent of the request cap.
const DIGEST_RESULTS_PER_SOURCE: usize = 5;

/// A collaborator that turns an aggregate into prose.
///
/// Infallible by contract: an implementation that hits an upstream
/// error returns a string describing the failure instead, so callers
/// always have something to show.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, aggregate: &ResultAggregate) -> String;
}

/// Render an aggregate as the sectioned plain-text digest fed to a
/// [`Synthesizer`].
///
/// One `=== {SOURCE} RESULTS ===` section per aggregate entry, in
/// aggregate order. Empty entries render as `No results found`, so a
/// reader can tell "source contributed nothing" apart from "source was
/// never asked".
pub fn format_aggregate(aggregate: &ResultAggregate) -> String {
    let mut out = String::new();

    for (source, results) in aggregate.iter() {
        out.push_str(&format!("\n=== {} RESULTS ===", source_heading(source)));
        if results.is_empty() {
            out.push_str("\nNo results found");
            continue;
        }
        for (i, result) in results.iter().take(DIGEST_RESULTS_PER_SOURCE).enumerate() {
            out.push_str(&format!("\n\n{}. Title: {}", i + 1, result.title));
            out.push_str(&format!("\n   URL: {}", result.url));
            out.push_str(&format!("\n   Content: {}", result.snippet));
            if let Some(score) = result.relevance {
                out.push_str(&format!("\n   Score: {score}"));
            }
        }
    }

    out.trim_start().to_string()
}

/// One-line coverage summary, e.g. `7 results from 2/3 sources`.
pub fn coverage_summary(aggregate: &ResultAggregate) -> String {
    let with_results = aggregate
        .iter()
        .filter(|(_, results)| !results.is_empty())
        .count();
    format!(
        "{} results from {}/{} sources",
        aggregate.total_results(),
        with_results,
        aggregate.len()
    )
}

fn source_heading(source: SourceId) -> String {
    source.name().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchResult;

    fn result(source: SourceId, title: &str, relevance: Option<f64>) -> SearchResult {
        SearchResult {
            source,
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            snippet: format!("about {title}"),
            timestamp: None,
            relevance,
        }
    }

    #[test]
    fn digest_sections_every_entry() {
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(
            SourceId::Google,
            vec![result(SourceId::Google, "g1", Some(0.9))],
        );
        aggregate.insert(SourceId::Wikipedia, vec![]);

        let digest = format_aggregate(&aggregate);
        assert!(digest.starts_with("=== GOOGLE RESULTS ==="));
        assert!(digest.contains("1. Title: g1"));
        assert!(digest.contains("URL: https://example.com/g1"));
        assert!(digest.contains("Content: about g1"));
        assert!(digest.contains("Score: 0.9"));
        assert!(digest.contains("=== WIKIPEDIA RESULTS ===\nNo results found"));
    }

    #[test]
    fn digest_omits_score_when_absent() {
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(
            SourceId::DuckDuckGo,
            vec![result(SourceId::DuckDuckGo, "d1", None)],
        );
        let digest = format_aggregate(&aggregate);
        assert!(!digest.contains("Score:"));
    }

    #[test]
    fn digest_caps_entries_per_source() {
        let results: Vec<SearchResult> = (0..10)
            .map(|i| result(SourceId::Reddit, &format!("r{i}"), None))
            .collect();
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(SourceId::Reddit, results);

        let digest = format_aggregate(&aggregate);
        assert!(digest.contains("5. Title: r4"));
        assert!(!digest.contains("6. Title: r5"));
    }

    #[test]
    fn empty_aggregate_yields_empty_digest() {
        assert_eq!(format_aggregate(&ResultAggregate::default()), "");
    }

    #[test]
    fn coverage_counts_contributing_sources() {
        let mut aggregate = ResultAggregate::default();
        aggregate.insert(
            SourceId::Google,
            vec![
                result(SourceId::Google, "a", None),
                result(SourceId::Google, "b", None),
            ],
        );
        aggregate.insert(SourceId::Wikipedia, vec![result(SourceId::Wikipedia, "c", None)]);
        aggregate.insert(SourceId::Reddit, vec![]);

        assert_eq!(coverage_summary(&aggregate), "3 results from 2/3 sources");
    }

    #[tokio::test]
    async fn synthesizer_trait_is_object_safe() {
        struct EchoSynthesizer;

        #[async_trait]
        impl Synthesizer for EchoSynthesizer {
            async fn synthesize(&self, query: &str, aggregate: &ResultAggregate) -> String {
                format!("{query}: {}", coverage_summary(aggregate))
            }
        }

        let synthesizer: Box<dyn Synthesizer> = Box::new(EchoSynthesizer);
        let text = synthesizer
            .synthesize("rust", &ResultAggregate::default())
            .await;
        assert_eq!(text, "rust: 0 results from 0/0 sources");
    }
}
