//! The parallel search orchestrator: concurrent per-source fan-out with
//! independent deadlines and uniform partial-failure aggregation.
//!
//! One tokio task per requested source, each wrapped in its own deadline.
//! A source that fails, times out, or panics contributes an empty entry;
//! it never cancels or delays a sibling. The aggregate always contains
//! exactly one entry per requested source.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::cache::{self, CacheKey};
use crate::config::{SearchConfig, SourceCredentials};
use crate::error::Result;
use crate::source::SourceModule;
use crate::sources::{DuckDuckGoModule, GoogleModule, RedditModule, WikipediaModule};
use crate::types::{
    ProgressStatus, ResultAggregate, SearchRequest, SearchResult, SourceId, SourceProgress,
};

/// How one source's task settled.
enum TaskOutcome {
    Completed(Vec<SearchResult>),
    TimedOut,
    Faulted(String),
}

/// Orchestrates concurrent searches across the registered source modules.
///
/// Holds no state across calls beyond its static module registry; one
/// instance is safe to share across concurrent orchestration calls.
pub struct ParallelSearchManager {
    config: SearchConfig,
    modules: HashMap<SourceId, Arc<dyn SourceModule>>,
}

impl ParallelSearchManager {
    /// Build a manager with the full default registry (Google,
    /// DuckDuckGo, Wikipedia, Reddit), wiring `credentials` into the
    /// chains that can use them.
    pub fn new(config: SearchConfig, credentials: &SourceCredentials) -> Self {
        let modules: Vec<Arc<dyn SourceModule>> = vec![
            Arc::new(GoogleModule::new(&config, credentials)),
            Arc::new(DuckDuckGoModule::new(&config)),
            Arc::new(WikipediaModule::new(&config)),
            Arc::new(RedditModule::new(&config, credentials)),
        ];
        Self::with_modules(config, modules)
    }

    /// Build a manager from an explicit module registry.
    ///
    /// Useful for partial deployments and for tests that substitute
    /// scripted modules.
    pub fn with_modules(config: SearchConfig, modules: Vec<Arc<dyn SourceModule>>) -> Self {
        let modules = modules.into_iter().map(|m| (m.source(), m)).collect();
        Self { config, modules }
    }

    /// The sources this manager has modules for.
    pub fn registered_sources(&self) -> Vec<SourceId> {
        let mut sources: Vec<SourceId> = self.modules.keys().copied().collect();
        sources.sort();
        sources
    }

    /// Run the requested searches concurrently and return the aggregate.
    ///
    /// # Errors
    ///
    /// Only request validation can fail. Past validation every failure
    /// mode (strategy exhaustion, timeout, panic) is absorbed into an
    /// empty entry for the affected source.
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultAggregate> {
        self.search_with_progress(request, None).await
    }

    /// Like [`search`](Self::search), additionally emitting a
    /// [`SourceProgress`] event as each source's task starts and settles.
    ///
    /// Events are an observation hook for incremental delivery; the
    /// returned aggregate is the authoritative outcome. A cache hit
    /// returns the aggregate without emitting any events. Send failures
    /// (receiver dropped) are ignored.
    pub async fn search_with_progress(
        &self,
        request: &SearchRequest,
        progress: Option<UnboundedSender<SourceProgress>>,
    ) -> Result<ResultAggregate> {
        request.validate()?;

        let ttl = self.config.cache_ttl_seconds;
        let key = CacheKey::new(&request.query, &request.sources, request.max_results_per_source);
        if ttl > 0 {
            if let Some(aggregate) = cache::get(&key, ttl).await {
                tracing::debug!(sources = aggregate.len(), "aggregate served from cache");
                return Ok(aggregate);
            }
        }

        let aggregate = self.fan_out(request, progress).await;

        if ttl > 0 {
            cache::insert(key, aggregate.clone(), ttl).await;
        }
        Ok(aggregate)
    }

    /// Deadline for one source: config override, else the source default.
    fn deadline_for(&self, source: SourceId) -> Duration {
        self.config.deadline_for(source)
    }

    async fn fan_out(
        &self,
        request: &SearchRequest,
        progress: Option<UnboundedSender<SourceProgress>>,
    ) -> ResultAggregate {
        // Duplicates in the request collapse here; the aggregate is
        // keyed by identity.
        let requested: BTreeSet<SourceId> = request.sources.iter().copied().collect();
        let cap = request.max_results_per_source;

        let mut aggregate = ResultAggregate::default();
        let mut tasks = FuturesUnordered::new();

        for source in requested {
            emit(&progress, source, ProgressStatus::Started, 0);

            let module = match self.modules.get(&source) {
                Some(module) => Arc::clone(module),
                None => {
                    tracing::warn!(%source, "source requested but not registered");
                    emit(&progress, source, ProgressStatus::Completed, 0);
                    aggregate.insert(source, Vec::new());
                    continue;
                }
            };

            let query = request.query.clone();
            let deadline = self.deadline_for(source);

            tasks.push(async move {
                // A dedicated task per source: a panicking module
                // surfaces as a JoinError here instead of tearing down
                // the orchestration.
                let mut handle =
                    tokio::spawn(async move { module.search(&query, cap).await });

                let outcome = match tokio::time::timeout(deadline, &mut handle).await {
                    Ok(Ok(results)) => TaskOutcome::Completed(results),
                    Ok(Err(join_err)) => TaskOutcome::Faulted(join_err.to_string()),
                    Err(_) => {
                        // Abandon the in-flight task; its result, if it
                        // ever materialises, is discarded.
                        handle.abort();
                        TaskOutcome::TimedOut
                    }
                };
                (source, deadline, outcome)
            });
        }

        while let Some((source, deadline, outcome)) = tasks.next().await {
            let results = match outcome {
                TaskOutcome::Completed(mut results) => {
                    // Modules truncate themselves; enforce the cap here
                    // too so a misbehaving module cannot exceed it.
                    results.truncate(cap);
                    tracing::debug!(%source, count = results.len(), "source completed");
                    emit(&progress, source, ProgressStatus::Completed, results.len());
                    results
                }
                TaskOutcome::TimedOut => {
                    tracing::warn!(%source, ?deadline, "source timed out");
                    emit(&progress, source, ProgressStatus::TimedOut, 0);
                    Vec::new()
                }
                TaskOutcome::Faulted(reason) => {
                    tracing::warn!(%source, reason, "source task faulted");
                    emit(&progress, source, ProgressStatus::Failed, 0);
                    Vec::new()
                }
            };
            aggregate.insert(source, results);
        }

        aggregate
    }
}

fn emit(
    progress: &Option<UnboundedSender<SourceProgress>>,
    source: SourceId,
    status: ProgressStatus,
    results: usize,
) {
    if let Some(sender) = progress {
        let _ = sender.send(SourceProgress {
            source,
            status,
            results,
        });
    }
}
