//! Per-strategy circuit breaker for blocked-upstream backoff.
//!
//! Tracks failure counts per (source, strategy) pair and temporarily skips
//! strategies that keep getting blocked or erroring. After a cooldown, a
//! tripped strategy enters a half-open state where a single probe attempt
//! determines whether to restore or re-trip the circuit.
//!
//! Within a single orchestration call a blocked strategy and an empty
//! strategy behave identically (the fallback chain advances either way);
//! the breaker only changes behaviour *across* calls. Genuinely-empty
//! outcomes never count as failures.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure              │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use crate::types::SourceId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

/// A (source, strategy name) pair identifying one retrieval strategy.
pub type StrategyKey = (SourceId, &'static str);

/// Circuit breaker state for a single strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Strategy is healthy — all attempts are allowed through.
    Closed,
    /// Strategy has failed too many times — attempts are skipped until cooldown expires.
    Open,
    /// Cooldown has elapsed — one probe attempt is allowed to test recovery.
    HalfOpen,
}

/// Health tracking data for a single strategy.
#[derive(Debug, Clone)]
struct StrategyHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for StrategyHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Configuration for circuit breaker behaviour.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before tripping the circuit to Open.
    pub failure_threshold: u32,
    /// Seconds to wait in Open state before transitioning to HalfOpen.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

/// Per-strategy circuit breaker that tracks health and controls attempts.
///
/// Each (source, strategy) pair has independent health tracking, so one
/// blocked scraping strategy never disables a sibling API strategy or any
/// other source's chain.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    strategies: HashMap<StrategyKey, StrategyHealth>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            strategies: HashMap::new(),
        }
    }

    /// Record a successful attempt for the given strategy.
    ///
    /// Resets the consecutive failure count and transitions the strategy
    /// to [`CircuitState::Closed`] regardless of previous state.
    pub fn record_success(&mut self, key: StrategyKey) {
        let health = self.strategies.entry(key).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    /// Record a failed (errored or blocked) attempt for the given strategy.
    ///
    /// Increments the consecutive failure count. If the count reaches
    /// the configured threshold, transitions to [`CircuitState::Open`].
    pub fn record_failure(&mut self, key: StrategyKey) {
        let health = self.strategies.entry(key).or_default();
        health.consecutive_failures += 1;
        health.last_failure_at = Some(Instant::now());

        if health.consecutive_failures >= self.config.failure_threshold {
            health.state = CircuitState::Open;
        }
    }

    /// Check whether an attempt at the given strategy should be made.
    ///
    /// - [`CircuitState::Closed`]: always returns `true`
    /// - [`CircuitState::Open`]: returns `true` only if the cooldown has elapsed
    ///   (transitions to [`CircuitState::HalfOpen`])
    /// - [`CircuitState::HalfOpen`]: returns `true` (one probe allowed)
    pub fn should_attempt(&mut self, key: StrategyKey) -> bool {
        let health = self.strategies.entry(key).or_default();

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooldown_elapsed = health
                    .last_failure_at
                    .map_or(true, |t| t.elapsed().as_secs() >= self.config.cooldown_secs);

                if cooldown_elapsed {
                    health.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Get the current circuit state for a specific strategy.
    pub fn status(&self, key: StrategyKey) -> CircuitState {
        self.strategies
            .get(&key)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Health report for all tracked strategies:
    /// (key, state, consecutive_failures) per strategy seen so far.
    pub fn health_report(&self) -> Vec<(StrategyKey, CircuitState, u32)> {
        self.strategies
            .iter()
            .map(|(key, health)| (*key, health.state, health.consecutive_failures))
            .collect()
    }

    /// Reset all strategy states to healthy.
    pub fn reset(&mut self) {
        self.strategies.clear();
    }
}

/// Global circuit breaker singleton.
///
/// Shared across all orchestration calls within the process; source
/// modules themselves stay stateless. Protected by a [`Mutex`].
static GLOBAL_BREAKER: OnceLock<Mutex<CircuitBreaker>> = OnceLock::new();

/// Access the global circuit breaker instance.
///
/// Initialised lazily with default configuration on first access.
pub fn global_breaker() -> &'static Mutex<CircuitBreaker> {
    GLOBAL_BREAKER.get_or_init(|| Mutex::new(CircuitBreaker::new(CircuitBreakerConfig::default())))
}
