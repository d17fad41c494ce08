//! Three-state circuit breaker: Closed → Open → Half-Open, one per network.
//!
//! State transitions:
//! - `Closed` → `Open`:     failure count reaches `failure_threshold`
//! - `Open` → `Half-Open`:  `open_duration` has elapsed (checked lazily on query)
//! - `Half-Open` → `Closed`: `success_threshold` trial calls succeed
//! - `Half-Open` → `Open`:   any trial call fails

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// All requests rejected. Wait for `open_duration` before probing.
    Open,
    /// Trial requests allowed to test network health.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures (net of successes) before opening.
    pub failure_threshold: u32,
    /// How long to stay open before transitioning to half-open.
    pub open_duration: Duration,
    /// Number of successful half-open trial calls before closing.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Point-in-time view of one network's breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub network: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub half_open_successes: u32,
}

struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
}

impl CircuitInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            last_failure_at: None,
            next_attempt_at: None,
        }
    }
}

/// Thread-safe circuit breaker for a single network.
#[derive(Clone)]
pub struct CircuitBreaker {
    network: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<CircuitInner>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in `Closed` state.
    pub fn new(network: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            network: Arc::from(network.into()),
            config,
            inner: Arc::new(Mutex::new(CircuitInner::closed())),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the current state, transitioning Open→HalfOpen if the wait has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.advance(&mut inner);
        inner.state
    }

    fn advance(&self, inner: &mut CircuitInner) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(opened_at) = inner.opened_at {
            if opened_at.elapsed() >= self.config.open_duration {
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                tracing::info!(network = %self.network, "Circuit breaker → half-open");
            }
        }
    }

    /// Returns `true` if the circuit allows a request through.
    pub fn is_available(&self) -> bool {
        self.state() != CircuitState::Open
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        self.advance(&mut inner);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    *inner = CircuitInner {
                        last_failure_at: inner.last_failure_at,
                        ..CircuitInner::closed()
                    };
                    tracing::info!(network = %self.network, "Circuit breaker → closed");
                }
            }
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_sub(1);
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        self.advance(&mut inner);
        inner.last_failure_at = Some(Utc::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.trip(&mut inner);
                    tracing::warn!(
                        network = %self.network,
                        failures = inner.failure_count,
                        "Circuit breaker → open"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.trip(&mut inner);
                tracing::warn!(network = %self.network, "Circuit breaker trial call failed → open");
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&self, inner: &mut CircuitInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.success_count = 0;
        inner.next_attempt_at = chrono::Duration::from_std(self.config.open_duration)
            .ok()
            .map(|d| Utc::now() + d);
    }

    /// How long the breaker has been continuously open, if it is open.
    pub fn open_for(&self) -> Option<Duration> {
        let inner = self.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => Some(at.elapsed()),
            _ => None,
        }
    }

    /// Force the breaker back to `Closed` with all counters cleared.
    pub fn reset(&self) {
        *self.lock() = CircuitInner::closed();
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut inner = self.lock();
        self.advance(&mut inner);
        CircuitSnapshot {
            network: self.network.to_string(),
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_at: inner.last_failure_at,
            next_attempt_at: inner.next_attempt_at,
            half_open_successes: inner.success_count,
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("network", &self.network)
            .field("state", &self.state())
            .finish()
    }
}

/// Lazily-populated set of per-network breakers.
///
/// The map is sharded, and each breaker carries its own lock, so traffic on
/// one network never waits on another network's bookkeeping.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `network`, created `Closed` on first use.
    pub fn get(&self, network: &str) -> CircuitBreaker {
        if let Some(cb) = self.breakers.get(network) {
            return cb.value().clone();
        }
        self.breakers
            .entry(network.to_string())
            .or_insert_with(|| CircuitBreaker::new(network, self.config.clone()))
            .value()
            .clone()
    }

    pub fn is_available(&self, network: &str) -> bool {
        self.get(network).is_available()
    }

    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let breakers: Vec<CircuitBreaker> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        breakers.iter().map(CircuitBreaker::snapshot).collect()
    }

    /// Reset breakers that have stayed open longer than `max_open`.
    /// Returns how many were reset.
    pub fn reset_stale(&self, max_open: Duration) -> usize {
        let breakers: Vec<CircuitBreaker> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        let mut reset = 0;
        for cb in breakers {
            if cb.open_for().is_some_and(|d| d > max_open) {
                cb.reset();
                tracing::info!(network = %cb.network(), "Stale circuit breaker reset");
                reset += 1;
            }
        }
        reset
    }
}
