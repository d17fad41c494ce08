//! Per-network attempt bookkeeping: circuit breakers, request counters and a
//! bounded history of classified failures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::policy::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitSnapshot, CircuitState};

/// Success rate at or above which a closed network counts as healthy.
pub const HEALTHY_SUCCESS_RATE: f64 = 0.8;

/// Health summary for one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkHealth {
    pub success_rate: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub circuit_state: CircuitState,
    pub is_healthy: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<NetworkError>,
}

#[derive(Default)]
struct NetworkStats {
    total: u64,
    failed: u64,
    last_success_at: Option<DateTime<Utc>>,
    errors: VecDeque<NetworkError>,
}

/// Shared attempt ledger. Every network attempt reports here exactly once.
pub struct NetworkMonitor {
    breakers: CircuitBreakerRegistry,
    stats: DashMap<String, Arc<Mutex<NetworkStats>>>,
    history_limit: usize,
}

impl NetworkMonitor {
    pub fn new(config: CircuitBreakerConfig, history_limit: usize) -> Self {
        Self {
            breakers: CircuitBreakerRegistry::new(config),
            stats: DashMap::new(),
            history_limit,
        }
    }

    fn stats(&self, network: &str) -> Arc<Mutex<NetworkStats>> {
        if let Some(s) = self.stats.get(network) {
            return s.value().clone();
        }
        self.stats
            .entry(network.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn lock(stats: &Mutex<NetworkStats>) -> MutexGuard<'_, NetworkStats> {
        stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `network`'s breaker currently admits calls.
    pub fn is_available(&self, network: &str) -> bool {
        self.breakers.is_available(network)
    }

    pub fn record_success(&self, network: &str) {
        self.breakers.get(network).record_success();
        let stats = self.stats(network);
        let mut s = Self::lock(&stats);
        s.total += 1;
        s.last_success_at = Some(Utc::now());
    }

    pub fn record_failure(&self, network: &str, error: &NetworkError) {
        self.breakers.get(network).record_failure();
        let stats = self.stats(network);
        let mut s = Self::lock(&stats);
        s.total += 1;
        s.failed += 1;
        s.errors.push_back(error.clone());
        while s.errors.len() > self.history_limit {
            s.errors.pop_front();
        }
    }

    pub fn circuit(&self, network: &str) -> CircuitSnapshot {
        self.breakers.get(network).snapshot()
    }

    fn existing(&self, network: &str) -> Option<Arc<Mutex<NetworkStats>>> {
        self.stats.get(network).map(|s| s.value().clone())
    }

    pub fn last_success(&self, network: &str) -> Option<DateTime<Utc>> {
        let stats = self.existing(network)?;
        let s = Self::lock(&stats);
        s.last_success_at
    }

    /// Recorded failures for `network`, oldest first.
    pub fn recent_errors(&self, network: &str) -> Vec<NetworkError> {
        match self.existing(network) {
            Some(stats) => Self::lock(&stats).errors.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn health(&self, network: &str) -> NetworkHealth {
        let circuit_state = self.breakers.get(network).state();
        let (total, failed, last_success_at, last_error) = match self.existing(network) {
            Some(stats) => {
                let s = Self::lock(&stats);
                (s.total, s.failed, s.last_success_at, s.errors.back().cloned())
            }
            None => (0, 0, None, None),
        };
        let success_rate = if total == 0 {
            1.0
        } else {
            (total - failed) as f64 / total as f64
        };
        NetworkHealth {
            success_rate,
            total_requests: total,
            failed_requests: failed,
            circuit_state,
            is_healthy: circuit_state == CircuitState::Closed
                && success_rate >= HEALTHY_SUCCESS_RATE,
            last_success_at,
            last_error,
        }
    }

    /// Reset breakers open longer than `max_open`.
    pub fn reset_stale_circuits(&self, max_open: Duration) -> usize {
        self.breakers.reset_stale(max_open)
    }
}
