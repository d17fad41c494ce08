//! Service configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a valid
//! configuration. Durations are integers in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use chainbalance_core::error::BalanceError;
use chainbalance_core::policy::{CircuitBreakerConfig, RateLimiterConfig, RetryConfig};

/// Ceiling for any configured duration (30 days). Larger values overflow
/// `Instant` arithmetic in the cache and the background worker.
pub const MAX_DURATION_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Top-level balance service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Token summed across networks.
    pub token_symbol: String,
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub rate_limits: RateLimitSettings,
    pub timeouts: TimeoutSettings,
    /// Failures kept per network for health reporting.
    pub error_history: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_symbol: "USDC".into(),
            cache: CacheSettings::default(),
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limits: RateLimitSettings::default(),
            timeouts: TimeoutSettings::default(),
            error_history: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub network_ttl_ms: u64,
    pub aggregate_ttl_ms: u64,
    /// Cache hits older than this queue a background refresh.
    pub refresh_after_ms: u64,
    pub sweep_interval_ms: u64,
    pub refresh_interval_ms: u64,
    /// Breakers open longer than this are reset by the sweep.
    pub stale_circuit_after_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            network_ttl_ms: 30_000,
            aggregate_ttl_ms: 30_000,
            refresh_after_ms: 20_000,
            sweep_interval_ms: 300_000,
            refresh_interval_ms: 15_000,
            stale_circuit_after_ms: 3_600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
    pub rate_limit_cooldown_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter_ms: 500,
            rate_limit_cooldown_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub open_ms: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_ms: 60_000,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub premium_rps: f64,
    pub premium_burst: f64,
    pub public_rps: f64,
    pub public_burst: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let premium = RateLimiterConfig::premium();
        let public = RateLimiterConfig::public();
        Self {
            premium_rps: premium.requests_per_second,
            premium_burst: premium.burst_limit,
            public_rps: public.requests_per_second,
            public_burst: public.burst_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub native_ms: u64,
    pub token_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            native_ms: 12_000,
            token_ms: 10_000,
        }
    }
}

impl ServiceConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, BalanceError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BalanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BalanceError> {
        let fail = |msg: &str| Err(BalanceError::Config(msg.to_string()));
        if self.token_symbol.trim().is_empty() {
            return fail("token_symbol must not be empty");
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0 {
            return fail("circuit breaker thresholds must be at least 1");
        }
        if self.cache.sweep_interval_ms == 0 || self.cache.refresh_interval_ms == 0 {
            return fail("background intervals must be non-zero");
        }
        if self.timeouts.native_ms == 0 || self.timeouts.token_ms == 0 {
            return fail("call timeouts must be non-zero");
        }
        if self.rate_limits.premium_burst < 1.0 || self.rate_limits.public_burst < 1.0 {
            return fail("rate limit bursts must admit at least one request");
        }
        if let Some((name, _)) = self.durations().into_iter().find(|(_, ms)| *ms > MAX_DURATION_MS) {
            return Err(BalanceError::Config(format!(
                "{name} exceeds the {MAX_DURATION_MS}ms ceiling"
            )));
        }
        Ok(())
    }

    fn durations(&self) -> [(&'static str, u64); 13] {
        [
            ("cache.network_ttl_ms", self.cache.network_ttl_ms),
            ("cache.aggregate_ttl_ms", self.cache.aggregate_ttl_ms),
            ("cache.refresh_after_ms", self.cache.refresh_after_ms),
            ("cache.sweep_interval_ms", self.cache.sweep_interval_ms),
            ("cache.refresh_interval_ms", self.cache.refresh_interval_ms),
            ("cache.stale_circuit_after_ms", self.cache.stale_circuit_after_ms),
            ("retry.base_delay_ms", self.retry.base_delay_ms),
            ("retry.max_delay_ms", self.retry.max_delay_ms),
            ("retry.jitter_ms", self.retry.jitter_ms),
            ("retry.rate_limit_cooldown_ms", self.retry.rate_limit_cooldown_ms),
            ("circuit_breaker.open_ms", self.circuit_breaker.open_ms),
            ("timeouts.native_ms", self.timeouts.native_ms),
            ("timeouts.token_ms", self.timeouts.token_ms),
        ]
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: 2.0,
            jitter_max: Duration::from_millis(self.retry.jitter_ms),
            rate_limit_cooldown: Duration::from_millis(self.retry.rate_limit_cooldown_ms),
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold,
            open_duration: Duration::from_millis(self.circuit_breaker.open_ms),
            success_threshold: self.circuit_breaker.success_threshold,
        }
    }

    pub fn premium_rate_limit(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_second: self.rate_limits.premium_rps,
            burst_limit: self.rate_limits.premium_burst,
            window: Duration::from_secs(1),
        }
    }

    pub fn public_rate_limit(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_second: self.rate_limits.public_rps,
            burst_limit: self.rate_limits.public_burst,
            window: Duration::from_secs(1),
        }
    }

    pub fn native_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.native_ms)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.token_ms)
    }
}
