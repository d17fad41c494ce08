//! Exponential backoff retry policy with random jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::NetworkError;
use crate::monitor::NetworkMonitor;

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub base_delay: Duration,
    /// Maximum backoff delay (caps exponential growth, excludes jitter).
    pub max_delay: Duration,
    /// Multiplier applied to backoff on each retry.
    pub multiplier: f64,
    /// Upper bound of the uniform random jitter added to every backoff.
    pub jitter_max: Duration,
    /// Extra pause, applied once per operation, after a rate-limited failure.
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_max: Duration::from_millis(500),
            rate_limit_cooldown: Duration::from_secs(5),
        }
    }
}

/// Retry policy: computes delays and drives a fallible operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Exponential part of the delay before the `attempt`-th retry (1-based),
    /// capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.config.base_delay.as_millis() as f64 * self.config.multiplier.powi(exp);
        let cap_ms = self.config.max_delay.as_millis() as f64;
        Duration::from_millis(base_ms.min(cap_ms) as u64)
    }

    /// Returns the full delay (backoff plus jitter) before the `attempt`-th
    /// retry. Returns `None` if `attempt` exceeds `max_retries`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let jitter_ms = self.config.jitter_max.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        Some(self.backoff(attempt) + jitter)
    }

    /// Returns `true` if any retries remain after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.config.max_retries
    }

    /// Run `op` against `network` with breaker gating and backoff.
    ///
    /// `op` receives the 0-based attempt number. Every attempt that reaches
    /// the network is recorded on `monitor` exactly once. Validation errors
    /// return immediately and are not recorded. At most `max_retries + 1`
    /// attempts are made.
    pub async fn execute<T, F, Fut>(
        &self,
        network: &str,
        monitor: &NetworkMonitor,
        mut op: F,
    ) -> Result<T, NetworkError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        if !monitor.is_available(network) {
            return Err(NetworkError::circuit_open(network));
        }

        let mut cooled_down = false;
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    monitor.record_success(network);
                    if attempt > 0 {
                        tracing::debug!(network, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_validation() => return Err(e),
                Err(e) => {
                    monitor.record_failure(network, &e);
                    attempt += 1;

                    let Some(mut delay) = self.next_delay(attempt) else {
                        tracing::error!(network, attempt, error = %e, "max retries exceeded");
                        return Err(e);
                    };
                    if !monitor.is_available(network) {
                        tracing::warn!(network, attempt, "circuit opened, abandoning retries");
                        return Err(e);
                    }
                    if e.is_rate_limited() && !cooled_down {
                        delay += self.config.rate_limit_cooldown;
                        cooled_down = true;
                    }
                    tracing::warn!(
                        network,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    if !monitor.is_available(network) {
                        return Err(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::policy::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
            jitter_max: Duration::ZERO,
            rate_limit_cooldown: Duration::from_millis(1),
        })
    }

    fn monitor() -> NetworkMonitor {
        NetworkMonitor::new(CircuitBreakerConfig::default(), 100)
    }

    fn timeout() -> NetworkError {
        NetworkError::new(ErrorKind::Timeout, "TIMEOUT", "timed out", "sepolia")
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter_max: Duration::ZERO,
            ..Default::default()
        });
        assert_eq!(policy.next_delay(1).unwrap().as_millis(), 100);
        assert_eq!(policy.next_delay(2).unwrap().as_millis(), 200);
        assert_eq!(policy.next_delay(3).unwrap().as_millis(), 400);
        assert!(policy.next_delay(4).is_none());
    }

    #[test]
    fn delay_capped_at_max_plus_jitter() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 10.0,
            jitter_max: Duration::from_millis(50),
            ..Default::default()
        });
        for _ in 0..20 {
            let d5 = policy.next_delay(5).unwrap();
            assert!(d5 >= Duration::from_millis(500), "d5={d5:?} below cap");
            assert!(d5 <= Duration::from_millis(550), "d5={d5:?} exceeds cap + jitter");
        }
    }

    #[test]
    fn should_retry_boundary() {
        let policy = fast(2);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[tokio::test]
    async fn attempts_never_exceed_max_retries_plus_one() {
        let m = monitor();
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(3)
            .execute("sepolia", &m, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout()) }
            })
            .await;
        assert!(result.unwrap_err().is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(m.health("sepolia").failed_requests, 4);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let m = monitor();
        let result = fast(3)
            .execute("sepolia", &m, |attempt| async move {
                if attempt < 2 {
                    Err(timeout())
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        let h = m.health("sepolia");
        assert_eq!(h.total_requests, 3);
        assert_eq!(h.failed_requests, 2);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried_or_recorded() {
        let m = monitor();
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(3)
            .execute("sepolia", &m, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(NetworkError::validation("sepolia", "bad address")) }
            })
            .await;
        assert!(result.unwrap_err().is_validation());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(m.health("sepolia").total_requests, 0);
    }

    #[tokio::test]
    async fn open_breaker_aborts_retry_loop() {
        let m = NetworkMonitor::new(
            CircuitBreakerConfig {
                failure_threshold: 2,
                ..Default::default()
            },
            100,
        );
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(5)
            .execute("sepolia", &m, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout()) }
            })
            .await;
        assert!(result.unwrap_err().is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Subsequent calls short-circuit without touching the operation.
        let result: Result<(), _> = fast(5)
            .execute("sepolia", &m, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::CircuitOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_cooldown_applies_once_per_operation() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            multiplier: 2.0,
            jitter_max: Duration::ZERO,
            rate_limit_cooldown: Duration::from_millis(100),
        });
        let m = monitor();
        let calls = AtomicU32::new(0);
        let started = std::time::Instant::now();
        let result: Result<(), _> = policy
            .execute("sepolia", &m, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(NetworkError::new(
                        ErrorKind::RateLimited,
                        "RATE_LIMITED",
                        "429 Too Many Requests",
                        "sepolia",
                    ))
                }
            })
            .await;
        let elapsed = started.elapsed();

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(elapsed >= Duration::from_millis(100), "elapsed={elapsed:?}");
        // Three cooldowns would take at least 300ms.
        assert!(elapsed < Duration::from_millis(250), "elapsed={elapsed:?}");
    }
}
