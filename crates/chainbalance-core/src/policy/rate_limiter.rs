//! Token bucket rate limiter, one bucket per endpoint class.
//!
//! Tokens accrue at `requests_per_second` up to `burst_limit`. On top of the
//! bucket, a sliding window of request timestamps caps the number of requests
//! admitted within any `window`, so a full bucket cannot be drained in one
//! instant past the per-second limit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::transport::EndpointClass;

/// Rate limiter configuration for a single bucket.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Sustained rate, also the cap on requests inside one window.
    pub requests_per_second: f64,
    /// Maximum tokens in the bucket.
    pub burst_limit: f64,
    /// Length of the sliding request window.
    pub window: Duration,
}

impl RateLimiterConfig {
    pub fn premium() -> Self {
        Self {
            requests_per_second: 25.0,
            burst_limit: 50.0,
            window: Duration::from_secs(1),
        }
    }

    pub fn public() -> Self {
        Self {
            requests_per_second: 5.0,
            burst_limit: 10.0,
            window: Duration::from_secs(1),
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::public()
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
    recent: VecDeque<Instant>,
}

/// Thread-safe token bucket.
pub struct TokenBucket {
    config: RateLimiterConfig,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: config.burst_limit,
                last_refill: Instant::now(),
                recent: VecDeque::new(),
            }),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit one request if both the bucket and the window allow it.
    ///
    /// Returns `false` (consuming nothing) when the bucket is empty or the
    /// window already holds `requests_per_second` requests.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();
        let now = Instant::now();
        self.refill(&mut state, now);
        self.prune(&mut state, now);

        if state.tokens < 1.0 || state.recent.len() as f64 >= self.config.requests_per_second {
            return false;
        }
        state.tokens -= 1.0;
        state.recent.push_back(now);
        true
    }

    /// Estimated wait until the next request would be admitted.
    pub fn wait_time(&self) -> Duration {
        let mut state = self.lock();
        let now = Instant::now();
        self.refill(&mut state, now);
        self.prune(&mut state, now);

        let token_wait = if state.tokens >= 1.0 || self.config.requests_per_second <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - state.tokens) / self.config.requests_per_second)
        };
        let window_wait = if (state.recent.len() as f64) < self.config.requests_per_second {
            Duration::ZERO
        } else {
            state
                .recent
                .front()
                .map(|oldest| (*oldest + self.config.window).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO)
        };
        token_wait.max(window_wait)
    }

    /// Returns currently available tokens.
    pub fn available(&self) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state, Instant::now());
        state.tokens
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let new_tokens = elapsed * self.config.requests_per_second;
        state.tokens = (state.tokens + new_tokens).min(self.config.burst_limit);
        state.last_refill = now;
    }

    fn prune(&self, state: &mut BucketState, now: Instant) {
        while let Some(oldest) = state.recent.front() {
            if now.duration_since(*oldest) >= self.config.window {
                state.recent.pop_front();
            } else {
                break;
            }
        }
    }
}

/// One token bucket per [`EndpointClass`].
pub struct RateLimiter {
    buckets: HashMap<EndpointClass, TokenBucket>,
}

impl RateLimiter {
    pub fn new(premium: RateLimiterConfig, public: RateLimiterConfig) -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(EndpointClass::Premium, TokenBucket::new(premium));
        buckets.insert(EndpointClass::Public, TokenBucket::new(public));
        Self { buckets }
    }

    /// Try to admit one request for `class`.
    pub fn allow(&self, class: EndpointClass) -> bool {
        self.buckets
            .get(&class)
            .map(TokenBucket::allow_request)
            .unwrap_or(true)
    }

    /// Wait time before `class` admits another request.
    pub fn wait_time(&self, class: EndpointClass) -> Duration {
        self.buckets
            .get(&class)
            .map(TokenBucket::wait_time)
            .unwrap_or(Duration::ZERO)
    }

    pub fn available(&self, class: EndpointClass) -> f64 {
        self.buckets
            .get(&class)
            .map(TokenBucket::available)
            .unwrap_or(f64::INFINITY)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::premium(), RateLimiterConfig::public())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(rps: f64, burst: f64) -> TokenBucket {
        TokenBucket::new(RateLimiterConfig {
            requests_per_second: rps,
            burst_limit: burst,
            window: Duration::from_secs(1),
        })
    }

    #[test]
    fn allow_within_burst() {
        let b = bucket(10.0, 10.0);
        for _ in 0..10 {
            assert!(b.allow_request(), "should succeed within burst");
        }
        assert!(!b.allow_request());
    }

    #[test]
    fn window_caps_below_burst() {
        // A 20-token burst still admits only 5 requests inside one window.
        let b = bucket(5.0, 20.0);
        let admitted = (0..20).filter(|_| b.allow_request()).count();
        assert_eq!(admitted, 5);
        assert!(b.wait_time() > Duration::ZERO);
    }

    #[test]
    fn reject_when_empty() {
        let b = bucket(0.0001, 3.0);
        assert!(b.allow_request());
        assert!(!b.allow_request(), "window of ~0 rps admits nothing more");
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let b = bucket(1000.0, 4.0);
        std::thread::sleep(Duration::from_millis(20));
        assert!(b.available() <= 4.0);
    }

    #[test]
    fn classes_are_independent() {
        let rl = RateLimiter::new(
            RateLimiterConfig {
                requests_per_second: 1.0,
                burst_limit: 1.0,
                window: Duration::from_secs(1),
            },
            RateLimiterConfig::public(),
        );
        assert!(rl.allow(EndpointClass::Premium));
        assert!(!rl.allow(EndpointClass::Premium));
        assert!(rl.allow(EndpointClass::Public));
    }
}
