//! Policy engine: reliability middleware applied around every network read.
//!
//! ```text
//! ConnectionManager → [RateLimiter]     (endpoint class selection)
//! BalanceFetcher    → [CircuitBreaker] → [RetryPolicy] → [Transport]
//! ```

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitSnapshot, CircuitState,
};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, TokenBucket};
pub use retry::{RetryConfig, RetryPolicy};
