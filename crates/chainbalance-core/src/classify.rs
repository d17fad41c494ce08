//! Failure classification.
//!
//! This is the only place raw transport errors are inspected. Retry and
//! circuit-breaker bookkeeping consume the resulting [`NetworkError`].

use crate::error::{ErrorKind, NetworkError, TransportError};

const RATE_LIMIT_RPC_CODES: &[i64] = &[-32005, -32029, 429];

const RATE_LIMIT_MARKERS: &[&str] = &[
    "too many requests",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "exceeded",
    "throttl",
];

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline"];

const NETWORK_MARKERS: &[&str] = &[
    "connection",
    "connect",
    "dns",
    "network",
    "refused",
    "reset",
    "unreachable",
    "eof",
    "broken pipe",
];

/// Classify a transport failure observed on `network`.
pub fn classify(error: &TransportError, network: &str) -> NetworkError {
    let message = error.to_string();
    let (kind, code) = match error {
        TransportError::RateLimited { .. } => (ErrorKind::RateLimited, None),
        TransportError::Timeout { .. } => (ErrorKind::Timeout, None),
        TransportError::Status { status, body } => {
            (classify_status(*status, body), Some(status.to_string()))
        }
        TransportError::Rpc(err) => {
            let kind = if RATE_LIMIT_RPC_CODES.contains(&err.code) {
                ErrorKind::RateLimited
            } else {
                classify_message(&err.message)
            };
            (kind, Some(err.code.to_string()))
        }
        TransportError::Http(msg) => (classify_message(msg), None),
        TransportError::Deserialization(_) | TransportError::InvalidResponse(_) => {
            (ErrorKind::Unknown, None)
        }
        TransportError::Other(msg) => (classify_message(msg), None),
    };
    let code = code.unwrap_or_else(|| kind.default_code().to_string());
    NetworkError::new(kind, code, message, network)
}

fn classify_status(status: u16, body: &str) -> ErrorKind {
    match status {
        429 => ErrorKind::RateLimited,
        408 | 504 => ErrorKind::Timeout,
        502 | 503 => ErrorKind::NetworkFailure,
        _ => classify_message(body),
    }
}

/// Message-based fallback. Rate limiting wins over timeout, timeout over
/// network failure, matching how providers phrase compound errors
/// ("request timed out: too many requests").
fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
    if has(RATE_LIMIT_MARKERS) {
        ErrorKind::RateLimited
    } else if has(TIMEOUT_MARKERS) {
        ErrorKind::Timeout
    } else if has(NETWORK_MARKERS) {
        ErrorKind::NetworkFailure
    } else {
        ErrorKind::Unknown
    }
}
