//! Error types: raw transport failures, the classified per-network error
//! record, and service-level errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed before a response arrived (connect, DNS, TLS, body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Rate limit exceeded: caller should back off.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited { provider: String },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Response was well-formed JSON-RPC but not a usable value.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

/// Closed set of failure categories every downstream decision is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Timeout,
    NetworkFailure,
    /// Malformed caller input. Never retried, never counted against a network.
    Validation,
    /// The network's circuit breaker rejected the call without an attempt.
    CircuitOpen,
    Unknown,
}

impl ErrorKind {
    /// Symbolic code used when the raw error carries none of its own.
    pub fn default_code(&self) -> &'static str {
        match self {
            Self::RateLimited => "RATE_LIMITED",
            Self::Timeout => "TIMEOUT",
            Self::NetworkFailure => "NETWORK_ERROR",
            Self::Validation => "INVALID_INPUT",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Timeout => write!(f, "timeout"),
            Self::NetworkFailure => write!(f, "network failure"),
            Self::Validation => write!(f, "validation"),
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified failure on one network.
///
/// Built by [`crate::classify::classify`] for transport failures, or by the
/// constructors below for failures that never reached the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{network}] {kind}: {message}")]
pub struct NetworkError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub network: String,
    pub timestamp: DateTime<Utc>,
}

impl NetworkError {
    pub fn new(
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            network: network.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn validation(network: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Validation,
            ErrorKind::Validation.default_code(),
            message,
            network,
        )
    }

    pub fn circuit_open(network: impl Into<String>) -> Self {
        let network = network.into();
        let message = format!("circuit breaker open for {network}, skipping request");
        Self::new(
            ErrorKind::CircuitOpen,
            ErrorKind::CircuitOpen.default_code(),
            message,
            network,
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_network_failure(&self) -> bool {
        self.kind == ErrorKind::NetworkFailure
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

/// Errors surfaced by the balance service API itself (not per-network faults).
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
