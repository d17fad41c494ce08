//! Balance results returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::policy::CircuitSnapshot;
use crate::registry::NetworkConfig;
use crate::units;

/// Returns `true` for a `0x`-prefixed, 20-byte hex address.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// A fetched value together with the failure that produced it, if any.
///
/// On failure `value` holds the fallback (`"0"` for native balances, `None`
/// for tokens) and `error` says why; a genuine zero has no error.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub value: T,
    pub error: Option<NetworkError>,
}

impl<T> FetchOutcome<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn failed(fallback: T, error: NetworkError) -> Self {
        Self {
            value: fallback,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Balance of one ERC-20 token on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract_address: String,
    /// Human-readable amount, e.g. `"100.5"`.
    pub balance: String,
    /// Base-unit integer amount.
    pub raw_balance: String,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub network: String,
    pub chain_id: u64,
}

/// Per-network result of one query cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkBalance {
    pub network: String,
    pub chain_id: u64,
    pub is_testnet: bool,
    pub native_balance: String,
    pub usdc: Option<TokenBalance>,
    pub error: Option<String>,
    pub error_detail: Option<NetworkError>,
    pub circuit_breaker: Option<CircuitSnapshot>,
    pub last_successful_fetch: Option<DateTime<Utc>>,
}

impl NetworkBalance {
    pub fn success(
        network: &NetworkConfig,
        native_balance: String,
        token: Option<TokenBalance>,
    ) -> Self {
        Self {
            network: network.name.clone(),
            chain_id: network.chain_id,
            is_testnet: network.is_testnet,
            native_balance,
            usdc: token,
            error: None,
            error_detail: None,
            circuit_breaker: None,
            last_successful_fetch: None,
        }
    }

    /// Failed entry for a configured network. Carries no balances.
    pub fn failure(network: &NetworkConfig, error: NetworkError) -> Self {
        let mut entry = Self::failure_for(&network.name, error);
        entry.chain_id = network.chain_id;
        entry.is_testnet = network.is_testnet;
        entry
    }

    /// Failed entry for a network that could not be resolved at all.
    pub fn failure_for(network: &str, error: NetworkError) -> Self {
        Self {
            network: network.to_string(),
            chain_id: 0,
            is_testnet: false,
            native_balance: "0".to_string(),
            usdc: None,
            error: Some(error.to_string()),
            error_detail: Some(error),
            circuit_breaker: None,
            last_successful_fetch: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn with_circuit(mut self, snapshot: CircuitSnapshot) -> Self {
        self.circuit_breaker = Some(snapshot);
        self
    }

    pub fn with_last_success(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_successful_fetch = at;
        self
    }
}

/// Token balance summed across networks, with the per-network breakdown.
///
/// The total is derived from `networks` at construction and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBalance {
    total_usdc: String,
    networks: Vec<NetworkBalance>,
    timestamp: DateTime<Utc>,
}

impl AggregatedBalance {
    pub fn new(networks: Vec<NetworkBalance>) -> Self {
        Self {
            total_usdc: Self::recompute_total(&networks),
            networks,
            timestamp: Utc::now(),
        }
    }

    /// Sum of token balances over entries without an error. Entries whose
    /// balance string cannot be parsed are skipped with a warning.
    pub fn recompute_total(networks: &[NetworkBalance]) -> String {
        let contributing: Vec<&str> = networks
            .iter()
            .filter(|n| n.is_ok())
            .filter_map(|n| n.usdc.as_ref())
            .filter(|t| {
                let valid = units::parse_units(&t.balance, t.decimals).is_ok();
                if !valid {
                    tracing::warn!(network = %t.network, balance = %t.balance, "unparseable token balance");
                }
                valid
            })
            .map(|t| t.balance.as_str())
            .collect();
        units::sum_decimals(contributing).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "token balance sum overflowed");
            "0".to_string()
        })
    }

    pub fn total_usdc(&self) -> &str {
        &self.total_usdc
    }

    pub fn networks(&self) -> &[NetworkBalance] {
        &self.networks
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn into_networks(self) -> Vec<NetworkBalance> {
        self.networks
    }
}
