//! Static network and token configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::units::NATIVE_DECIMALS;

fn default_native_decimals() -> u8 {
    NATIVE_DECIMALS
}

/// One EVM network the service can query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Registry key, e.g. `"base-sepolia"`.
    pub name: String,
    pub chain_id: u64,
    #[serde(default)]
    pub is_testnet: bool,
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    /// Public (credential-free) JSON-RPC endpoint.
    pub rpc_url: String,
    #[serde(default)]
    pub explorer_url: String,
}

/// Networks keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    order: Vec<String>,
    networks: HashMap<String, NetworkConfig>,
}

impl NetworkRegistry {
    pub fn new(networks: impl IntoIterator<Item = NetworkConfig>) -> Self {
        let mut registry = Self::default();
        for network in networks {
            registry.insert(network);
        }
        registry
    }

    /// Add or replace a network.
    pub fn insert(&mut self, network: NetworkConfig) {
        if !self.networks.contains_key(&network.name) {
            self.order.push(network.name.clone());
        }
        self.networks.insert(network.name.clone(), network);
    }

    pub fn get(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.order.iter().filter_map(|n| self.networks.get(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A token contract deployed on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployment {
    pub network: String,
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

/// Token deployments keyed by (network, symbol). Symbols match
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    deployments: HashMap<(String, String), TokenDeployment>,
}

impl TokenRegistry {
    pub fn new(deployments: impl IntoIterator<Item = TokenDeployment>) -> Self {
        let mut registry = Self::default();
        for d in deployments {
            registry.insert(d);
        }
        registry
    }

    pub fn insert(&mut self, deployment: TokenDeployment) {
        let key = (deployment.network.clone(), deployment.symbol.to_uppercase());
        self.deployments.insert(key, deployment);
    }

    pub fn get(&self, network: &str, symbol: &str) -> Option<&TokenDeployment> {
        self.deployments
            .get(&(network.to_string(), symbol.to_uppercase()))
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}
