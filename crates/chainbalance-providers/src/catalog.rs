//! Built-in networks and token deployments.
//!
//! Testnets only: Sepolia and the major L2 test networks, with Circle's
//! USDC deployments on each.

use chainbalance_core::registry::{NetworkConfig, NetworkRegistry, TokenDeployment, TokenRegistry};
use chainbalance_core::units::NATIVE_DECIMALS;

use crate::public;

pub const USDC: &str = "USDC";
pub const USDC_DECIMALS: u8 = 6;

struct Entry {
    name: &'static str,
    chain_id: u64,
    native_symbol: &'static str,
    explorer_url: &'static str,
    usdc: &'static str,
}

const TESTNETS: &[Entry] = &[
    Entry {
        name: "sepolia",
        chain_id: 11155111,
        native_symbol: "ETH",
        explorer_url: "https://sepolia.etherscan.io",
        usdc: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
    },
    Entry {
        name: "base-sepolia",
        chain_id: 84532,
        native_symbol: "ETH",
        explorer_url: "https://sepolia.basescan.org",
        usdc: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
    },
    Entry {
        name: "arbitrum-sepolia",
        chain_id: 421614,
        native_symbol: "ETH",
        explorer_url: "https://sepolia.arbiscan.io",
        usdc: "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d",
    },
    Entry {
        name: "optimism-sepolia",
        chain_id: 11155420,
        native_symbol: "ETH",
        explorer_url: "https://sepolia-optimism.etherscan.io",
        usdc: "0x5fd84259d66Cd46123540766Be93DFE6D43130D7",
    },
    Entry {
        name: "polygon-amoy",
        chain_id: 80002,
        native_symbol: "POL",
        explorer_url: "https://amoy.polygonscan.com",
        usdc: "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582",
    },
];

/// Built-in test networks.
pub fn testnets() -> NetworkRegistry {
    NetworkRegistry::new(TESTNETS.iter().map(|e| NetworkConfig {
        name: e.name.to_string(),
        chain_id: e.chain_id,
        is_testnet: true,
        native_symbol: e.native_symbol.to_string(),
        native_decimals: NATIVE_DECIMALS,
        rpc_url: public::fallback_url(e.chain_id)
            .unwrap_or_default()
            .to_string(),
        explorer_url: e.explorer_url.to_string(),
    }))
}

/// USDC deployments on the built-in test networks.
pub fn usdc_deployments() -> TokenRegistry {
    TokenRegistry::new(TESTNETS.iter().map(|e| TokenDeployment {
        network: e.name.to_string(),
        symbol: USDC.to_string(),
        address: e.usdc.to_string(),
        decimals: USDC_DECIMALS,
    }))
}
