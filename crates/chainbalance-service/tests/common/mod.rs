#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use chainbalance_core::error::TransportError;
use chainbalance_core::registry::{NetworkConfig, NetworkRegistry, TokenDeployment, TokenRegistry};
use chainbalance_core::request::{JsonRpcRequest, JsonRpcResponse};
use chainbalance_core::transport::{Connector, Endpoint, RpcTransport};
use chainbalance_providers::ProviderCredentials;
use chainbalance_service::config::ServiceConfig;
use chainbalance_service::BalanceService;

pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";

#[derive(Clone, Copy)]
pub enum Behavior {
    /// Native balance in wei and token balance in base units (6 decimals).
    Healthy { wei: u128, usdc: u128 },
    Timeout,
    Refused,
}

pub struct MockNode {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockNode {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn word(value: u128) -> String {
    format!("0x{value:064x}")
}

fn abi_string(s: &str) -> String {
    let mut data = hex::encode(s.as_bytes());
    while data.len() % 64 != 0 {
        data.push('0');
    }
    format!("0x{:064x}{:064x}{data}", 32, s.len())
}

#[async_trait]
impl RpcTransport for MockNode {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (wei, usdc) = match self.behavior {
            Behavior::Healthy { wei, usdc } => (wei, usdc),
            Behavior::Timeout => return Err(TransportError::Timeout { ms: 10 }),
            Behavior::Refused => {
                return Err(TransportError::Http("connection refused".into()))
            }
        };
        let result = if req.method == "eth_getBalance" {
            json!(format!("0x{wei:x}"))
        } else {
            let data = req.params[0]["data"].as_str().unwrap_or_default();
            match data.get(2..10) {
                Some("70a08231") => json!(word(usdc)),
                Some("313ce567") => json!(word(6)),
                Some("95d89b41") => json!(abi_string("USDC")),
                _ => json!(abi_string("USD Coin")),
            }
        };
        Ok(JsonRpcResponse::success(req.id, result))
    }

    fn url(&self) -> &str {
        "mock://node"
    }
}

/// Routes each network to its own mock node.
#[derive(Default)]
pub struct MockConnector {
    nodes: HashMap<String, Arc<MockNode>>,
}

impl MockConnector {
    pub fn with(mut self, network: &str, node: Arc<MockNode>) -> Self {
        self.nodes.insert(network.to_string(), node);
        self
    }
}

impl Connector for MockConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn RpcTransport>, TransportError> {
        self.nodes
            .get(&endpoint.network)
            .cloned()
            .map(|n| n as Arc<dyn RpcTransport>)
            .ok_or_else(|| TransportError::Http(format!("connection refused: {}", endpoint.url)))
    }
}

pub fn network(name: &str, chain_id: u64) -> NetworkConfig {
    NetworkConfig {
        name: name.into(),
        chain_id,
        is_testnet: true,
        native_symbol: "ETH".into(),
        native_decimals: 18,
        rpc_url: format!("mock://{name}"),
        explorer_url: String::new(),
    }
}

/// Millisecond-scale retry and breaker settings.
pub fn fast_config(max_retries: u32) -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.retry.max_retries = max_retries;
    cfg.retry.base_delay_ms = 1;
    cfg.retry.max_delay_ms = 2;
    cfg.retry.jitter_ms = 0;
    cfg.retry.rate_limit_cooldown_ms = 1;
    cfg.timeouts.native_ms = 200;
    cfg.timeouts.token_ms = 200;
    cfg
}

/// A service over `nodes`, each a (network name, node) pair with USDC
/// deployed on every network.
pub fn service(config: ServiceConfig, nodes: &[(&str, Arc<MockNode>)]) -> BalanceService {
    let mut connector = MockConnector::default();
    let mut networks = Vec::new();
    let mut tokens = Vec::new();
    for (i, (name, node)) in nodes.iter().enumerate() {
        connector = connector.with(name, node.clone());
        networks.push(network(name, 1000 + i as u64));
        tokens.push(TokenDeployment {
            network: name.to_string(),
            symbol: "USDC".into(),
            address: format!("0x{:040x}", 0xc0ffee + i),
            decimals: 6,
        });
    }
    BalanceService::builder()
        .config(config)
        .networks(NetworkRegistry::new(networks))
        .tokens(TokenRegistry::new(tokens))
        .credentials(ProviderCredentials::default())
        .connector(Arc::new(connector))
        .build()
        .expect("service builds")
}

pub fn names(nodes: &[&str]) -> Vec<String> {
    nodes.iter().map(|n| n.to_string()).collect()
}
