//! Per-network RPC connections.
//!
//! The first request for a network resolves its endpoint: a keyed provider
//! URL when credentials cover the chain and the premium budget admits the
//! request, the network's public URL otherwise. The transport built for that
//! endpoint is kept for the life of the manager.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use chainbalance_core::error::TransportError;
use chainbalance_core::policy::RateLimiter;
use chainbalance_core::registry::NetworkConfig;
use chainbalance_core::transport::{Connector, Endpoint, EndpointClass, RpcTransport};
use chainbalance_providers::{public, ProviderCredentials};

/// A live transport and the endpoint it was built for.
#[derive(Clone)]
pub struct Connection {
    pub endpoint: Endpoint,
    pub transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    credentials: ProviderCredentials,
    limiter: RateLimiter,
    connections: DashMap<String, Connection>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        credentials: ProviderCredentials,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            connector,
            credentials,
            limiter,
            connections: DashMap::new(),
        }
    }

    /// Connection for `network`, created on first use.
    pub fn connection(&self, network: &NetworkConfig) -> Result<Connection, TransportError> {
        if let Some(existing) = self.connections.get(&network.name) {
            return Ok(existing.value().clone());
        }
        match self.connections.entry(network.name.clone()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let endpoint = self.resolve(network)?;
                let transport = self.connector.connect(&endpoint)?;
                tracing::info!(
                    network = %endpoint.network,
                    chain_id = endpoint.chain_id,
                    class = %endpoint.class,
                    "RPC connection established"
                );
                let conn = Connection {
                    endpoint,
                    transport,
                };
                e.insert(conn.clone());
                Ok(conn)
            }
        }
    }

    /// Class of the endpoint in use for `network`, if connected.
    pub fn endpoint_class(&self, network: &str) -> Option<EndpointClass> {
        self.connections.get(network).map(|c| c.endpoint.class)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn resolve(&self, network: &NetworkConfig) -> Result<Endpoint, TransportError> {
        let endpoint = |class, url| Endpoint {
            network: network.name.clone(),
            chain_id: network.chain_id,
            class,
            url,
        };

        if let Some(url) = self.credentials.premium_url(network.chain_id) {
            if self.limiter.allow(EndpointClass::Premium) {
                return Ok(endpoint(EndpointClass::Premium, url));
            }
            tracing::warn!(
                network = %network.name,
                "premium rate budget exhausted, using public endpoint"
            );
        }

        let url = if network.rpc_url.is_empty() {
            public::fallback_url(network.chain_id)
                .map(str::to_string)
                .ok_or_else(|| {
                    TransportError::Other(format!("no RPC endpoint for network {}", network.name))
                })?
        } else {
            network.rpc_url.clone()
        };
        if !self.limiter.wait_time(EndpointClass::Public).is_zero() {
            tracing::debug!(network = %network.name, "public rate budget exhausted");
        }
        Ok(endpoint(EndpointClass::Public, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chainbalance_core::policy::RateLimiterConfig;
    use chainbalance_core::request::{JsonRpcRequest, JsonRpcResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Null(String);

    #[async_trait]
    impl RpcTransport for Null {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            Ok(JsonRpcResponse::success(req.id, serde_json::json!("0x0")))
        }
        fn url(&self) -> &str {
            &self.0
        }
    }

    #[derive(Default)]
    struct Recording {
        connects: AtomicUsize,
        endpoints: Mutex<Vec<Endpoint>>,
    }

    impl Connector for Recording {
        fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn RpcTransport>, TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.endpoints.lock().unwrap().push(endpoint.clone());
            Ok(Arc::new(Null(endpoint.url.clone())))
        }
    }

    fn net(name: &str, chain_id: u64) -> NetworkConfig {
        NetworkConfig {
            name: name.into(),
            chain_id,
            is_testnet: true,
            native_symbol: "ETH".into(),
            native_decimals: 18,
            rpc_url: format!("https://public.example/{name}"),
            explorer_url: String::new(),
        }
    }

    fn manager(creds: ProviderCredentials, premium: RateLimiterConfig) -> (Arc<Recording>, ConnectionManager) {
        let connector = Arc::new(Recording::default());
        let mgr = ConnectionManager::new(
            connector.clone(),
            creds,
            RateLimiter::new(premium, RateLimiterConfig::public()),
        );
        (connector, mgr)
    }

    #[test]
    fn public_without_credentials() {
        let (_, mgr) = manager(ProviderCredentials::default(), RateLimiterConfig::premium());
        let conn = mgr.connection(&net("sepolia", 11155111)).unwrap();
        assert_eq!(conn.endpoint.class, EndpointClass::Public);
        assert_eq!(conn.transport.url(), "https://public.example/sepolia");
    }

    #[test]
    fn premium_with_credentials() {
        let creds = ProviderCredentials::default().with_alchemy("key");
        let (_, mgr) = manager(creds, RateLimiterConfig::premium());
        let conn = mgr.connection(&net("base-sepolia", 84532)).unwrap();
        assert_eq!(conn.endpoint.class, EndpointClass::Premium);
        assert!(conn.endpoint.url.contains("alchemy"));
    }

    #[test]
    fn saturated_premium_falls_back_to_public() {
        let creds = ProviderCredentials::default().with_alchemy("key");
        let one_shot = RateLimiterConfig {
            requests_per_second: 1.0,
            burst_limit: 1.0,
            window: Duration::from_secs(60),
        };
        let (_, mgr) = manager(creds, one_shot);
        let first = mgr.connection(&net("sepolia", 11155111)).unwrap();
        let second = mgr.connection(&net("base-sepolia", 84532)).unwrap();
        assert_eq!(first.endpoint.class, EndpointClass::Premium);
        assert_eq!(second.endpoint.class, EndpointClass::Public);
        assert_eq!(mgr.endpoint_class("base-sepolia"), Some(EndpointClass::Public));
    }

    #[test]
    fn public_selection_leaves_public_budget_untouched() {
        let one_shot = RateLimiterConfig {
            requests_per_second: 0.01,
            burst_limit: 1.0,
            window: Duration::from_secs(60),
        };
        let mgr = ConnectionManager::new(
            Arc::new(Recording::default()),
            ProviderCredentials::default(),
            RateLimiter::new(RateLimiterConfig::premium(), one_shot),
        );
        for (name, chain_id) in [("sepolia", 11155111), ("base-sepolia", 84532), ("holesky", 17000)] {
            let conn = mgr.connection(&net(name, chain_id)).unwrap();
            assert_eq!(conn.endpoint.class, EndpointClass::Public);
        }
        assert_eq!(mgr.limiter.available(EndpointClass::Public), 1.0);
    }

    #[test]
    fn connection_is_reused() {
        let (connector, mgr) = manager(ProviderCredentials::default(), RateLimiterConfig::premium());
        let network = net("sepolia", 11155111);
        mgr.connection(&network).unwrap();
        mgr.connection(&network).unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn empty_rpc_url_uses_builtin_public_endpoint() {
        let (connector, mgr) = manager(ProviderCredentials::default(), RateLimiterConfig::premium());
        let mut network = net("sepolia", 11155111);
        network.rpc_url.clear();
        mgr.connection(&network).unwrap();
        let endpoints = connector.endpoints.lock().unwrap();
        assert!(endpoints[0].url.starts_with("https://"));
    }

    #[test]
    fn unknown_chain_without_url_fails() {
        let (_, mgr) = manager(ProviderCredentials::default(), RateLimiterConfig::premium());
        let mut network = net("devnet", 999_999);
        network.rpc_url.clear();
        assert!(mgr.connection(&network).is_err());
        assert!(mgr.is_empty());
    }
}
