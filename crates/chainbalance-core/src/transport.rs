//! The `RpcTransport` trait and the `Connector` that builds transports for
//! resolved endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Endpoint class an RPC URL belongs to. Each class has its own rate budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Keyed provider endpoint (Alchemy, Infura).
    Premium,
    /// Free community endpoint, no credential.
    Public,
}

impl std::fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Premium => write!(f, "premium"),
            Self::Public => write!(f, "public"),
        }
    }
}

/// A resolved RPC endpoint for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub network: String,
    pub chain_id: u64,
    pub class: EndpointClass,
    pub url: String,
}

/// The async trait every RPC transport implements.
///
/// Implementations must be `Send + Sync` and are stored as
/// `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Send `req` and unwrap its hex-string result.
    async fn call_hex(&self, req: JsonRpcRequest) -> Result<String, TransportError> {
        self.send(req).await?.into_hex()
    }
}

/// Builds a transport for a resolved endpoint.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn RpcTransport>, TransportError>;
}
