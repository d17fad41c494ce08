//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! The client performs exactly one HTTP round trip per request. Retry,
//! circuit breaking and rate limiting are applied by the caller, so failures
//! are mapped into the most specific [`TransportError`] variant and returned
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chainbalance_core::error::TransportError;
use chainbalance_core::request::{JsonRpcRequest, JsonRpcResponse};
use chainbalance_core::transport::{Connector, Endpoint, RpcTransport};

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request deadline enforced by reqwest. Call-level deadlines set
    /// by the fetchers are usually tighter.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Single-endpoint HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            TransportError::Http(format!("connection error: {e}"))
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited {
                provider: self.url.clone(),
            });
        }
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| self.map_reqwest(e))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Builds an [`HttpRpcClient`] for every resolved endpoint.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: HttpClientConfig,
}

impl HttpConnector {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let client = HttpRpcClient::new(endpoint.url.clone(), self.config.clone())?;
        tracing::debug!(
            network = %endpoint.network,
            class = %endpoint.class,
            "HTTP transport created"
        );
        Ok(Arc::new(client))
    }
}
