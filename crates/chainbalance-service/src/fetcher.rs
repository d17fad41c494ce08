//! Native and token balance fetchers.
//!
//! Both fetchers validate the address before touching the network, bound
//! every RPC call with a deadline, and run under the shared retry policy so
//! each attempt lands in the network monitor exactly once. Failures never
//! escape as `Err`: the outcome carries the fallback value and the
//! classified error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainbalance_core::abi::{self, CallData};
use chainbalance_core::classify;
use chainbalance_core::error::{ErrorKind, NetworkError, TransportError};
use chainbalance_core::monitor::NetworkMonitor;
use chainbalance_core::policy::RetryPolicy;
use chainbalance_core::registry::{NetworkConfig, TokenRegistry};
use chainbalance_core::request::JsonRpcRequest;
use chainbalance_core::types::{is_valid_address, FetchOutcome, TokenBalance};
use chainbalance_core::units::{format_units, parse_hex_quantity};

use crate::connection::{Connection, ConnectionManager};

pub struct BalanceFetcher {
    connections: Arc<ConnectionManager>,
    monitor: Arc<NetworkMonitor>,
    tokens: TokenRegistry,
    retry: RetryPolicy,
    native_timeout: Duration,
    token_timeout: Duration,
    next_id: AtomicU64,
}

impl BalanceFetcher {
    pub fn new(
        connections: Arc<ConnectionManager>,
        monitor: Arc<NetworkMonitor>,
        tokens: TokenRegistry,
        retry: RetryPolicy,
        native_timeout: Duration,
        token_timeout: Duration,
    ) -> Self {
        Self {
            connections,
            monitor,
            tokens,
            retry,
            native_timeout,
            token_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Native balance of `address` on `network` in whole units, e.g.
    /// `"0.5"`. Falls back to `"0"` with the failure attached.
    pub async fn native_balance(&self, address: &str, network: &NetworkConfig) -> FetchOutcome<String> {
        if !is_valid_address(address) {
            return FetchOutcome::failed("0".into(), invalid_address(network, address));
        }

        let result = self
            .retry
            .execute(&network.name, &self.monitor, |_attempt| async move {
                let conn = self.connect(network)?;
                let req = JsonRpcRequest::get_balance(self.id(), address);
                let hex = self.call(&conn, req, self.native_timeout).await?;
                let wei = parse_hex_quantity(&hex)
                    .map_err(|e| invalid_response(network, format!("eth_getBalance: {e}")))?;
                Ok(format_units(wei, network.native_decimals))
            })
            .await;

        match result {
            Ok(balance) => FetchOutcome::ok(balance),
            Err(e) => {
                tracing::warn!(network = %network.name, error = %e, "native balance fetch failed");
                FetchOutcome::failed("0".into(), e)
            }
        }
    }

    /// Balance of the `symbol` token on `network`. `None` without an error
    /// when the token has no deployment there.
    pub async fn token_balance(
        &self,
        address: &str,
        network: &NetworkConfig,
        symbol: &str,
    ) -> FetchOutcome<Option<TokenBalance>> {
        let Some(deployment) = self.tokens.get(&network.name, symbol) else {
            tracing::debug!(network = %network.name, symbol, "no token deployment");
            return FetchOutcome::ok(None);
        };
        if !is_valid_address(address) {
            return FetchOutcome::failed(None, invalid_address(network, address));
        }

        let result = self
            .retry
            .execute(&network.name, &self.monitor, |_attempt| async move {
                let conn = self.connect(network)?;
                let conn = &conn;
                let contract = deployment.address.as_str();
                let eth_call = move |data: CallData| {
                    let req = JsonRpcRequest::eth_call(self.id(), contract, data.raw());
                    self.call(conn, req, self.token_timeout)
                };
                let (raw, decimals, token_symbol, token_name) = tokio::try_join!(
                    eth_call(CallData::balance_of(address)),
                    eth_call(CallData::decimals()),
                    eth_call(CallData::symbol()),
                    eth_call(CallData::name()),
                )?;

                let raw = abi::decode_uint(&raw)
                    .map_err(|e| invalid_response(network, format!("balanceOf: {e}")))?;
                let decimals = abi::decode_u8(&decimals).unwrap_or_else(|e| {
                    tracing::warn!(network = %network.name, error = %e, "bad decimals(), using registry value");
                    deployment.decimals
                });
                let token_symbol =
                    abi::decode_string(&token_symbol).unwrap_or_else(|_| deployment.symbol.clone());
                let token_name = abi::decode_string(&token_name).unwrap_or_else(|_| token_symbol.clone());

                Ok(Some(TokenBalance {
                    contract_address: deployment.address.clone(),
                    balance: format_units(raw, decimals),
                    raw_balance: raw.to_string(),
                    decimals,
                    symbol: token_symbol,
                    name: token_name,
                    network: network.name.clone(),
                    chain_id: network.chain_id,
                }))
            })
            .await;

        match result {
            Ok(balance) => FetchOutcome::ok(balance),
            Err(e) => {
                tracing::warn!(network = %network.name, symbol, error = %e, "token balance fetch failed");
                FetchOutcome::failed(None, e)
            }
        }
    }

    fn id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn connect(&self, network: &NetworkConfig) -> Result<Connection, NetworkError> {
        self.connections
            .connection(network)
            .map_err(|e| classify(&e, &network.name))
    }

    async fn call(
        &self,
        conn: &Connection,
        req: JsonRpcRequest,
        deadline: Duration,
    ) -> Result<String, NetworkError> {
        let network = conn.endpoint.network.as_str();
        match tokio::time::timeout(deadline, conn.transport.call_hex(req)).await {
            Ok(Ok(hex)) => Ok(hex),
            Ok(Err(e)) => Err(classify(&e, network)),
            Err(_) => {
                let elapsed = TransportError::Timeout {
                    ms: deadline.as_millis() as u64,
                };
                Err(classify(&elapsed, network))
            }
        }
    }
}

fn invalid_address(network: &NetworkConfig, address: &str) -> NetworkError {
    NetworkError::validation(&network.name, format!("invalid address format: {address}"))
}

fn invalid_response(network: &NetworkConfig, message: String) -> NetworkError {
    NetworkError::new(ErrorKind::Unknown, "INVALID_RESPONSE", message, &network.name)
}
