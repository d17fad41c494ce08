//! chainbalance-core: foundation traits and types for ChainBalance.
//!
//! # Overview
//!
//! ChainBalance reads native and ERC-20 balances for one address across many
//! EVM networks, each behind an unreliable JSON-RPC endpoint. The core crate
//! defines:
//!
//! - [`RpcTransport`] / [`Connector`]: transport abstraction
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`], [`NetworkError`], [`classify`]: failure taxonomy
//! - [`policy`] module: retry, circuit breaker, rate limiter
//! - [`NetworkMonitor`]: per-network attempt ledger and health
//! - [`NetworkBalance`] / [`AggregatedBalance`]: result types

pub mod abi;
pub mod classify;
pub mod error;
pub mod monitor;
pub mod policy;
pub mod registry;
pub mod request;
pub mod transport;
pub mod types;
pub mod units;

pub use classify::classify;
pub use error::{BalanceError, ErrorKind, NetworkError, TransportError};
pub use monitor::{NetworkHealth, NetworkMonitor};
pub use registry::{NetworkConfig, NetworkRegistry, TokenDeployment, TokenRegistry};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use transport::{Connector, Endpoint, EndpointClass, RpcTransport};
pub use types::{is_valid_address, AggregatedBalance, FetchOutcome, NetworkBalance, TokenBalance};
