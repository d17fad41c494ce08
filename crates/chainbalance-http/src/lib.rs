//! chainbalance-http: reqwest-backed JSON-RPC transport for ChainBalance.

pub mod client;

pub use client::{HttpClientConfig, HttpConnector, HttpRpcClient};
