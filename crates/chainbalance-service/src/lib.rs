//! chainbalance-service: cached, failure-isolated balance queries across
//! EVM networks.
//!
//! # Quick start
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainbalance_service::BalanceService;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(BalanceService::builder().build()?);
//! let worker = service.start_background();
//!
//! let networks = service.networks().names();
//! let balances = service
//!     .get_all_network_balances("0x0000000000000000000000000000000000000001", &networks, true)
//!     .await;
//! println!("total USDC: {}", balances.total_usdc());
//!
//! worker.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod fetcher;
pub mod service;
pub mod worker;

pub use cache::{BalanceCache, CacheStats};
pub use config::ServiceConfig;
pub use connection::{Connection, ConnectionManager};
pub use fetcher::BalanceFetcher;
pub use service::{BalanceService, BalanceServiceBuilder, SweepReport};
pub use worker::BackgroundHandle;
