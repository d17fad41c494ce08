//! `BalanceService`: the public query surface.
//!
//! Answers per-network and multi-network balance queries from the cache when
//! possible, otherwise by fanning out to the fetchers. One network failing,
//! timing out, or sitting behind an open breaker never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use chainbalance_core::error::{BalanceError, NetworkError};
use chainbalance_core::monitor::{NetworkHealth, NetworkMonitor};
use chainbalance_core::policy::{RateLimiter, RetryPolicy};
use chainbalance_core::registry::{NetworkConfig, NetworkRegistry, TokenRegistry};
use chainbalance_core::transport::Connector;
use chainbalance_core::types::{is_valid_address, AggregatedBalance, NetworkBalance};
use chainbalance_http::HttpConnector;
use chainbalance_providers::{catalog, ProviderCredentials};

use crate::cache::{BalanceCache, CacheStats, CacheTtls};
use crate::config::ServiceConfig;
use crate::connection::ConnectionManager;
use crate::fetcher::BalanceFetcher;
use crate::worker::{self, BackgroundHandle};

/// What one maintenance sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub expired_entries: usize,
    pub circuits_reset: usize,
}

pub struct BalanceService {
    config: ServiceConfig,
    networks: NetworkRegistry,
    monitor: Arc<NetworkMonitor>,
    connections: Arc<ConnectionManager>,
    fetcher: BalanceFetcher,
    cache: BalanceCache,
}

impl BalanceService {
    pub fn builder() -> BalanceServiceBuilder {
        BalanceServiceBuilder::default()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Native and token balance of `address` on one network.
    ///
    /// Only an unknown network is an `Err`; every network-level failure is
    /// reported inside the returned entry.
    pub async fn get_network_balance(
        &self,
        address: &str,
        network: &str,
        use_cache: bool,
    ) -> Result<NetworkBalance, BalanceError> {
        let cfg = self
            .networks
            .get(network)
            .ok_or_else(|| BalanceError::UnknownNetwork(network.to_string()))?;

        if use_cache {
            if let Some(hit) = self.cache.get_network(address, network) {
                tracing::debug!(network, "network balance cache hit");
                return Ok(hit);
            }
        }

        if !is_valid_address(address) {
            let err = NetworkError::validation(network, format!("invalid address format: {address}"));
            return Ok(NetworkBalance::failure(cfg, err));
        }

        if !self.monitor.is_available(network) {
            tracing::debug!(network, "circuit open, skipping network");
            let entry = NetworkBalance::failure(cfg, NetworkError::circuit_open(network));
            return Ok(self.annotate(entry));
        }

        let entry = self.fetch(address, cfg).await;
        if entry.is_ok() {
            self.cache.put_network(address, entry.clone());
        }
        Ok(entry)
    }

    /// Balances of `address` on every listed network plus the summed token
    /// total. Entries keep the order of `networks`.
    pub async fn get_all_network_balances(
        &self,
        address: &str,
        networks: &[String],
        use_cache: bool,
    ) -> AggregatedBalance {
        if use_cache {
            if let Some(hit) = self
                .cache
                .get_aggregate(address, networks)
                .and_then(|hit| in_requested_order(hit, networks))
            {
                tracing::debug!(networks = networks.len(), "aggregate cache hit");
                return hit;
            }
        }

        let results = join_all(
            networks
                .iter()
                .map(|network| self.get_network_balance(address, network, use_cache)),
        )
        .await;

        let entries: Vec<NetworkBalance> = networks
            .iter()
            .zip(results)
            .map(|(network, result)| {
                result.unwrap_or_else(|e| {
                    tracing::warn!(network = %network, error = %e, "network query failed");
                    NetworkBalance::failure_for(network, NetworkError::validation(network, e.to_string()))
                })
            })
            .collect();

        let failed = entries.iter().filter(|e| !e.is_ok()).count();
        let aggregate = AggregatedBalance::new(entries);
        tracing::info!(
            networks = networks.len(),
            failed,
            total = %aggregate.total_usdc(),
            "balances aggregated"
        );
        self.cache.put_aggregate(address, networks, aggregate.clone());
        aggregate
    }

    /// Drop cached balances for `address`, on one network or on all of them.
    pub fn invalidate_cache(&self, address: &str, network: Option<&str>) -> usize {
        self.cache.invalidate(address, network)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Health of every configured network, keyed by name.
    pub fn network_health(&self) -> BTreeMap<String, NetworkHealth> {
        self.networks
            .iter()
            .map(|n| (n.name.clone(), self.monitor.health(&n.name)))
            .collect()
    }

    /// Most recent classified failures on `network`, oldest first.
    pub fn recent_errors(&self, network: &str) -> Vec<NetworkError> {
        self.monitor.recent_errors(network)
    }

    /// Remove expired cache entries and reset breakers stuck open.
    pub fn sweep(&self) -> SweepReport {
        let stale_after = Duration::from_millis(self.config.cache.stale_circuit_after_ms);
        let report = SweepReport {
            expired_entries: self.cache.sweep(),
            circuits_reset: self.monitor.reset_stale_circuits(stale_after),
        };
        tracing::info!(
            expired = report.expired_entries,
            circuits_reset = report.circuits_reset,
            "cache sweep complete"
        );
        report
    }

    /// Re-fetch every queued (address, network) pair. Returns how many
    /// refreshes succeeded.
    pub async fn refresh_queued(&self) -> usize {
        let queued = self.cache.drain_refresh_queue();
        if queued.is_empty() {
            return 0;
        }
        let results = join_all(
            queued
                .iter()
                .map(|key| self.get_network_balance(&key.address, &key.network, false)),
        )
        .await;
        let refreshed = results
            .iter()
            .filter(|r| matches!(r, Ok(entry) if entry.is_ok()))
            .count();
        tracing::debug!(queued = queued.len(), refreshed, "background refresh complete");
        refreshed
    }

    /// Start the periodic sweep and refresh task.
    pub fn start_background(self: &Arc<Self>) -> BackgroundHandle {
        worker::spawn(
            self,
            Duration::from_millis(self.config.cache.sweep_interval_ms),
            Duration::from_millis(self.config.cache.refresh_interval_ms),
        )
    }

    async fn fetch(&self, address: &str, cfg: &NetworkConfig) -> NetworkBalance {
        let (native, token) = tokio::join!(
            self.fetcher.native_balance(address, cfg),
            self.fetcher
                .token_balance(address, cfg, &self.config.token_symbol),
        );
        let entry = match native.error.or(token.error) {
            None => NetworkBalance::success(cfg, native.value, token.value),
            Some(e) => NetworkBalance::failure(cfg, e),
        };
        self.annotate(entry)
    }

    fn annotate(&self, entry: NetworkBalance) -> NetworkBalance {
        let circuit = self.monitor.circuit(&entry.network);
        let last_success = self.monitor.last_success(&entry.network);
        entry.with_circuit(circuit).with_last_success(last_success)
    }
}

/// The cached aggregate is keyed by the sorted network set; lay its entries
/// out in the order this caller asked for. `None` if an entry is missing.
fn in_requested_order(hit: AggregatedBalance, networks: &[String]) -> Option<AggregatedBalance> {
    let cached = hit.into_networks();
    let entries = networks
        .iter()
        .map(|name| cached.iter().find(|e| &e.network == name).cloned())
        .collect::<Option<Vec<_>>>()?;
    Some(AggregatedBalance::new(entries))
}

/// Assembles a [`BalanceService`]. Unset parts default to the built-in
/// testnet catalog, credentials from the environment, and HTTP transports.
#[derive(Default)]
pub struct BalanceServiceBuilder {
    config: ServiceConfig,
    networks: Option<NetworkRegistry>,
    tokens: Option<TokenRegistry>,
    credentials: Option<ProviderCredentials>,
    connector: Option<Arc<dyn Connector>>,
}

impl BalanceServiceBuilder {
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn networks(mut self, networks: NetworkRegistry) -> Self {
        self.networks = Some(networks);
        self
    }

    pub fn tokens(mut self, tokens: TokenRegistry) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<BalanceService, BalanceError> {
        let config = self.config;
        config.validate()?;

        let networks = self.networks.unwrap_or_else(catalog::testnets);
        if networks.is_empty() {
            return Err(BalanceError::Config("no networks configured".into()));
        }
        let tokens = self.tokens.unwrap_or_else(catalog::usdc_deployments);
        let credentials = self.credentials.unwrap_or_else(ProviderCredentials::from_env);
        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(HttpConnector::default()),
        };

        let monitor = Arc::new(NetworkMonitor::new(
            config.circuit_breaker_config(),
            config.error_history,
        ));
        let limiter = RateLimiter::new(config.premium_rate_limit(), config.public_rate_limit());
        let connections = Arc::new(ConnectionManager::new(connector, credentials, limiter));
        let fetcher = BalanceFetcher::new(
            connections.clone(),
            monitor.clone(),
            tokens,
            RetryPolicy::new(config.retry_config()),
            config.native_timeout(),
            config.token_timeout(),
        );
        let cache = BalanceCache::new(CacheTtls {
            network: Duration::from_millis(config.cache.network_ttl_ms),
            aggregate: Duration::from_millis(config.cache.aggregate_ttl_ms),
            refresh_after: Duration::from_millis(config.cache.refresh_after_ms),
        });

        tracing::info!(
            networks = networks.len(),
            token = %config.token_symbol,
            "balance service ready"
        );
        Ok(BalanceService {
            config,
            networks,
            monitor,
            connections,
            fetcher,
            cache,
        })
    }
}
