//! TTL caches for per-network and aggregated balances.
//!
//! Entries expire lazily on read and eagerly on [`BalanceCache::sweep`].
//! A per-network hit older than the refresh threshold is served as-is and
//! queued so the background worker can re-fetch it before it expires.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use chainbalance_core::types::{AggregatedBalance, NetworkBalance};

/// A cached value and its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Concurrent map with per-entry expiry.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Live entry for `key`. An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<CacheEntry<V>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value().clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, e| e.is_expired_at(now));
        }
        None
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, e)| e.value)
    }

    /// Drop every entry for which `keep` returns false. Returns the number removed.
    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| keep(k));
        before.saturating_sub(self.entries.len())
    }

    /// Remove expired entries. Returns the number removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired_at(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key of a per-network balance. Addresses are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkKey {
    pub address: String,
    pub network: String,
}

impl NetworkKey {
    pub fn new(address: &str, network: &str) -> Self {
        Self {
            address: address.to_lowercase(),
            network: network.to_string(),
        }
    }
}

/// Key of an aggregate: the address and the sorted network list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub address: String,
    pub networks: Vec<String>,
}

impl AggregateKey {
    pub fn new(address: &str, networks: &[String]) -> Self {
        let mut networks = networks.to_vec();
        networks.sort();
        Self {
            address: address.to_lowercase(),
            networks,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub network: Duration,
    pub aggregate: Duration,
    pub refresh_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub network_entries: usize,
    pub aggregate_entries: usize,
    pub refresh_queue_size: usize,
}

pub struct BalanceCache {
    networks: TtlCache<NetworkKey, NetworkBalance>,
    aggregates: TtlCache<AggregateKey, AggregatedBalance>,
    refresh_queue: Mutex<HashSet<NetworkKey>>,
    ttls: CacheTtls,
}

impl BalanceCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            networks: TtlCache::new(),
            aggregates: TtlCache::new(),
            refresh_queue: Mutex::new(HashSet::new()),
            ttls,
        }
    }

    fn queue(&self) -> MutexGuard<'_, HashSet<NetworkKey>> {
        self.refresh_queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached balance for `address` on `network`. Hits past the refresh
    /// threshold are queued for background refresh.
    pub fn get_network(&self, address: &str, network: &str) -> Option<NetworkBalance> {
        let key = NetworkKey::new(address, network);
        let now = Instant::now();
        let entry = self.networks.get_at(&key, now)?;
        if entry.age_at(now) >= self.ttls.refresh_after {
            tracing::debug!(address = %key.address, network, "queueing background refresh");
            self.queue().insert(key);
        }
        Some(entry.value)
    }

    pub fn put_network(&self, address: &str, balance: NetworkBalance) {
        let key = NetworkKey::new(address, &balance.network);
        self.networks.insert(key, balance, self.ttls.network);
    }

    pub fn get_aggregate(&self, address: &str, networks: &[String]) -> Option<AggregatedBalance> {
        self.aggregates
            .get(&AggregateKey::new(address, networks))
            .map(|e| e.value)
    }

    pub fn put_aggregate(&self, address: &str, networks: &[String], aggregate: AggregatedBalance) {
        self.aggregates.insert(
            AggregateKey::new(address, networks),
            aggregate,
            self.ttls.aggregate,
        );
    }

    /// Drop cached balances for `address`: one network's entry and every
    /// aggregate that includes it, or everything for the address when
    /// `network` is `None`. Returns the number of entries removed.
    pub fn invalidate(&self, address: &str, network: Option<&str>) -> usize {
        let address = address.to_lowercase();
        let removed = match network {
            Some(network) => {
                let single = usize::from(
                    self.networks
                        .remove(&NetworkKey::new(&address, network))
                        .is_some(),
                );
                let aggregates = self.aggregates.retain(|k| {
                    k.address != address || !k.networks.iter().any(|n| n == network)
                });
                self.queue()
                    .retain(|k| k.address != address || k.network != network);
                single + aggregates
            }
            None => {
                let networks = self.networks.retain(|k| k.address != address);
                let aggregates = self.aggregates.retain(|k| k.address != address);
                self.queue().retain(|k| k.address != address);
                networks + aggregates
            }
        };
        tracing::debug!(%address, network = ?network, removed, "cache invalidated");
        removed
    }

    /// Remove expired entries from both tables.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        self.networks.sweep_at(now) + self.aggregates.sweep_at(now)
    }

    /// Take every queued refresh key.
    pub fn drain_refresh_queue(&self) -> Vec<NetworkKey> {
        self.queue().drain().collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            network_entries: self.networks.len(),
            aggregate_entries: self.aggregates.len(),
            refresh_queue_size: self.queue().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbalance_core::registry::NetworkConfig;

    const ADDR: &str = "0x00000000000000000000000000000000000000AA";

    fn ttls(network_ms: u64, refresh_after_ms: u64) -> CacheTtls {
        CacheTtls {
            network: Duration::from_millis(network_ms),
            aggregate: Duration::from_millis(network_ms),
            refresh_after: Duration::from_millis(refresh_after_ms),
        }
    }

    fn balance(network: &str) -> NetworkBalance {
        let cfg = NetworkConfig {
            name: network.into(),
            chain_id: 1,
            is_testnet: true,
            native_symbol: "ETH".into(),
            native_decimals: 18,
            rpc_url: String::new(),
            explorer_url: String::new(),
        };
        NetworkBalance::success(&cfg, "1.0".into(), None)
    }

    #[test]
    fn expired_entry_is_a_miss_and_removed() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("k", 7, Duration::from_secs(30));
        let now = Instant::now();
        assert_eq!(cache.get_at(&"k", now).map(|e| e.value), Some(7));
        assert!(cache.get_at(&"k", now + Duration::from_secs(31)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("short", 1, Duration::from_secs(1));
        cache.insert("long", 2, Duration::from_secs(60));
        let removed = cache.sweep_at(Instant::now() + Duration::from_secs(2));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn address_lookup_ignores_case() {
        let cache = BalanceCache::new(ttls(30_000, 20_000));
        cache.put_network(ADDR, balance("sepolia"));
        assert!(cache.get_network(&ADDR.to_lowercase(), "sepolia").is_some());
        assert!(cache.get_network(ADDR, "base-sepolia").is_none());
    }

    #[test]
    fn stale_hit_queues_refresh_once() {
        let cache = BalanceCache::new(ttls(30_000, 0));
        cache.put_network(ADDR, balance("sepolia"));
        cache.get_network(ADDR, "sepolia");
        cache.get_network(ADDR, "sepolia");
        assert_eq!(cache.stats().refresh_queue_size, 1);
        let drained = cache.drain_refresh_queue();
        assert_eq!(drained, vec![NetworkKey::new(ADDR, "sepolia")]);
        assert_eq!(cache.stats().refresh_queue_size, 0);
    }

    #[test]
    fn fresh_hit_does_not_queue() {
        let cache = BalanceCache::new(ttls(30_000, 20_000));
        cache.put_network(ADDR, balance("sepolia"));
        cache.get_network(ADDR, "sepolia");
        assert_eq!(cache.stats().refresh_queue_size, 0);
    }

    #[test]
    fn aggregate_key_ignores_network_order() {
        let cache = BalanceCache::new(ttls(30_000, 20_000));
        let a = vec!["sepolia".to_string(), "base-sepolia".to_string()];
        let b = vec!["base-sepolia".to_string(), "sepolia".to_string()];
        cache.put_aggregate(ADDR, &a, AggregatedBalance::new(vec![]));
        assert!(cache.get_aggregate(ADDR, &b).is_some());
    }

    #[test]
    fn invalidate_network_drops_dependent_aggregates() {
        let cache = BalanceCache::new(ttls(30_000, 20_000));
        cache.put_network(ADDR, balance("sepolia"));
        cache.put_network(ADDR, balance("base-sepolia"));
        let both = vec!["sepolia".to_string(), "base-sepolia".to_string()];
        let base_only = vec!["base-sepolia".to_string()];
        cache.put_aggregate(ADDR, &both, AggregatedBalance::new(vec![]));
        cache.put_aggregate(ADDR, &base_only, AggregatedBalance::new(vec![]));

        assert_eq!(cache.invalidate(ADDR, Some("sepolia")), 2);
        assert!(cache.get_network(ADDR, "sepolia").is_none());
        assert!(cache.get_network(ADDR, "base-sepolia").is_some());
        assert!(cache.get_aggregate(ADDR, &both).is_none());
        assert!(cache.get_aggregate(ADDR, &base_only).is_some());
    }

    #[test]
    fn invalidate_address_drops_everything_for_it() {
        let cache = BalanceCache::new(ttls(30_000, 20_000));
        let other = "0x00000000000000000000000000000000000000bb";
        cache.put_network(ADDR, balance("sepolia"));
        cache.put_network(other, balance("sepolia"));
        cache.put_aggregate(ADDR, &["sepolia".to_string()], AggregatedBalance::new(vec![]));

        assert_eq!(cache.invalidate(ADDR, None), 2);
        let stats = cache.stats();
        assert_eq!(stats.network_entries, 1);
        assert_eq!(stats.aggregate_entries, 0);
    }
}
