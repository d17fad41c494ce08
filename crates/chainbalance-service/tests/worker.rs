mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_config, service, Behavior, MockNode, OWNER};

#[tokio::test]
async fn worker_refreshes_queued_entries() {
    let node = MockNode::new(Behavior::Healthy { wei: 1, usdc: 1 });
    let mut cfg = fast_config(0);
    cfg.cache.refresh_after_ms = 0;
    cfg.cache.refresh_interval_ms = 20;
    let svc = Arc::new(service(cfg, &[("n1", node.clone())]));

    svc.get_network_balance(OWNER, "n1", true).await.unwrap();
    // served from cache, but old enough to queue a refresh
    svc.get_network_balance(OWNER, "n1", true).await.unwrap();
    assert_eq!(node.calls(), 5);
    assert_eq!(svc.cache_stats().refresh_queue_size, 1);

    let handle = svc.start_background();
    assert!(handle.is_running());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(svc.cache_stats().refresh_queue_size, 0);
    assert_eq!(node.calls(), 10);
    assert_eq!(svc.cache_stats().network_entries, 1);

    handle.stop().await;
}

#[tokio::test]
async fn worker_sweeps_expired_entries() {
    let node = MockNode::new(Behavior::Healthy { wei: 1, usdc: 1 });
    let mut cfg = fast_config(0);
    cfg.cache.network_ttl_ms = 10;
    cfg.cache.sweep_interval_ms = 30;
    let svc = Arc::new(service(cfg, &[("n1", node)]));

    svc.get_network_balance(OWNER, "n1", true).await.unwrap();
    let handle = svc.start_background();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(svc.cache_stats().network_entries, 0);
    handle.stop().await;
}

#[tokio::test]
async fn stop_is_prompt_with_long_intervals() {
    let svc = Arc::new(service(fast_config(0), &[("n1", MockNode::new(Behavior::Refused))]));
    let handle = svc.start_background();
    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("worker stops without waiting for a tick");
}
