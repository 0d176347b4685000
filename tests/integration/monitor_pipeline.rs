//! Integration tests for the monitor pipeline
//!
//! These tests verify that:
//! - A cycle produces exactly one measurement per snapshot target
//! - Probe failures and timeouts become unreachable measurements
//! - Results reach the cache, the store and the right subscribers
//! - Failed subscribers are pruned without affecting the others
//! - The lifecycle never runs two loops at once
//! - The in-memory backend is trimmed by the retention task

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use ping_monitor::{
    Measurement, MonitorState,
    broadcast::{Frame, Topic, is_dns_resolver, subscriber_queue},
    commands::OutboundMessage,
    config::Config,
    storage::{MeasurementStore, MemoryStore, retention::spawn_retention_task},
};

use crate::helpers::{Reply, StubProbe, create_test_monitor};

fn decode(frame: Frame) -> OutboundMessage {
    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn test_timed_out_target_reaches_full_subscribers_only() {
    // Setup
    let probe = Arc::new(StubProbe::new().with("a.com", Reply::Hang));
    let store = Arc::new(MemoryStore::new());
    let monitor = create_test_monitor(&["a.com"], probe, store.clone());

    let (full_tx, mut full_rx) = subscriber_queue();
    let (dns_tx, mut dns_rx) = subscriber_queue();
    monitor.subscribers().connect(full_tx, Topic::Full).await;
    monitor.subscribers().connect(dns_tx, Topic::DnsOnly).await;

    // Test
    let results = monitor.run_cycle().await.unwrap();

    // Verify
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].target, "a.com");
    assert!(!results[0].reachable);
    assert_eq!(results[0].error.as_deref(), Some("timeout"));

    let cached = monitor.latest_results().await;
    assert_eq!(cached.get("a.com"), Some(&results[0]));
    assert_eq!(store.count(Some("a.com"), None).await.unwrap(), 1);

    assert_matches!(decode(full_rx.try_recv().unwrap()), OutboundMessage::PingUpdate { results: sent, .. } => {
        assert_eq!(sent, results);
    });
    assert!(dns_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_cycle_output_matches_snapshot() {
    // Setup
    let probe = Arc::new(
        StubProbe::new()
            .with("down.example", Reply::Fail("connection reset".to_string()))
            .with("slow.example", Reply::After(Duration::from_millis(50))),
    );
    let targets = ["8.8.8.8", "down.example", "slow.example", "1.1.1.1"];
    let monitor = create_test_monitor(&targets, probe, Arc::new(MemoryStore::new()));

    // Test
    let results = monitor.run_cycle().await.unwrap();

    // Verify
    let probed: Vec<&str> = results.iter().map(|m| m.target.as_str()).collect();
    assert_eq!(probed, targets);

    let timestamp = results[0].timestamp;
    assert!(results.iter().all(|m| m.timestamp == timestamp));

    for m in &results {
        if m.reachable {
            assert!(m.latency_ms.is_some());
        } else {
            assert!(m.error.is_some());
        }
    }
    assert_eq!(results[1].error.as_deref(), Some("connection reset"));
}

#[tokio::test]
async fn test_dns_subscribers_only_see_resolvers() {
    // Setup
    let monitor = create_test_monitor(
        &["8.8.8.8", "google.com", "208.67.222.222", "github.com"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    let (dns_tx, mut dns_rx) = subscriber_queue();
    monitor.subscribers().connect(dns_tx, Topic::DnsOnly).await;

    // Test
    monitor.run_cycle().await.unwrap();

    // Verify
    assert_matches!(decode(dns_rx.try_recv().unwrap()), OutboundMessage::DnsStatusUpdate { results, .. } => {
        let hosts: Vec<&str> = results.iter().map(|m| m.target.as_str()).collect();
        assert_eq!(hosts, vec!["8.8.8.8", "208.67.222.222"]);
        assert!(results.iter().all(|m| is_dns_resolver(&m.target)));
    });
}

#[tokio::test]
async fn test_failed_subscriber_is_pruned() {
    // Setup
    let monitor = create_test_monitor(
        &["8.8.8.8"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    let (dead_tx, dead_rx) = subscriber_queue();
    let (live_tx, mut live_rx) = subscriber_queue();
    monitor.subscribers().connect(dead_tx, Topic::Full).await;
    monitor.subscribers().connect(live_tx, Topic::Full).await;
    drop(dead_rx);

    // Test
    monitor.run_cycle().await.unwrap();
    monitor.run_cycle().await.unwrap();

    // Verify
    assert_eq!(monitor.subscribers().count().await, 1);
    assert!(live_rx.try_recv().is_ok());
    assert!(live_rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_removed_target_stays_out_of_cache() {
    // Setup
    let monitor = create_test_monitor(
        &["a.com", "b.com"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    monitor.run_cycle().await.unwrap();

    // Test
    monitor.remove_target("a.com").await;

    // Verify
    assert!(!monitor.latest_results().await.contains_key("a.com"));
    let results = monitor.run_cycle().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!monitor.latest_results().await.contains_key("a.com"));
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_one_loop() {
    // Setup
    let probe = Arc::new(StubProbe::new());
    let monitor = create_test_monitor(&["a.com"], probe.clone(), Arc::new(MemoryStore::new()));

    // Test
    assert!(monitor.start().await);
    assert!(!monitor.start().await);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    monitor.shutdown().await;

    // Verify
    assert_eq!(monitor.state().await, MonitorState::Stopped);
    assert_eq!(probe.calls(), 3);
}

#[tokio::test]
async fn test_memory_backend_is_trimmed_by_retention() {
    // Setup
    let config: Config = serde_json::from_str(r#"{ "storage": { "backend": "none" } }"#).unwrap();
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store
        .insert(&Measurement::reachable("a.com", 5.0, now - chrono::Duration::days(45)))
        .await
        .unwrap();
    store.insert(&Measurement::reachable("a.com", 5.0, now)).await.unwrap();

    // Test
    let task = spawn_retention_task(
        store.clone(),
        config.storage().retention_days(),
        Duration::from_secs(3600),
    );

    // Verify
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while store.count(None, None).await.unwrap() > 1 {
        assert!(tokio::time::Instant::now() < deadline, "old rows never removed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    task.abort();
    assert_eq!(store.count(Some("a.com"), None).await.unwrap(), 1);
}
