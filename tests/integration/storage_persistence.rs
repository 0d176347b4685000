//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Every cycle result is persisted to the SQLite backend
//! - Rows survive reopening the database file
//! - Host summaries and latest-per-host queries read back what was written
//! - Retention cleanup removes old measurements only

use std::sync::Arc;

use chrono::{Duration, Utc};
use ping_monitor::{
    Measurement,
    commands::{CommandHandler, OutboundMessage},
    storage::{
        MeasurementQuery, MeasurementStore, TimeWindow, retention::run_cleanup,
        sqlite::SqliteStore,
    },
};
use tempfile::tempdir;

use crate::helpers::{Reply, StubProbe, create_test_monitor, seed_host};

#[tokio::test]
async fn test_cycles_are_persisted() {
    // Setup
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(temp_dir.path().join("ping.db")).await.unwrap());
    let probe = Arc::new(StubProbe::new().with("down.example", Reply::Fail("refused".to_string())));
    let monitor = create_test_monitor(&["8.8.8.8", "down.example"], probe, store.clone());

    // Test
    monitor.run_cycle().await.unwrap();
    monitor.run_cycle().await.unwrap();

    // Verify
    assert_eq!(store.count(None, None).await.unwrap(), 4);
    assert_eq!(store.count(Some("8.8.8.8"), None).await.unwrap(), 2);

    let rows = store
        .query(MeasurementQuery::new(TimeWindow::from_hours(1)).with_host("down.example"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| !row.measurement.reachable));
    assert_eq!(rows[0].measurement.error.as_deref(), Some("refused"));
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    // Setup
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ping.db");
    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        seed_host(&store, "1.1.1.1", 5, 1).await;
        store.close().await.unwrap();
    }

    // Test
    let store = SqliteStore::new(&db_path).await.unwrap();

    // Verify
    assert_eq!(store.count(Some("1.1.1.1"), None).await.unwrap(), 5);
    assert_eq!(store.distinct_hosts().await.unwrap(), vec!["1.1.1.1"]);
}

#[tokio::test]
async fn test_host_summary_over_window() {
    // Setup
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(temp_dir.path().join("ping.db")).await.unwrap());
    seed_host(store.as_ref(), "8.8.8.8", 10, 2).await;
    let monitor = create_test_monitor(&["8.8.8.8"], Arc::new(StubProbe::new()), store.clone());
    let handler = CommandHandler::new(monitor);

    // Test
    let reply = handler
        .handle(r#"{"type":"get_host_summary","host":"8.8.8.8","minutes":120}"#)
        .await;

    // Verify
    let OutboundMessage::HostSummaryResponse { host, summary } = reply else {
        panic!("unexpected reply: {reply:?}");
    };
    assert_eq!(host, "8.8.8.8");
    assert_eq!(summary.total_pings, 10);
    assert_eq!(summary.packet_losses, 2);
    assert_eq!(summary.minutes_analyzed, 120);
    assert!((summary.uptime_percentage - 80.0).abs() < 1e-9);
    assert!(summary.min_response_time.unwrap() <= summary.max_response_time.unwrap());
}

#[tokio::test]
async fn test_latest_per_host() {
    // Setup
    let temp_dir = tempdir().unwrap();
    let store = SqliteStore::new(temp_dir.path().join("ping.db")).await.unwrap();
    let now = Utc::now();

    store
        .insert(&Measurement::unreachable("a.com", "timeout", now - Duration::seconds(10)))
        .await
        .unwrap();
    store
        .insert(&Measurement::reachable("a.com", 12.0, now))
        .await
        .unwrap();
    store
        .insert(&Measurement::reachable("b.com", 30.0, now))
        .await
        .unwrap();

    // Test
    let latest = store.latest_per_host().await.unwrap();

    // Verify
    assert_eq!(latest.len(), 2);
    assert!(latest["a.com"].measurement.reachable);
    assert_eq!(latest["a.com"].measurement.latency_ms, Some(12.0));
    assert_eq!(latest["b.com"].measurement.latency_ms, Some(30.0));
}

#[tokio::test]
async fn test_retention_cleanup() {
    // Setup
    let temp_dir = tempdir().unwrap();
    let store = SqliteStore::new(temp_dir.path().join("ping.db")).await.unwrap();
    let now = Utc::now();

    for days in [40, 35, 1] {
        store
            .insert(&Measurement::reachable("a.com", 5.0, now - Duration::days(days)))
            .await
            .unwrap();
    }

    // Test
    let deleted = run_cleanup(&store, 30).await;

    // Verify
    assert_eq!(deleted, 2);
    assert_eq!(store.count(Some("a.com"), None).await.unwrap(), 1);
}
