//! Integration tests for the REST API
//!
//! These tests verify that:
//! - The server answers on a real socket
//! - Metric endpoints serve what the monitor persisted
//! - Summaries and cleanup honor their windows
//! - Out-of-range parameters are rejected with 400

use std::net::SocketAddr;
use std::sync::Arc;

use ping_monitor::{
    MonitorState,
    api::{
        ApiConfig, ApiState, spawn_api_server,
        types::{
            CleanupResponse, ConnectionsResponse, CountResponse, HealthResponse, LiveResponse,
            MetricsResponse, ServiceHealth,
        },
    },
    monitor::PingMonitor,
    storage::{HostSummary, MemoryStore},
};
use reqwest::StatusCode;

use crate::helpers::{Reply, StubProbe, create_test_monitor, seed_host};

async fn start_server(monitor: PingMonitor) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };
    spawn_api_server(config, ApiState::new(monitor)).await.unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    // Setup
    let monitor = create_test_monitor(
        &["8.8.8.8", "github.com"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    let addr = start_server(monitor).await;

    // Test
    let health: HealthResponse = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Verify
    assert_eq!(health.status, ServiceHealth::Healthy);
    assert_eq!(health.monitoring, MonitorState::Stopped);
    assert_eq!(health.target_count, 2);
    assert_eq!(health.ping_interval_seconds, 1);
    assert!(health.storage.healthy);
}

#[tokio::test]
async fn test_metrics_after_cycles() {
    // Setup
    let store = Arc::new(MemoryStore::new());
    let probe = Arc::new(StubProbe::new().with("down.example", Reply::Hang));
    let monitor = create_test_monitor(&["8.8.8.8", "down.example"], probe, store);
    monitor.run_cycle().await.unwrap();
    monitor.run_cycle().await.unwrap();
    let addr = start_server(monitor).await;
    let client = reqwest::Client::new();

    // Test
    let metrics: MetricsResponse = client
        .get(format!("http://{addr}/api/ping-metrics?host=8.8.8.8&limit=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let count: CountResponse = client
        .get(format!("http://{addr}/api/ping-metrics/count?hours=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let live: LiveResponse = client
        .get(format!("http://{addr}/api/ping-metrics/live"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Verify
    assert_eq!(metrics.count, 1);
    assert_eq!(metrics.limit, 1);
    assert_eq!(metrics.metrics[0].measurement.target, "8.8.8.8");

    assert_eq!(count.count, 4);
    assert_eq!(count.hours, Some(1));

    assert!(!live.monitoring_active);
    assert!(live.timestamp.is_some());
    assert!(live.results["8.8.8.8"].reachable);
    assert_eq!(live.results["down.example"].error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_metric_by_id() {
    // Setup
    let store = Arc::new(MemoryStore::new());
    let monitor = create_test_monitor(&["1.1.1.1"], Arc::new(StubProbe::new()), store);
    monitor.run_cycle().await.unwrap();
    let addr = start_server(monitor).await;

    // Test
    let metrics: MetricsResponse = reqwest::get(format!("http://{addr}/api/ping-metrics"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = metrics.metrics[0].id;
    let found = reqwest::get(format!("http://{addr}/api/ping-metrics/{id}"))
        .await
        .unwrap();
    let missing = reqwest::get(format!("http://{addr}/api/ping-metrics/{}", id + 100))
        .await
        .unwrap();

    // Verify
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_host_summary_endpoint() {
    // Setup
    let store = Arc::new(MemoryStore::new());
    seed_host(store.as_ref(), "8.8.8.8", 10, 2).await;
    let monitor = create_test_monitor(&["8.8.8.8"], Arc::new(StubProbe::new()), store);
    let addr = start_server(monitor).await;

    // Test
    let summary: HostSummary = reqwest::get(format!(
        "http://{addr}/api/ping-metrics/hosts/8.8.8.8/summary?minutes=120"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let narrow: HostSummary = reqwest::get(format!(
        "http://{addr}/api/ping-metrics/hosts/8.8.8.8/summary?minutes=3"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    // Verify
    assert_eq!(summary.total_pings, 10);
    assert_eq!(summary.packet_losses, 2);
    assert!((summary.uptime_percentage - 80.0).abs() < 1e-9);

    assert!(narrow.total_pings < summary.total_pings);
    assert_eq!(narrow.minutes_analyzed, 3);
}

#[tokio::test]
async fn test_cleanup_endpoint() {
    // Setup
    let store = Arc::new(MemoryStore::new());
    seed_host(store.as_ref(), "8.8.8.8", 3, 0).await;
    let monitor = create_test_monitor(&["8.8.8.8"], Arc::new(StubProbe::new()), store);
    let addr = start_server(monitor).await;
    let client = reqwest::Client::new();

    // Test
    let cleanup: CleanupResponse = client
        .delete(format!("http://{addr}/api/ping-metrics/cleanup?days=7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rejected = client
        .delete(format!("http://{addr}/api/ping-metrics/cleanup?days=400"))
        .send()
        .await
        .unwrap();

    // Verify
    assert_eq!(cleanup.deleted_records, 0);
    assert_eq!(cleanup.cutoff_days, 7);
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_parameters_return_bad_request() {
    // Setup
    let monitor = create_test_monitor(
        &["8.8.8.8"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    let addr = start_server(monitor).await;

    // Test & Verify
    for path in [
        "/api/ping-metrics?hours=200",
        "/api/ping-metrics?limit=0",
        "/api/ping-metrics/hosts/8.8.8.8/summary?hours=0",
    ] {
        let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("must be between"));
    }
}

#[tokio::test]
async fn test_connections_without_subscribers() {
    // Setup
    let monitor = create_test_monitor(
        &["8.8.8.8"],
        Arc::new(StubProbe::new()),
        Arc::new(MemoryStore::new()),
    );
    let addr = start_server(monitor).await;

    // Test
    let connections: ConnectionsResponse =
        reqwest::get(format!("http://{addr}/api/ws/connections"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

    // Verify
    assert_eq!(connections.active_connections, 0);
    assert_eq!(connections.full_subscribers, 0);
    assert_eq!(connections.dns_subscribers, 0);
    assert!(!connections.monitoring_active);
}
