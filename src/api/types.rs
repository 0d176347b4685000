//! API response types
//!
//! Shared between the route handlers and the integration tests, which
//! deserialize responses back into these structs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StoredMeasurement;
use crate::{Measurement, MonitorState};

/// Overall service health
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Healthy,
    Degraded,
}

/// Storage part of the health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
}

/// GET /api/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceHealth,
    pub timestamp: DateTime<Utc>,
    pub storage: StorageHealth,
    pub monitoring: MonitorState,
    pub target_count: usize,
    pub subscribers: usize,
    pub ping_interval_seconds: u64,
}

/// POST /api/monitoring/start and /stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub message: String,
    pub state: MonitorState,
    /// `false` when the monitor already was in the requested state
    pub changed: bool,
}

/// GET /api/ping-metrics/live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResponse {
    pub monitoring_active: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub results: BTreeMap<String, Measurement>,
}

/// GET /api/ping-metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub hours: u64,
    pub host: Option<String>,
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
    pub metrics: Vec<StoredMeasurement>,
}

/// GET /api/ping-metrics/count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
    pub host: Option<String>,
    pub hours: Option<u64>,
}

/// GET /api/ping-metrics/hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostsResponse {
    pub database_hosts: Vec<String>,
    pub active_monitoring_hosts: Vec<String>,
    pub monitoring_active: bool,
}

/// POST / DELETE /api/ping-metrics/hosts/{host}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostChangeResponse {
    pub message: String,
    pub changed: bool,
    pub current_hosts: Vec<String>,
}

/// DELETE /api/ping-metrics/cleanup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_records: usize,
    pub cutoff_days: u32,
}

/// GET /api/ws/connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub active_connections: usize,
    pub full_subscribers: usize,
    pub dns_subscribers: usize,
    pub monitoring_active: bool,
}
