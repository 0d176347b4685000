//! Storage backend trait definition
//!
//! This module defines the `MeasurementStore` trait that all storage
//! implementations must implement.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::error::StorageResult;
use super::schema::{HostSummary, StoredMeasurement};
use crate::Measurement;

/// Default number of rows returned by `query`
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// A look-back window ending "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    minutes: u64,
}

impl TimeWindow {
    pub fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    pub fn from_hours(hours: u64) -> Self {
        Self {
            minutes: hours.saturating_mul(60),
        }
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Window length in hours, rounded to two decimals
    pub fn hours(&self) -> f64 {
        (self.minutes as f64 / 60.0 * 100.0).round() / 100.0
    }

    /// First instant covered by the window when it ends at `now`
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let minutes = i64::try_from(self.minutes).unwrap_or(i64::MAX);
        Duration::try_minutes(minutes)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::from_hours(24)
    }
}

/// Parameters for fetching stored measurements
#[derive(Debug, Clone)]
pub struct MeasurementQuery {
    pub window: TimeWindow,

    /// Restrict to a single host
    pub host: Option<String>,

    /// Maximum number of results
    pub limit: usize,

    /// Number of newest results to skip
    pub offset: usize,
}

impl MeasurementQuery {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            host: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for measurement persistence
///
/// Implementations must be `Send + Sync` as they are shared between the
/// monitor loop, every websocket session and the REST handlers.
///
/// Methods return `StorageResult<T>`; implementations convert their
/// backend-specific errors into `StorageError` variants.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Persist one measurement and return its row id
    async fn insert(&self, measurement: &Measurement) -> StorageResult<i64>;

    /// Measurements inside the window, newest first
    async fn query(&self, query: MeasurementQuery) -> StorageResult<Vec<StoredMeasurement>>;

    /// A single measurement by row id
    async fn get(&self, id: i64) -> StorageResult<Option<StoredMeasurement>>;

    /// The most recent measurement of every host ever stored
    async fn latest_per_host(&self) -> StorageResult<BTreeMap<String, StoredMeasurement>>;

    /// Summary statistics for one host over the window
    async fn aggregate(&self, host: &str, window: TimeWindow) -> StorageResult<HostSummary>;

    /// Every host with at least one stored measurement, sorted
    async fn distinct_hosts(&self) -> StorageResult<Vec<String>>;

    /// Number of stored measurements, optionally filtered
    async fn count(&self, host: Option<&str>, window: Option<TimeWindow>) -> StorageResult<u64>;

    /// Delete measurements older than `before`, returning how many were removed
    ///
    /// Used by the retention task.
    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    /// Lightweight check that the backend is operational
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
