//! In-memory storage backend (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Running the hub with `"storage": { "backend": "none" }`
//!
//! ## Limitations
//!
//! - **No persistence**: all data lost on restart
//! - **Linear scans**: every query walks the whole buffer

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, MeasurementQuery, MeasurementStore, TimeWindow};
use super::error::StorageResult;
use super::schema::{HostSummary, StoredMeasurement};
use crate::Measurement;

#[derive(Debug, Default)]
struct MemoryRows {
    rows: Vec<StoredMeasurement>,
    next_id: i64,
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryRows>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of `host` (or all hosts) whose timestamp lies inside `window`
    fn matching<'a>(
        rows: &'a [StoredMeasurement],
        host: Option<&'a str>,
        window: Option<TimeWindow>,
    ) -> impl Iterator<Item = &'a StoredMeasurement> + 'a {
        let since = window.map(|w| w.start(Utc::now()));
        rows.iter().filter(move |row| {
            host.is_none_or(|h| row.measurement.target == h)
                && since.is_none_or(|s| row.measurement.timestamp >= s)
        })
    }
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn insert(&self, measurement: &Measurement) -> StorageResult<i64> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredMeasurement {
            id,
            measurement: measurement.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn query(&self, query: MeasurementQuery) -> StorageResult<Vec<StoredMeasurement>> {
        debug!("querying in-memory storage for {:?}", query.host);

        let inner = self.inner.read().await;
        let mut rows: Vec<StoredMeasurement> =
            Self::matching(&inner.rows, query.host.as_deref(), Some(query.window))
                .cloned()
                .collect();

        rows.sort_by(|a, b| {
            b.measurement
                .timestamp
                .cmp(&a.measurement.timestamp)
                .then(b.id.cmp(&a.id))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn get(&self, id: i64) -> StorageResult<Option<StoredMeasurement>> {
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().find(|row| row.id == id).cloned())
    }

    async fn latest_per_host(&self) -> StorageResult<BTreeMap<String, StoredMeasurement>> {
        let inner = self.inner.read().await;
        let mut latest: BTreeMap<String, StoredMeasurement> = BTreeMap::new();

        for row in &inner.rows {
            let newer = latest
                .get(&row.measurement.target)
                .is_none_or(|current| {
                    (row.measurement.timestamp, row.id)
                        > (current.measurement.timestamp, current.id)
                });
            if newer {
                latest.insert(row.measurement.target.clone(), row.clone());
            }
        }

        Ok(latest)
    }

    async fn aggregate(&self, host: &str, window: TimeWindow) -> StorageResult<HostSummary> {
        let inner = self.inner.read().await;
        let rows = Self::matching(&inner.rows, Some(host), Some(window)).map(|row| &row.measurement);
        Ok(HostSummary::from_measurements(host, window, rows))
    }

    async fn distinct_hosts(&self) -> StorageResult<Vec<String>> {
        let inner = self.inner.read().await;
        let hosts: BTreeSet<&String> = inner.rows.iter().map(|row| &row.measurement.target).collect();
        Ok(hosts.into_iter().cloned().collect())
    }

    async fn count(&self, host: Option<&str>, window: Option<TimeWindow>) -> StorageResult<u64> {
        let inner = self.inner.read().await;
        Ok(Self::matching(&inner.rows, host, window).count() as u64)
    }

    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut inner = self.inner.write().await;
        let previous = inner.rows.len();
        inner.rows.retain(|row| row.measurement.timestamp >= before);
        let deleted = previous - inner.rows.len();
        debug!("deleted {deleted} in-memory measurements");
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let inner = self.inner.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_measurements".to_string(), inner.rows.len().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
