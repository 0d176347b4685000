//! Periodic retention cleanup
//!
//! Deletes measurements older than the configured retention period once at
//! startup and then on every tick of the cleanup interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, instrument};

use super::backend::MeasurementStore;

/// Cleanup interval - run retention cleanup daily
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Oldest instant kept by a retention of `retention_days`.
///
/// Periods reaching past the representable range keep everything.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    chrono::Duration::try_days(i64::from(retention_days))
        .and_then(|period| now.checked_sub_signed(period))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run one retention pass, returning the number of deleted rows
#[instrument(skip(store))]
pub async fn run_cleanup(store: &dyn MeasurementStore, retention_days: u32) -> usize {
    let cutoff = retention_cutoff(Utc::now(), retention_days);

    match store.cleanup_before(cutoff).await {
        Ok(deleted) => {
            info!("retention cleanup removed {deleted} measurements older than {retention_days} days");
            deleted
        }
        Err(e) => {
            error!("retention cleanup failed: {e}");
            0
        }
    }
}

/// Spawn the retention task. The first tick fires immediately.
pub fn spawn_retention_task(
    store: Arc<dyn MeasurementStore>,
    retention_days: u32,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        loop {
            ticker.tick().await;
            run_cleanup(store.as_ref(), retention_days).await;
        }
    })
}
