//! The monitor loop
//!
//! ```text
//! snapshot targets → probe all → persist each → update cache → broadcast → sleep
//!        ↑                                                                  │
//!        └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop only exits when the shutdown signal flips. A failing cycle is
//! logged and retried after the usual interval.

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::PingMonitor;
use crate::Measurement;

pub(super) async fn run(monitor: PingMonitor, mut shutdown: watch::Receiver<bool>) {
    let interval = monitor.interval();
    info!("target hosts: {}", monitor.targets().await.join(", "));

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = monitor.run_cycle().await {
            error!("error in monitoring loop: {e:#}");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("monitor loop exited");
}

impl PingMonitor {
    /// Run a single cycle and return its measurements
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<Vec<Measurement>> {
        let snapshot = self.targets().await;
        let timestamp = Utc::now();

        let measurements = self.inner.prober.probe_all(&snapshot, timestamp).await;

        self.persist(&measurements).await;

        {
            let targets = self.inner.targets.read().await;
            let mut cache = self.inner.cache.write().await;
            // Targets removed while probing stay evicted
            for m in measurements.iter().filter(|m| targets.contains(&m.target)) {
                cache.update(m.clone());
            }
        }
        *self.inner.last_cycle.write().await = Some(timestamp);

        self.inner.subscribers.broadcast(timestamp, &measurements).await?;

        let reachable = measurements.iter().filter(|m| m.reachable).count();
        debug!("ping cycle completed: {reachable}/{} reachable", measurements.len());

        Ok(measurements)
    }

    async fn persist(&self, measurements: &[Measurement]) {
        for m in measurements {
            if let Err(e) = self.inner.store.insert(m).await {
                warn!("failed to store measurement for {}: {e}", m.target);
            }
        }
    }
}
