//! The monitoring service object
//!
//! `PingMonitor` owns everything the scheduler loop touches: the target
//! registry, the result cache, the prober, the store and the subscriber
//! registry. It is constructed once by the entry point and handed (cloned)
//! to the API and command handlers; there is no global instance.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped ──start()──► Running ──stop()──► Stopped
//! ```
//!
//! Duplicate transitions are logged and ignored. `stop()` only signals the
//! loop; a cycle already in flight runs to completion.

pub mod cache;
pub mod registry;
pub mod scheduler;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::SubscriberRegistry;
use crate::config::MonitorSettings;
use crate::probe::{Probe, Prober};
use crate::storage::MeasurementStore;
use crate::{Measurement, MonitorState};

pub use cache::ResultCache;
pub use registry::TargetRegistry;

#[derive(Debug)]
struct Lifecycle {
    state: MonitorState,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

struct MonitorInner {
    settings: MonitorSettings,
    prober: Prober,
    store: Arc<dyn MeasurementStore>,
    subscribers: SubscriberRegistry,
    targets: RwLock<TargetRegistry>,
    cache: RwLock<ResultCache>,
    last_cycle: RwLock<Option<DateTime<Utc>>>,
    lifecycle: Mutex<Lifecycle>,
}

/// Point-in-time view of the monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub monitoring_active: bool,
    pub target_hosts: Vec<String>,
    pub ping_interval: u64,
    pub latest_results: BTreeMap<String, Measurement>,
    pub last_cycle: Option<DateTime<Utc>>,
    pub subscribers: usize,
}

/// Handle to the monitoring service. Clones share the same state.
#[derive(Clone)]
pub struct PingMonitor {
    inner: Arc<MonitorInner>,
}

impl PingMonitor {
    pub fn new(
        settings: MonitorSettings,
        targets: impl IntoIterator<Item = String>,
        probe: Arc<dyn Probe>,
        store: Arc<dyn MeasurementStore>,
        subscribers: SubscriberRegistry,
    ) -> Self {
        let prober = Prober::new(probe, settings.probe_timeout);
        Self {
            inner: Arc::new(MonitorInner {
                settings,
                prober,
                store,
                subscribers,
                targets: RwLock::new(targets.into_iter().collect()),
                cache: RwLock::new(ResultCache::new()),
                last_cycle: RwLock::new(None),
                lifecycle: Mutex::new(Lifecycle {
                    state: MonitorState::Stopped,
                    shutdown: None,
                    task: None,
                }),
            }),
        }
    }

    /// Start the monitor loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.state == MonitorState::Running {
            warn!("ping monitoring is already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(scheduler::run(self.clone(), shutdown_rx));

        lifecycle.state = MonitorState::Running;
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.task = Some(task);

        info!(
            "ping monitoring started with {}s interval",
            self.inner.settings.interval.as_secs()
        );
        true
    }

    /// Signal the loop to stop. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        self.signal_stop().await.is_some()
    }

    /// Stop and wait until the in-flight cycle, if any, has finished
    pub async fn shutdown(&self) {
        if let Some(Some(task)) = self.signal_stop().await
            && let Err(e) = task.await
        {
            warn!("monitor loop ended abnormally: {e}");
        }
    }

    async fn signal_stop(&self) -> Option<Option<JoinHandle<()>>> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.state == MonitorState::Stopped {
            warn!("ping monitoring is not running");
            return None;
        }

        lifecycle.state = MonitorState::Stopped;
        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }

        info!("ping monitoring stopped");
        Some(lifecycle.task.take())
    }

    pub async fn state(&self) -> MonitorState {
        self.inner.lifecycle.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == MonitorState::Running
    }

    /// Add a target. It is probed from the next cycle on.
    pub async fn add_target(&self, host: &str) -> bool {
        let host = host.trim();
        let added = self.inner.targets.write().await.add(host);
        if added {
            info!("added target host {host}");
        }
        added
    }

    /// Remove a target and evict its cached result immediately
    pub async fn remove_target(&self, host: &str) -> bool {
        let host = host.trim();
        let mut targets = self.inner.targets.write().await;
        let removed = targets.remove(host);
        if removed {
            self.inner.cache.write().await.evict(host);
            info!("removed target host {host}");
        }
        removed
    }

    pub async fn targets(&self) -> Vec<String> {
        self.inner.targets.read().await.list()
    }

    pub async fn latest_results(&self) -> BTreeMap<String, Measurement> {
        self.inner.cache.read().await.snapshot()
    }

    /// Timestamp of the most recent completed cycle
    pub async fn last_cycle(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_cycle.read().await
    }

    pub fn interval(&self) -> Duration {
        self.inner.settings.interval
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.inner.store
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.inner.subscribers
    }

    pub async fn status(&self) -> MonitorStatus {
        let state = self.state().await;
        MonitorStatus {
            state,
            monitoring_active: state == MonitorState::Running,
            target_hosts: self.targets().await,
            ping_interval: self.interval().as_secs(),
            latest_results: self.latest_results().await,
            last_cycle: self.last_cycle().await,
            subscribers: self.inner.subscribers.count().await,
        }
    }
}
