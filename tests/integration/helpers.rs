//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use ping_monitor::{
    Measurement,
    broadcast::SubscriberRegistry,
    config::MonitorSettings,
    monitor::PingMonitor,
    probe::Probe,
    storage::MeasurementStore,
};

/// Behaviour of a stubbed target
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer after the given latency
    After(Duration),
    /// Fail immediately with this error
    Fail(String),
    /// Never answer
    Hang,
}

/// Probe with a fixed reply per target. Unknown targets answer after 1ms.
#[derive(Debug, Default)]
pub struct StubProbe {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: &str, reply: Reply) -> Self {
        self.replies.insert(target.to_string(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for StubProbe {
    async fn probe(&self, target: &str) -> anyhow::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(target).cloned() {
            Some(Reply::After(latency)) => {
                tokio::time::sleep(latency).await;
                Ok(latency.as_secs_f64() * 1000.0)
            }
            Some(Reply::Fail(error)) => anyhow::bail!(error),
            Some(Reply::Hang) => std::future::pending().await,
            None => {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(1.0)
            }
        }
    }
}

pub fn fast_settings() -> MonitorSettings {
    MonitorSettings {
        interval: Duration::from_secs(1),
        probe_timeout: Duration::from_millis(200),
    }
}

pub fn create_test_monitor(
    targets: &[&str],
    probe: Arc<dyn Probe>,
    store: Arc<dyn MeasurementStore>,
) -> PingMonitor {
    PingMonitor::new(
        fast_settings(),
        targets.iter().map(|t| t.to_string()),
        probe,
        store,
        SubscriberRegistry::new(),
    )
}

/// Insert `total` measurements for `host`, one per minute going back from
/// now, the most recent `losses` of them unreachable.
pub async fn seed_host(store: &dyn MeasurementStore, host: &str, total: i64, losses: i64) {
    let now = Utc::now();
    for i in 0..total {
        let timestamp = now - ChronoDuration::minutes(i);
        let measurement = if i < losses {
            Measurement::unreachable(host, "timeout", timestamp)
        } else {
            Measurement::reachable(host, 10.0 + i as f64, timestamp)
        };
        store.insert(&measurement).await.unwrap();
    }
}
