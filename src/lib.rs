pub mod api;
pub mod broadcast;
pub mod commands;
pub mod config;
pub mod monitor;
pub mod probe;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reachability result for one target at one point in time.
///
/// `reachable == false` always carries an `error`, `reachable == true` always
/// carries a `latency_ms`. Use the constructors to keep that pairing intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub target: String,
    pub latency_ms: Option<f64>,
    pub reachable: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    pub fn reachable(target: impl Into<String>, latency_ms: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            target: target.into(),
            latency_ms: Some(round_latency(latency_ms)),
            reachable: true,
            error: None,
            timestamp,
        }
    }

    pub fn unreachable(
        target: impl Into<String>,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            latency_ms: None,
            reachable: false,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Latencies are reported with two decimals.
fn round_latency(latency_ms: f64) -> f64 {
    (latency_ms * 100.0).round() / 100.0
}

/// Lifecycle of the monitor loop. Exactly one per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Stopped,
    Running,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Stopped => write!(f, "stopped"),
            MonitorState::Running => write!(f, "running"),
        }
    }
}
