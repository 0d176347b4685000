//! Stored row and summary definitions
//!
//! Every probe result becomes one row in `ping_metrics`. Summary statistics
//! are computed in Rust from the rows of a window so that all backends agree
//! on percentile and uptime semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::TimeWindow;
use crate::Measurement;

/// A measurement as persisted, with its row id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMeasurement {
    pub id: i64,

    #[serde(flatten)]
    pub measurement: Measurement,

    /// When the row was written (always UTC)
    pub created_at: DateTime<Utc>,
}

/// Reachability summary for one host over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    pub host: String,
    pub hours_analyzed: f64,
    pub minutes_analyzed: u64,
    pub total_pings: u64,
    pub avg_response_time: Option<f64>,
    pub min_response_time: Option<f64>,
    pub max_response_time: Option<f64>,
    pub median_response_time: Option<f64>,
    pub p95_response_time: Option<f64>,
    pub packet_losses: u64,
    /// Fraction of unreachable probes, `0.0..=1.0`
    pub packet_loss_rate: f64,
    pub uptime_percentage: f64,
    pub first_ping: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
}

impl HostSummary {
    /// Summarize the measurements of one host.
    ///
    /// Latency statistics only consider reachable probes. An empty input
    /// yields zero uptime rather than an undefined rate.
    pub fn from_measurements<'a>(
        host: &str,
        window: TimeWindow,
        measurements: impl IntoIterator<Item = &'a Measurement>,
    ) -> Self {
        let mut total = 0u64;
        let mut losses = 0u64;
        let mut first: Option<DateTime<Utc>> = None;
        let mut last: Option<DateTime<Utc>> = None;
        let mut latencies = Vec::new();

        for m in measurements {
            total += 1;
            if !m.reachable {
                losses += 1;
            }
            if let Some(latency) = m.latency_ms {
                latencies.push(latency);
            }
            first = Some(first.map_or(m.timestamp, |f| f.min(m.timestamp)));
            last = Some(last.map_or(m.timestamp, |l| l.max(m.timestamp)));
        }

        latencies.sort_by(f64::total_cmp);

        let avg = (!latencies.is_empty())
            .then(|| latencies.iter().sum::<f64>() / latencies.len() as f64);

        let (packet_loss_rate, uptime_percentage) = if total == 0 {
            (0.0, 0.0)
        } else {
            let rate = losses as f64 / total as f64;
            (rate, 100.0 * (1.0 - rate))
        };

        Self {
            host: host.to_string(),
            hours_analyzed: window.hours(),
            minutes_analyzed: window.minutes(),
            total_pings: total,
            avg_response_time: avg,
            min_response_time: latencies.first().copied(),
            max_response_time: latencies.last().copied(),
            median_response_time: percentile(&latencies, 0.5),
            p95_response_time: percentile(&latencies, 0.95),
            packet_losses: losses,
            packet_loss_rate,
            uptime_percentage,
            first_ping: first,
            last_ping: last,
        }
    }
}

/// Continuous percentile over sorted values (linear interpolation)
fn percentile(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = fraction * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
