//! Wire messages and the Command Handler
//!
//! Every message is a JSON object whose `type` field names its kind.
//! Inbound messages are handled one at a time per connection and always
//! produce exactly one reply; no command ever closes the connection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::broadcast::SubscriberId;
use crate::monitor::PingMonitor;
use crate::storage::{HostSummary, StoredMeasurement, TimeWindow};
use crate::{Measurement, MonitorState};

/// Host entry of a `hosts_update` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEntry {
    pub host: String,
}

/// Messages sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    ConnectionEstablished {
        connection_id: SubscriberId,
        message: String,
        monitoring_active: bool,
    },
    InitialData {
        results: BTreeMap<String, Measurement>,
        timestamp: Option<DateTime<Utc>>,
    },
    HostsUpdate {
        results: Vec<HostEntry>,
    },
    Pong {
        timestamp: Option<DateTime<Utc>>,
    },
    StatusResponse {
        monitoring_active: bool,
        state: MonitorState,
        target_hosts: Vec<String>,
        ping_interval: u64,
        latest_results: BTreeMap<String, Measurement>,
    },
    LatestMetricsResponse {
        metrics: BTreeMap<String, StoredMeasurement>,
    },
    SubscriptionConfirmed {
        host: String,
        message: String,
    },
    HostSummaryResponse {
        host: String,
        summary: HostSummary,
    },
    PingUpdate {
        timestamp: DateTime<Utc>,
        results: Vec<Measurement>,
    },
    DnsStatusUpdate {
        timestamp: DateTime<Utc>,
        results: Vec<Measurement>,
    },
    Error {
        message: String,
    },
}

impl OutboundMessage {
    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }
}

/// A decoded inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    GetStatus,
    GetLatestMetrics,
    SubscribeHost { host: String },
    GetHostSummary { host: String, window: TimeWindow },
}

/// Why an inbound message could not be turned into a `Command`
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    InvalidJson,
    InvalidFormat(String),
    UnknownKind(Option<String>),
    MissingHost(&'static str),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidJson => write!(f, "Invalid JSON format"),
            DecodeError::InvalidFormat(e) => write!(f, "Invalid message format: {e}"),
            DecodeError::UnknownKind(Some(kind)) => write!(f, "Unknown message type: {kind}"),
            DecodeError::UnknownKind(None) => write!(f, "Unknown message type: none"),
            DecodeError::MissingHost(purpose) => write!(f, "Host parameter required for {purpose}"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(rename = "type")]
    kind: Option<String>,
    host: Option<String>,
    hours: Option<u32>,
    minutes: Option<u32>,
}

impl Command {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| DecodeError::InvalidJson)?;
        let raw: RawCommand = serde_json::from_value(value)
            .map_err(|e| DecodeError::InvalidFormat(e.to_string()))?;

        let host = raw.host.filter(|h| !h.trim().is_empty());

        match raw.kind.as_deref() {
            Some("ping") => Ok(Command::Ping),
            Some("get_status") => Ok(Command::GetStatus),
            Some("get_latest_metrics") => Ok(Command::GetLatestMetrics),
            Some("subscribe_host") => host
                .map(|host| Command::SubscribeHost { host })
                .ok_or(DecodeError::MissingHost("subscription")),
            Some("get_host_summary") => {
                let host = host.ok_or(DecodeError::MissingHost("summary"))?;
                let window = match (raw.minutes, raw.hours) {
                    (Some(minutes), _) => TimeWindow::from_minutes(u64::from(minutes)),
                    (None, Some(hours)) => TimeWindow::from_hours(u64::from(hours)),
                    (None, None) => TimeWindow::default(),
                };
                Ok(Command::GetHostSummary { host, window })
            }
            _ => Err(DecodeError::UnknownKind(raw.kind)),
        }
    }
}

/// Answers inbound commands on behalf of one connection
#[derive(Clone)]
pub struct CommandHandler {
    monitor: PingMonitor,
}

impl CommandHandler {
    pub fn new(monitor: PingMonitor) -> Self {
        Self { monitor }
    }

    /// Decode and execute one text message, returning the reply
    pub async fn handle(&self, text: &str) -> OutboundMessage {
        match Command::decode(text) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                debug!("rejected inbound message: {e}");
                OutboundMessage::error(e.to_string())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, command: Command) -> OutboundMessage {
        match command {
            Command::Ping => OutboundMessage::Pong {
                timestamp: self.monitor.last_cycle().await,
            },

            Command::GetStatus => {
                let status = self.monitor.status().await;
                OutboundMessage::StatusResponse {
                    monitoring_active: status.monitoring_active,
                    state: status.state,
                    target_hosts: status.target_hosts,
                    ping_interval: status.ping_interval,
                    latest_results: status.latest_results,
                }
            }

            Command::GetLatestMetrics => match self.monitor.store().latest_per_host().await {
                Ok(metrics) => OutboundMessage::LatestMetricsResponse { metrics },
                Err(e) => {
                    warn!("latest metrics query failed: {e}");
                    OutboundMessage::error(format!("Failed to get latest metrics: {e}"))
                }
            },

            Command::SubscribeHost { host } => OutboundMessage::SubscriptionConfirmed {
                message: format!("Subscribed to updates for {host}"),
                host,
            },

            Command::GetHostSummary { host, window } => {
                match self.monitor.store().aggregate(&host, window).await {
                    Ok(summary) => OutboundMessage::HostSummaryResponse { host, summary },
                    Err(e) => {
                        warn!("summary query for {host} failed: {e}");
                        OutboundMessage::error(format!("Failed to get host summary: {e}"))
                    }
                }
            }
        }
    }
}
