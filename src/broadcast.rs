//! Subscriber Registry and topic-filtered fan-out
//!
//! Every live websocket registers an outbound queue together with the topic
//! it was opened on. A broadcast serializes each envelope variant once and
//! pushes the frame into every matching queue. Queues are drained by one
//! writer task per connection, so frames for a given subscriber never
//! overtake each other.
//!
//! Delivery is best-effort and at-most-once: a queue whose receiving side is
//! gone, or that is full because its socket stopped draining, is removed from
//! the registry on the spot. Nothing is retried or buffered beyond the
//! queue's fixed capacity.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::Measurement;
use crate::commands::OutboundMessage;

/// Public DNS resolvers whose results make up the `dns-only` stream
pub const DNS_RESOLVERS: [&str; 3] = ["8.8.8.8", "1.1.1.1", "208.67.222.222"];

pub fn is_dns_resolver(target: &str) -> bool {
    DNS_RESOLVERS.contains(&target)
}

/// Measurements of DNS resolver targets, in input order
pub fn dns_results(measurements: &[Measurement]) -> Vec<Measurement> {
    measurements
        .iter()
        .filter(|m| is_dns_resolver(&m.target))
        .cloned()
        .collect()
}

/// Stream a subscriber receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "dns-only")]
    DnsOnly,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Full => "full",
            Topic::DnsOnly => "dns-only",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Topic::Full),
            "dns-only" => Ok(Topic::DnsOnly),
            other => anyhow::bail!("unknown topic: {other}"),
        }
    }
}

/// One serialized JSON text frame, shared between all recipients
pub type Frame = Arc<str>;

/// Sending half of a subscriber's outbound queue
pub type Channel = mpsc::Sender<Frame>;

/// Frames a subscriber may have pending before it counts as stalled
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

/// A fresh outbound queue of `SUBSCRIBER_QUEUE_CAPACITY` frames
pub fn subscriber_queue() -> (Channel, mpsc::Receiver<Frame>) {
    mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY)
}

pub type SubscriberId = u64;

pub fn encode(message: &OutboundMessage) -> Result<Frame> {
    let text = serde_json::to_string(message).context("failed to serialize outbound message")?;
    Ok(Frame::from(text))
}

#[derive(Debug)]
struct Subscriber {
    channel: Channel,
    topic: Topic,
}

/// Outcome of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: usize,
}

/// Live subscribers keyed by id. Cheap to clone, all clones share state.
#[derive(Debug, Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<BTreeMap<SubscriberId, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel on `topic`
    pub async fn connect(&self, channel: Channel, topic: Topic) -> SubscriberId {
        self.connect_with(channel, topic, |_| Vec::new()).await
    }

    /// Register a channel and queue its greeting in one step.
    ///
    /// `greeting` receives the new id; its frames are queued under the
    /// registry lock, so they always precede the first broadcast envelope.
    pub async fn connect_with<F>(&self, channel: Channel, topic: Topic, greeting: F) -> SubscriberId
    where
        F: FnOnce(SubscriberId) -> Vec<Frame>,
    {
        let mut subscribers = self.subscribers.write().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        for frame in greeting(id) {
            // A client that vanished this early is cleaned up by its session
            let _ = channel.try_send(frame);
        }

        subscribers.insert(id, Subscriber { channel, topic });
        info!(
            "subscriber {id} connected on {topic}, {} live",
            subscribers.len()
        );
        id
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub async fn disconnect(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id).is_some();
        if removed {
            info!("subscriber {id} disconnected, {} live", subscribers.len());
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn count_on(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|s| s.topic == topic)
            .count()
    }

    /// Fan one cycle's results out to every subscriber.
    ///
    /// `full` subscribers get a `ping_update` with all results. `dns-only`
    /// subscribers get a `dns_status_update` restricted to the resolver set,
    /// or nothing when no resolver was probed this cycle.
    #[instrument(skip(self, measurements), fields(results = measurements.len()))]
    pub async fn broadcast(
        &self,
        timestamp: DateTime<Utc>,
        measurements: &[Measurement],
    ) -> Result<BroadcastReport> {
        let full = encode(&OutboundMessage::PingUpdate {
            timestamp,
            results: measurements.to_vec(),
        })?;

        let dns = dns_results(measurements);
        let dns = if dns.is_empty() {
            None
        } else {
            Some(encode(&OutboundMessage::DnsStatusUpdate {
                timestamp,
                results: dns,
            })?)
        };

        let mut report = BroadcastReport::default();
        let mut subscribers = self.subscribers.write().await;

        subscribers.retain(|id, subscriber| {
            let frame = match subscriber.topic {
                Topic::Full => &full,
                Topic::DnsOnly => match &dns {
                    Some(frame) => frame,
                    None => return true,
                },
            };

            match subscriber.channel.try_send(Arc::clone(frame)) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!("subscriber {id} stopped draining its queue, removing it");
                    report.removed += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("delivery to subscriber {id} failed, removing it");
                    report.removed += 1;
                    false
                }
            }
        });

        debug!(
            "broadcast delivered to {} subscribers, removed {}",
            report.delivered, report.removed
        );

        Ok(report)
    }
}
