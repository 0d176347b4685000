//! Reachability probing
//!
//! ## Design
//!
//! - **`Probe`**: measures the round trip to a single target
//! - **`TcpProbe`**: production probe, times a TCP handshake
//! - **`Prober`**: runs one probe task per target concurrently, each bounded
//!   by its own timeout, and turns every outcome into a `Measurement`
//!
//! A cycle therefore takes as long as its slowest probe, never the sum of
//! all probes, and no probe failure ever escapes as an error.
//!
//! ```text
//! snapshot ─┬─► spawn(probe a) ─► timeout ─┐
//!           ├─► spawn(probe b) ─► timeout ─┼─► join (ordered) ─► Vec<Measurement>
//!           └─► spawn(probe c) ─► timeout ─┘
//! ```

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, instrument, trace};

use crate::Measurement;

/// Error recorded when a probe exceeds its time budget
pub const TIMEOUT_ERROR: &str = "timeout";

/// A single reachability check
#[async_trait]
pub trait Probe: Send + Sync {
    /// Round-trip latency to `target` in milliseconds
    async fn probe(&self, target: &str) -> Result<f64>;
}

/// Probe that times a TCP connect
///
/// ICMP needs raw sockets (and therefore privileges), a TCP handshake does
/// not. A connection that is actively refused still proves the host is up
/// and answering, so it counts as reachable.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    default_port: u16,
}

impl TcpProbe {
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }

    /// Split `host:port` targets; bare hosts and IPv6 literals use the default port
    fn endpoint<'a>(&self, target: &'a str) -> (&'a str, u16) {
        if let Some((host, port)) = target.rsplit_once(':')
            && !host.contains(':')
            && let Ok(port) = port.parse::<u16>()
        {
            return (host, port);
        }

        (target.trim_start_matches('[').trim_end_matches(']'), self.default_port)
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, target: &str) -> Result<f64> {
        let (host, port) = self.endpoint(target);

        let addr = lookup_host((host, port))
            .await
            .with_context(|| format!("failed to resolve {host}"))?
            .next()
            .ok_or_else(|| anyhow!("no address found for {host}"))?;

        trace!("probing {target} via {addr}");

        let start = Instant::now();
        match TcpStream::connect(addr).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {}
            Err(e) => return Err(e).with_context(|| format!("{addr} unreachable")),
        }

        Ok(start.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Concurrent, time-bounded execution of probes
#[derive(Clone)]
pub struct Prober {
    probe: Arc<dyn Probe>,
    timeout: Duration,
}

impl Prober {
    pub fn new(probe: Arc<dyn Probe>, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe every target concurrently.
    ///
    /// The result is aligned one-to-one with `targets` and every measurement
    /// carries `timestamp`.
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub async fn probe_all(&self, targets: &[String], timestamp: DateTime<Utc>) -> Vec<Measurement> {
        let tasks = targets.iter().map(|target| {
            let probe = Arc::clone(&self.probe);
            let target = target.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                match tokio::time::timeout(timeout, probe.probe(&target)).await {
                    Ok(Ok(latency)) => Measurement::reachable(target, latency, timestamp),
                    Ok(Err(e)) => Measurement::unreachable(target, format!("{e:#}"), timestamp),
                    Err(_) => Measurement::unreachable(target, TIMEOUT_ERROR, timestamp),
                }
            })
        });

        let measurements: Vec<Measurement> = join_all(tasks)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, target)| {
                joined.unwrap_or_else(|e| {
                    Measurement::unreachable(
                        target.clone(),
                        format!("probe task failed: {e}"),
                        timestamp,
                    )
                })
            })
            .collect();

        let reachable = measurements.iter().filter(|m| m.reachable).count();
        debug!("probed {}/{} targets reachable", reachable, measurements.len());

        measurements
    }
}
