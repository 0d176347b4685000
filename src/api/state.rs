//! API shared state

use std::sync::Arc;

use crate::broadcast::SubscriberRegistry;
use crate::commands::CommandHandler;
use crate::monitor::PingMonitor;
use crate::storage::MeasurementStore;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// The monitoring service (targets, cache, lifecycle, subscribers)
    pub monitor: PingMonitor,

    /// Answers inbound websocket commands
    pub commands: CommandHandler,
}

impl ApiState {
    pub fn new(monitor: PingMonitor) -> Self {
        Self {
            commands: CommandHandler::new(monitor.clone()),
            monitor,
        }
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        self.monitor.store()
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        self.monitor.subscribers()
    }
}
