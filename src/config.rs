use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::util::{
    API_BIND, DATABASE_PATH, PING_INTERVAL, PROBE_PORT, PROBE_TIMEOUT, get_default_api_bind,
    get_default_database_path, get_default_interval, get_default_probe_port,
    get_default_probe_timeout,
};

/// Hosts monitored when no target list is configured.
pub const DEFAULT_TARGETS: [&str; 5] = [
    "8.8.8.8",
    "1.1.1.1",
    "208.67.222.222",
    "google.com",
    "github.com",
];

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None {
        /// Measurements older than this are dropped from memory
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "crate::util::get_default_database_path")]
        path: PathBuf,

        /// Measurements older than this are deleted by the retention task
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: get_default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

impl StorageConfig {
    /// Retention period of the configured backend
    pub fn retention_days(&self) -> u32 {
        match self {
            StorageConfig::None { retention_days } => *retention_days,
            StorageConfig::Sqlite { retention_days, .. } => *retention_days,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "crate::util::get_default_probe_timeout")]
    pub timeout_secs: u64,

    /// TCP port used when a target does not carry its own
    #[serde(default = "crate::util::get_default_probe_port")]
    pub port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: get_default_probe_timeout(),
            port: get_default_probe_port(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "crate::util::get_default_api_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: get_default_api_bind(),
            enable_cors: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    pub targets: Option<Vec<String>>,

    pub interval_secs: Option<u64>,

    #[serde(default)]
    pub probe: ProbeConfig,

    /// Storage configuration (defaults to SQLite)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub api: ApiSettings,

    /// Start the monitor loop as soon as the hub is up
    pub autostart: Option<bool>,
}

impl Config {
    /// Apply environment overrides on top of the file values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).map(|raw| raw.trim().to_string());

        if let Some(interval) = parsed(PING_INTERVAL).and_then(|v| v.parse().ok()) {
            self.interval_secs = Some(interval);
        }
        if let Some(timeout) = parsed(PROBE_TIMEOUT).and_then(|v| v.parse().ok()) {
            self.probe.timeout_secs = timeout;
        }
        if let Some(port) = parsed(PROBE_PORT).and_then(|v| v.parse().ok()) {
            self.probe.port = port;
        }
        if let Some(bind) = parsed(API_BIND).and_then(|v| v.parse().ok()) {
            self.api.bind = bind;
        }
        if let Some(path) = parsed(DATABASE_PATH).filter(|v| !v.is_empty()) {
            let retention_days = self
                .storage
                .as_ref()
                .map_or_else(default_retention_days, StorageConfig::retention_days);
            self.storage = Some(StorageConfig::Sqlite {
                path: PathBuf::from(path),
                retention_days,
            });
        }

        self
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect())
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_secs(self.interval_secs.unwrap_or_else(get_default_interval).max(1)),
            probe_timeout: Duration::from_secs(self.probe.timeout_secs.max(1)),
        }
    }

    pub fn autostart(&self) -> bool {
        self.autostart.unwrap_or(true)
    }
}

/// Timing parameters of the monitor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Sleep between two cycles
    pub interval: Duration,

    /// Upper bound for a single probe
    pub probe_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(get_default_interval()),
            probe_timeout: Duration::from_secs(get_default_probe_timeout()),
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
