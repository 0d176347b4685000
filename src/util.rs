use std::net::SocketAddr;

pub const PING_INTERVAL: &str = "PING_INTERVAL";

pub const PROBE_TIMEOUT: &str = "PROBE_TIMEOUT";

pub const PROBE_PORT: &str = "PROBE_PORT";

pub const DATABASE_PATH: &str = "DATABASE_PATH";

pub const API_BIND: &str = "API_BIND";

pub const LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_INTERVAL_SECS: u64 = 1;

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

const DEFAULT_PROBE_PORT: u16 = 443;

const DEFAULT_DATABASE_PATH: &str = "./ping_metrics.db";

pub fn get_default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

pub fn get_default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

pub fn get_default_probe_port() -> u16 {
    DEFAULT_PROBE_PORT
}

pub fn get_default_database_path() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_DATABASE_PATH)
}

pub fn get_default_api_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

pub fn get_log_level() -> tracing::level_filters::LevelFilter {
    std::env::var(LOG_LEVEL)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(tracing::level_filters::LevelFilter::INFO)
}
