//! REST API and WebSocket server for the ping monitor
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **`PingMonitor` handle** for lifecycle, targets and the result cache
//! - **WebSocket** streams, one per topic, fed by the subscriber registry
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/monitoring/status` - Monitor state snapshot
//! - `POST /api/monitoring/start|stop` - Lifecycle transitions
//! - `GET /api/ping-metrics` - Stored measurements
//! - `GET /api/ping-metrics/{live,latest,count,hosts}`
//! - `GET /api/ping-metrics/{id}` - One stored measurement
//! - `POST|DELETE /api/ping-metrics/hosts/{host}` - Manage targets
//! - `GET /api/ping-metrics/hosts/{host}/summary` - Host summary
//! - `DELETE /api/ping-metrics/cleanup` - Retention cleanup
//! - `WS /api/ws/ping-status` - All results every cycle
//! - `WS /api/ws/dns-status` - DNS resolver results only
//! - `GET /api/ws/connections` - Live subscriber counts

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;
#[cfg(feature = "api")]
pub mod utils;
#[cfg(feature = "api")]
pub mod websocket;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tracing::info;

use crate::util::get_default_api_bind;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Enable CORS for browser dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: get_default_api_bind(),
            enable_cors: true,
        }
    }
}

/// Build the router with all routes and layers
#[cfg(feature = "api")]
pub fn build_router(state: ApiState, enable_cors: bool) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/monitoring/status", get(routes::monitoring::get_status))
        .route("/api/monitoring/start", post(routes::monitoring::start))
        .route("/api/monitoring/stop", post(routes::monitoring::stop))
        .route("/api/ping-metrics", get(routes::metrics::list_metrics))
        .route("/api/ping-metrics/live", get(routes::metrics::live_metrics))
        .route("/api/ping-metrics/latest", get(routes::metrics::latest_metrics))
        .route("/api/ping-metrics/count", get(routes::metrics::count_metrics))
        .route("/api/ping-metrics/hosts", get(routes::metrics::list_hosts))
        .route(
            "/api/ping-metrics/hosts/:host",
            post(routes::metrics::add_host).delete(routes::metrics::remove_host),
        )
        .route(
            "/api/ping-metrics/hosts/:host/summary",
            get(routes::metrics::host_summary),
        )
        .route("/api/ping-metrics/cleanup", delete(routes::metrics::cleanup))
        .route("/api/ping-metrics/:id", get(routes::metrics::get_metric))
        .route("/api/ws/ping-status", get(websocket::ping_status_handler))
        .route("/api/ws/dns-status", get(websocket::dns_status_handler))
        .route("/api/ws/connections", get(websocket::connections))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = build_router(state, config.enable_cors);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
