//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::state::ApiState;
use crate::api::types::{HealthResponse, ServiceHealth, StorageHealth};

/// GET /api/health
///
/// Reports storage health next to the monitor state. Always answers 200, a
/// failing store only degrades the status.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let storage = match state.store().health_check().await {
        Ok(health) => StorageHealth {
            healthy: health.healthy,
            message: health.message,
        },
        Err(e) => StorageHealth {
            healthy: false,
            message: e.to_string(),
        },
    };

    let status = if storage.healthy {
        ServiceHealth::Healthy
    } else {
        ServiceHealth::Degraded
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        storage,
        monitoring: state.monitor.state().await,
        target_count: state.monitor.targets().await.len(),
        subscribers: state.subscribers().count().await,
        ping_interval_seconds: state.monitor.interval().as_secs(),
    })
}
