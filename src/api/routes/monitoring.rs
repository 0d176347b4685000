//! Monitor lifecycle endpoints

use axum::{Json, extract::State};

use crate::MonitorState;
use crate::api::state::ApiState;
use crate::api::types::LifecycleResponse;
use crate::monitor::MonitorStatus;

/// GET /api/monitoring/status
pub async fn get_status(State(state): State<ApiState>) -> Json<MonitorStatus> {
    Json(state.monitor.status().await)
}

/// POST /api/monitoring/start
///
/// Starting a running monitor is not an error, `changed` is `false` then.
pub async fn start(State(state): State<ApiState>) -> Json<LifecycleResponse> {
    let changed = state.monitor.start().await;
    Json(LifecycleResponse {
        message: if changed {
            "Ping monitoring started".to_string()
        } else {
            "Ping monitoring is already running".to_string()
        },
        state: MonitorState::Running,
        changed,
    })
}

/// POST /api/monitoring/stop
pub async fn stop(State(state): State<ApiState>) -> Json<LifecycleResponse> {
    let changed = state.monitor.stop().await;
    Json(LifecycleResponse {
        message: if changed {
            "Ping monitoring stopped".to_string()
        } else {
            "Ping monitoring is not running".to_string()
        },
        state: MonitorState::Stopped,
        changed,
    })
}
