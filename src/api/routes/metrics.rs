//! Ping metric endpoints
//!
//! Live data comes from the monitor's result cache, everything else is read
//! from the measurement store.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::ApiState;
use crate::api::types::{
    CleanupResponse, CountResponse, HostChangeResponse, HostsResponse, LiveResponse,
    MetricsResponse,
};
use crate::api::utils::{MAX_CLEANUP_DAYS, MAX_HOURS, MAX_LIMIT, MAX_MINUTES, bounded};
use crate::storage::{
    DEFAULT_QUERY_LIMIT, HostSummary, MeasurementQuery, StoredMeasurement, TimeWindow,
};

/// Query parameters for GET /api/ping-metrics
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    hours: Option<u64>,
    host: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    host: Option<String>,
    hours: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    hours: Option<u64>,
    minutes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    days: Option<u32>,
}

/// GET /api/ping-metrics
///
/// Stored measurements, newest first
pub async fn list_metrics(
    State(state): State<ApiState>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<MetricsResponse>> {
    let hours = bounded("hours", query.hours, 24, 1, MAX_HOURS)?;
    let limit = bounded("limit", query.limit, DEFAULT_QUERY_LIMIT, 1, MAX_LIMIT)?;
    let offset = query.offset.unwrap_or(0);

    let mut request = MeasurementQuery::new(TimeWindow::from_hours(hours))
        .with_limit(limit)
        .with_offset(offset);
    if let Some(host) = &query.host {
        request = request.with_host(host.clone());
    }

    let metrics = state.store().query(request).await?;

    Ok(Json(MetricsResponse {
        hours,
        host: query.host,
        limit,
        offset,
        count: metrics.len(),
        metrics,
    }))
}

/// GET /api/ping-metrics/count
pub async fn count_metrics(
    State(state): State<ApiState>,
    Query(query): Query<CountQuery>,
) -> ApiResult<Json<CountResponse>> {
    let hours = query
        .hours
        .map(|h| bounded("hours", Some(h), h, 1, MAX_HOURS))
        .transpose()?;

    let count = state
        .store()
        .count(query.host.as_deref(), hours.map(TimeWindow::from_hours))
        .await?;

    Ok(Json(CountResponse {
        count,
        host: query.host,
        hours,
    }))
}

/// GET /api/ping-metrics/latest
///
/// Most recent stored measurement of every host
pub async fn latest_metrics(
    State(state): State<ApiState>,
) -> ApiResult<Json<BTreeMap<String, StoredMeasurement>>> {
    Ok(Json(state.store().latest_per_host().await?))
}

/// GET /api/ping-metrics/live
///
/// Result cache of the running monitor, no storage access
pub async fn live_metrics(State(state): State<ApiState>) -> Json<LiveResponse> {
    Json(LiveResponse {
        monitoring_active: state.monitor.is_running().await,
        timestamp: state.monitor.last_cycle().await,
        results: state.monitor.latest_results().await,
    })
}

/// GET /api/ping-metrics/:id
pub async fn get_metric(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StoredMeasurement>> {
    state
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("ping metric {id} not found")))
}

/// GET /api/ping-metrics/hosts
pub async fn list_hosts(State(state): State<ApiState>) -> ApiResult<Json<HostsResponse>> {
    Ok(Json(HostsResponse {
        database_hosts: state.store().distinct_hosts().await?,
        active_monitoring_hosts: state.monitor.targets().await,
        monitoring_active: state.monitor.is_running().await,
    }))
}

/// POST /api/ping-metrics/hosts/:host
pub async fn add_host(
    State(state): State<ApiState>,
    Path(host): Path<String>,
) -> ApiResult<Json<HostChangeResponse>> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ApiError::InvalidRequest("host must not be empty".to_string()));
    }

    let changed = state.monitor.add_target(host).await;
    let message = if changed {
        format!("Host {host} added to monitoring")
    } else {
        format!("Host {host} is already monitored")
    };

    Ok(Json(HostChangeResponse {
        message,
        changed,
        current_hosts: state.monitor.targets().await,
    }))
}

/// DELETE /api/ping-metrics/hosts/:host
///
/// Removing an unknown host is a no-op, not a 404.
pub async fn remove_host(
    State(state): State<ApiState>,
    Path(host): Path<String>,
) -> Json<HostChangeResponse> {
    let host = host.trim();
    let changed = state.monitor.remove_target(host).await;
    let message = if changed {
        format!("Host {host} removed from monitoring")
    } else {
        format!("Host {host} is not monitored")
    };

    Json(HostChangeResponse {
        message,
        changed,
        current_hosts: state.monitor.targets().await,
    })
}

/// GET /api/ping-metrics/hosts/:host/summary
///
/// `minutes` takes precedence over `hours`; without either the last 24 hours
/// are summarized.
pub async fn host_summary(
    State(state): State<ApiState>,
    Path(host): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<HostSummary>> {
    let window = match (query.minutes, query.hours) {
        (Some(minutes), _) => {
            TimeWindow::from_minutes(bounded("minutes", Some(minutes), minutes, 1, MAX_MINUTES)?)
        }
        (None, Some(hours)) => {
            TimeWindow::from_hours(bounded("hours", Some(hours), hours, 1, MAX_HOURS)?)
        }
        (None, None) => TimeWindow::default(),
    };

    Ok(Json(state.store().aggregate(&host, window).await?))
}

/// DELETE /api/ping-metrics/cleanup
pub async fn cleanup(
    State(state): State<ApiState>,
    Query(query): Query<CleanupQuery>,
) -> ApiResult<Json<CleanupResponse>> {
    let days = bounded("days", query.days, 30, 1, MAX_CLEANUP_DAYS)?;
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));

    let deleted_records = state.store().cleanup_before(cutoff).await?;

    Ok(Json(CleanupResponse {
        message: "Cleanup completed".to_string(),
        deleted_records,
        cutoff_days: days,
    }))
}
