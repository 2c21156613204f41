//! HTTP request handlers.
//!
//! Thin adapter over the pipeline and lifecycle manager: deserialize, call
//! the core, shape the response. No alerting logic lives here.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::{Arc, PoisonError};

use super::envelope::{failure, respond, success};
use crate::lifecycle::LifecycleManager;
use crate::pipeline::AlertPipeline;
use crate::types::{within_limits, CoreError, Sample, SensorFrame};
use tracing::warn;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<AlertPipeline>,
    pub lifecycle: Arc<LifecycleManager>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitSampleRequest {
    pub machine_id: String,
    /// Defaults to the server clock when the collector omits it.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub sensors: SensorFrame,
    /// Skip stabilizer smoothing (scripted replays).
    #[serde(default)]
    pub bypass_smoothing: bool,
}

#[derive(Debug, Deserialize)]
pub struct OperatorRequest {
    pub operator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub operator_id: String,
    pub root_cause: String,
    pub resolution_notes: String,
    pub downtime_minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct MachineQuery {
    pub machine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub machine_id: Option<String>,
    #[serde(default = "default_log_days")]
    pub days: i64,
}

fn default_log_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon_hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_trend_hours")]
    pub hours: i64,
}

fn default_trend_hours() -> i64 {
    24
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub machine_id: Option<String>,
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct SensorHistoryQuery {
    #[serde(default = "default_sensor_history_hours")]
    pub hours: i64,
}

fn default_sensor_history_hours() -> i64 {
    24
}

#[derive(Debug, Deserialize)]
pub struct FailureRequest {
    pub machine_id: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
}

fn default_event_type() -> String {
    "failure".to_string()
}

// ============================================================================
// Ingestion
// ============================================================================

/// POST /api/v1/samples — submit one sensor sample.
///
/// Readings outside physical limits are accepted as-is (the pipeline treats
/// validation as the collector's job) but logged for the operator.
pub async fn submit_sample(
    State(state): State<ApiState>,
    Json(req): Json<SubmitSampleRequest>,
) -> Response {
    let sample = Sample {
        machine_id: req.machine_id,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
        sensors: req.sensors,
    };
    warn_if_outside_limits(&sample);
    let alert_ids = state
        .pipeline
        .submit_with_options(&sample, req.bypass_smoothing);
    success(&serde_json::json!({ "alert_ids": alert_ids }))
}

fn warn_if_outside_limits(sample: &Sample) {
    use crate::config::defaults::{
        PRESSURE_LIMITS, RPM_LIMITS, TEMPERATURE_LIMITS, VIBRATION_LIMITS,
    };
    let s = &sample.sensors;
    let checks = [
        ("vibration_x", s.vibration_x, VIBRATION_LIMITS),
        ("vibration_y", s.vibration_y, VIBRATION_LIMITS),
        ("temperature", s.temperature, TEMPERATURE_LIMITS),
        ("pressure", s.pressure, PRESSURE_LIMITS),
        ("rpm", s.rpm, RPM_LIMITS),
    ];
    for (channel, value, (lo, hi)) in checks {
        if !within_limits(value, lo, hi) {
            warn!(
                machine_id = %sample.machine_id,
                channel,
                value,
                "Sensor reading outside physical limits"
            );
        }
    }
}

// ============================================================================
// Alerts & Lifecycle
// ============================================================================

/// GET /api/v1/alerts — open alerts, optionally for one machine.
pub async fn get_alerts(
    State(state): State<ApiState>,
    Query(query): Query<MachineQuery>,
) -> Response {
    respond(
        state
            .lifecycle
            .active_alerts(query.machine_id.as_deref())
            .map(|alerts| serde_json::json!({ "alerts": alerts })),
    )
}

/// GET /api/v1/alerts/statistics — counts by state and aggregates.
pub async fn get_alert_statistics(State(state): State<ApiState>) -> Response {
    respond(state.lifecycle.statistics())
}

/// POST /api/v1/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<ApiState>,
    Path(alert_id): Path<String>,
    Json(req): Json<OperatorRequest>,
) -> Response {
    respond(state.lifecycle.acknowledge(&alert_id, &req.operator_id))
}

/// POST /api/v1/alerts/:id/start
pub async fn start_work(
    State(state): State<ApiState>,
    Path(alert_id): Path<String>,
    Json(req): Json<OperatorRequest>,
) -> Response {
    respond(state.lifecycle.start_work(&alert_id, &req.operator_id))
}

/// POST /api/v1/alerts/:id/resolve
pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(alert_id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Response {
    respond(state.lifecycle.resolve(
        &alert_id,
        &req.operator_id,
        &req.root_cause,
        &req.resolution_notes,
        req.downtime_minutes,
    ))
}

/// GET /api/v1/logs — maintenance logs over a trailing window.
pub async fn get_maintenance_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogsQuery>,
) -> Response {
    respond(
        state
            .lifecycle
            .maintenance_logs(query.machine_id.as_deref(), query.days, 100)
            .map(|logs| serde_json::json!({ "logs": logs })),
    )
}

// ============================================================================
// Machine Introspection
// ============================================================================

/// GET /api/v1/machines/:id/forecast
pub async fn get_forecast(
    State(state): State<ApiState>,
    Path(machine_id): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Response {
    let horizon = query.horizon_hours.unwrap_or(48);
    let report = state.pipeline.forecast(&machine_id, Utc::now(), horizon);
    success(&report)
}

/// GET /api/v1/machines/:id/trend — stabilized prediction trend.
pub async fn get_prediction_trend(
    State(state): State<ApiState>,
    Path(machine_id): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Response {
    let trend = state
        .pipeline
        .prediction_trend(&machine_id, Utc::now(), query.hours);
    success(&trend)
}

/// GET /api/v1/machines/:id/windows — evaluation window snapshots.
pub async fn get_window_status(
    State(state): State<ApiState>,
    Path(machine_id): Path<String>,
) -> Response {
    let windows = state.pipeline.window_status(&machine_id, Utc::now());
    success(&serde_json::json!({ "windows": windows }))
}

/// GET /api/v1/machines/:id/history — persisted sensor readings with the
/// stabilized prediction attached, over a trailing window.
pub async fn get_sensor_history(
    State(state): State<ApiState>,
    Path(machine_id): Path<String>,
    Query(query): Query<SensorHistoryQuery>,
) -> Response {
    let since = Utc::now() - chrono::Duration::hours(query.hours);
    match state.pipeline.store().get_sensor_history(&machine_id, since) {
        Ok(rows) => success(&serde_json::json!({ "history": rows })),
        Err(e) => failure(&CoreError::Unavailable(e.to_string())),
    }
}

/// POST /api/v1/machines/:id/reset — post-maintenance reset.
pub async fn reset_machine(
    State(state): State<ApiState>,
    Path(machine_id): Path<String>,
) -> Response {
    state.pipeline.reset_machine(&machine_id);
    success(&serde_json::json!({ "machine_id": machine_id }))
}

// ============================================================================
// Metrics
// ============================================================================

/// GET /api/v1/metrics — prediction quality report.
pub async fn get_metrics(State(state): State<ApiState>) -> Response {
    let metrics = state.pipeline.metrics();
    let report = metrics
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .report_at(Utc::now());
    success(&report)
}

/// GET /api/v1/metrics/predictions — recent prediction records.
pub async fn get_prediction_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let metrics = state.pipeline.metrics();
    let history = metrics
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .prediction_history(query.machine_id.as_deref(), query.limit);
    success(&serde_json::json!({ "predictions": history }))
}

/// GET /api/v1/metrics/failures — recent failure events.
pub async fn get_failure_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let metrics = state.pipeline.metrics();
    let history = metrics
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .failure_history(query.machine_id.as_deref(), query.limit);
    success(&serde_json::json!({ "failures": history }))
}

/// POST /api/v1/metrics/failures — record a ground-truth failure.
pub async fn record_failure(
    State(state): State<ApiState>,
    Json(req): Json<FailureRequest>,
) -> Response {
    if req.machine_id.is_empty() {
        return failure(&CoreError::InvalidInput("machine_id is required".to_string()));
    }
    let metrics = state.pipeline.metrics();
    let failure_id = metrics
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record_failure(&req.machine_id, &req.event_type);
    success(&serde_json::json!({ "failure_id": failure_id }))
}

// ============================================================================
// Health
// ============================================================================

/// GET /health — liveness probe.
pub async fn health_check() -> Response {
    success(&serde_json::json!({ "status": "ok" }))
}
