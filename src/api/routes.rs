//! API route definitions
//!
//! Organizes endpoints for the plantwatch maintenance dashboard:
//! - /api/v1/samples - sensor sample ingestion
//! - /api/v1/alerts - open alerts, statistics, lifecycle transitions
//! - /api/v1/logs - maintenance log queries
//! - /api/v1/machines - forecast, trend, window status, reset
//! - /api/v1/metrics - prediction quality tracking

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::envelope;
use super::handlers::{self, ApiState};
use crate::config::defaults;
use crate::types::CoreError;

/// Create all API routes under /api/v1.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/samples", post(handlers::submit_sample))
        .route("/alerts", get(handlers::get_alerts))
        .route("/alerts/statistics", get(handlers::get_alert_statistics))
        .route("/alerts/:id/acknowledge", post(handlers::acknowledge_alert))
        .route("/alerts/:id/start", post(handlers::start_work))
        .route("/alerts/:id/resolve", post(handlers::resolve_alert))
        .route("/logs", get(handlers::get_maintenance_logs))
        .route("/machines/:id/forecast", get(handlers::get_forecast))
        .route("/machines/:id/trend", get(handlers::get_prediction_trend))
        .route("/machines/:id/windows", get(handlers::get_window_status))
        .route("/machines/:id/history", get(handlers::get_sensor_history))
        .route("/machines/:id/reset", post(handlers::reset_machine))
        .route("/metrics", get(handlers::get_metrics))
        .route("/metrics/predictions", get(handlers::get_prediction_history))
        .route(
            "/metrics/failures",
            get(handlers::get_failure_history).post(handlers::record_failure),
        )
        .with_state(state)
}

/// Full application router with the health probe and middleware layers.
///
/// Requests that outlive the server-side deadline are answered with the
/// canceled envelope instead of hanging.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|_: BoxError| async {
                    envelope::failure(&CoreError::Canceled)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    defaults::API_REQUEST_TIMEOUT_SECS,
                ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
