//! Response shaping for the HTTP surface.
//!
//! Lifecycle operations keep the operator-facing `{ "success": bool, ... }`
//! shape: successful calls merge their receipt fields into a success
//! envelope, failures map the core error taxonomy onto an HTTP status with
//! `{ "success": false, "error": "..." }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::types::CoreError;

/// 200 with `{ "success": true }` merged into the serialized payload.
pub fn success<T: Serialize>(payload: &T) -> Response {
    let mut body = serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(map) = body.as_object_mut() {
        map.insert("success".to_string(), serde_json::Value::Bool(true));
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// Failure envelope with a status derived from the error kind.
pub fn failure(err: &CoreError) -> Response {
    let status = match err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidState(_) | CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::Duplicate { .. } | CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Canceled => StatusCode::REQUEST_TIMEOUT,
    };
    let body = serde_json::json!({
        "success": false,
        "error": err.to_string(),
    });
    (status, Json(body)).into_response()
}

/// Either arm of a lifecycle call.
pub fn respond<T: Serialize>(result: Result<T, CoreError>) -> Response {
    match result {
        Ok(payload) => success(&payload),
        Err(err) => failure(&err),
    }
}
