use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use lookout_core::{DetectorError, SanitizedConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Error half of every handler that talks to the detection service.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a detection service failure to `502 Bad Gateway`.
pub fn detector_failure(e: DetectorError) -> ApiError {
    warn!("Detection service request failed: {}", e);
    (StatusCode::BAD_GATEWAY, Json(ErrorResponse::new(e.to_string())))
}

pub fn bad_request(error: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error)))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
