//! Session control, stats and settings proxies.

use std::sync::Arc;

use axum::{extract::State, Json};
use lookout_core::{ControlResponse, DetectorSettings, DetectorStats, SettingsUpdate};
use tracing::info;

use super::handlers::{bad_request, detector_failure, ApiError};
use crate::state::AppState;

/// POST /api/v1/session/start
pub async fn start_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ApiError> {
    let response = state.detector().start().await.map_err(detector_failure)?;
    info!("Detection session started");
    Ok(Json(response))
}

/// POST /api/v1/session/pause
///
/// Toggles pause on the detector side.
pub async fn pause_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ApiError> {
    state
        .detector()
        .pause()
        .await
        .map(Json)
        .map_err(detector_failure)
}

/// POST /api/v1/session/stop
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ApiError> {
    let response = state.detector().stop().await.map_err(detector_failure)?;
    info!(
        "Detection session stopped (duration: {})",
        response.duration.as_deref().unwrap_or("unknown")
    );
    Ok(Json(response))
}

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<DetectorStats>, ApiError> {
    state
        .detector()
        .stats()
        .await
        .map(Json)
        .map_err(detector_failure)
}

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DetectorSettings>, ApiError> {
    state
        .detector()
        .settings()
        .await
        .map(Json)
        .map_err(detector_failure)
}

/// PUT /api/v1/settings
///
/// Partial update; only the fields present in the body are forwarded.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<DetectorSettings>, ApiError> {
    if update.is_empty() {
        return Err(bad_request("No settings to update"));
    }
    state
        .detector()
        .update_settings(&update)
        .await
        .map(Json)
        .map_err(detector_failure)
}
