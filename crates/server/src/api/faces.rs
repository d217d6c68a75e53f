//! Face database handlers and batch enrollment upload.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use lookout_core::{
    AccelerationInfo, EnrollResponse, EnrollmentError, FaceDbResponse, FacePerson, PhotoItem,
    ProcessingMode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::handlers::{bad_request, detector_failure, ApiError, ErrorResponse};
use crate::state::AppState;

/// Media type assumed when a multipart part does not declare one.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollBatchResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ProcessingMode>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/faces
pub async fn list_faces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FacePerson>>, ApiError> {
    state
        .detector()
        .list_faces()
        .await
        .map(Json)
        .map_err(detector_failure)
}

/// DELETE /api/v1/faces/{name}
pub async fn delete_face(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FaceDbResponse>, ApiError> {
    let response = state
        .detector()
        .delete_face(&name)
        .await
        .map_err(detector_failure)?;

    if response.status != "ok" {
        let message = response
            .message
            .unwrap_or_else(|| format!("Person '{}' not found", name));
        return Err((StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))));
    }

    info!("Deleted enrolled person {:?}", name);
    state.ws_broadcaster().faces_changed();
    Ok(Json(response))
}

/// POST /api/v1/faces/capture
///
/// Enroll the face currently visible on the live camera.
pub async fn capture_face(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CaptureRequest>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(bad_request("Name is required"));
    }

    let response = state
        .detector()
        .enroll_from_camera(name)
        .await
        .map_err(detector_failure)?;
    if response.is_ok() {
        state.ws_broadcaster().faces_changed();
    }
    Ok(Json(response))
}

/// GET /api/v1/faces/export
pub async fn export_faces(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .detector()
        .export_faces()
        .await
        .map_err(detector_failure)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"face_db.pkl\"",
            ),
        ],
        data,
    ))
}

/// POST /api/v1/faces/import
///
/// Multipart `file` plus optional `merge` (default true).
pub async fn import_faces(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FaceDbResponse>, ApiError> {
    let mut data: Option<Vec<u8>> = None;
    let mut merge = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file: {}", e)))?;
                data = Some(bytes.to_vec());
            }
            "merge" => {
                if let Ok(text) = field.text().await {
                    merge = parse_flag(&text);
                }
            }
            _ => {}
        }
    }

    let data = match data {
        Some(d) if !d.is_empty() => d,
        _ => return Err(bad_request("No face database file provided")),
    };

    let response = state
        .detector()
        .import_faces(data, merge)
        .await
        .map_err(detector_failure)?;
    if response.status == "ok" {
        info!(
            "Imported face database ({} people, merge={})",
            response.imported_names.len(),
            merge
        );
        state.ws_broadcaster().faces_changed();
    }
    Ok(Json(response))
}

/// GET /api/v1/faces/acceleration
///
/// Re-poll the detector's acceleration capability; new batches use the
/// refreshed value.
pub async fn acceleration_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccelerationInfo>, ApiError> {
    state
        .orchestrator()
        .refresh_acceleration()
        .await
        .map(Json)
        .map_err(detector_failure)
}

/// POST /api/v1/faces/enroll
///
/// Multipart `name` plus any number of `files`. The batch runs in the
/// background and reports over the WebSocket stream.
pub async fn enroll_photos(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<EnrollBatchResponse>), ApiError> {
    let mut name = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read name: {}", e)))?;
            }
            "files" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let media_type = field
                    .content_type()
                    .unwrap_or(UNKNOWN_MEDIA_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    bad_request(format!("Failed to read {}: {}", file_name, e))
                })?;
                files.push(PhotoItem::new(file_name, media_type, bytes.to_vec()));
            }
            other => warn!("Ignoring unexpected enrollment field {:?}", other),
        }
    }

    let run = match state.orchestrator().begin(&name, files) {
        Ok(Some(run)) => run,
        Ok(None) => {
            return Ok((
                StatusCode::OK,
                Json(EnrollBatchResponse {
                    started: false,
                    batch_id: None,
                    total: 0,
                    mode: None,
                }),
            ))
        }
        Err(e @ EnrollmentError::BatchInProgress) => {
            return Err((StatusCode::CONFLICT, Json(ErrorResponse::new(e.to_string()))))
        }
    };

    let response = EnrollBatchResponse {
        started: true,
        batch_id: Some(run.batch_id()),
        total: run.total(),
        mode: Some(run.mode()),
    };
    info!(
        "Starting enrollment batch {} for {:?}: {} photo(s), {}",
        run.batch_id(),
        name.trim(),
        run.total(),
        run.mode().as_str()
    );
    tokio::spawn(run.run());

    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
