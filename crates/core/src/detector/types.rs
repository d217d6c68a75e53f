//! Types and traits for talking to the detection service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrollment::PhotoItem;

/// Errors from detection service calls.
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Status field carried by enrollment responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollStatus {
    Ok,
    Error,
}

/// Response to a single enrollment attempt.
///
/// `acceleration_failed` is orthogonal to `status`: the service may have
/// attempted accelerated processing, failed, and still found (or not found)
/// a face on its fallback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub status: EnrollStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, alias = "gpu_failed")]
    pub acceleration_failed: bool,
}

impl EnrollResponse {
    pub fn is_ok(&self) -> bool {
        self.status == EnrollStatus::Ok
    }
}

/// Hardware acceleration available to the detection service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerationInfo {
    #[serde(default, alias = "has_gpu")]
    pub has_accelerator: bool,
    #[serde(default, alias = "detector_gpu")]
    pub detector_accelerated: bool,
    #[serde(default, alias = "recognizer_gpu")]
    pub recognizer_accelerated: bool,
}

/// Live statistics for the current detection session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorStats {
    pub people_count: u32,
    pub total_unique: u32,
    pub fps: f32,
    pub session_time: String,
    pub screenshots: u32,
    pub running: bool,
    pub paused: bool,
}

/// Detection settings as reported by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub confidence: f32,
    pub camera_index: i32,
    pub model_name: String,
    pub show_labels: bool,
    pub show_confidence: bool,
    pub face_recognition_enabled: bool,
    pub face_recognition_tolerance: f32,
}

/// Partial settings update. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_labels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_confidence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_recognition_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_recognition_tolerance: Option<f32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.confidence.is_none()
            && self.camera_index.is_none()
            && self.model_name.is_none()
            && self.show_labels.is_none()
            && self.show_confidence.is_none()
            && self.face_recognition_enabled.is_none()
            && self.face_recognition_tolerance.is_none()
    }
}

/// Response to a session control call (start / pause / stop).
///
/// `stop` additionally reports a short session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_unique: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<u32>,
}

/// An enrolled person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacePerson {
    pub name: String,
    pub sample_count: u32,
}

/// Result of deleting a person or importing a face database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDbResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imported_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_people: Option<u32>,
}

/// Per-photo enrollment against the recognizer.
///
/// This is the only surface the batch enrollment orchestrator depends on.
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    /// Enroll one photo for `person_name`.
    ///
    /// An `Err` means the call itself did not complete. A completed call that
    /// found no usable face returns `Ok` with `status: Error`.
    async fn enroll_photo(
        &self,
        person_name: &str,
        photo: &PhotoItem,
        acceleration_requested: bool,
    ) -> Result<EnrollResponse, DetectorError>;

    /// Report what hardware acceleration the service has.
    async fn acceleration_info(&self) -> Result<AccelerationInfo, DetectorError>;
}

/// Session controls and face database management.
#[async_trait]
pub trait DetectorControl: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn start(&self) -> Result<ControlResponse, DetectorError>;

    /// Toggle pause/resume of the running session.
    async fn pause(&self) -> Result<ControlResponse, DetectorError>;

    async fn stop(&self) -> Result<ControlResponse, DetectorError>;

    async fn stats(&self) -> Result<DetectorStats, DetectorError>;

    async fn settings(&self) -> Result<DetectorSettings, DetectorError>;

    /// Apply a partial update and return the resulting settings.
    async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<DetectorSettings, DetectorError>;

    async fn list_faces(&self) -> Result<Vec<FacePerson>, DetectorError>;

    async fn delete_face(&self, name: &str) -> Result<FaceDbResponse, DetectorError>;

    /// Enroll the face currently visible to the camera.
    async fn enroll_from_camera(&self, name: &str) -> Result<EnrollResponse, DetectorError>;

    /// Export the face database as an opaque blob.
    async fn export_faces(&self) -> Result<Vec<u8>, DetectorError>;

    /// Import a blob produced by `export_faces`, merging or replacing.
    async fn import_faces(&self, data: Vec<u8>, merge: bool)
        -> Result<FaceDbResponse, DetectorError>;
}
