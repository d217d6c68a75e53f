//! HTTP client for the detection service's REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::enrollment::PhotoItem;

use super::{
    AccelerationInfo, ControlResponse, DetectorControl, DetectorError, DetectorSettings,
    DetectorStats, EnrollResponse, EnrollmentService, FaceDbResponse, FacePerson,
    SettingsUpdate,
};

/// Detection service client.
pub struct HttpDetectorClient {
    client: Client,
    config: DetectorConfig,
}

impl HttpDetectorClient {
    /// Create a new client.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| DetectorError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DetectorError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DetectorError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }

    async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, DetectorError> {
        let response = self
            .client
            .put(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<T, DetectorError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }
}

fn map_request_error(e: reqwest::Error) -> DetectorError {
    if e.is_timeout() {
        DetectorError::Timeout
    } else if e.is_connect() {
        DetectorError::ConnectionFailed(e.to_string())
    } else {
        DetectorError::ApiError(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, DetectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DetectorError::ApiError(format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    )))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DetectorError> {
    response
        .json::<T>()
        .await
        .map_err(|e| DetectorError::InvalidResponse(e.to_string()))
}

/// Path for a single person in the face database.
fn face_path(name: &str) -> String {
    format!("/api/faces/{}", urlencoding::encode(name))
}

/// The service takes the inverse flag: `cpu_only = true` forces degraded mode.
fn cpu_only_flag(acceleration_requested: bool) -> &'static str {
    if acceleration_requested {
        "false"
    } else {
        "true"
    }
}

fn photo_part(photo: &PhotoItem) -> Result<multipart::Part, DetectorError> {
    multipart::Part::bytes(photo.data().to_vec())
        .file_name(photo.file_name().to_string())
        .mime_str(photo.media_type())
        .map_err(|e| DetectorError::ApiError(format!("invalid media type: {}", e)))
}

#[async_trait]
impl EnrollmentService for HttpDetectorClient {
    async fn enroll_photo(
        &self,
        person_name: &str,
        photo: &PhotoItem,
        acceleration_requested: bool,
    ) -> Result<EnrollResponse, DetectorError> {
        debug!(
            "Uploading {} ({} bytes) for {:?}, accelerated={}",
            photo.file_name(),
            photo.size_bytes(),
            person_name,
            acceleration_requested
        );

        let form = multipart::Form::new()
            .text("name", person_name.to_string())
            .text("cpu_only", cpu_only_flag(acceleration_requested))
            .part("files", photo_part(photo)?);

        self.post_multipart("/api/faces/upload", form).await
    }

    async fn acceleration_info(&self) -> Result<AccelerationInfo, DetectorError> {
        self.get_json("/api/faces/gpu").await
    }
}

#[async_trait]
impl DetectorControl for HttpDetectorClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn start(&self) -> Result<ControlResponse, DetectorError> {
        self.post_empty("/api/start").await
    }

    async fn pause(&self) -> Result<ControlResponse, DetectorError> {
        self.post_empty("/api/pause").await
    }

    async fn stop(&self) -> Result<ControlResponse, DetectorError> {
        self.post_empty("/api/stop").await
    }

    async fn stats(&self) -> Result<DetectorStats, DetectorError> {
        self.get_json("/api/stats").await
    }

    async fn settings(&self) -> Result<DetectorSettings, DetectorError> {
        self.get_json("/api/settings").await
    }

    async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<DetectorSettings, DetectorError> {
        self.put_json("/api/settings", update).await
    }

    async fn list_faces(&self) -> Result<Vec<FacePerson>, DetectorError> {
        self.get_json("/api/faces").await
    }

    async fn delete_face(&self, name: &str) -> Result<FaceDbResponse, DetectorError> {
        let response = self
            .client
            .delete(self.url(&face_path(name)))
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }

    async fn enroll_from_camera(&self, name: &str) -> Result<EnrollResponse, DetectorError> {
        let response = self
            .client
            .post(self.url("/api/faces/enroll"))
            .form(&[("name", name)])
            .send()
            .await
            .map_err(map_request_error)?;
        decode(check_status(response).await?).await
    }

    async fn export_faces(&self) -> Result<Vec<u8>, DetectorError> {
        let response = self
            .client
            .get(self.url("/api/faces/export"))
            .send()
            .await
            .map_err(map_request_error)?;
        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn import_faces(
        &self,
        data: Vec<u8>,
        merge: bool,
    ) -> Result<FaceDbResponse, DetectorError> {
        let part = multipart::Part::bytes(data)
            .file_name("face_db.pkl")
            .mime_str("application/octet-stream")
            .map_err(|e| DetectorError::ApiError(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("merge", if merge { "true" } else { "false" });

        self.post_multipart("/api/faces/import", form).await
    }
}
