//! Mock detector service for testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::detector::{
    AccelerationInfo, ControlResponse, DetectorControl, DetectorError, DetectorSettings,
    DetectorStats, EnrollResponse, EnrollStatus, EnrollmentService, FaceDbResponse, FacePerson,
    SettingsUpdate,
};
use crate::enrollment::PhotoItem;

/// A recorded enrollment call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEnrollment {
    pub person_name: String,
    pub file_name: String,
    pub acceleration_requested: bool,
}

#[derive(Debug, Default)]
struct DetectorState {
    scripted: VecDeque<Result<EnrollResponse, DetectorError>>,
    enroll_calls: Vec<RecordedEnrollment>,
    control_calls: Vec<&'static str>,
    faces: BTreeMap<String, u32>,
    acceleration: AccelerationInfo,
    settings: DetectorSettings,
    running: bool,
    paused: bool,
    offline: bool,
    enroll_delay: Option<Duration>,
}

/// Mock implementation of the EnrollmentService and DetectorControl traits.
///
/// Provides controllable behavior for testing:
/// - Script per-photo enrollment results (status, acceleration failure, transport errors)
/// - Track every enrollment call and the mode it requested
/// - Keep an in-memory face database for list/delete/export/import
/// - Simulate the detector being unreachable
///
/// Photos without a scripted result enroll successfully.
#[derive(Debug)]
pub struct MockDetector {
    state: Mutex<DetectorState>,
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDetector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DetectorState {
                settings: DetectorSettings {
                    confidence: 0.5,
                    model_name: "yolov8n".to_string(),
                    show_labels: true,
                    show_confidence: true,
                    face_recognition_enabled: true,
                    face_recognition_tolerance: 0.6,
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    /// Script the result of the next unscripted enrollment call.
    pub fn push_response(&self, status: EnrollStatus, acceleration_failed: bool) {
        let message = match status {
            EnrollStatus::Ok => None,
            EnrollStatus::Error => Some("No face detected in image".to_string()),
        };
        self.state.lock().unwrap().scripted.push_back(Ok(EnrollResponse {
            status,
            name: None,
            sample_count: None,
            message,
            acceleration_failed,
        }));
    }

    /// Script a transport failure for the next enrollment call.
    pub fn push_error(&self, error: DetectorError) {
        self.state.lock().unwrap().scripted.push_back(Err(error));
    }

    pub fn set_accelerator(&self, available: bool) {
        self.state.lock().unwrap().acceleration = AccelerationInfo {
            has_accelerator: available,
            detector_accelerated: available,
            recognizer_accelerated: available,
        };
    }

    /// Make every call fail with `ConnectionFailed`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Delay each enrollment call, to keep a batch observable while running.
    pub fn set_enroll_delay(&self, delay: Duration) {
        self.state.lock().unwrap().enroll_delay = Some(delay);
    }

    /// Pre-populate an enrolled person.
    pub fn add_face(&self, name: &str, sample_count: u32) {
        self.state
            .lock()
            .unwrap()
            .faces
            .insert(name.to_string(), sample_count);
    }

    pub fn enroll_calls(&self) -> Vec<RecordedEnrollment> {
        self.state.lock().unwrap().enroll_calls.clone()
    }

    /// Names of session control calls, oldest first ("start", "pause", "stop").
    pub fn control_calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().control_calls.clone()
    }

    pub fn face_count(&self) -> usize {
        self.state.lock().unwrap().faces.len()
    }

    fn check_online(&self) -> Result<(), DetectorError> {
        if self.state.lock().unwrap().offline {
            Err(DetectorError::ConnectionFailed(
                "mock detector offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn faces(&self) -> Vec<FacePerson> {
        self.state
            .lock()
            .unwrap()
            .faces
            .iter()
            .map(|(name, count)| FacePerson {
                name: name.clone(),
                sample_count: *count,
            })
            .collect()
    }

    /// Enroll one sample for `name` in the face database.
    fn add_sample(state: &mut DetectorState, name: &str) -> u32 {
        let count = state.faces.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn control(&self, call: &'static str, running: bool, paused: bool) -> ControlResponse {
        let mut state = self.state.lock().unwrap();
        state.control_calls.push(call);
        state.running = running;
        state.paused = paused;
        ControlResponse {
            status: call.to_string(),
            message: None,
            duration: None,
            total_unique: None,
            screenshots: None,
        }
    }
}

#[async_trait]
impl EnrollmentService for MockDetector {
    async fn enroll_photo(
        &self,
        person_name: &str,
        photo: &PhotoItem,
        acceleration_requested: bool,
    ) -> Result<EnrollResponse, DetectorError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.enroll_calls.push(RecordedEnrollment {
                person_name: person_name.to_string(),
                file_name: photo.file_name().to_string(),
                acceleration_requested,
            });
            state.enroll_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;

        let mut state = self.state.lock().unwrap();
        let mut response = match state.scripted.pop_front() {
            Some(scripted) => scripted?,
            None => EnrollResponse {
                status: EnrollStatus::Ok,
                name: None,
                sample_count: None,
                message: None,
                acceleration_failed: false,
            },
        };
        if response.is_ok() {
            response.name = Some(person_name.to_string());
            response.sample_count = Some(Self::add_sample(&mut state, person_name));
        }
        Ok(response)
    }

    async fn acceleration_info(&self) -> Result<AccelerationInfo, DetectorError> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().acceleration)
    }
}

#[async_trait]
impl DetectorControl for MockDetector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self) -> Result<ControlResponse, DetectorError> {
        self.check_online()?;
        Ok(self.control("start", true, false))
    }

    async fn pause(&self) -> Result<ControlResponse, DetectorError> {
        self.check_online()?;
        let paused = !self.state.lock().unwrap().paused;
        Ok(self.control("pause", true, paused))
    }

    async fn stop(&self) -> Result<ControlResponse, DetectorError> {
        self.check_online()?;
        Ok(self.control("stop", false, false))
    }

    async fn stats(&self) -> Result<DetectorStats, DetectorError> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(DetectorStats {
            running: state.running,
            paused: state.paused,
            session_time: "00:00:00".to_string(),
            ..Default::default()
        })
    }

    async fn settings(&self) -> Result<DetectorSettings, DetectorError> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().settings.clone())
    }

    async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<DetectorSettings, DetectorError> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        let settings = &mut state.settings;
        if let Some(v) = update.confidence {
            settings.confidence = v;
        }
        if let Some(v) = update.camera_index {
            settings.camera_index = v;
        }
        if let Some(v) = &update.model_name {
            settings.model_name = v.clone();
        }
        if let Some(v) = update.show_labels {
            settings.show_labels = v;
        }
        if let Some(v) = update.show_confidence {
            settings.show_confidence = v;
        }
        if let Some(v) = update.face_recognition_enabled {
            settings.face_recognition_enabled = v;
        }
        if let Some(v) = update.face_recognition_tolerance {
            settings.face_recognition_tolerance = v;
        }
        Ok(settings.clone())
    }

    async fn list_faces(&self) -> Result<Vec<FacePerson>, DetectorError> {
        self.check_online()?;
        Ok(self.faces())
    }

    async fn delete_face(&self, name: &str) -> Result<FaceDbResponse, DetectorError> {
        self.check_online()?;
        let removed = self.state.lock().unwrap().faces.remove(name);
        let (status, message) = match removed {
            Some(_) => ("ok", None),
            None => ("error", Some(format!("Person '{}' not found", name))),
        };
        Ok(FaceDbResponse {
            status: status.to_string(),
            name: removed.map(|_| name.to_string()),
            message,
            imported_names: Vec::new(),
            total_people: None,
        })
    }

    async fn enroll_from_camera(&self, name: &str) -> Result<EnrollResponse, DetectorError> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if !state.running {
            return Ok(EnrollResponse {
                status: EnrollStatus::Error,
                name: None,
                sample_count: None,
                message: Some("Detection is not running".to_string()),
                acceleration_failed: false,
            });
        }
        let count = Self::add_sample(&mut state, name);
        Ok(EnrollResponse {
            status: EnrollStatus::Ok,
            name: Some(name.to_string()),
            sample_count: Some(count),
            message: None,
            acceleration_failed: false,
        })
    }

    async fn export_faces(&self) -> Result<Vec<u8>, DetectorError> {
        self.check_online()?;
        serde_json::to_vec(&self.faces()).map_err(|e| DetectorError::InvalidResponse(e.to_string()))
    }

    async fn import_faces(
        &self,
        data: Vec<u8>,
        merge: bool,
    ) -> Result<FaceDbResponse, DetectorError> {
        self.check_online()?;
        let imported: Vec<FacePerson> = serde_json::from_slice(&data)
            .map_err(|e| DetectorError::ApiError(format!("HTTP 400 Bad Request: {}", e)))?;

        let mut state = self.state.lock().unwrap();
        if !merge {
            state.faces.clear();
        }
        let mut imported_names = Vec::with_capacity(imported.len());
        for person in imported {
            *state.faces.entry(person.name.clone()).or_insert(0) += person.sample_count;
            imported_names.push(person.name);
        }
        Ok(FaceDbResponse {
            status: "ok".to_string(),
            name: None,
            message: None,
            imported_names,
            total_people: Some(state.faces.len() as u32),
        })
    }
}
