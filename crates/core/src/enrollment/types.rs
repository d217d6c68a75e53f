//! Types for batch enrollment.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::detector::{DetectorError, EnrollResponse};
use crate::notify::Notification;

const MIB: u64 = 1024 * 1024;

/// Errors returned by the orchestrator itself.
///
/// Per-photo failures never surface here; they are counted in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    /// Another batch holds the orchestrator.
    #[error("an enrollment batch is already in progress")]
    BatchInProgress,
}

/// One photo to enroll. Immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoItem {
    file_name: String,
    media_type: String,
    data: Vec<u8>,
}

impl PhotoItem {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared media type, e.g. `image/jpeg`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for PhotoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoItem")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

/// Whether the recognizer is asked to use hardware acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    Accelerated,
    Degraded,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Accelerated => "accelerated",
            ProcessingMode::Degraded => "degraded",
        }
    }
}

/// Classification of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The service stored a face sample.
    Enrolled,
    /// The call completed but no usable face was found.
    Rejected,
    /// The call itself did not complete.
    TransportFailed,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Enrolled => "enrolled",
            ItemOutcome::Rejected => "rejected",
            ItemOutcome::TransportFailed => "transport_failed",
        }
    }
}

/// Outcome of one dispatch plus the orthogonal acceleration-failure flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemResult {
    pub outcome: ItemOutcome,
    pub acceleration_failed: bool,
}

impl ItemResult {
    /// Classify the result of an `enroll_photo` call.
    pub fn from_call(result: &Result<EnrollResponse, DetectorError>) -> Self {
        match result {
            Ok(response) => Self {
                outcome: if response.is_ok() {
                    ItemOutcome::Enrolled
                } else {
                    ItemOutcome::Rejected
                },
                acceleration_failed: response.acceleration_failed,
            },
            Err(_) => Self {
                outcome: ItemOutcome::TransportFailed,
                acceleration_failed: false,
            },
        }
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Every accepted photo was dispatched.
    Completed,
    /// The operator chose to stop after an acceleration failure.
    AbortedByUser,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Completed => "completed",
            Disposition::AbortedByUser => "aborted_by_user",
        }
    }
}

/// Final counters of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub person_name: String,
    pub enrolled: usize,
    pub errors: usize,
    /// Photos accepted by validation.
    pub total: usize,
    /// Photos actually sent to the service.
    pub dispatched: usize,
    pub disposition: Disposition,
}

impl BatchSummary {
    /// The single end-of-batch message shown to the operator.
    pub fn notification(&self) -> Notification {
        match (self.disposition, self.enrolled, self.errors) {
            (Disposition::AbortedByUser, 0, _) => Notification::warning("Upload cancelled"),
            (Disposition::AbortedByUser, enrolled, _) => {
                Notification::success(format!("Enrolled {} (stopped early)", photos(enrolled)))
            }
            (Disposition::Completed, 0, _) => {
                Notification::error(format!("No faces detected in {}", photos(self.total)))
            }
            (Disposition::Completed, enrolled, 0) => {
                Notification::success(format!("Enrolled {}", photos(enrolled)))
            }
            (Disposition::Completed, enrolled, errors) => {
                Notification::success(format!("Enrolled {} ({} failed)", photos(enrolled), errors))
            }
        }
    }

    /// Whether the enrolled people list changed.
    pub fn enrolled_any(&self) -> bool {
        self.enrolled > 0
    }
}

/// `1 photo`, `2 photos`.
fn photos(count: usize) -> String {
    if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{} photos", count)
    }
}

/// Why validation dropped a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    NotAnImage,
    TooLarge { size_bytes: u64, limit_bytes: u64 },
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NotAnImage => "not_an_image",
            RejectionReason::TooLarge { .. } => "too_large",
        }
    }
}

/// A photo dropped by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedPhoto {
    pub file_name: String,
    #[serde(flatten)]
    pub reason: RejectionReason,
}

impl fmt::Display for RejectedPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectionReason::NotAnImage => {
                write!(f, "Skipped {}: not an image file", self.file_name)
            }
            RejectionReason::TooLarge { limit_bytes, .. } if limit_bytes % MIB == 0 => write!(
                f,
                "Skipped {}: larger than {} MB",
                self.file_name,
                limit_bytes / MIB
            ),
            RejectionReason::TooLarge { limit_bytes, .. } => write!(
                f,
                "Skipped {}: larger than {} bytes",
                self.file_name, limit_bytes
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::EnrollStatus;
    use crate::notify::Severity;

    fn summary(disposition: Disposition, enrolled: usize, errors: usize) -> BatchSummary {
        BatchSummary {
            batch_id: Uuid::nil(),
            person_name: "alice".to_string(),
            enrolled,
            errors,
            total: enrolled + errors,
            dispatched: enrolled + errors,
            disposition,
        }
    }

    fn response(status: EnrollStatus, acceleration_failed: bool) -> EnrollResponse {
        EnrollResponse {
            status,
            name: None,
            sample_count: None,
            message: None,
            acceleration_failed,
        }
    }

    #[test]
    fn test_all_enrolled_message() {
        let n = summary(Disposition::Completed, 2, 0).notification();
        assert_eq!(n.severity, Severity::Success);
        assert_eq!(n.message, "Enrolled 2 photos");

        let n = summary(Disposition::Completed, 1, 0).notification();
        assert_eq!(n.message, "Enrolled 1 photo");
    }

    #[test]
    fn test_partial_failure_message() {
        let n = summary(Disposition::Completed, 3, 1).notification();
        assert_eq!(n.severity, Severity::Success);
        assert_eq!(n.message, "Enrolled 3 photos (1 failed)");
    }

    #[test]
    fn test_nothing_enrolled_message_counts_total() {
        let n = summary(Disposition::Completed, 0, 2).notification();
        assert_eq!(n.severity, Severity::Error);
        assert_eq!(n.message, "No faces detected in 2 photos");
    }

    #[test]
    fn test_stopped_early_messages() {
        let n = summary(Disposition::AbortedByUser, 1, 1).notification();
        assert_eq!(n.severity, Severity::Success);
        assert_eq!(n.message, "Enrolled 1 photo (stopped early)");

        let n = summary(Disposition::AbortedByUser, 0, 1).notification();
        assert_eq!(n.severity, Severity::Warning);
        assert_eq!(n.message, "Upload cancelled");
    }

    #[test]
    fn test_item_result_classification() {
        let ok = ItemResult::from_call(&Ok(response(EnrollStatus::Ok, false)));
        assert_eq!(ok.outcome, ItemOutcome::Enrolled);
        assert!(!ok.acceleration_failed);

        let rejected = ItemResult::from_call(&Ok(response(EnrollStatus::Error, true)));
        assert_eq!(rejected.outcome, ItemOutcome::Rejected);
        assert!(rejected.acceleration_failed);

        let failed = ItemResult::from_call(&Err(DetectorError::Timeout));
        assert_eq!(failed.outcome, ItemOutcome::TransportFailed);
        assert!(!failed.acceleration_failed);
    }

    #[test]
    fn test_rejected_photo_display() {
        let too_large = RejectedPhoto {
            file_name: "big.jpg".to_string(),
            reason: RejectionReason::TooLarge {
                size_bytes: 11 * MIB,
                limit_bytes: 10 * MIB,
            },
        };
        assert_eq!(too_large.to_string(), "Skipped big.jpg: larger than 10 MB");

        let not_image = RejectedPhoto {
            file_name: "notes.txt".to_string(),
            reason: RejectionReason::NotAnImage,
        };
        assert_eq!(not_image.to_string(), "Skipped notes.txt: not an image file");
    }

    #[test]
    fn test_photo_item_debug_omits_payload() {
        let photo = PhotoItem::new("a.png", "image/png", vec![0u8; 4]);
        let debug = format!("{:?}", photo);
        assert!(debug.contains("size_bytes: 4"));
        assert!(!debug.contains("data"));
    }
}
