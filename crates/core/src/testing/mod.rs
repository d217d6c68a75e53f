//! Testing utilities and mock implementations for E2E tests.
//!
//! Mocks for every collaborator of the enrollment orchestrator and the
//! dashboard API, so both can be exercised without a running detector.
//!
//! # Example
//!
//! ```rust,ignore
//! use lookout_core::testing::{fixtures, MockDetector, RecordingNotifier, ScriptedDecisions};
//!
//! let detector = MockDetector::new();
//! detector.set_accelerator(true);
//! detector.push_response(EnrollStatus::Error, true); // accelerated path failed
//!
//! let decisions = ScriptedDecisions::new();
//! decisions.push_answer(true); // continue degraded
//! ```

mod mock_decisions;
mod mock_detector;
mod recording_notifier;

pub use mock_decisions::ScriptedDecisions;
pub use mock_detector::{MockDetector, RecordedEnrollment};
pub use recording_notifier::RecordingNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::enrollment::PhotoItem;

    /// A JPEG-typed photo of `size` bytes.
    pub fn photo(file_name: &str, size: usize) -> PhotoItem {
        PhotoItem::new(file_name, "image/jpeg", vec![0xFF; size])
    }

    /// `n` small JPEG photos named `photo_0.jpg`, `photo_1.jpg`, ...
    pub fn jpegs(n: usize) -> Vec<PhotoItem> {
        (0..n).map(|i| photo(&format!("photo_{}.jpg", i), 1024)).collect()
    }

    /// A non-image attachment.
    pub fn text_file(file_name: &str) -> PhotoItem {
        PhotoItem::new(file_name, "text/plain", b"not a photo".to_vec())
    }
}
