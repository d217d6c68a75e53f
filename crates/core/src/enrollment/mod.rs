//! Batch face enrollment.
//!
//! A batch enrolls a list of photos for one person, strictly one photo at a
//! time, against the detection service's recognizer:
//! - **Validation**: non-image and oversized files are dropped up front
//! - **Dispatch**: sequential, continue-on-error, never retried
//! - **Fallback**: if accelerated processing fails mid-batch the run suspends
//!   and the operator decides whether to continue in degraded mode
//!
//! The suspended state is an explicit value ([`PendingDecision`]) that is
//! resolved exactly once, so the dispatch loop never blocks inside itself.

mod batch;
mod config;
mod orchestrator;
mod types;
mod validate;

pub use batch::{BatchStep, EnrollmentBatch, PendingDecision, Resolution};
pub use config::EnrollmentConfig;
pub use orchestrator::{BatchRun, EnrollmentOrchestrator};
pub use types::{
    BatchSummary, Disposition, EnrollmentError, ItemOutcome, ItemResult, PhotoItem,
    ProcessingMode, RejectedPhoto, RejectionReason,
};
pub use validate::{check_photo, validate_photos};
