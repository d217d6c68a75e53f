//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Enrollment batches (items, dispatch latency, dispositions)
//! - Acceleration fallback decisions
//! - Photo validation

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Enrollment
// =============================================================================

/// Photos dispatched to the detector, by outcome.
pub static ENROLLMENT_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lookout_enrollment_items_total",
            "Total photos dispatched for enrollment",
        ),
        &["outcome"], // "enrolled", "rejected", "transport_failed"
    )
    .unwrap()
});

/// Per-photo enrollment call duration.
pub static ENROLLMENT_DISPATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lookout_enrollment_dispatch_duration_seconds",
            "Duration of a single enrollment call",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["mode"], // "accelerated", "degraded"
    )
    .unwrap()
});

/// Finished batches by disposition.
pub static ENROLLMENT_BATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lookout_enrollment_batches_total",
            "Total enrollment batches finished",
        ),
        &["disposition"], // "completed", "aborted_by_user"
    )
    .unwrap()
});

/// Answers to the degraded-mode prompt.
pub static ACCELERATION_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lookout_acceleration_decisions_total",
            "Operator answers to the acceleration fallback prompt",
        ),
        &["answer"], // "continue", "stop", "timeout", "failed"
    )
    .unwrap()
});

// =============================================================================
// Validation
// =============================================================================

/// Photos skipped before dispatch.
pub static PHOTOS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lookout_photos_rejected_total",
            "Photos skipped by client-side validation",
        ),
        &["reason"], // "not_an_image", "too_large"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ENROLLMENT_ITEMS.clone()),
        Box::new(ENROLLMENT_DISPATCH_DURATION.clone()),
        Box::new(ENROLLMENT_BATCHES.clone()),
        Box::new(ACCELERATION_DECISIONS.clone()),
        Box::new(PHOTOS_REJECTED.clone()),
    ]
}
