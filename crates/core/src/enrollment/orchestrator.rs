//! Batch enrollment orchestrator.
//!
//! Owns the single-active-batch guard, the cached acceleration capability,
//! and the collaborators a batch reports through.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::detector::{AccelerationInfo, DetectorError, EnrollmentService};
use crate::metrics::{ACCELERATION_DECISIONS, ENROLLMENT_BATCHES, PHOTOS_REJECTED};
use crate::notify::{
    DecisionChannel, DecisionPrompt, ListRefreshCallback, Notification, NotificationSink,
    ProgressSink,
};

use super::batch::{BatchStep, EnrollmentBatch, Resolution};
use super::config::EnrollmentConfig;
use super::types::{BatchSummary, EnrollmentError, PhotoItem, ProcessingMode};
use super::validate::validate_photos;

/// Drives enrollment batches, one at a time.
pub struct EnrollmentOrchestrator {
    config: EnrollmentConfig,
    service: Arc<dyn EnrollmentService>,
    notifier: Arc<dyn NotificationSink>,
    progress: Arc<dyn ProgressSink>,
    decisions: Arc<dyn DecisionChannel>,
    on_enrolled: Option<ListRefreshCallback>,

    // Runtime state
    active: Arc<AtomicBool>,
    accelerated: AtomicBool,
}

impl EnrollmentOrchestrator {
    /// Create a new orchestrator. Batches start degraded until
    /// [`refresh_acceleration`](Self::refresh_acceleration) reports an accelerator.
    pub fn new(
        config: EnrollmentConfig,
        service: Arc<dyn EnrollmentService>,
        notifier: Arc<dyn NotificationSink>,
        progress: Arc<dyn ProgressSink>,
        decisions: Arc<dyn DecisionChannel>,
    ) -> Self {
        Self {
            config,
            service,
            notifier,
            progress,
            decisions,
            on_enrolled: None,
            active: Arc::new(AtomicBool::new(false)),
            accelerated: AtomicBool::new(false),
        }
    }

    /// Set the callback fired when a batch enrolled at least one photo.
    pub fn with_refresh_callback(mut self, callback: ListRefreshCallback) -> Self {
        self.on_enrolled = Some(callback);
        self
    }

    /// Poll the service's acceleration capability and cache it.
    ///
    /// On failure the cache falls back to degraded.
    pub async fn refresh_acceleration(&self) -> Result<AccelerationInfo, DetectorError> {
        match self.service.acceleration_info().await {
            Ok(info) => {
                self.accelerated
                    .store(info.has_accelerator, Ordering::SeqCst);
                info!(
                    "Acceleration: available={}, detector={}, recognizer={}",
                    info.has_accelerator, info.detector_accelerated, info.recognizer_accelerated
                );
                Ok(info)
            }
            Err(e) => {
                self.accelerated.store(false, Ordering::SeqCst);
                warn!("Failed to query acceleration info: {}", e);
                Err(e)
            }
        }
    }

    /// Whether new batches start in accelerated mode.
    pub fn is_accelerated(&self) -> bool {
        self.accelerated.load(Ordering::SeqCst)
    }

    /// Whether a batch currently holds the orchestrator.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Enroll `files` for `person_name` and wait for the batch to end.
    ///
    /// Returns `Ok(None)` when there is nothing to do (blank name, no files,
    /// or every file rejected by validation).
    pub async fn submit(
        &self,
        person_name: &str,
        files: Vec<PhotoItem>,
    ) -> Result<Option<BatchSummary>, EnrollmentError> {
        match self.begin(person_name, files)? {
            Some(run) => Ok(Some(run.run().await)),
            None => Ok(None),
        }
    }

    /// Claim the orchestrator and validate `files` without dispatching.
    ///
    /// The returned [`BatchRun`] holds the claim until it is run to the end
    /// or dropped, so callers can reject a concurrent batch before spawning.
    pub fn begin(
        &self,
        person_name: &str,
        files: Vec<PhotoItem>,
    ) -> Result<Option<BatchRun>, EnrollmentError> {
        let person_name = person_name.trim();
        if person_name.is_empty() || files.is_empty() {
            return Ok(None);
        }

        let guard = BatchGuard::acquire(&self.active).ok_or(EnrollmentError::BatchInProgress)?;

        let (accepted, rejected) = validate_photos(files, self.config.max_file_bytes);
        for rejection in &rejected {
            PHOTOS_REJECTED
                .with_label_values(&[rejection.reason.as_str()])
                .inc();
            self.notifier.notify(Notification::warning(rejection.to_string()));
        }

        if accepted.is_empty() {
            debug!("No valid photos for {:?}, nothing to enroll", person_name);
            return Ok(None);
        }

        let mode = if self.is_accelerated() {
            ProcessingMode::Accelerated
        } else {
            ProcessingMode::Degraded
        };
        let batch = EnrollmentBatch::new(person_name, accepted, mode);

        info!(
            "Starting enrollment batch {} for {:?}: {} photo(s), {} skipped, mode {}",
            batch.id(),
            person_name,
            batch.total(),
            rejected.len(),
            mode.as_str()
        );

        Ok(Some(BatchRun {
            batch,
            service: Arc::clone(&self.service),
            notifier: Arc::clone(&self.notifier),
            progress: Arc::clone(&self.progress),
            decisions: Arc::clone(&self.decisions),
            on_enrolled: self.on_enrolled.clone(),
            decision_timeout: self.config.decision_timeout(),
            guard,
        }))
    }
}

/// Releases the single-batch claim on drop.
struct BatchGuard {
    active: Arc<AtomicBool>,
}

impl BatchGuard {
    fn acquire(active: &Arc<AtomicBool>) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// A validated batch that owns the orchestrator until it finishes.
pub struct BatchRun {
    batch: EnrollmentBatch,
    service: Arc<dyn EnrollmentService>,
    notifier: Arc<dyn NotificationSink>,
    progress: Arc<dyn ProgressSink>,
    decisions: Arc<dyn DecisionChannel>,
    on_enrolled: Option<ListRefreshCallback>,
    decision_timeout: Option<Duration>,
    guard: BatchGuard,
}

impl BatchRun {
    pub fn batch_id(&self) -> Uuid {
        self.batch.id()
    }

    pub fn total(&self) -> usize {
        self.batch.total()
    }

    pub fn mode(&self) -> ProcessingMode {
        self.batch.mode()
    }

    /// Dispatch every photo, negotiating at most one fallback decision, and
    /// report the outcome.
    pub async fn run(self) -> BatchSummary {
        let BatchRun {
            mut batch,
            service,
            notifier,
            progress,
            decisions,
            on_enrolled,
            decision_timeout,
            guard,
        } = self;

        let summary = loop {
            match batch.advance(service.as_ref(), progress.as_ref()).await {
                BatchStep::Finished(summary) => break summary,
                BatchStep::Suspended(pending) => {
                    let resume =
                        await_decision(decisions.as_ref(), pending.prompt(), decision_timeout)
                            .await;
                    match pending.resolve(resume) {
                        Resolution::Resumed(next) => {
                            info!(
                                "Batch {}: continuing with {} photo(s) in degraded mode",
                                next.id(),
                                next.remaining().len()
                            );
                            batch = next;
                        }
                        Resolution::Aborted(summary) => break summary,
                    }
                }
            }
        };

        ENROLLMENT_BATCHES
            .with_label_values(&[summary.disposition.as_str()])
            .inc();
        info!(
            "Batch {} {}: {} enrolled, {} failed, {}/{} dispatched",
            summary.batch_id,
            summary.disposition.as_str(),
            summary.enrolled,
            summary.errors,
            summary.dispatched,
            summary.total
        );

        notifier.notify(summary.notification());
        if summary.enrolled_any() {
            if let Some(refresh) = &on_enrolled {
                refresh();
            }
        }

        drop(guard);
        summary
    }
}

/// Ask the operator whether to continue degraded. Anything other than an
/// explicit "continue" stops the batch.
async fn await_decision(
    decisions: &dyn DecisionChannel,
    prompt: DecisionPrompt,
    timeout: Option<Duration>,
) -> bool {
    let batch_id = prompt.batch_id;
    let answer = match timeout {
        Some(limit) => {
            match tokio::time::timeout(limit, decisions.request_decision(prompt)).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!(
                        "Batch {}: no decision within {:?}, stopping",
                        batch_id, limit
                    );
                    ACCELERATION_DECISIONS.with_label_values(&["timeout"]).inc();
                    return false;
                }
            }
        }
        None => decisions.request_decision(prompt).await,
    };

    match answer {
        Ok(resume) => {
            ACCELERATION_DECISIONS
                .with_label_values(&[if resume { "continue" } else { "stop" }])
                .inc();
            resume
        }
        Err(e) => {
            warn!("Batch {}: decision failed ({}), stopping", batch_id, e);
            ACCELERATION_DECISIONS.with_label_values(&["failed"]).inc();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::EnrollStatus;
    use crate::enrollment::Disposition;
    use crate::notify::{DecisionError, Severity};
    use crate::testing::{fixtures, MockDetector, RecordingNotifier, ScriptedDecisions};
    use std::sync::atomic::AtomicUsize;

    struct Harness {
        detector: Arc<MockDetector>,
        notifier: Arc<RecordingNotifier>,
        decisions: Arc<ScriptedDecisions>,
        refreshes: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new(decisions: ScriptedDecisions) -> Self {
            Self {
                detector: Arc::new(MockDetector::new()),
                notifier: Arc::new(RecordingNotifier::new()),
                decisions: Arc::new(decisions),
                refreshes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn orchestrator(&self, config: EnrollmentConfig) -> EnrollmentOrchestrator {
            let refreshes = Arc::clone(&self.refreshes);
            EnrollmentOrchestrator::new(
                config,
                Arc::clone(&self.detector) as Arc<dyn EnrollmentService>,
                Arc::clone(&self.notifier) as Arc<dyn NotificationSink>,
                Arc::clone(&self.notifier) as Arc<dyn ProgressSink>,
                Arc::clone(&self.decisions) as Arc<dyn DecisionChannel>,
            )
            .with_refresh_callback(Arc::new(move || {
                refreshes.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    #[tokio::test]
    async fn test_blank_name_is_noop() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        let result = orchestrator.submit("   ", fixtures::jpegs(2)).await.unwrap();

        assert!(result.is_none());
        assert!(harness.detector.enroll_calls().is_empty());
        assert!(harness.notifier.notifications().is_empty());
        assert!(!orchestrator.is_active());
    }

    #[tokio::test]
    async fn test_name_is_trimmed() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        let summary = orchestrator
            .submit("  alice ", fixtures::jpegs(1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.person_name, "alice");
        assert_eq!(harness.detector.enroll_calls()[0].person_name, "alice");
    }

    #[tokio::test]
    async fn test_starts_degraded_without_accelerator() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        orchestrator.submit("alice", fixtures::jpegs(1)).await.unwrap();

        assert!(!harness.detector.enroll_calls()[0].acceleration_requested);
    }

    #[tokio::test]
    async fn test_refresh_acceleration_enables_accelerated_mode() {
        let harness = Harness::new(ScriptedDecisions::new());
        harness.detector.set_accelerator(true);
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        let info = orchestrator.refresh_acceleration().await.unwrap();
        assert!(info.has_accelerator);
        assert!(orchestrator.is_accelerated());

        orchestrator.submit("alice", fixtures::jpegs(1)).await.unwrap();
        assert!(harness.detector.enroll_calls()[0].acceleration_requested);
    }

    #[tokio::test]
    async fn test_refresh_acceleration_failure_falls_back() {
        let harness = Harness::new(ScriptedDecisions::new());
        harness.detector.set_accelerator(true);
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());
        orchestrator.refresh_acceleration().await.unwrap();

        harness.detector.set_offline(true);
        assert!(orchestrator.refresh_acceleration().await.is_err());
        assert!(!orchestrator.is_accelerated());
    }

    #[tokio::test]
    async fn test_second_batch_rejected_while_active() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        let run = orchestrator
            .begin("alice", fixtures::jpegs(1))
            .unwrap()
            .unwrap();
        assert!(orchestrator.is_active());

        let second = orchestrator.begin("bob", fixtures::jpegs(1));
        assert!(matches!(second, Err(EnrollmentError::BatchInProgress)));

        run.run().await;
        assert!(!orchestrator.is_active());
        assert!(orchestrator.begin("bob", fixtures::jpegs(1)).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_all_rejected_releases_guard() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        let files = vec![PhotoItem::new("notes.txt", "text/plain", vec![1, 2, 3])];
        assert!(orchestrator.submit("alice", files).await.unwrap().is_none());

        assert!(!orchestrator.is_active());
        assert_eq!(harness.notifier.notifications().len(), 1);
        assert_eq!(harness.notifier.notifications()[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_refresh_fires_only_when_enrolled() {
        let harness = Harness::new(ScriptedDecisions::new());
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());

        harness.detector.push_response(EnrollStatus::Error, false);
        orchestrator.submit("alice", fixtures::jpegs(1)).await.unwrap();
        assert_eq!(harness.refreshes.load(Ordering::SeqCst), 0);

        orchestrator.submit("alice", fixtures::jpegs(1)).await.unwrap();
        assert_eq!(harness.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decision_channel_failure_stops_batch() {
        let decisions = ScriptedDecisions::new();
        decisions.push_error(DecisionError::ChannelClosed);
        let harness = Harness::new(decisions);
        harness.detector.set_accelerator(true);
        harness.detector.push_response(EnrollStatus::Ok, true);
        let orchestrator = harness.orchestrator(EnrollmentConfig::default());
        orchestrator.refresh_acceleration().await.unwrap();

        let summary = orchestrator
            .submit("alice", fixtures::jpegs(3))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.disposition, Disposition::AbortedByUser);
        assert_eq!(harness.detector.enroll_calls().len(), 1);
        assert_eq!(
            harness.notifier.last_notification().unwrap().message,
            "Enrolled 1 photo (stopped early)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_timeout_stops_batch() {
        let harness = Harness::new(ScriptedDecisions::never_answering());
        harness.detector.set_accelerator(true);
        harness.detector.push_response(EnrollStatus::Error, true);
        let orchestrator = harness.orchestrator(EnrollmentConfig {
            decision_timeout_secs: Some(30),
            ..Default::default()
        });
        orchestrator.refresh_acceleration().await.unwrap();

        let summary = orchestrator
            .submit("alice", fixtures::jpegs(2))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.disposition, Disposition::AbortedByUser);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(harness.decisions.prompts().len(), 1);
        let last = harness.notifier.last_notification().unwrap();
        assert_eq!(last.severity, Severity::Warning);
        assert_eq!(last.message, "Upload cancelled");
    }
}
