//! Enrollment batch lifecycle integration tests.
//!
//! These tests drive the orchestrator end to end against the mock detector:
//! validate -> dispatch -> (decision) -> summary

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lookout_core::{
    testing::{fixtures, MockDetector, RecordingNotifier, ScriptedDecisions},
    BatchProgress, DecisionChannel, Disposition, EnrollStatus, EnrollmentConfig,
    EnrollmentOrchestrator, EnrollmentService, NotificationSink, PhotoItem, ProgressSink,
    Severity,
};

const MIB: usize = 1024 * 1024;

/// Test helper wiring the orchestrator to recording collaborators.
struct TestHarness {
    detector: Arc<MockDetector>,
    notifier: Arc<RecordingNotifier>,
    decisions: Arc<ScriptedDecisions>,
    refreshes: Arc<AtomicUsize>,
    orchestrator: Arc<EnrollmentOrchestrator>,
}

impl TestHarness {
    async fn new(accelerated: bool, decisions: ScriptedDecisions) -> Self {
        let detector = Arc::new(MockDetector::new());
        detector.set_accelerator(accelerated);
        let notifier = Arc::new(RecordingNotifier::new());
        let decisions = Arc::new(decisions);
        let refreshes = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&refreshes);
        let orchestrator = EnrollmentOrchestrator::new(
            EnrollmentConfig::default(),
            Arc::clone(&detector) as Arc<dyn EnrollmentService>,
            Arc::clone(&notifier) as Arc<dyn NotificationSink>,
            Arc::clone(&notifier) as Arc<dyn ProgressSink>,
            Arc::clone(&decisions) as Arc<dyn DecisionChannel>,
        )
        .with_refresh_callback(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        orchestrator
            .refresh_acceleration()
            .await
            .expect("mock detector is online");

        Self {
            detector,
            notifier,
            decisions,
            refreshes,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn final_message(&self) -> (Severity, String) {
        let last = self
            .notifier
            .last_notification()
            .expect("batch should report");
        (last.severity, last.message)
    }

    fn dispatched_files(&self) -> Vec<String> {
        self.detector
            .enroll_calls()
            .into_iter()
            .map(|c| c.file_name)
            .collect()
    }
}

#[tokio::test]
async fn test_all_ok_batch() {
    let harness = TestHarness::new(true, ScriptedDecisions::new()).await;

    let summary = harness
        .orchestrator
        .submit("alice", fixtures::jpegs(2))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.enrolled, 2);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.disposition, Disposition::Completed);
    assert!(harness.decisions.prompts().is_empty());
    assert_eq!(
        harness.final_message(),
        (Severity::Success, "Enrolled 2 photos".to_string())
    );
    assert_eq!(harness.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.notifier.notifications().len(), 1);
}

#[tokio::test]
async fn test_progress_sequence() {
    let harness = TestHarness::new(false, ScriptedDecisions::new()).await;
    harness.detector.push_response(EnrollStatus::Error, false);

    let summary = harness
        .orchestrator
        .submit("alice", fixtures::jpegs(4))
        .await
        .unwrap()
        .unwrap();

    let updates = harness.notifier.progress_updates();
    let expected: Vec<BatchProgress> = (1..=4)
        .map(|done| BatchProgress {
            batch_id: summary.batch_id,
            done,
            total: 4,
        })
        .collect();
    assert_eq!(updates, expected);
}

#[tokio::test]
async fn test_acceleration_failure_waits_for_decision() {
    let (decisions, answer) = ScriptedDecisions::manual();
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Ok, true);

    let orchestrator = Arc::clone(&harness.orchestrator);
    let run = tokio::spawn(async move { orchestrator.submit("bob", fixtures::jpegs(3)).await });

    harness.decisions.wait_for_prompt().await;
    assert_eq!(harness.detector.enroll_calls().len(), 1);
    assert!(harness.orchestrator.is_active());

    let prompt = &harness.decisions.prompts()[0];
    assert_eq!(prompt.person_name, "bob");
    assert_eq!(prompt.remaining, 2);
    assert_eq!(prompt.enrolled, 1);
    assert_eq!(prompt.errors, 0);

    answer.send(true).unwrap();
    let summary = run.await.unwrap().unwrap().unwrap();

    assert_eq!(summary.enrolled, 3);
    assert_eq!(harness.decisions.prompts().len(), 1);
    assert!(!harness.orchestrator.is_active());
}

#[tokio::test]
async fn test_stop_freezes_counters() {
    let decisions = ScriptedDecisions::new();
    decisions.push_answer(false);
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Ok, false);
    harness.detector.push_response(EnrollStatus::Error, true);

    let summary = harness
        .orchestrator
        .submit("carol", fixtures::jpegs(3))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.disposition, Disposition::AbortedByUser);
    assert_eq!(summary.enrolled, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(
        harness.dispatched_files(),
        vec!["photo_0.jpg".to_string(), "photo_1.jpg".to_string()]
    );
    assert_eq!(
        harness.final_message(),
        (Severity::Success, "Enrolled 1 photo (stopped early)".to_string())
    );
    assert_eq!(harness.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_continue_switches_to_degraded() {
    let decisions = ScriptedDecisions::new();
    decisions.push_answer(true);
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Ok, false);
    harness.detector.push_response(EnrollStatus::Error, true);
    harness.detector.push_response(EnrollStatus::Ok, false);

    let summary = harness
        .orchestrator
        .submit("dave", fixtures::jpegs(3))
        .await
        .unwrap()
        .unwrap();

    let modes: Vec<bool> = harness
        .detector
        .enroll_calls()
        .iter()
        .map(|c| c.acceleration_requested)
        .collect();
    assert_eq!(modes, vec![true, true, false]);
    assert_eq!(summary.enrolled, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.disposition, Disposition::Completed);
    assert_eq!(
        harness.final_message(),
        (Severity::Success, "Enrolled 2 photos (1 failed)".to_string())
    );
}

#[tokio::test]
async fn test_later_flags_ignored_after_continue() {
    let decisions = ScriptedDecisions::new();
    decisions.push_answer(true);
    decisions.push_answer(false);
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Ok, true);
    harness.detector.push_response(EnrollStatus::Ok, true);
    harness.detector.push_response(EnrollStatus::Ok, true);

    let summary = harness
        .orchestrator
        .submit("erin", fixtures::jpegs(4))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(harness.decisions.prompts().len(), 1);
    assert_eq!(summary.enrolled, 4);
    assert_eq!(summary.disposition, Disposition::Completed);
}

#[tokio::test]
async fn test_stop_with_nothing_enrolled() {
    let decisions = ScriptedDecisions::new();
    decisions.push_answer(false);
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Error, true);

    harness
        .orchestrator
        .submit("frank", fixtures::jpegs(2))
        .await
        .unwrap();

    assert_eq!(
        harness.final_message(),
        (Severity::Warning, "Upload cancelled".to_string())
    );
    assert_eq!(harness.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_faces_detected() {
    let harness = TestHarness::new(false, ScriptedDecisions::new()).await;
    harness.detector.push_response(EnrollStatus::Error, false);
    harness.detector.push_response(EnrollStatus::Error, false);

    harness
        .orchestrator
        .submit("grace", fixtures::jpegs(2))
        .await
        .unwrap();

    assert_eq!(
        harness.final_message(),
        (Severity::Error, "No faces detected in 2 photos".to_string())
    );
    assert_eq!(harness.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_file_never_dispatched() {
    let harness = TestHarness::new(false, ScriptedDecisions::new()).await;
    let files = vec![
        fixtures::photo("small.jpg", 1024),
        fixtures::photo("huge.jpg", 10 * MIB + 1),
        fixtures::photo("limit.jpg", 10 * MIB),
    ];

    let summary = harness
        .orchestrator
        .submit("heidi", files)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(
        harness.dispatched_files(),
        vec!["small.jpg".to_string(), "limit.jpg".to_string()]
    );
    assert_eq!(
        harness.notifier.messages_with(Severity::Warning),
        vec!["Skipped huge.jpg: larger than 10 MB".to_string()]
    );
}

#[tokio::test]
async fn test_all_invalid_is_silent() {
    let harness = TestHarness::new(false, ScriptedDecisions::new()).await;
    let files: Vec<PhotoItem> = vec![
        fixtures::text_file("notes.txt"),
        fixtures::photo("huge.jpg", 11 * MIB),
    ];

    let result = harness.orchestrator.submit("ivan", files).await.unwrap();

    assert!(result.is_none());
    assert!(harness.detector.enroll_calls().is_empty());
    assert!(harness.notifier.progress_updates().is_empty());
    let notifications = harness.notifier.notifications();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n.severity == Severity::Warning));
    assert!(!harness.orchestrator.is_active());
}

#[tokio::test]
async fn test_transport_failure_does_not_abort() {
    let harness = TestHarness::new(false, ScriptedDecisions::new()).await;
    harness
        .detector
        .push_error(lookout_core::DetectorError::ConnectionFailed("reset".to_string()));

    let summary = harness
        .orchestrator
        .submit("judy", fixtures::jpegs(3))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.enrolled, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(
        harness.final_message(),
        (Severity::Success, "Enrolled 2 photos (1 failed)".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_submit_rejected() {
    let (decisions, answer) = ScriptedDecisions::manual();
    let harness = TestHarness::new(true, decisions).await;
    harness.detector.push_response(EnrollStatus::Ok, true);

    let orchestrator = Arc::clone(&harness.orchestrator);
    let run = tokio::spawn(async move { orchestrator.submit("kim", fixtures::jpegs(2)).await });
    harness.decisions.wait_for_prompt().await;

    let second = harness
        .orchestrator
        .submit("leo", fixtures::jpegs(1))
        .await;
    assert!(matches!(
        second,
        Err(lookout_core::EnrollmentError::BatchInProgress)
    ));

    answer.send(false).unwrap();
    run.await.unwrap().unwrap();

    let third = harness
        .orchestrator
        .submit("leo", fixtures::jpegs(1))
        .await
        .unwrap();
    assert!(third.is_some());
}
