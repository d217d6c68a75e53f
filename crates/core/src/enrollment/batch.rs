//! Batch state and the suspended-decision continuation.

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::detector::EnrollmentService;
use crate::metrics::{ENROLLMENT_DISPATCH_DURATION, ENROLLMENT_ITEMS};
use crate::notify::{BatchProgress, DecisionPrompt, ProgressSink};

use super::types::{BatchSummary, Disposition, ItemOutcome, ItemResult, PhotoItem, ProcessingMode};

/// Photos for one person plus the dispatch cursor and running counters.
#[derive(Debug)]
pub struct EnrollmentBatch {
    id: Uuid,
    person_name: String,
    items: Vec<PhotoItem>,
    /// Index of the next photo to send.
    cursor: usize,
    mode: ProcessingMode,
    enrolled: usize,
    errors: usize,
}

/// Where `advance` stopped.
#[derive(Debug)]
pub enum BatchStep {
    /// Every photo was dispatched.
    Finished(BatchSummary),
    /// Accelerated processing failed with photos remaining.
    Suspended(PendingDecision),
}

impl EnrollmentBatch {
    pub fn new(person_name: impl Into<String>, items: Vec<PhotoItem>, mode: ProcessingMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            person_name: person_name.into(),
            items,
            cursor: 0,
            mode,
            enrolled: 0,
            errors: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn person_name(&self) -> &str {
        &self.person_name
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn enrolled(&self) -> usize {
        self.enrolled
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Photos not yet sent.
    pub fn remaining(&self) -> &[PhotoItem] {
        &self.items[self.cursor..]
    }

    /// Dispatch photos in order until the batch is exhausted or an
    /// acceleration failure needs an operator decision.
    pub async fn advance(
        mut self,
        service: &dyn EnrollmentService,
        progress: &dyn ProgressSink,
    ) -> BatchStep {
        while self.cursor < self.items.len() {
            let accelerated = self.mode == ProcessingMode::Accelerated;
            let photo = &self.items[self.cursor];

            let started = Instant::now();
            let response = service
                .enroll_photo(&self.person_name, photo, accelerated)
                .await;
            ENROLLMENT_DISPATCH_DURATION
                .with_label_values(&[self.mode.as_str()])
                .observe(started.elapsed().as_secs_f64());

            let result = ItemResult::from_call(&response);
            match &response {
                Ok(r) if !r.is_ok() => debug!(
                    "Batch {}: {} rejected: {}",
                    self.id,
                    photo.file_name(),
                    r.message.as_deref().unwrap_or("no reason given")
                ),
                Err(e) => debug!("Batch {}: {} not delivered: {}", self.id, photo.file_name(), e),
                _ => debug!("Batch {}: {} enrolled", self.id, photo.file_name()),
            }
            self.record(result);

            progress.progress(BatchProgress {
                batch_id: self.id,
                done: self.cursor,
                total: self.items.len(),
            });

            if result.acceleration_failed && accelerated && self.cursor < self.items.len() {
                info!(
                    "Batch {}: accelerated processing failed, {} photo(s) remaining",
                    self.id,
                    self.items.len() - self.cursor
                );
                return BatchStep::Suspended(PendingDecision { batch: self });
            }
        }

        BatchStep::Finished(self.finish(Disposition::Completed))
    }

    fn record(&mut self, result: ItemResult) {
        ENROLLMENT_ITEMS
            .with_label_values(&[result.outcome.as_str()])
            .inc();
        match result.outcome {
            ItemOutcome::Enrolled => self.enrolled += 1,
            ItemOutcome::Rejected | ItemOutcome::TransportFailed => self.errors += 1,
        }
        self.cursor += 1;
    }

    fn finish(self, disposition: Disposition) -> BatchSummary {
        BatchSummary {
            batch_id: self.id,
            person_name: self.person_name,
            enrolled: self.enrolled,
            errors: self.errors,
            total: self.items.len(),
            dispatched: self.cursor,
            disposition,
        }
    }
}

/// A batch suspended after an acceleration failure.
///
/// Holds the batch (and therefore the unsent photos and counters) until
/// [`resolve`](Self::resolve) consumes it with the operator's answer.
#[derive(Debug)]
pub struct PendingDecision {
    batch: EnrollmentBatch,
}

/// Result of resolving a [`PendingDecision`].
#[derive(Debug)]
pub enum Resolution {
    /// Continue from the next unsent photo in degraded mode.
    Resumed(EnrollmentBatch),
    /// The operator stopped the batch.
    Aborted(BatchSummary),
}

impl PendingDecision {
    pub fn batch_id(&self) -> Uuid {
        self.batch.id
    }

    pub fn remaining(&self) -> &[PhotoItem] {
        self.batch.remaining()
    }

    pub fn enrolled(&self) -> usize {
        self.batch.enrolled
    }

    pub fn errors(&self) -> usize {
        self.batch.errors
    }

    /// Snapshot published to the operator.
    pub fn prompt(&self) -> DecisionPrompt {
        DecisionPrompt {
            batch_id: self.batch.id,
            person_name: self.batch.person_name.clone(),
            remaining: self.batch.remaining().len(),
            enrolled: self.batch.enrolled,
            errors: self.batch.errors,
        }
    }

    /// Apply the operator's answer: `true` continues degraded, `false` stops.
    pub fn resolve(self, resume: bool) -> Resolution {
        let mut batch = self.batch;
        if resume {
            batch.mode = ProcessingMode::Degraded;
            Resolution::Resumed(batch)
        } else {
            Resolution::Aborted(batch.finish(Disposition::AbortedByUser))
        }
    }
}
