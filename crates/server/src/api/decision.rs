//! Operator decision channel and the enrollment status/decision handlers.
//!
//! A suspended batch publishes a `decision_required` message and parks on a
//! oneshot receiver; `POST /faces/enroll/decision` completes it.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use lookout_core::{DecisionChannel, DecisionError, DecisionPrompt};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use super::handlers::ErrorResponse;
use super::ws::WsBroadcaster;
use crate::state::AppState;

struct PendingSlot {
    prompt: DecisionPrompt,
    responder: oneshot::Sender<bool>,
}

/// Decision channel answered over HTTP.
///
/// At most one question is open at a time. A question whose waiter went
/// away (timeout, shutdown) counts as closed and may be replaced.
pub struct WsDecisionChannel {
    broadcaster: WsBroadcaster,
    pending: Mutex<Option<PendingSlot>>,
}

impl WsDecisionChannel {
    pub fn new(broadcaster: WsBroadcaster) -> Self {
        Self {
            broadcaster,
            pending: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingSlot>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The open question, if a batch is waiting for one.
    pub fn pending(&self) -> Option<DecisionPrompt> {
        self.slot()
            .as_ref()
            .filter(|slot| !slot.responder.is_closed())
            .map(|slot| slot.prompt.clone())
    }

    /// Answer the open question for `batch_id`.
    pub fn answer(&self, batch_id: Uuid, resume: bool) -> Result<(), DecisionError> {
        let slot = {
            let mut pending = self.slot();
            match pending.take() {
                Some(slot) if slot.responder.is_closed() => {
                    return Err(DecisionError::NoPendingDecision)
                }
                Some(slot) if slot.prompt.batch_id != batch_id => {
                    let pending_id = slot.prompt.batch_id;
                    *pending = Some(slot);
                    return Err(DecisionError::BatchMismatch {
                        pending: pending_id,
                        answered: batch_id,
                    });
                }
                Some(slot) => slot,
                None => return Err(DecisionError::NoPendingDecision),
            }
        };

        slot.responder
            .send(resume)
            .map_err(|_| DecisionError::NoPendingDecision)?;
        self.broadcaster.decision_resolved(batch_id, resume);
        info!(
            "Batch {}: operator chose to {}",
            batch_id,
            if resume { "continue" } else { "stop" }
        );
        Ok(())
    }
}

#[async_trait]
impl DecisionChannel for WsDecisionChannel {
    async fn request_decision(&self, prompt: DecisionPrompt) -> Result<bool, DecisionError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.slot();
            if let Some(existing) = pending.as_ref() {
                if !existing.responder.is_closed() {
                    return Err(DecisionError::AlreadyPending(existing.prompt.batch_id));
                }
            }
            *pending = Some(PendingSlot {
                prompt: prompt.clone(),
                responder: tx,
            });
        }

        self.broadcaster.decision_required(&prompt);
        rx.await.map_err(|_| DecisionError::ChannelClosed)
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EnrollmentStatusResponse {
    pub active: bool,
    pub accelerated: bool,
    pub pending_decision: Option<DecisionPrompt>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub batch_id: Uuid,
    #[serde(rename = "continue")]
    pub resume: bool,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub batch_id: Uuid,
    #[serde(rename = "continue")]
    pub resume: bool,
}

/// GET /api/v1/faces/enroll/status
pub async fn enrollment_status(State(state): State<Arc<AppState>>) -> Json<EnrollmentStatusResponse> {
    let orchestrator = state.orchestrator();
    Json(EnrollmentStatusResponse {
        active: orchestrator.is_active(),
        accelerated: orchestrator.is_accelerated(),
        pending_decision: state.decisions().pending(),
    })
}

/// POST /api/v1/faces/enroll/decision
///
/// Resolve the degraded-mode question of a suspended batch.
pub async fn submit_decision(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.decisions().answer(body.batch_id, body.resume) {
        Ok(()) => Ok(Json(DecisionResponse {
            batch_id: body.batch_id,
            resume: body.resume,
        })),
        Err(e) => {
            warn!("Rejected decision for batch {}: {}", body.batch_id, e);
            let status = match e {
                DecisionError::NoPendingDecision | DecisionError::ChannelClosed => {
                    StatusCode::NOT_FOUND
                }
                DecisionError::BatchMismatch { .. } | DecisionError::AlreadyPending(_) => {
                    StatusCode::CONFLICT
                }
            };
            Err((status, Json(ErrorResponse::new(e.to_string()))))
        }
    }
}
