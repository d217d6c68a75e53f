//! Types exchanged with the presentation layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Severity of an operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

/// A single operator notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// Progress of a running batch. `done` counts dispatched items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_id: Uuid,
    pub done: usize,
    pub total: usize,
}

/// Question put to the operator after accelerated processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPrompt {
    pub batch_id: Uuid,
    pub person_name: String,
    /// Photos not yet sent.
    pub remaining: usize,
    pub enrolled: usize,
    pub errors: usize,
}

/// Errors from the decision channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// The presentation side went away before answering.
    #[error("decision channel closed")]
    ChannelClosed,

    /// A decision is already awaiting an answer.
    #[error("a decision is already pending for batch {0}")]
    AlreadyPending(Uuid),

    /// An answer arrived while nothing was pending.
    #[error("no decision is pending")]
    NoPendingDecision,

    /// An answer arrived for a batch other than the pending one.
    #[error("pending decision belongs to batch {pending}, not {answered}")]
    BatchMismatch { pending: Uuid, answered: Uuid },
}
