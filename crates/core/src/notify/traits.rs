//! Collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use super::{BatchProgress, DecisionError, DecisionPrompt, Notification};

/// Callback that reloads the externally-owned enrolled people list.
pub type ListRefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Fire-and-forget operator messages. No acknowledgment.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fire-and-forget batch progress.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, update: BatchProgress);
}

/// Blocking operator question with exactly one boolean answer.
#[async_trait]
pub trait DecisionChannel: Send + Sync {
    /// Publish `prompt` and wait for the answer.
    ///
    /// `Ok(true)` continues the batch in degraded mode, `Ok(false)` stops it.
    async fn request_decision(&self, prompt: DecisionPrompt) -> Result<bool, DecisionError>;
}
