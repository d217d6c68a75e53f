//! Operator-facing collaborators of the enrollment orchestrator.
//!
//! Notifications and progress are fire-and-forget. Decisions block the
//! batch until the operator answers exactly once.

mod traits;
mod types;

pub use traits::{DecisionChannel, ListRefreshCallback, NotificationSink, ProgressSink};
pub use types::{BatchProgress, DecisionError, DecisionPrompt, Notification, Severity};
