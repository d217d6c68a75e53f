//! Notification and progress sink that records everything it receives.

use std::sync::Mutex;

use crate::notify::{BatchProgress, Notification, NotificationSink, ProgressSink, Severity};

/// Records notifications and progress updates for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
    progress: Mutex<Vec<BatchProgress>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.notifications.lock().unwrap().last().cloned()
    }

    /// Messages of notifications with the given severity.
    pub fn messages_with(&self, severity: Severity) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.severity == severity)
            .map(|n| n.message.clone())
            .collect()
    }

    /// All progress updates, oldest first.
    pub fn progress_updates(&self) -> Vec<BatchProgress> {
        self.progress.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
        self.progress.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

impl ProgressSink for RecordingNotifier {
    fn progress(&self, update: BatchProgress) {
        self.progress.lock().unwrap().push(update);
    }
}
