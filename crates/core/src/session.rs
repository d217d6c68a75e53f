//! Process-lifetime operator flags.
//!
//! Created once at startup and never persisted; a restart resets them.

use serde::{Deserialize, Serialize};

/// Operator flags shared by every dashboard client of this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// The operator has dismissed the "no accelerator available" hint.
    pub acceleration_hint_dismissed: bool,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SessionFlagsUpdate {
    #[serde(default)]
    pub acceleration_hint_dismissed: Option<bool>,
}

impl SessionFlags {
    pub fn apply(&mut self, update: SessionFlagsUpdate) {
        if let Some(dismissed) = update.acceleration_hint_dismissed {
            self.acceleration_hint_dismissed = dismissed;
        }
    }
}
