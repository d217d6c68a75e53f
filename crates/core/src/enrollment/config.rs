//! Enrollment configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for batch enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    /// Largest photo accepted into a batch, in bytes (inclusive).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// How long to wait for the operator after an acceleration failure.
    /// Unset means wait indefinitely. On expiry the batch stops.
    #[serde(default)]
    pub decision_timeout_secs: Option<u64>,
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            decision_timeout_secs: None,
        }
    }
}

impl EnrollmentConfig {
    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_secs.map(Duration::from_secs)
    }
}
