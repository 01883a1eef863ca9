//! Configuration for the queue manager.

use serde::{Deserialize, Serialize};

/// Queue manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Extension of the target container, without the leading dot.
    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    /// Source extensions replaced by the target extension when naming outputs.
    /// Any other name gets the target extension appended.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Upper bound for a single conversion. `None` waits forever.
    #[serde(default = "default_conversion_timeout")]
    pub conversion_timeout_secs: Option<u64>,

    /// Number of finished jobs kept for retrieval; oldest are evicted first.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Rough per-job duration used for the remaining time estimate.
    #[serde(default = "default_estimated_minutes_per_job")]
    pub estimated_minutes_per_job: u64,
}

fn default_target_extension() -> String {
    "mp4".to_string()
}

fn default_source_extensions() -> Vec<String> {
    ["mkv", "webm", "avi", "mov", "mp4", "m4v", "ts"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_conversion_timeout() -> Option<u64> {
    Some(3600) // 1 hour
}

fn default_history_limit() -> usize {
    100
}

fn default_estimated_minutes_per_job() -> u64 {
    2
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            target_extension: default_target_extension(),
            source_extensions: default_source_extensions(),
            conversion_timeout_secs: default_conversion_timeout(),
            history_limit: default_history_limit(),
            estimated_minutes_per_job: default_estimated_minutes_per_job(),
        }
    }
}

impl QueueConfig {
    /// Sets the target container extension.
    pub fn with_target_extension(mut self, extension: impl Into<String>) -> Self {
        self.target_extension = extension.into();
        self
    }

    /// Sets the conversion timeout in seconds, or disables it.
    pub fn with_conversion_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.conversion_timeout_secs = timeout_secs;
        self
    }

    /// Sets the number of finished jobs kept in history.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
