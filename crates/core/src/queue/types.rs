//! Types for the queue module.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::QueueError;
use super::naming::content_type_for;

/// Per-file size cap: 2 GiB.
pub const MAX_SOURCE_SIZE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Opaque job identifier, assigned at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    Pending,
    /// Currently handed to the engine.
    Converting,
    /// Converted; the artifact can be retrieved.
    Completed,
    /// Conversion failed; see the error detail.
    Failed,
}

impl JobStatus {
    /// Whether the job has settled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Converting => "converting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file handed to [`QueueManager::submit`](super::QueueManager::submit).
///
/// `size_bytes` is the declared length used for validation. Callers that
/// stop buffering an oversized upload still report its full size here.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Creates a source file whose declared size is the buffer length.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("buffered", &self.bytes.len())
            .finish()
    }
}

/// A job as tracked by the queue manager.
pub(crate) struct Job {
    pub id: JobId,
    pub source_name: String,
    /// Taken when the job is handed to the engine.
    pub source_bytes: Option<Vec<u8>>,
    pub size_bytes: u64,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub output_name: Option<String>,
    pub result_bytes: Option<Bytes>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(file: SourceFile) -> Self {
        Self {
            id: JobId::new(),
            source_name: file.name,
            source_bytes: Some(file.bytes),
            size_bytes: file.size_bytes,
            status: JobStatus::Pending,
            progress_percent: 0,
            output_name: None,
            result_bytes: None,
            error_detail: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Marks the job converting and hands out its source bytes.
    pub fn begin(&mut self, output_name: String) -> Vec<u8> {
        self.status = JobStatus::Converting;
        self.progress_percent = 0;
        self.output_name = Some(output_name);
        self.started_at = Some(Utc::now());
        self.source_bytes.take().unwrap_or_default()
    }

    /// Raises the displayed progress. Returns false when the value would not
    /// move forward or the job is not converting.
    pub fn advance(&mut self, percent: u8) -> bool {
        if self.status != JobStatus::Converting || percent <= self.progress_percent {
            return false;
        }
        self.progress_percent = percent.min(100);
        true
    }

    pub fn complete(&mut self, output: Bytes) {
        self.status = JobStatus::Completed;
        self.progress_percent = 100;
        self.result_bytes = Some(output);
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, detail: String) {
        self.status = JobStatus::Failed;
        self.error_detail = Some(detail);
        self.result_bytes = None;
        self.source_bytes = None;
        self.finished_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            name: self.source_name.clone(),
            size_bytes: self.size_bytes,
            size_display: format_file_size(self.size_bytes),
            status: self.status,
            progress_percent: self.progress_percent,
            output_name: self.output_name.clone(),
            error: self.error_detail.clone(),
            download_available: self.status == JobStatus::Completed,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    pub fn artifact(&self) -> Result<ConversionArtifact, QueueError> {
        match (self.status, &self.result_bytes, &self.output_name) {
            (JobStatus::Completed, Some(bytes), Some(file_name)) => Ok(ConversionArtifact {
                job_id: self.id,
                content_type: content_type_for(file_name).to_string(),
                file_name: file_name.clone(),
                bytes: bytes.clone(),
            }),
            (status, _, _) => Err(QueueError::NotReady {
                job_id: self.id,
                status,
            }),
        }
    }
}

/// Serializable view of a job for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub size_bytes: u64,
    /// Human-readable size, e.g. "2 GB".
    pub size_display: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub download_available: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A completed conversion ready for download.
#[derive(Clone)]
pub struct ConversionArtifact {
    pub job_id: JobId,
    pub file_name: String,
    pub content_type: String,
    /// Exactly the bytes produced by the engine. Cheap to clone.
    pub bytes: Bytes,
}

impl fmt::Debug for ConversionArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionArtifact")
            .field("job_id", &self.job_id)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Readiness of the engine as seen by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    /// Initialization has not finished yet.
    Loading,
    /// Conversions can run.
    Ready,
    /// Initialization failed; nothing will be converted until restart.
    Failed { reason: String },
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Queue counters for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs in the active queue, including the one converting.
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
    /// `queued` times the configured per-job estimate; `None` when idle.
    pub estimated_remaining_minutes: Option<u64>,
}

/// Formats a byte count as `Bytes`, `KB`, `MB` or `GB`, rounded to a whole
/// number of the largest unit that fits.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor: u64 = 1;
    while unit < UNITS.len() - 1 && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = (bytes as f64 / divisor as f64).round() as u64;
    format!("{} {}", value, UNITS[unit])
}
