//! Error types for the queue module.

use thiserror::Error;

use super::types::{JobId, JobStatus};

/// Errors returned by the queue manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Submitted file exceeds the per-file size cap.
    #[error("File {name} is too large ({size_bytes} bytes, maximum is {max_bytes} bytes)")]
    FileTooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    /// The job exists but has no result to hand out.
    #[error("Job {job_id} is not ready (status: {status})")]
    NotReady { job_id: JobId, status: JobStatus },

    /// No job with this id in the queue or history.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The job is still pending or converting.
    #[error("Job {0} is still active")]
    JobActive(JobId),

    /// The engine could not be initialized; nothing will be converted.
    #[error("Engine initialization failed: {0}")]
    EngineInitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = QueueError::FileTooLarge {
            name: "huge.mkv".to_string(),
            size_bytes: 3,
            max_bytes: 2,
        };
        assert_eq!(
            err.to_string(),
            "File huge.mkv is too large (3 bytes, maximum is 2 bytes)"
        );

        let id = JobId::new();
        let err = QueueError::NotReady {
            job_id: id,
            status: JobStatus::Converting,
        };
        assert_eq!(
            err.to_string(),
            format!("Job {} is not ready (status: converting)", id)
        );
    }
}
