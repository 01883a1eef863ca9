//! Events published by the queue manager.

use serde::{Deserialize, Serialize};

use super::types::{JobId, JobStatus};

/// Status and progress notifications, keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// A file was accepted and queued.
    JobCreated {
        job_id: JobId,
        name: String,
        size_bytes: u64,
    },
    /// A file was refused at submission and never queued.
    JobRejected {
        name: String,
        size_bytes: u64,
        reason: String,
    },
    /// A job moved to a new lifecycle state.
    JobStatusChanged { job_id: JobId, status: JobStatus },
    /// The converting job made progress (0 - 100, never decreasing).
    JobProgress { job_id: JobId, percent: u8 },
    /// A job failed; follows its `failed` status change.
    JobFailed { job_id: JobId, detail: String },
    /// The engine finished loading.
    EngineReady,
    /// The engine could not be loaded. Published once; processing halts.
    EngineFailed { detail: String },
}

impl QueueEvent {
    /// The job this event refers to, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobCreated { job_id, .. }
            | Self::JobStatusChanged { job_id, .. }
            | Self::JobProgress { job_id, .. }
            | Self::JobFailed { job_id, .. } => Some(*job_id),
            Self::JobRejected { .. } | Self::EngineReady | Self::EngineFailed { .. } => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JobCreated { .. } => "job_created",
            Self::JobRejected { .. } => "job_rejected",
            Self::JobStatusChanged { .. } => "job_status_changed",
            Self::JobProgress { .. } => "job_progress",
            Self::JobFailed { .. } => "job_failed",
            Self::EngineReady => "engine_ready",
            Self::EngineFailed { .. } => "engine_failed",
        }
    }
}

/// Consumer of queue events, typically a presentation layer.
///
/// Called while the queue state is locked so that delivery order matches the
/// order of state transitions. Implementations must not block and must not
/// call back into the queue manager.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: QueueEvent);
}

/// Discards every event.
impl EventSink for () {
    fn publish(&self, _event: QueueEvent) {}
}

impl EventSink for tokio::sync::broadcast::Sender<QueueEvent> {
    fn publish(&self, event: QueueEvent) {
        // No receivers is fine
        let _ = self.send(event);
    }
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<QueueEvent> {
    fn publish(&self, event: QueueEvent) {
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let id = JobId::new();
        let json = serde_json::to_value(QueueEvent::JobProgress {
            job_id: id,
            percent: 42,
        })
        .unwrap();
        assert_eq!(json["type"], "job_progress");
        assert_eq!(json["job_id"], id.to_string());
        assert_eq!(json["percent"], 42);

        let json = serde_json::to_value(QueueEvent::JobStatusChanged {
            job_id: id,
            status: JobStatus::Completed,
        })
        .unwrap();
        assert_eq!(json["type"], "job_status_changed");
        assert_eq!(json["status"], "completed");

        let json = serde_json::to_value(QueueEvent::EngineReady).unwrap();
        assert_eq!(json["type"], "engine_ready");
    }

    #[test]
    fn test_event_job_id() {
        let id = JobId::new();
        assert_eq!(
            QueueEvent::JobFailed {
                job_id: id,
                detail: "x".to_string()
            }
            .job_id(),
            Some(id)
        );
        assert_eq!(QueueEvent::EngineReady.job_id(), None);
    }

    #[tokio::test]
    async fn test_channel_sinks() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.publish(QueueEvent::EngineReady);
        assert_eq!(rx.recv().await, Some(QueueEvent::EngineReady));

        let (tx, mut rx) = tokio::sync::broadcast::channel(4);
        tx.publish(QueueEvent::EngineReady);
        assert_eq!(rx.recv().await.unwrap(), QueueEvent::EngineReady);

        // Publishing without receivers must not panic
        let (tx, rx) = tokio::sync::broadcast::channel::<QueueEvent>(4);
        drop(rx);
        tx.publish(QueueEvent::EngineReady);
    }
}
