//! Event sink that records everything it receives.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::queue::{EventSink, JobId, JobStatus, QueueEvent};

/// Records published events in order for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueEvent>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events referring to `job_id`.
    pub fn events_for(&self, job_id: JobId) -> Vec<QueueEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.job_id() == Some(job_id))
            .collect()
    }

    /// Progress percentages published for `job_id`, in order.
    pub fn progress_for(&self, job_id: JobId) -> Vec<u8> {
        self.events_for(job_id)
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::JobProgress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }

    /// Terminal status changes, in the order they were published.
    pub fn terminal_statuses(&self) -> Vec<(JobId, JobStatus)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::JobStatusChanged { job_id, status } if status.is_terminal() => {
                    Some((job_id, status))
                }
                _ => None,
            })
            .collect()
    }

    /// Highest number of jobs that were converting at the same time,
    /// according to the published status changes.
    pub fn max_concurrent_conversions(&self) -> usize {
        let mut converting = 0usize;
        let mut max = 0usize;
        for event in self.events() {
            if let QueueEvent::JobStatusChanged { status, .. } = event {
                match status {
                    JobStatus::Converting => {
                        converting += 1;
                        max = max.max(converting);
                    }
                    JobStatus::Completed | JobStatus::Failed => {
                        converting = converting.saturating_sub(1);
                    }
                    JobStatus::Pending => {}
                }
            }
        }
        max
    }

    /// Waits until `predicate` holds for the recorded events.
    ///
    /// Returns false if `timeout` elapses first.
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&[QueueEvent]) -> bool,
    {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                {
                    let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
                    if predicate(&events) {
                        return;
                    }
                }

                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Waits until `count` jobs reached a terminal status.
    pub async fn wait_for_terminal(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |events| {
            events
                .iter()
                .filter(|event| {
                    matches!(
                        event,
                        QueueEvent::JobStatusChanged { status, .. } if status.is_terminal()
                    )
                })
                .count()
                >= count
        })
        .await
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: QueueEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_until_sees_later_events() {
        let sink = Arc::new(RecordingSink::new());
        let job_id = JobId::new();

        let publisher = Arc::clone(&sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(QueueEvent::JobStatusChanged {
                job_id,
                status: JobStatus::Completed,
            });
        });

        assert!(sink.wait_for_terminal(1, Duration::from_secs(2)).await);
        assert_eq!(sink.terminal_statuses(), vec![(job_id, JobStatus::Completed)]);
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let sink = RecordingSink::new();
        assert!(!sink.wait_for_terminal(1, Duration::from_millis(20)).await);
    }

    #[test]
    fn test_max_concurrent_conversions() {
        let sink = RecordingSink::new();
        let (a, b) = (JobId::new(), JobId::new());
        for (job_id, status) in [
            (a, JobStatus::Converting),
            (a, JobStatus::Completed),
            (b, JobStatus::Converting),
            (b, JobStatus::Failed),
        ] {
            sink.publish(QueueEvent::JobStatusChanged { job_id, status });
        }
        assert_eq!(sink.max_concurrent_conversions(), 1);
    }
}
