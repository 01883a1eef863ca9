//! Queue manager implementation.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{ConvertRequest, Engine, EngineError, EngineProgress};
use crate::metrics::{
    CONVERSIONS_TOTAL, CONVERSION_DURATION, JOBS_REJECTED, JOBS_SUBMITTED, QUEUE_DEPTH,
};

use super::config::QueueConfig;
use super::error::QueueError;
use super::events::{EventSink, QueueEvent};
use super::naming::derive_output_name;
use super::types::{
    format_file_size, ConversionArtifact, EngineStatus, Job, JobId, JobSnapshot, JobStatus,
    QueueStats, SourceFile, MAX_SOURCE_SIZE_BYTES,
};

/// Buffer size for engine progress ticks.
const PROGRESS_BUFFER_SIZE: usize = 64;

/// Mutable queue state. Only touched inside short critical sections that
/// never span an `.await`.
struct QueueState {
    engine: EngineStatus,
    /// True from the moment a job is handed to the engine until it settled.
    busy: bool,
    /// Pending jobs and the converting one (always the head), FIFO.
    active: VecDeque<Job>,
    /// Settled jobs, oldest first.
    history: VecDeque<Job>,
}

impl QueueState {
    fn find(&self, job_id: JobId) -> Option<&Job> {
        self.active
            .iter()
            .chain(self.history.iter())
            .find(|job| job.id == job_id)
    }
}

struct Inner<E> {
    config: QueueConfig,
    engine: E,
    sink: Arc<dyn EventSink>,
    state: Mutex<QueueState>,
}

/// Converts submitted files one at a time through a single engine.
///
/// Cheap to clone; clones share the same queue. Methods that may start a
/// conversion spawn a Tokio task and must be called inside a runtime.
pub struct QueueManager<E: Engine> {
    inner: Arc<Inner<E>>,
}

impl<E: Engine> Clone for QueueManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Engine + 'static> QueueManager<E> {
    /// Creates a queue manager owning `engine`.
    ///
    /// Nothing is converted until [`start`](Self::start) has loaded the engine.
    pub fn new(config: QueueConfig, engine: E, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                engine,
                sink,
                state: Mutex::new(QueueState {
                    engine: EngineStatus::Loading,
                    busy: false,
                    active: VecDeque::new(),
                    history: VecDeque::new(),
                }),
            }),
        }
    }

    /// Returns the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Returns the name of the engine implementation.
    pub fn engine_name(&self) -> &str {
        self.inner.engine.name()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: QueueEvent) {
        self.inner.sink.publish(event);
    }

    /// Loads the engine and begins processing whatever is queued.
    ///
    /// A load failure is published once as [`QueueEvent::EngineFailed`] and
    /// leaves the queue halted for the lifetime of this manager.
    pub async fn start(&self) -> Result<(), QueueError> {
        match self.inner.engine.ensure_ready().await {
            Ok(()) => {
                {
                    let mut state = self.lock();
                    if state.engine == EngineStatus::Loading {
                        state.engine = EngineStatus::Ready;
                        info!(engine = self.inner.engine.name(), "Engine ready");
                        self.publish(QueueEvent::EngineReady);
                    }
                }
                self.process_next();
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    EngineError::InitFailed { reason } => reason,
                    other => other.to_string(),
                };

                let mut state = self.lock();
                if !matches!(state.engine, EngineStatus::Failed { .. }) {
                    error!(
                        engine = self.inner.engine.name(),
                        "Engine failed to load, conversions halted: {}", reason
                    );
                    state.engine = EngineStatus::Failed {
                        reason: reason.clone(),
                    };
                    self.publish(QueueEvent::EngineFailed {
                        detail: reason.clone(),
                    });
                }

                Err(QueueError::EngineInitFailed(reason))
            }
        }
    }

    /// Queues a batch of files.
    ///
    /// Oversized files are rejected individually; the rest of the batch is
    /// queued in order. Returns one outcome per file, in input order.
    pub fn submit(&self, files: Vec<SourceFile>) -> Vec<Result<JobId, QueueError>> {
        let mut outcomes = Vec::with_capacity(files.len());

        {
            let mut state = self.lock();

            for file in files {
                if file.size_bytes > MAX_SOURCE_SIZE_BYTES {
                    let err = QueueError::FileTooLarge {
                        name: file.name.clone(),
                        size_bytes: file.size_bytes,
                        max_bytes: MAX_SOURCE_SIZE_BYTES,
                    };
                    warn!(
                        name = %file.name,
                        size = %format_file_size(file.size_bytes),
                        "Rejected file: too large"
                    );
                    JOBS_REJECTED.with_label_values(&["file_too_large"]).inc();
                    self.publish(QueueEvent::JobRejected {
                        name: file.name,
                        size_bytes: file.size_bytes,
                        reason: err.to_string(),
                    });
                    outcomes.push(Err(err));
                    continue;
                }

                let job = Job::new(file);
                info!(
                    job_id = %job.id,
                    name = %job.source_name,
                    size = %format_file_size(job.size_bytes),
                    "Job queued"
                );
                JOBS_SUBMITTED.inc();
                self.publish(QueueEvent::JobCreated {
                    job_id: job.id,
                    name: job.source_name.clone(),
                    size_bytes: job.size_bytes,
                });
                outcomes.push(Ok(job.id));
                state.active.push_back(job);
            }

            QUEUE_DEPTH.set(state.active.len() as i64);
        }

        self.process_next();
        outcomes
    }

    /// Starts converting the head of the queue if the engine is idle and ready.
    ///
    /// The readiness checks and setting `busy` happen under one lock, so
    /// concurrent triggers can never start a second conversion.
    fn process_next(&self) {
        let (job_id, request) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            if state.busy || !state.engine.is_ready() {
                return;
            }
            let Some(job) = state.active.front_mut() else {
                return;
            };
            if job.status != JobStatus::Pending {
                return;
            }

            let output_name = derive_output_name(
                &job.source_name,
                &self.inner.config.target_extension,
                &self.inner.config.source_extensions,
            );
            let input_bytes = job.begin(output_name.clone());
            state.busy = true;

            info!(
                job_id = %job.id,
                input = %job.source_name,
                output = %output_name,
                "Conversion started"
            );
            self.publish(QueueEvent::JobStatusChanged {
                job_id: job.id,
                status: JobStatus::Converting,
            });

            (
                job.id,
                ConvertRequest {
                    input_name: job.source_name.clone(),
                    input_bytes,
                    output_name,
                },
            )
        };

        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_job(job_id, request).await;
        });
    }

    async fn run_job(self, job_id: JobId, request: ConvertRequest) {
        let start = Instant::now();

        // An engine panic surfaces as a JoinError instead of unwinding this task
        let worker = self.clone();
        let outcome = match tokio::spawn(async move {
            worker.convert_with_progress(job_id, request).await
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                error!(job_id = %job_id, "Engine panicked during conversion");
                Err(format!("Engine panicked during conversion: {}", e))
            }
            Err(e) => Err(format!("Conversion task was cancelled: {}", e)),
        };
        self.settle(job_id, outcome, start.elapsed());
        self.process_next();
    }

    /// Runs the engine, forwarding its progress ticks, bounded by the
    /// configured timeout. Returns the output or a failure detail.
    async fn convert_with_progress(
        &self,
        job_id: JobId,
        request: ConvertRequest,
    ) -> Result<Vec<u8>, String> {
        let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
        let timeout_secs = self.inner.config.conversion_timeout_secs;
        let conversion = self.inner.engine.convert(request, progress_tx);

        let conversion = async move {
            match timeout_secs {
                Some(secs) => {
                    match tokio::time::timeout(Duration::from_secs(secs), conversion).await {
                        Ok(result) => result.map_err(|e| e.detail()),
                        Err(_) => Err(format!("Conversion timed out after {} seconds", secs)),
                    }
                }
                None => conversion.await.map_err(|e| e.detail()),
            }
        };
        tokio::pin!(conversion);

        let outcome = loop {
            tokio::select! {
                biased;
                Some(progress) = progress_rx.recv() => self.record_progress(job_id, progress),
                outcome = &mut conversion => break outcome,
            }
        };

        // Ticks sent right before the engine returned
        while let Ok(progress) = progress_rx.try_recv() {
            self.record_progress(job_id, progress);
        }

        outcome
    }

    fn record_progress(&self, job_id: JobId, progress: EngineProgress) {
        let Some(percent) = progress.percent() else {
            return;
        };

        let mut state = self.lock();
        if let Some(job) = state.active.iter_mut().find(|job| job.id == job_id) {
            if job.advance(percent) {
                debug!(job_id = %job_id, percent, "Conversion progress");
                self.publish(QueueEvent::JobProgress { job_id, percent });
            }
        }
    }

    /// Records the outcome, moves the job to history and frees the engine.
    fn settle(&self, job_id: JobId, outcome: Result<Vec<u8>, String>, elapsed: Duration) {
        let mut guard = self.lock();
        let state = &mut *guard;

        let removed = state
            .active
            .iter()
            .position(|job| job.id == job_id)
            .and_then(|position| state.active.remove(position));

        if let Some(mut job) = removed {
            let outcome = outcome.and_then(|bytes| {
                if bytes.is_empty() {
                    Err("Engine produced an empty output".to_string())
                } else {
                    Ok(bytes)
                }
            });

            match outcome {
                Ok(bytes) => {
                    let output_size = bytes.len() as u64;
                    job.complete(Bytes::from(bytes));
                    info!(
                        job_id = %job_id,
                        output = job.output_name.as_deref().unwrap_or_default(),
                        size = %format_file_size(output_size),
                        duration_ms = elapsed.as_millis() as u64,
                        "Conversion completed"
                    );
                    CONVERSIONS_TOTAL.with_label_values(&["completed"]).inc();
                    CONVERSION_DURATION
                        .with_label_values(&["completed"])
                        .observe(elapsed.as_secs_f64());
                    self.publish(QueueEvent::JobStatusChanged {
                        job_id,
                        status: JobStatus::Completed,
                    });
                }
                Err(detail) => {
                    warn!(
                        job_id = %job_id,
                        name = %job.source_name,
                        duration_ms = elapsed.as_millis() as u64,
                        "Conversion failed: {}", detail
                    );
                    job.fail(detail.clone());
                    CONVERSIONS_TOTAL.with_label_values(&["failed"]).inc();
                    CONVERSION_DURATION
                        .with_label_values(&["failed"])
                        .observe(elapsed.as_secs_f64());
                    self.publish(QueueEvent::JobStatusChanged {
                        job_id,
                        status: JobStatus::Failed,
                    });
                    self.publish(QueueEvent::JobFailed { job_id, detail });
                }
            }

            state.history.push_back(job);
            while state.history.len() > self.inner.config.history_limit {
                if let Some(evicted) = state.history.pop_front() {
                    debug!(job_id = %evicted.id, "Evicted job from history");
                }
            }
        } else {
            warn!(job_id = %job_id, "Settled job is no longer in the queue");
        }

        state.busy = false;
        QUEUE_DEPTH.set(state.active.len() as i64);
    }

    /// Returns the artifact of a completed job.
    pub fn retrieve_result(&self, job_id: JobId) -> Result<ConversionArtifact, QueueError> {
        let state = self.lock();
        state
            .find(job_id)
            .ok_or(QueueError::NotFound(job_id))?
            .artifact()
    }

    /// Returns a snapshot of one job from the queue or history.
    pub fn job(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.lock().find(job_id).map(Job::snapshot)
    }

    /// Returns the active queue in FIFO order followed by the history.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let state = self.lock();
        state
            .active
            .iter()
            .chain(state.history.iter())
            .map(Job::snapshot)
            .collect()
    }

    /// Returns queue counters.
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        let queued = state.active.len();
        let count = |status: JobStatus| state.history.iter().filter(|j| j.status == status).count();

        QueueStats {
            queued,
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            estimated_remaining_minutes: (queued > 0)
                .then(|| queued as u64 * self.inner.config.estimated_minutes_per_job),
        }
    }

    /// Returns the engine readiness as seen by the queue.
    pub fn engine_status(&self) -> EngineStatus {
        self.lock().engine.clone()
    }

    /// Whether a conversion is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Drops a settled job from history, releasing its result.
    pub fn dismiss(&self, job_id: JobId) -> Result<JobSnapshot, QueueError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        if state.active.iter().any(|job| job.id == job_id) {
            return Err(QueueError::JobActive(job_id));
        }

        let job = state
            .history
            .iter()
            .position(|job| job.id == job_id)
            .and_then(|position| state.history.remove(position))
            .ok_or(QueueError::NotFound(job_id))?;

        debug!(job_id = %job_id, "Job dismissed");
        Ok(job.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEngine, RecordingSink};

    const WAIT: Duration = Duration::from_secs(5);

    async fn started(config: QueueConfig) -> (QueueManager<MockEngine>, MockEngine, Arc<RecordingSink>) {
        let engine = MockEngine::new();
        let sink = Arc::new(RecordingSink::new());
        let queue = QueueManager::new(config, engine.clone(), sink.clone());
        queue.start().await.unwrap();
        (queue, engine, sink)
    }

    fn file(name: &str) -> SourceFile {
        SourceFile::new(name, format!("contents of {}", name).into_bytes())
    }

    #[tokio::test]
    async fn test_single_job_completes() {
        let (queue, _engine, sink) = started(QueueConfig::default()).await;

        let outcomes = queue.submit(vec![file("movie.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();

        assert!(sink.wait_for_terminal(1, WAIT).await);
        let artifact = queue.retrieve_result(job_id).unwrap();
        assert_eq!(artifact.file_name, "movie.mp4");
        assert_eq!(artifact.content_type, "video/mp4");
        assert_eq!(
            artifact.bytes.to_vec(),
            MockEngine::expected_output(b"contents of movie.mkv")
        );

        let snapshot = queue.job(job_id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert!(snapshot.download_available);
        assert!(!queue.is_busy());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_rest_accepted() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.hold().await;

        let mut exact = file("exact.mkv");
        exact.size_bytes = MAX_SOURCE_SIZE_BYTES;
        let mut over = file("over.mkv");
        over.size_bytes = MAX_SOURCE_SIZE_BYTES + 1;

        let outcomes = queue.submit(vec![exact, over]);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1],
            Err(QueueError::FileTooLarge { ref name, size_bytes, .. })
                if name == "over.mkv" && size_bytes == MAX_SOURCE_SIZE_BYTES + 1
        ));

        let names: Vec<String> = queue.jobs().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["exact.mkv"]);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, QueueEvent::JobRejected { name, .. } if name == "over.mkv")));

        engine.release(1).await;
        assert!(sink.wait_for_terminal(1, WAIT).await);
    }

    #[tokio::test]
    async fn test_nothing_starts_before_engine_ready() {
        let engine = MockEngine::new();
        let sink = Arc::new(RecordingSink::new());
        let queue = QueueManager::new(QueueConfig::default(), engine.clone(), sink.clone());

        let outcomes = queue.submit(vec![file("a.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();

        tokio::task::yield_now().await;
        assert_eq!(queue.job(job_id).unwrap().status, JobStatus::Pending);
        assert_eq!(queue.engine_status(), EngineStatus::Loading);
        assert!(!queue.is_busy());

        queue.start().await.unwrap();
        assert!(sink.wait_for_terminal(1, WAIT).await);
        assert_eq!(queue.job(job_id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_retrieve_not_ready_and_not_found() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.hold().await;

        let outcomes = queue.submit(vec![file("a.mkv"), file("b.mkv")]);
        let a = *outcomes[0].as_ref().unwrap();
        let b = *outcomes[1].as_ref().unwrap();

        assert!(
            sink.wait_until(WAIT, |events| events.iter().any(|e| matches!(
                e,
                QueueEvent::JobStatusChanged { status: JobStatus::Converting, .. }
            )))
            .await
        );

        assert!(matches!(
            queue.retrieve_result(a),
            Err(QueueError::NotReady { status: JobStatus::Converting, .. })
        ));
        assert!(matches!(
            queue.retrieve_result(b),
            Err(QueueError::NotReady { status: JobStatus::Pending, .. })
        ));
        let unknown = JobId::new();
        assert_eq!(queue.retrieve_result(unknown).unwrap_err(), QueueError::NotFound(unknown));

        engine.release(2).await;
        assert!(sink.wait_for_terminal(2, WAIT).await);
    }

    #[tokio::test]
    async fn test_failure_does_not_stall_queue() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine
            .fail_on("broken.mkv", EngineError::conversion_failed("unsupported codec", None))
            .await;

        let outcomes = queue.submit(vec![file("broken.mkv"), file("fine.mkv")]);
        let broken = *outcomes[0].as_ref().unwrap();
        let fine = *outcomes[1].as_ref().unwrap();

        assert!(sink.wait_for_terminal(2, WAIT).await);
        assert_eq!(
            sink.terminal_statuses(),
            vec![(broken, JobStatus::Failed), (fine, JobStatus::Completed)]
        );

        let failed = queue.job(broken).unwrap();
        assert_eq!(failed.error.as_deref(), Some("Conversion failed: unsupported codec"));
        assert!(sink.events().iter().any(|e| matches!(
            e,
            QueueEvent::JobFailed { job_id, .. } if *job_id == broken
        )));
        assert!(queue.retrieve_result(fine).is_ok());
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.set_output("empty.mkv", Vec::new()).await;

        let outcomes = queue.submit(vec![file("empty.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();

        assert!(sink.wait_for_terminal(1, WAIT).await);
        let snapshot = queue.job(job_id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("Engine produced an empty output"));
    }

    #[tokio::test]
    async fn test_progress_clamped_and_monotonic() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine
            .set_progress_script(vec![0.1, 0.5, 0.3, f64::NAN, 1.7, 0.9])
            .await;

        let outcomes = queue.submit(vec![file("a.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();

        assert!(sink.wait_for_terminal(1, WAIT).await);
        assert_eq!(sink.progress_for(job_id), vec![10, 50, 100]);
    }

    #[tokio::test]
    async fn test_progress_resets_between_jobs() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.set_progress_script(vec![0.4, 1.0]).await;

        let outcomes = queue.submit(vec![file("a.mkv"), file("b.mkv")]);
        let b = *outcomes[1].as_ref().unwrap();

        assert!(sink.wait_for_terminal(2, WAIT).await);
        assert_eq!(sink.progress_for(b), vec![40, 100]);
    }

    #[tokio::test]
    async fn test_timeout_fails_job_and_unblocks() {
        let config = QueueConfig::default().with_conversion_timeout(Some(1));
        let (queue, engine, sink) = started(config).await;
        engine.hold().await;

        let outcomes = queue.submit(vec![file("stuck.mkv")]);
        let stuck = *outcomes[0].as_ref().unwrap();

        assert!(sink.wait_for_terminal(1, WAIT).await);
        let snapshot = queue.job(stuck).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Conversion timed out after 1 seconds")
        );
        assert_eq!(engine.staged_count(), 0, "working area cleaned on timeout");

        engine.release(1).await;
        let outcomes = queue.submit(vec![file("next.mkv")]);
        let next = *outcomes[0].as_ref().unwrap();
        assert!(sink.wait_for_terminal(2, WAIT).await);
        assert_eq!(queue.job(next).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_history_limit_evicts_oldest() {
        let config = QueueConfig::default().with_history_limit(2);
        let (queue, _engine, sink) = started(config).await;

        let ids: Vec<JobId> = queue
            .submit(vec![file("1.mkv"), file("2.mkv"), file("3.mkv")])
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert!(sink.wait_for_terminal(3, WAIT).await);
        assert_eq!(queue.retrieve_result(ids[0]).unwrap_err(), QueueError::NotFound(ids[0]));
        assert!(queue.retrieve_result(ids[1]).is_ok());
        assert!(queue.retrieve_result(ids[2]).is_ok());
    }

    #[tokio::test]
    async fn test_dismiss() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.hold().await;

        let outcomes = queue.submit(vec![file("a.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();
        assert_eq!(queue.dismiss(job_id).unwrap_err(), QueueError::JobActive(job_id));

        engine.release(1).await;
        assert!(sink.wait_for_terminal(1, WAIT).await);

        let snapshot = queue.dismiss(job_id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert!(queue.job(job_id).is_none());
        assert_eq!(queue.dismiss(job_id).unwrap_err(), QueueError::NotFound(job_id));
    }

    #[tokio::test]
    async fn test_stats() {
        let (queue, engine, sink) = started(QueueConfig::default()).await;
        engine.fail_on("bad.mkv", EngineError::staging("disk full")).await;

        assert_eq!(
            queue.stats(),
            QueueStats {
                queued: 0,
                completed: 0,
                failed: 0,
                estimated_remaining_minutes: None,
            }
        );

        engine.hold().await;
        queue.submit(vec![file("bad.mkv"), file("a.mkv"), file("b.mkv")]);
        let stats = queue.stats();
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.estimated_remaining_minutes, Some(6));

        engine.release(3).await;
        assert!(sink.wait_for_terminal(3, WAIT).await);
        let stats = queue.stats();
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_engine_init_failure_halts_processing() {
        let engine = MockEngine::new();
        engine.set_init_failure("wasm core missing").await;
        let sink = Arc::new(RecordingSink::new());
        let queue = QueueManager::new(QueueConfig::default(), engine.clone(), sink.clone());

        let err = queue.start().await.unwrap_err();
        assert_eq!(err, QueueError::EngineInitFailed("wasm core missing".to_string()));
        // A second start does not publish again
        assert!(queue.start().await.is_err());

        let outcomes = queue.submit(vec![file("a.mkv")]);
        let job_id = *outcomes[0].as_ref().unwrap();
        tokio::task::yield_now().await;

        assert_eq!(queue.job(job_id).unwrap().status, JobStatus::Pending);
        assert_eq!(
            queue.engine_status(),
            EngineStatus::Failed {
                reason: "wasm core missing".to_string()
            }
        );
        let failures = sink
            .events()
            .iter()
            .filter(|e| matches!(e, QueueEvent::EngineFailed { .. }))
            .count();
        assert_eq!(failures, 1);
        assert_eq!(engine.conversion_count().await, 0);
    }
}
