//! Mock engine for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock, Semaphore};

use crate::engine::{ConvertRequest, Engine, EngineError, EngineProgress};

/// A recorded conversion for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub input_name: String,
    pub output_name: String,
    pub input_len: usize,
    /// Whether the conversion returned output.
    pub success: bool,
}

/// Mock implementation of the [`Engine`] trait.
///
/// Provides controllable behavior for testing:
/// - Fail initialization or individual inputs
/// - Script progress ticks
/// - Hold conversions until released, to observe in-flight state
/// - Track the in-memory working area and concurrent conversions
///
/// Clones share all state, so a test can keep a handle after giving the
/// engine to a queue manager.
///
/// # Example
///
/// ```rust,ignore
/// use remuxq_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.hold().await;
///
/// // ... submit jobs, observe the converting one ...
///
/// engine.release(1).await;
/// assert_eq!(engine.max_concurrent(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockEngine {
    ready: Arc<AtomicBool>,
    init_calls: Arc<AtomicUsize>,
    init_error: Arc<RwLock<Option<String>>>,
    /// Failures keyed by input name.
    failures: Arc<RwLock<HashMap<String, EngineError>>>,
    /// Inputs whose next conversion panics.
    panics: Arc<Mutex<HashSet<String>>>,
    /// Output overrides keyed by input name.
    outputs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Ratios reported during each conversion.
    progress_script: Arc<RwLock<Vec<f64>>>,
    tick_delay: Arc<RwLock<Duration>>,
    /// When set, each conversion waits for a permit.
    gate: Arc<RwLock<Option<Arc<Semaphore>>>>,
    /// Staged file names and their sizes.
    working_area: Arc<Mutex<HashMap<String, usize>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine that converts everything successfully.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            init_calls: Arc::new(AtomicUsize::new(0)),
            init_error: Arc::new(RwLock::new(None)),
            failures: Arc::new(RwLock::new(HashMap::new())),
            panics: Arc::new(Mutex::new(HashSet::new())),
            outputs: Arc::new(RwLock::new(HashMap::new())),
            progress_script: Arc::new(RwLock::new(vec![0.25, 0.5, 0.75, 1.0])),
            tick_delay: Arc::new(RwLock::new(Duration::ZERO)),
            gate: Arc::new(RwLock::new(None)),
            working_area: Arc::new(Mutex::new(HashMap::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            conversions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Bytes produced for `input` when no override is set.
    pub fn expected_output(input: &[u8]) -> Vec<u8> {
        let mut output = b"remuxed:".to_vec();
        output.extend_from_slice(input);
        output
    }

    /// Make initialization fail with `reason`.
    pub async fn set_init_failure(&self, reason: impl Into<String>) {
        *self.init_error.write().await = Some(reason.into());
    }

    /// Number of `ensure_ready` calls.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Fail conversions of `input_name` with `error`.
    pub async fn fail_on(&self, input_name: impl Into<String>, error: EngineError) {
        self.failures.write().await.insert(input_name.into(), error);
    }

    /// Panic inside the next conversion of `input_name`.
    pub fn panic_on(&self, input_name: impl Into<String>) {
        self.panics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(input_name.into());
    }

    /// Return `output` for conversions of `input_name`.
    pub async fn set_output(&self, input_name: impl Into<String>, output: Vec<u8>) {
        self.outputs.write().await.insert(input_name.into(), output);
    }

    /// Set the progress ratios reported by each conversion.
    pub async fn set_progress_script(&self, ratios: Vec<f64>) {
        *self.progress_script.write().await = ratios;
    }

    /// Sleep between progress ticks.
    pub async fn set_tick_delay(&self, delay: Duration) {
        *self.tick_delay.write().await = delay;
    }

    /// Make conversions wait until [`release`](Self::release) is called.
    pub async fn hold(&self) {
        *self.gate.write().await = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held conversions proceed.
    pub async fn release(&self, count: usize) {
        if let Some(gate) = self.gate.read().await.as_ref() {
            gate.add_permits(count);
        }
    }

    /// Number of files currently staged in the working area.
    pub fn staged_count(&self) -> usize {
        self.working_area
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Names currently staged in the working area, sorted.
    pub fn staged_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .working_area
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Highest number of conversions observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    fn stage(&self, name: &str, len: usize) {
        self.working_area
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), len);
    }

    async fn run(
        &self,
        request: &ConvertRequest,
        progress_tx: &mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError> {
        let gate = self.gate.read().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let script = self.progress_script.read().await.clone();
        let delay = *self.tick_delay.read().await;
        for ratio in script {
            let _ = progress_tx.send(EngineProgress::new(ratio)).await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(err) = self.failures.read().await.get(&request.input_name) {
            return Err(err.clone());
        }

        let output = match self.outputs.read().await.get(&request.input_name) {
            Some(output) => output.clone(),
            None => Self::expected_output(&request.input_bytes),
        };
        self.stage(&request.output_name, output.len());
        Ok(output)
    }
}

/// Clears the staged files and the running count, including when the
/// conversion future is dropped mid-flight.
struct ConversionGuard {
    working_area: Arc<Mutex<HashMap<String, usize>>>,
    active: Arc<AtomicUsize>,
    names: [String; 2],
}

impl Drop for ConversionGuard {
    fn drop(&mut self) {
        let mut area = self
            .working_area
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for name in &self.names {
            area.remove(name);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ensure_ready(&self) -> Result<(), EngineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.init_error.read().await.clone() {
            return Err(EngineError::init_failed(reason));
        }

        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn convert(
        &self,
        request: ConvertRequest,
        progress_tx: mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(EngineError::NotReady);
        }

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);

        let _guard = ConversionGuard {
            working_area: Arc::clone(&self.working_area),
            active: Arc::clone(&self.active),
            names: [
                format!("input/{}", request.input_name),
                request.output_name.clone(),
            ],
        };
        self.stage(&format!("input/{}", request.input_name), request.input_bytes.len());

        let should_panic = self
            .panics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request.input_name);
        if should_panic {
            panic!("mock engine panicked on {}", request.input_name);
        }

        let result = self.run(&request, &progress_tx).await;

        self.conversions.write().await.push(RecordedConversion {
            input_name: request.input_name.clone(),
            output_name: request.output_name.clone(),
            input_len: request.input_bytes.len(),
            success: result.is_ok(),
        });

        result
    }
}
