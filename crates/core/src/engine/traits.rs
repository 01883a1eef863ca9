//! Trait definitions for the engine module.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::error::EngineError;
use super::types::{ConvertRequest, EngineProgress};

/// A stateful transcoding engine.
///
/// Implementations are driven by a single caller at a time; they are not
/// required to support overlapping conversions.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Performs one-time initialization.
    ///
    /// Idempotent: once initialized, later calls return immediately. A failed
    /// initialization is terminal and every later call returns the same
    /// [`EngineError::InitFailed`].
    async fn ensure_ready(&self) -> Result<(), EngineError>;

    /// Converts the staged input into the requested output container.
    ///
    /// Progress ticks are sent on `progress_tx`; if the receiver is gone the
    /// conversion continues without reporting. Both staged input and produced
    /// output are removed from the working area before this returns, whatever
    /// the outcome.
    async fn convert(
        &self,
        request: ConvertRequest,
        progress_tx: mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError>;
}

#[async_trait]
impl<T: Engine + ?Sized> Engine for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn ensure_ready(&self) -> Result<(), EngineError> {
        (**self).ensure_ready().await
    }

    async fn convert(
        &self,
        request: ConvertRequest,
        progress_tx: mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError> {
        (**self).convert(request, progress_tx).await
    }
}
