//! Error types for the engine module.

use thiserror::Error;

/// Errors surfaced by an engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A conversion was requested before initialization finished.
    #[error("Engine is not ready")]
    NotReady,

    /// One-time initialization failed. Terminal for the engine instance.
    #[error("Engine initialization failed: {reason}")]
    InitFailed { reason: String },

    /// The conversion itself failed (unsupported codec for the target
    /// container, corrupt input, engine crash).
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Staging the input or reading back the output failed.
    #[error("Working area I/O failed: {reason}")]
    StagingIoFailed { reason: String },
}

impl EngineError {
    /// Creates an initialization failure.
    pub fn init_failed(reason: impl Into<String>) -> Self {
        Self::InitFailed {
            reason: reason.into(),
        }
    }

    /// Creates a conversion failure with optional stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a staging failure.
    pub fn staging(reason: impl Into<String>) -> Self {
        Self::StagingIoFailed {
            reason: reason.into(),
        }
    }

    /// Human-readable detail for a failed job, including captured engine
    /// output when there is any.
    pub fn detail(&self) -> String {
        match self {
            Self::ConversionFailed {
                reason,
                stderr: Some(stderr),
            } if !stderr.trim().is_empty() => {
                format!("Conversion failed: {}: {}", reason, stderr.trim())
            }
            other => other.to_string(),
        }
    }
}
