//! Queue module: sequential conversion of submitted files.
//!
//! The [`QueueManager`] owns the engine, keeps submitted jobs in FIFO order
//! and converts them one at a time. Every lifecycle transition and progress
//! tick is published to an [`EventSink`] as a [`QueueEvent`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use remuxq_core::engine::{EngineConfig, FfmpegEngine};
//! use remuxq_core::queue::{QueueConfig, QueueManager, SourceFile};
//!
//! let engine = FfmpegEngine::new(EngineConfig::default());
//! let queue = QueueManager::new(QueueConfig::default(), engine, sink);
//! queue.start().await?;
//!
//! let outcomes = queue.submit(vec![SourceFile::new("movie.mkv", bytes)]);
//! // ... wait for a job_status_changed { status: completed } event ...
//! let artifact = queue.retrieve_result(job_id)?;
//! std::fs::write(&artifact.file_name, &artifact.bytes)?;
//! ```

mod config;
mod error;
mod events;
mod manager;
mod naming;
mod types;

pub use config::QueueConfig;
pub use error::QueueError;
pub use events::{EventSink, QueueEvent};
pub use manager::QueueManager;
pub use naming::{content_type_for, derive_output_name};
pub use types::{
    format_file_size, ConversionArtifact, EngineStatus, JobId, JobSnapshot, JobStatus,
    QueueStats, SourceFile, MAX_SOURCE_SIZE_BYTES,
};
