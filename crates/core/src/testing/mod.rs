//! Testing utilities and mock implementations.
//!
//! Lets queue and server tests run without an ffmpeg install.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use remuxq_core::queue::{QueueConfig, QueueManager};
//! use remuxq_core::testing::{MockEngine, RecordingSink};
//!
//! let engine = MockEngine::new();
//! let sink = Arc::new(RecordingSink::new());
//! let queue = QueueManager::new(QueueConfig::default(), engine.clone(), sink.clone());
//! queue.start().await?;
//! ```

mod mock_engine;
mod recording_sink;

pub use mock_engine::{MockEngine, RecordedConversion};
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::queue::SourceFile;

    /// A small source file whose contents name the file.
    pub fn source_file(name: &str) -> SourceFile {
        SourceFile::new(name, format!("source bytes of {}", name).into_bytes())
    }

    /// A source file that declares `size_bytes` without buffering them.
    pub fn declared_file(name: &str, size_bytes: u64) -> SourceFile {
        let mut file = SourceFile::new(name, Vec::new());
        file.size_bytes = size_bytes;
        file
    }
}
