//! Engine module: the transcoding engine behind a stable async contract.
//!
//! The queue talks to exactly one [`Engine`]. An engine has a one-time
//! initialization step, a private working area used to stage input and
//! collect output, and a run-to-completion conversion call. Conversions are
//! stream copies: encoded streams are repackaged into the target container
//! without re-encoding.
//!
//! # Example
//!
//! ```ignore
//! use remuxq_core::engine::{ConvertRequest, Engine, EngineConfig, FfmpegEngine};
//!
//! let engine = FfmpegEngine::new(EngineConfig::default());
//! engine.ensure_ready().await?;
//!
//! let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel(64);
//! let request = ConvertRequest {
//!     input_name: "movie.mkv".to_string(),
//!     input_bytes: std::fs::read("movie.mkv")?,
//!     output_name: "movie.mp4".to_string(),
//! };
//! let output = engine.convert(request, progress_tx).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use traits::Engine;
pub use types::{ConvertRequest, EngineProgress};
