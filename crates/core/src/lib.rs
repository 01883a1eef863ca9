pub mod config;
pub mod engine;
pub mod metrics;
pub mod queue;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
    ServerConfig,
};
pub use engine::{
    ConvertRequest, Engine, EngineConfig, EngineError, EngineProgress, FfmpegEngine,
};
pub use queue::{
    content_type_for, derive_output_name, format_file_size, ConversionArtifact, EngineStatus,
    EventSink, JobId, JobSnapshot, JobStatus, QueueConfig, QueueError, QueueEvent, QueueManager,
    QueueStats, SourceFile, MAX_SOURCE_SIZE_BYTES,
};
