use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Target extension is non-empty and has no dot
/// - History keeps at least one job
/// - Conversion timeout, when set, is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Queue validation
    let target = config.queue.target_extension.trim();
    if target.is_empty() {
        return Err(ConfigError::ValidationError(
            "queue.target_extension cannot be empty".to_string(),
        ));
    }
    if target.contains('.') {
        return Err(ConfigError::ValidationError(format!(
            "queue.target_extension must not contain a dot: {:?}",
            config.queue.target_extension
        )));
    }

    if config.queue.history_limit == 0 {
        return Err(ConfigError::ValidationError(
            "queue.history_limit must be at least 1".to_string(),
        ));
    }

    if config.queue.conversion_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "queue.conversion_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
