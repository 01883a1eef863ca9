use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::info;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides, e.g. `REMUXQ_SERVER__PORT=8080`.
const ENV_PREFIX: &str = "REMUXQ_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from `path` if it exists, defaults otherwise.
/// Environment overrides apply in both cases.
pub fn load_default_config(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        return load_config(path);
    }

    info!(path = %path.display(), "No config file, using defaults");
    extract(Figment::from(Serialized::defaults(Config::default())))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[queue]
target_extension = "mkv"
conversion_timeout_secs = 60
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.queue.target_extension, "mkv");
        assert_eq!(config.queue.conversion_timeout_secs, Some(60));
        assert_eq!(config.queue.history_limit, 100);
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.queue.target_extension, "mp4");
        assert_eq!(config.engine.ffmpeg_path.to_str(), Some("ffmpeg"));
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[server]
port = "not a number"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_default_config_missing_file() {
        let config = load_default_config(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.queue.target_extension, "mp4");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3100

[engine]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
extra_args = ["-movflags", "+faststart"]
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3100);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.engine.ffmpeg_path.to_str(),
            Some("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.engine.extra_args, vec!["-movflags", "+faststart"]);
    }
}
