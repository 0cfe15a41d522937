//! Configuration loading from disk and environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override and validate configuration.
///
/// With no path, starts from defaults. `HOST` and `PORT` environment
/// variables override the file when they parse.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_config(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(host) = env::var("HOST").ok().and_then(|s| s.parse().ok()) {
        config.server.host = host;
    }
    if let Some(port) = env::var("PORT").ok().and_then(|s| s.parse().ok()) {
        config.server.port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::shutdown::DrainTimeoutPolicy;
    use std::time::Duration;

    #[test]
    fn parses_partial_document() {
        let config = parse_config(
            r#"
            [server]
            host = "127.0.0.1"
            port = 3000
            shutdown_timeout_secs = 10
            drain_timeout_policy = "cleanup"

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address().to_string(), "127.0.0.1:3000");
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.server.cleanup_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.drain_timeout_policy, DrainTimeoutPolicy::Cleanup);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.otlp_endpoint.is_none());
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = parse_config("[server]\ndrain_timeout_policy = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Some(Path::new("/nonexistent/lifecycle.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lifecycle.toml"));
    }
}
