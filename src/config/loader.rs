//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `backend.base_url`.
pub const BACKEND_BASE_URL_ENV: &str = "BACKEND_BASE_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without overrides or validation.
pub fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(BACKEND_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.backend.base_url = Some(base_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file_value() {
        let mut config = AppConfig::default();
        config.backend.base_url = Some("http://from-file:8080".into());

        apply_env_overrides(&mut config, |key| {
            (key == BACKEND_BASE_URL_ENV).then(|| "http://from-env:9000".to_string())
        });

        assert_eq!(config.backend.base_url.as_deref(), Some("http://from-env:9000"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |_| Some("  ".to_string()));
        assert!(config.backend.base_url.is_none());
    }

    #[test]
    fn test_validation_error_message_lists_problems() {
        let err = ConfigError::Validation(vec![
            ValidationError::MissingBackendBaseUrl,
            ValidationError::Zero("jobs.poll_interval_ms"),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: backend.base_url is required"));
        assert!(message.ends_with("jobs.poll_interval_ms must be greater than zero"));
    }
}
