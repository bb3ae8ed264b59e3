//! Configuration validation.
//!
//! Semantic checks run after serde has accepted the file. All errors are
//! collected rather than stopping at the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, JobPollConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend.base_url is required (set it in the config file or BACKEND_BASE_URL)")]
    MissingBackendBaseUrl,

    #[error("backend.base_url '{0}' is not a valid URL")]
    InvalidBackendBaseUrl(String),

    #[error("backend.base_url '{0}' must use the http scheme")]
    UnsupportedBackendScheme(String),

    #[error("{field} must start with '/' and must not end with '/': '{value}'")]
    InvalidPathPrefix { field: &'static str, value: String },

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.backend.base_url.as_deref() {
        None => errors.push(ValidationError::MissingBackendBaseUrl),
        Some(raw) if raw.trim().is_empty() => errors.push(ValidationError::MissingBackendBaseUrl),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if url.scheme() != "http" => {
                errors.push(ValidationError::UnsupportedBackendScheme(raw.to_string()))
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidBackendBaseUrl(raw.to_string()))
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidBackendBaseUrl(raw.to_string())),
        },
    }

    for (field, value) in [
        ("backend.proxy_prefix", &config.backend.proxy_prefix),
        ("backend.oauth_callback_path", &config.backend.oauth_callback_path),
    ] {
        if !value.starts_with('/') || value.len() < 2 || value.ends_with('/') {
            errors.push(ValidationError::InvalidPathPrefix {
                field,
                value: value.clone(),
            });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    errors.extend(job_errors(&config.jobs));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the job polling section, for callers without a backend
/// section of their own.
pub fn validate_jobs(jobs: &JobPollConfig) -> Result<(), Vec<ValidationError>> {
    let errors = job_errors(jobs);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn job_errors(jobs: &JobPollConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if jobs.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("jobs.poll_interval_ms"));
    }
    if jobs.overall_timeout_ms == 0 {
        errors.push(ValidationError::Zero("jobs.overall_timeout_ms"));
    }
    errors
}
