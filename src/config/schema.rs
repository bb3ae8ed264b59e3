//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the team progress proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend service the proxy forwards to.
    pub backend: BackendConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Job polling settings.
    pub jobs: JobPollConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend origin (e.g., "http://localhost:8080").
    ///
    /// Required. `BACKEND_BASE_URL` in the environment overrides the file.
    pub base_url: Option<String>,

    /// Path prefix under which requests are forwarded verbatim.
    pub proxy_prefix: String,

    /// Path of the OAuth callback relay.
    pub oauth_callback_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            proxy_prefix: "/api/backend".to_string(),
            oauth_callback_path: "/api/auth/github/callback".to_string(),
        }
    }
}

/// Timeout configuration for proxied exchanges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Job polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobPollConfig {
    /// Fixed delay between two status fetches in milliseconds.
    pub poll_interval_ms: u64,

    /// Budget without observed progress before giving up, in milliseconds.
    pub overall_timeout_ms: u64,

    /// Consecutive transient fetch errors tolerated before failing.
    pub max_transient_errors: u32,

    /// Base delay for the transient error backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for the transient error backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for JobPollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            overall_timeout_ms: 120_000,
            max_transient_errors: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
