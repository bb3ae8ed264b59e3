//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, BACKEND_BASE_URL override)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → injected into HttpServer / JobPoller at construction
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates new config
//!     → HttpServer swaps its BackendTarget atomically
//! ```
//!
//! # Design Decisions
//! - A missing backend base URL is a startup error, never a per-request one
//! - All fields except the backend URL have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_file, ConfigError, BACKEND_BASE_URL_ENV};
pub use schema::{
    AppConfig, BackendConfig, JobPollConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, validate_jobs, ValidationError};
pub use watcher::ConfigWatcher;
