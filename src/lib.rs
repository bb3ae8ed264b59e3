//! Team progress proxy.
//!
//! Same-origin gateway between the team progress dashboard and its backend:
//! forwards API calls with header hygiene and cookie reissue, relays the
//! OAuth callback, and follows long-running backend jobs to completion.

pub mod config;
pub mod cookies;
pub mod http;
pub mod jobs;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
