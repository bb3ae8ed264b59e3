//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (request counters and latency histograms, job poll outcomes)
//!
//! Consumers:
//!     → stderr log lines
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
