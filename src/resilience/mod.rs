//! Resilience helpers.
//!
//! The proxy itself never retries: it is a transparent pipe. Retries only
//! happen in the job poller, for transient status fetch failures, spaced by
//! `backoff.rs`.

pub mod backoff;

pub use backoff::calculate_backoff;
