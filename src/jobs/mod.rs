//! Backend job submission and completion polling.
//!
//! # Data Flow
//! ```text
//! submit_and_await(org)
//!     → client.rs   POST /api/organizations/{id}/sync → JobSubmission
//!     → poller.rs   GET /api/jobs/{jobId} every poll_interval
//!     → deadline.rs progress renews the timeout budget
//!     → Ok(JobStatus) | NotFound | Failed | Timeout | Cancelled
//! ```

pub mod client;
pub mod deadline;
pub mod poller;
pub mod types;

pub use client::{HttpJobApi, JobApi};
pub use deadline::LivenessDeadline;
pub use poller::{JobPoller, PollSettings};
pub use types::{JobError, JobState, JobStatus, JobSubmission, GENERIC_FAILURE_MESSAGE};
