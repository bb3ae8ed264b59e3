//! Job payloads exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend job lifecycle: `QUEUED -> RUNNING -> {SUCCEEDED | FAILED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// Returned immediately when a job is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub job_id: String,
    pub status: String,
}

/// Snapshot of a job as reported by `GET /api/jobs/{jobId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: String,
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    pub status: JobState,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Percent complete, 0 to 100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Message used when a failed job carries none.
pub const GENERIC_FAILURE_MESSAGE: &str = "job failed without an error message";

/// Terminal outcomes and transport failures of job operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {0} was not found")]
    NotFound(String),

    #[error("job failed: {0}")]
    Failed(String),

    #[error("job did not complete before the timeout")]
    Timeout,

    #[error("job polling was cancelled")]
    Cancelled,

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("invalid backend payload: {0}")]
    Decode(String),

    #[error("invalid backend base URL: {0}")]
    InvalidBaseUrl(String),
}

impl JobError {
    /// Errors worth another fetch: the backend may answer next time.
    pub fn is_transient(&self) -> bool {
        match self {
            JobError::Transport(_) => true,
            JobError::UnexpectedStatus(status) => *status >= 500,
            _ => false,
        }
    }
}
