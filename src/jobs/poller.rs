//! Job completion polling.
//!
//! # Algorithm
//! ```text
//! deadline = now + overall_timeout
//! loop:
//!     sleep(poll_interval)                  (cancellable)
//!     fetch status                          (cancellable, bounded by deadline)
//!         404          → NotFound, no retry
//!         transient    → retry with backoff while budget remains
//!     progress rose below 100 → deadline = now + overall_timeout
//!     SUCCEEDED → Ok, FAILED → Failed(message)
//!     now >= deadline → Timeout
//! ```
//!
//! # Design Decisions
//! - Fixed cadence between successful fetches; backoff only after failures
//! - Concurrent pollers of one job are independent, nothing is deduplicated

use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::JobPollConfig;
use crate::jobs::client::JobApi;
use crate::jobs::deadline::LivenessDeadline;
use crate::jobs::types::{JobError, JobState, JobStatus, GENERIC_FAILURE_MESSAGE};
use crate::observability::metrics;
use crate::resilience::calculate_backoff;

/// Polling cadence and failure tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub overall_timeout: Duration,
    /// Consecutive transient errors tolerated; 0 fails on the first one.
    pub max_transient_errors: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl PollSettings {
    /// Fixed cadence with no tolerance for fetch errors.
    pub fn fixed(poll_interval_ms: u64, overall_timeout_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            overall_timeout: Duration::from_millis(overall_timeout_ms),
            max_transient_errors: 0,
            retry_base_delay_ms: poll_interval_ms,
            retry_max_delay_ms: poll_interval_ms,
        }
    }

    pub fn with_transient_retries(mut self, max: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.max_transient_errors = max;
        self.retry_base_delay_ms = base_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self
    }
}

impl From<&JobPollConfig> for PollSettings {
    fn from(config: &JobPollConfig) -> Self {
        PollSettings::fixed(config.poll_interval_ms, config.overall_timeout_ms).with_transient_retries(
            config.max_transient_errors,
            config.retry_base_delay_ms,
            config.retry_max_delay_ms,
        )
    }
}

/// Waits for backend jobs to reach a terminal state.
pub struct JobPoller<A> {
    api: A,
    settings: PollSettings,
}

impl<A: JobApi> JobPoller<A> {
    pub fn new(api: A, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    /// Submit an organization sync and wait for it to finish.
    pub async fn submit_and_await(
        &self,
        organization_id: u64,
        cancel: &CancellationToken,
    ) -> Result<JobStatus, JobError> {
        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            submission = self.api.submit_sync(organization_id) => submission?,
        };
        tracing::info!(
            organization_id,
            job_id = %submission.job_id,
            status = %submission.status,
            "Sync job submitted"
        );

        self.await_completion(&submission.job_id, cancel).await
    }

    /// Block until the job is terminal. Returns the final status on success.
    pub async fn await_completion(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<JobStatus, JobError> {
        let mut deadline = LivenessDeadline::new(self.settings.overall_timeout, Instant::now());
        let mut transient_errors = 0u32;
        let mut delay = self.settings.poll_interval;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                _ = sleep(delay) => {}
            }
            delay = self.settings.poll_interval;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                fetched = self.api.fetch_status(job_id) => fetched,
                _ = sleep_until(deadline.deadline()) => {
                    metrics::record_job_poll("timeout");
                    tracing::warn!(job_id, "Job status fetch outlived the deadline");
                    return Err(JobError::Timeout);
                }
            };
            let now = Instant::now();

            let status = match fetched {
                Ok(Some(status)) => {
                    transient_errors = 0;
                    status
                }
                Ok(None) => {
                    metrics::record_job_poll("not_found");
                    tracing::warn!(job_id, "Job not found");
                    return Err(JobError::NotFound(job_id.to_string()));
                }
                Err(e) if e.is_transient() && transient_errors < self.settings.max_transient_errors => {
                    metrics::record_job_poll("transient_error");
                    if deadline.is_expired(now) {
                        return Err(JobError::Timeout);
                    }
                    transient_errors += 1;
                    delay = calculate_backoff(
                        transient_errors,
                        self.settings.retry_base_delay_ms,
                        self.settings.retry_max_delay_ms,
                    );
                    tracing::warn!(job_id, error = %e, attempt = transient_errors, delay = ?delay, "Retrying job status fetch");
                    continue;
                }
                Err(e) => {
                    metrics::record_job_poll("error");
                    tracing::error!(job_id, error = %e, "Job status fetch failed");
                    return Err(e);
                }
            };

            metrics::record_job_poll("ok");
            if deadline.observe(status.progress, now) {
                tracing::debug!(job_id, progress = ?status.progress, "Progress advanced, deadline extended");
            }
            tracing::debug!(job_id, status = ?status.status, progress = ?status.progress, "Polled job status");

            match status.status {
                JobState::Succeeded => {
                    tracing::info!(job_id, "Job succeeded");
                    return Ok(status);
                }
                JobState::Failed => {
                    let message = status
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                    tracing::warn!(job_id, error = %message, "Job failed");
                    return Err(JobError::Failed(message));
                }
                JobState::Queued | JobState::Running => {}
            }

            if deadline.is_expired(now) {
                tracing::warn!(job_id, "Job did not complete before the timeout");
                return Err(JobError::Timeout);
            }
        }
    }
}
