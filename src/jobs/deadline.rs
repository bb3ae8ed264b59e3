//! Liveness deadline: forward progress renews the timeout budget.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the poll deadline of one job.
#[derive(Debug, Clone)]
pub struct LivenessDeadline {
    budget: Duration,
    deadline: Instant,
    last_progress: f64,
}

impl LivenessDeadline {
    pub fn new(budget: Duration, now: Instant) -> Self {
        Self {
            budget,
            deadline: now + budget,
            last_progress: 0.0,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Feed the progress of a fresh status. Returns true when the deadline
    /// was pushed back, i.e. progress increased and is still below 100.
    pub fn observe(&mut self, progress: Option<f64>, now: Instant) -> bool {
        match progress {
            Some(progress) if progress > self.last_progress => {
                self.last_progress = progress;
                if progress < 100.0 {
                    self.deadline = now + self.budget;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}
