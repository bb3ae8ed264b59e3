//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (1-based).
///
/// The delay doubles from `base_ms` per attempt, is capped at `max_ms`, and
/// gets up to 10% of random jitter added on top.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped_ms = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped_ms / 10;
    let jitter_ms = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_ms + jitter_ms)
}
