//! Retry-delay computation shared by the queue's retry scheduling.

use std::time::Duration;

const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// `min(retryBaseDelay * 2^(attempt-1), 30s)` when `exponential` is set,
/// otherwise a constant `retry_base_delay` on every attempt.
///
/// `attempt` is 1-indexed: the first retry is attempt 1.
pub fn retry_delay(attempt: u32, retry_base_delay: Duration, exponential: bool) -> Duration {
    if !exponential {
        return retry_base_delay;
    }
    let attempt = attempt.max(1);
    let shift = attempt.saturating_sub(1).min(31);
    let multiplied = retry_base_delay.as_millis().saturating_mul(1u128 << shift);
    let capped = multiplied.min(MAX_RETRY_DELAY.as_millis());
    Duration::from_millis(capped as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_ignores_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(1, base, false), base);
        assert_eq!(retry_delay(5, base, false), base);
    }

    #[test]
    fn exponential_backoff_doubles_per_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(1, base, true), Duration::from_millis(100));
        assert_eq!(retry_delay(2, base, true), Duration::from_millis(200));
        assert_eq!(retry_delay(3, base, true), Duration::from_millis(400));
    }

    #[test]
    fn exponential_backoff_caps_at_30_seconds() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(20, base, true), Duration::from_millis(30_000));
    }
}
