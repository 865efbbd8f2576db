//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `attempt` (1-based).
///
/// Doubles from `base_ms`, caps at `max_ms`, then adds up to 10% jitter so
/// concurrent subtopic workers do not hit a rate-limited API in lockstep.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let first = calculate_backoff(1, 100, 2000).as_millis();
        assert!((100..110).contains(&first));

        let second = calculate_backoff(2, 100, 2000).as_millis();
        assert!((200..220).contains(&second));

        let capped = calculate_backoff(10, 100, 1000).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_zero_attempt_and_huge_attempt() {
        assert_eq!(calculate_backoff(0, 100, 1000), Duration::ZERO);
        let d = calculate_backoff(200, 100, 1000).as_millis();
        assert!(d >= 1000 && d < 1100);
    }
}
