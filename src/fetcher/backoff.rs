use std::time::Duration;

use crate::fetcher::FetchErrorKind;

/// Outcome of one backoff decision. The policy only computes the delay;
/// the caller owns the actual suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub retry: bool,
    pub delay: Duration,
}

impl Decision {
    fn give_up() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }
}

/// Exponential backoff: the delay doubles per attempt starting from
/// `initial_delay`, up to `max_attempts` tries. Pure and deterministic so
/// it tests without real clock time.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 4)
    }
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide whether `attempt` (1-based count of failures so far) should
    /// be retried for an error of the given kind, and after how long.
    pub fn next_delay(&self, attempt: u32, kind: FetchErrorKind) -> Decision {
        if !kind.is_transient() || attempt >= self.max_attempts {
            return Decision::give_up();
        }

        let exponent = attempt.saturating_sub(1).min(31);
        Decision {
            retry: true,
            delay: self.initial_delay.saturating_mul(1u32 << exponent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_retry_with_doubling_delay() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), 4);

        for kind in [
            FetchErrorKind::Timeout,
            FetchErrorKind::ConnectionReset,
            FetchErrorKind::ServerUnavailable,
        ] {
            assert_eq!(
                policy.next_delay(1, kind),
                Decision {
                    retry: true,
                    delay: Duration::from_secs(1)
                }
            );
            assert_eq!(policy.next_delay(2, kind).delay, Duration::from_secs(2));
            assert_eq!(policy.next_delay(3, kind).delay, Duration::from_secs(4));
        }
    }

    #[test]
    fn test_permanent_errors_never_retry() {
        let policy = BackoffPolicy::default();

        for kind in [
            FetchErrorKind::NotFound,
            FetchErrorKind::MalformedResponse,
            FetchErrorKind::Cancelled,
        ] {
            for attempt in 1..=5 {
                assert!(!policy.next_delay(attempt, kind).retry);
            }
        }
    }

    #[test]
    fn test_exhausted_attempts_give_up() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), 4);

        assert!(policy.next_delay(3, FetchErrorKind::Timeout).retry);
        assert!(!policy.next_delay(4, FetchErrorKind::Timeout).retry);
        assert!(
            !policy
                .next_delay(100, FetchErrorKind::ServerUnavailable)
                .retry
        );
    }

    #[test]
    fn test_deterministic() {
        let policy = BackoffPolicy::default();
        let a = policy.next_delay(2, FetchErrorKind::Timeout);
        let b = policy.next_delay(2, FetchErrorKind::Timeout);
        assert_eq!(a, b);
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), u32::MAX);
        let decision = policy.next_delay(64, FetchErrorKind::Timeout);
        assert!(decision.retry);
    }
}
