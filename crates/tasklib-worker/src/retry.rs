//! The retry/failure policy applied after a handler invocation fails.

use chrono::{Duration, Utc};
use tasklib_core::FailureOutcome;

/// Backoff and retry-cap parameters, resolved once per worker from
/// [`tasklib_core::Config`].
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub base_delay_seconds: f64,
    pub backoff_multiplier: f64,
}

/// Decide what happens to a row after a failed execution attempt.
///
/// `delay_n = base_delay × multiplier^(n-1)`, where `n` is the new retry
/// count (1 for the first retry), giving the default sequence 5s, 10s,
/// 20s, ... Retries exhausted (`retry_count >= max_retries`) produces a
/// terminal outcome instead.
pub fn next_outcome(retry_count: i32, max_retries: i32, retry_config: RetryConfig) -> FailureOutcome {
    if retry_count < max_retries {
        let n = retry_count + 1;
        let delay_seconds =
            retry_config.base_delay_seconds * retry_config.backoff_multiplier.powi(n - 1);
        let next_retry_at = Utc::now() + Duration::milliseconds((delay_seconds * 1000.0) as i64);
        FailureOutcome::Retry {
            retry_count: n,
            next_retry_at,
        }
    } else {
        FailureOutcome::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            base_delay_seconds: 5.0,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn first_retry_uses_base_delay() {
        let before = Utc::now();
        let outcome = next_outcome(0, 3, config());
        match outcome {
            FailureOutcome::Retry {
                retry_count,
                next_retry_at,
            } => {
                assert_eq!(retry_count, 1);
                let delta = next_retry_at - before;
                assert!(delta.num_milliseconds() >= 4_900 && delta.num_milliseconds() <= 5_100);
            }
            FailureOutcome::Terminal => panic!("expected a retry"),
        }
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let before = Utc::now();
        let outcome = next_outcome(1, 3, config());
        match outcome {
            FailureOutcome::Retry {
                retry_count,
                next_retry_at,
            } => {
                assert_eq!(retry_count, 2);
                let delta = next_retry_at - before;
                assert!(delta.num_milliseconds() >= 9_900 && delta.num_milliseconds() <= 10_100);
            }
            FailureOutcome::Terminal => panic!("expected a retry"),
        }
    }

    #[test]
    fn retries_exhausted_is_terminal() {
        assert!(matches!(next_outcome(3, 3, config()), FailureOutcome::Terminal));
        assert!(matches!(next_outcome(5, 3, config()), FailureOutcome::Terminal));
    }
}
