use crate::error::ApiError;
use configuration::EtsyConfig;
use reqwest::StatusCode;
use std::time::Duration;

/// How many times, and how patiently, a live request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay. Server and network failures wait one unit; 429s wait
    /// `unit * 2^attempt`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EtsyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_unit: config.backoff_unit(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retrying after `failure` on the 0-indexed `attempt`.
    pub(crate) fn delay_for(&self, failure: &Retryable, attempt: u32) -> Duration {
        match failure {
            Retryable::RateLimited => self
                .backoff_unit
                .saturating_mul(2u32.saturating_pow(attempt)),
            Retryable::Server(_) | Retryable::Transport(_) => self.backoff_unit,
        }
    }
}

/// A failed attempt that may succeed if repeated.
#[derive(Debug)]
pub(crate) enum Retryable {
    RateLimited,
    Server(StatusCode),
    Transport(reqwest::Error),
}

impl Retryable {
    /// The terminal error once the retry budget is spent.
    pub(crate) fn exhausted(self, attempts: u32) -> ApiError {
        match self {
            Retryable::RateLimited => ApiError::RateLimited { attempts },
            Retryable::Server(status) => ApiError::ServerError {
                status: status.as_u16(),
                attempts,
            },
            Retryable::Transport(source) => ApiError::Transport { attempts, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..4)
            .map(|attempt| policy.delay_for(&Retryable::RateLimited, attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8]);
    }

    #[test]
    fn server_errors_wait_one_unit() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff_unit: Duration::from_millis(250),
        };
        let failure = Retryable::Server(StatusCode::BAD_GATEWAY);
        assert_eq!(policy.delay_for(&failure, 0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(&failure, 2), Duration::from_millis(250));
    }

    #[test]
    fn huge_attempt_numbers_saturate_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(&Retryable::RateLimited, 200),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }

    #[test]
    fn exhausted_failures_keep_their_kind() {
        let err = Retryable::Server(StatusCode::SERVICE_UNAVAILABLE).exhausted(4);
        assert!(matches!(err, ApiError::ServerError { status: 503, attempts: 4 }));
        assert!(err.is_exhausted());
        assert!(Retryable::RateLimited.exhausted(4).is_exhausted());
        assert!(!ApiError::Cancelled.is_exhausted());
    }

    #[test]
    fn attempts_include_the_first_try() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts(), 4);
    }
}
