//! Retry eligibility and exponential backoff.

use std::time::Duration;

use crate::config::PipelineConfig;

/// When and how long to wait before retrying a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Statuses eligible for retry. Status 0 is always eligible.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.backoff_base(),
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a failure with `status` may be retried as attempt number
    /// `attempt` (1-indexed: the first retry is attempt 1).
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        if attempt == 0 || attempt > self.max_retries {
            return false;
        }
        status == 0 || self.retryable_statuses.contains(&status)
    }

    /// Delay before retry `attempt` (1-indexed): `initial * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for status in [0, 408, 429, 500, 502, 503, 504] {
            assert!(policy.should_retry(status, 1), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 409, 422, 501, 505] {
            assert!(!policy.should_retry(status, 1), "{status} should not retry");
        }
    }

    #[test]
    fn test_attempts_are_capped() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(503, 3));
        assert!(!policy.should_retry(503, 4));
        assert!(!policy.should_retry(503, 0));
        assert!(!RetryPolicy::none().should_retry(503, 1));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
    }
}
