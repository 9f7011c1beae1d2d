//! Explicit retry policy for calls to remote model services
//!
//! Adapters own a [`RetryPolicy`] and run each request through
//! [`RetryPolicy::run`]. Only errors that report themselves as transient
//! (rate limits) are retried; the wait between attempts is a randomized
//! exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Errors that may succeed if the request is simply repeated
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Whether a provider error reports a rate limit
///
/// The structured error code is authoritative; the message is only consulted
/// for errors that carry no code.
pub fn is_rate_limit(code: Option<&str>, message: &str) -> bool {
    match code {
        Some(code) => code == "rate_limit_exceeded",
        None => {
            let lower = message.to_lowercase();
            lower.contains("rate limit") || lower.contains("rate_limit")
        }
    }
}

/// Attempt budget and backoff shape for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Scale of the exponential ceiling (`multiplier * 2^(attempt - 1)`)
    pub multiplier: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            multiplier: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::immediate(1)
    }

    /// Retry without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            multiplier: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wait before the next attempt after `failed_attempts` failures
    ///
    /// Drawn uniformly from `[min_wait, ceiling]` where the ceiling grows as
    /// `multiplier * 2^(failed_attempts - 1)` and is capped at `max_wait`.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        let ceiling = self
            .multiplier
            .saturating_mul(1u32 << exponent)
            .min(self.max_wait)
            .max(self.min_wait);
        let low = self.min_wait.as_secs_f64();
        let high = ceiling.as_secs_f64();
        if high <= low {
            return ceiling;
        }
        Duration::from_secs_f64(rand::rng().random_range(low..=high))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        label, attempt, max_attempts, e, wait
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{} giving up after {} attempt(s)", label, attempt);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum FakeError {
        Busy,
        Broken,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Busy)
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limit(Some("rate_limit_exceeded"), "anything"));
        assert!(!is_rate_limit(Some("insufficient_quota"), "You exceeded your rate limit"));
        assert!(is_rate_limit(
            None,
            "Rate limit reached for default-text-embedding-ada-002"
        ));
        assert!(!is_rate_limit(None, "Invalid input: row 429 is too long"));
        assert!(!is_rate_limit(None, "Incorrect API key provided"));
    }

    #[test]
    fn test_backoff_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..10 {
            let wait = policy.backoff(attempt);
            assert!(wait >= Duration::from_secs(1), "attempt {attempt}: {wait:?}");
            assert!(wait <= Duration::from_secs(60), "attempt {attempt}: {wait:?}");
        }
        // ceiling after the first failure is max(min_wait, 1s * 2^0) = 1s
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        // after the third failure the ceiling is 1s * 2^2
        for _ in 0..20 {
            assert!(policy.backoff(3) <= Duration::from_secs(4));
        }
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.backoff(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, FakeError> = RetryPolicy::immediate(6)
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(FakeError::Busy) } else { Ok(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_at_attempt_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FakeError> = RetryPolicy::immediate(4)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Busy)
            })
            .await;

        assert!(matches!(result, Err(FakeError::Busy)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FakeError> = RetryPolicy::immediate(6)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Broken)
            })
            .await;

        assert!(matches!(result, Err(FakeError::Broken)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
