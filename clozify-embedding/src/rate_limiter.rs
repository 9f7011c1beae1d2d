//! Request spacing for embedding calls
//!
//! Embedding endpoints limit requests per minute. The limiter hands out
//! time slots at least `min_interval` apart so a long column is embedded
//! at a steady rate instead of in bursts that trip the limit.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default spacing between embedding requests (60 requests per minute)
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1000;

/// Spaces successive requests at least `min_interval` apart
///
/// A caller books the next free slot under the lock and sleeps until it
/// outside the lock, so concurrent callers never share a slot.
#[derive(Debug)]
pub struct RateLimiter {
    label: String,
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
    acquired: AtomicU64,
    delayed: AtomicU64,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64, label: &str) -> Self {
        Self {
            label: label.to_string(),
            min_interval: Duration::from_millis(min_interval_ms),
            next_slot: Mutex::new(None),
            acquired: AtomicU64::new(0),
            delayed: AtomicU64::new(0),
        }
    }

    /// Limiter allowing at most `requests` per minute
    pub fn per_minute(requests: u64, label: &str) -> Self {
        Self::new(60_000 / requests.max(1), label)
    }

    /// Wait for the next free slot
    pub async fn acquire(&self) {
        let ticket = self.acquired.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.min_interval);
            slot
        };

        if slot > now {
            self.delayed.fetch_add(1, Ordering::Relaxed);
            debug!(
                "{} request #{} delayed {:?}",
                self.label,
                ticket,
                slot - now
            );
            tokio::time::sleep_until(slot).await;
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            label: self.label.clone(),
            acquired: self.acquired.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            min_interval: self.min_interval,
        }
    }
}

/// Usage counters of a [`RateLimiter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub label: String,
    pub acquired: u64,
    /// Requests that had to wait for their slot
    pub delayed: u64,
    pub min_interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_immediate() {
        let limiter = RateLimiter::new(100, "test");

        let start = Instant::now();
        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.stats().delayed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let limiter = RateLimiter::new(100, "test");

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(200));
        let stats = limiter.stats();
        assert_eq!(stats.acquired, 3);
        assert_eq!(stats.delayed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_after_interval_immediate() {
        let limiter = RateLimiter::new(50, "test");
        limiter.acquire().await;

        tokio::time::sleep(Duration::from_millis(60)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_per_minute_interval() {
        assert_eq!(
            RateLimiter::per_minute(60, "test").min_interval(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            RateLimiter::per_minute(0, "test").min_interval(),
            Duration::from_millis(60_000)
        );
    }
}
