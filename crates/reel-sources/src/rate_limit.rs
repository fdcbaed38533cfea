//! Token-bucket throttle for one external source.
//!
//! Built on governor's GCRA limiter, which is equivalent to a token bucket
//! holding `capacity` tokens refilled at one token per `refill_interval`.
//! The limiter state is updated with a single atomic compare-and-swap, so
//! two concurrent callers can never both consume the last token.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use tracing::debug;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared token-bucket limiter.
///
/// One instance is bound to one source; clone the `Arc` returned by
/// [`RateLimiter::shared`] to hand it to every caller of that source.
pub struct RateLimiter {
    name: String,
    capacity: u32,
    refill_interval: Duration,
    limiter: DirectLimiter,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("refill_interval", &self.refill_interval)
            .finish()
    }
}

impl RateLimiter {
    /// Bucket of `capacity` tokens refilled at one token per `refill_interval`.
    pub fn new(name: impl Into<String>, capacity: u32, refill_interval: Duration) -> Self {
        let capacity = NonZeroU32::new(capacity).unwrap_or(NonZeroU32::MIN);
        let refill_interval = refill_interval.max(Duration::from_nanos(1));
        // `with_period` only rejects a zero period, which is excluded above.
        let quota = Quota::with_period(refill_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(capacity);

        Self {
            name: name.into(),
            capacity: capacity.get(),
            refill_interval,
            limiter: governor::RateLimiter::direct(quota),
        }
    }

    /// Bucket sized to `requests_per_minute`, refilled evenly over a minute.
    pub fn per_minute(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self::new(name, rpm, Duration::from_secs(60) / rpm)
    }

    /// Wrap in an `Arc` for sharing between concurrent callers.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Wait until a token is available and consume it.
    ///
    /// Suspends the calling task on a timer; never spins.
    pub async fn acquire(&self) {
        if self.limiter.check().is_ok() {
            return;
        }

        debug!(limiter = %self.name, "Rate limit reached, waiting for a token");
        metrics::counter!("reel_source_throttled_total", "source" => self.name.clone()).increment(1);
        self.limiter.until_ready().await;
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_per_minute_sizing() {
        let limiter = RateLimiter::per_minute("reddit", 30);
        assert_eq!(limiter.capacity(), 30);
        assert_eq!(limiter.refill_interval(), Duration::from_secs(2));

        let zero = RateLimiter::per_minute("zero", 0);
        assert_eq!(zero.capacity(), 1);
    }

    #[test]
    fn test_full_bucket_allows_exactly_capacity() {
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_acquire_suspends_on_empty_bucket() {
        let limiter = RateLimiter::new("pending", 1, Duration::from_secs(60));
        tokio_test::block_on(limiter.acquire());

        let mut waiting = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiting.poll());
    }

    #[tokio::test]
    async fn test_burst_then_paced() {
        let interval = Duration::from_millis(80);
        let limiter = RateLimiter::new("test", 3, interval);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        let burst_elapsed = start.elapsed();
        assert!(burst_elapsed < Duration::from_millis(50), "burst took {:?}", burst_elapsed);

        let mut last = Instant::now();
        for _ in 0..2 {
            limiter.acquire().await;
            let now = Instant::now();
            // Allow a little slack for clock granularity.
            assert!(now.duration_since(last) >= interval - Duration::from_millis(10));
            last = now;
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_tokens() {
        let interval = Duration::from_millis(60);
        let limiter = RateLimiter::new("shared", 2, interval).shared();
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Two tokens are free, the other three each need one refill.
        assert!(start.elapsed() >= interval * 3 - Duration::from_millis(20));
    }
}
