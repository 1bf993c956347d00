//! Pacing between successive embedding calls.
//!
//! Ingestion embeds child chunks sequentially and spaces the calls out to
//! respect provider rate limits. The pacing policy is a collaborator so that
//! hosts can tune the interval and tests can run without delays.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Gate acquired before every embedding call during ingestion.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call is allowed to proceed.
    async fn acquire(&self);
}

/// Limiter spacing successive calls at least a fixed interval apart.
///
/// The first call passes immediately; each acquisition reserves the next
/// slot, so bursty callers are serialized onto the configured cadence.
pub struct FixedIntervalLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl FixedIntervalLimiter {
    /// Create a limiter with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Create a limiter spacing calls `millis` milliseconds apart.
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

#[async_trait]
impl RateLimiter for FixedIntervalLimiter {
    async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Limiter that never waits; used by tests and offline embedding backends.
pub struct NoopLimiter;

#[async_trait]
impl RateLimiter for NoopLimiter {
    async fn acquire(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_interval_spaces_successive_calls() {
        let limiter = FixedIntervalLimiter::from_millis(50);
        let started = std::time::Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        // The first call passes immediately; the next two wait one interval
        // each.
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn noop_limiter_never_waits() {
        let limiter = NoopLimiter;
        let started = std::time::Instant::now();
        for _ in 0..1000 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
