//! Rate limiting for the range sweep.
//!
//! Token bucket limiting on how many hosts the range scanner starts per
//! second, so a sweep of a /16 does not hammer the segment.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared hosts-per-second limiter.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` operations per second.
    ///
    /// Returns `None` for a rate of 0, which means "unlimited".
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        let limiter = GovLimiter::direct(Quota::per_second(rate));

        Some(Self {
            limiter: Arc::new(limiter),
        })
    }

    /// Wait until the limit allows another operation.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token without waiting; `false` if none is available.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[tokio::test]
    async fn test_rate_limiter_wait() {
        let limiter = RateLimiter::new(1000).unwrap();
        assert!(limiter.try_acquire());
        limiter.wait().await;
    }

    #[test]
    fn test_clones_share_the_bucket() {
        let first = RateLimiter::new(1).unwrap();
        let second = first.clone();

        assert!(first.try_acquire());
        assert!(!second.try_acquire());
    }
}
