use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Token-bucket rate limiter (§4.2): rate `r` per minute, burst `b`.
///
/// `Allow` is non-blocking; `Wait` suspends the caller until a token is
/// available. Each key (typically a job name) owns one bucket; idle
/// buckets are reclaimed by the caller's periodic cleanup (§3 Token entry),
/// since this type only models a single bucket — `RateLimiterRegistry`
/// below owns the name-keyed map and cleanup.
pub struct RateLimiter {
    rate_per_minute: f64,
    burst: f64,
    state: Mutex<BucketState>,
    notify: Notify,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(rate_per_minute: f64, burst: u32) -> Self {
        Self {
            rate_per_minute: rate_per_minute.max(0.0),
            burst: f64::from(burst.max(1)),
            state: Mutex::new(BucketState {
                tokens: f64::from(burst.max(1)),
                last_refill: Instant::now(),
            }),
            notify: Notify::new(),
        }
    }

    /// Defaults from §4.4 `AddJob`: rate 1/s (60/min), burst 10.
    pub fn with_defaults() -> Self {
        Self::new(60.0, 10)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let refreshed = elapsed * (self.rate_per_minute / 60.0);
        if refreshed > 0.0 {
            state.tokens = (state.tokens + refreshed).min(self.burst);
            state.last_refill = now;
        }
    }

    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub async fn wait(&self) {
        loop {
            if self.allow() {
                return;
            }
            let wait_hint = {
                let state = self.state.lock();
                let deficit = 1.0 - state.tokens;
                let seconds = deficit / (self.rate_per_minute.max(0.001) / 60.0);
                Duration::from_secs_f64(seconds.max(0.001))
            };
            tokio::select! {
                _ = tokio::time::sleep(wait_hint) => {}
                _ = self.notify.notified() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_permits_are_consumed_then_denied() {
        let limiter = RateLimiter::new(60.0, 3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_unblocks_once_a_token_refills() {
        let limiter = RateLimiter::new(600.0, 1); // 10/sec
        assert!(limiter.allow());
        assert!(!limiter.allow());
        tokio::time::timeout(Duration::from_secs(1), limiter.wait())
            .await
            .expect("wait should resolve once the bucket refills");
    }
}
