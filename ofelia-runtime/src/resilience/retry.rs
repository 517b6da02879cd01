use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

/// §4.2 Retry policy parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    /// Defaults from §4.4 `AddJob`: maxAttempts 3, initial 2s, max 60s,
    /// factor 2.0, jitter 0.1.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `k` (1-indexed, the attempt that's about to be
    /// made), per §4.2: `min(maxDelay, initialDelay * factor^(k-1)) * (1 +
    /// U(-jitter, +jitter))`. Attempt 1 has no preceding delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1) as i32 - 1;
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(-self.jitter_factor..=self.jitter_factor);
        let jittered = (capped * (1.0 + jitter)).max(0.0);
        Duration::from_secs_f64(jittered)
    }

    /// Runs `op` under this policy. `retryable` is consulted after every
    /// failure (§4.2); cancellation is checked via the `Err(Error)`
    /// returned by `op` itself — the caller wires a cancellable future.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                let delay = self.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let retryable = e.is_retryable();
                    if !retryable || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            backoff_factor: 10.0,
            jitter_factor: 0.0,
        };
        let delay = policy.delay_for_attempt(5);
        assert!(delay <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn max_attempts_one_runs_exactly_once() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let result: Result<()> = policy
            .run(|_attempt| {
                calls += 1;
                async { Err(Error::Timeout) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<()> = policy
            .run(|_attempt| {
                calls += 1;
                async { Err(Error::CircuitOpen) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        tokio::time::pause();
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        };
        let result = policy
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(Error::Adapter(ofelia_client::Error::Transient(
                        "connection reset".into(),
                    )))
                } else {
                    Ok::<_, Error>(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }
}
