use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: State,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

/// A per-job circuit breaker (§4.2): closed/open/half-open, guarding a
/// failing dependency from repeated calls.
///
/// `opened_at` and `state` are mutated together under one short-held lock
/// so that "the first caller to arrive after resetTimeout performs the
/// state transition atomically" (§9) — there is no separate compare-and-
/// swap, just a single critical section covering the read-then-transition.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    consecutive_failures: AtomicU32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            consecutive_failures: AtomicU32::new(0),
            inner: Mutex::new(Inner {
                state: State::Closed,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
        }
    }

    /// Defaults from §4.4 `AddJob`: threshold 5, reset 30s.
    pub fn with_defaults() -> Self {
        Self::new(5, Duration::from_secs(30))
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Called by the dispatcher before attempting the call. Returns
    /// `Err(CircuitOpen)` if the call should be rejected; otherwise admits
    /// the call, marking it as the half-open probe if applicable.
    pub fn before_call(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => Ok(()),
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    inner.half_open_probe_in_flight = true;
                    Ok(())
                } else {
                    Err(Error::CircuitOpen)
                }
            }
            State::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    Err(Error::CircuitOpen)
                } else {
                    inner.half_open_probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn on_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        inner.state = State::Closed;
        inner.opened_at = None;
        inner.half_open_probe_in_flight = false;
    }

    pub fn on_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_probe_in_flight = false;
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            State::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(30));
        for _ in 0..2 {
            cb.before_call().unwrap();
            cb.on_failure();
            assert_eq!(cb.state(), State::Closed);
        }
        cb.before_call().unwrap();
        cb.on_failure();
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn open_rejects_immediately() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(30));
        cb.before_call().unwrap();
        cb.on_failure();
        assert!(matches!(cb.before_call(), Err(Error::CircuitOpen)));
    }

    #[test]
    fn half_open_allows_single_probe() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(1));
        cb.before_call().unwrap();
        cb.on_failure();
        std::thread::sleep(Duration::from_millis(5));
        cb.before_call().unwrap();
        assert_eq!(cb.state(), State::HalfOpen);
        assert!(matches!(cb.before_call(), Err(Error::CircuitOpen)));
    }

    #[test]
    fn success_in_half_open_closes_and_resets_counter() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(1));
        cb.before_call().unwrap();
        cb.on_failure();
        std::thread::sleep(Duration::from_millis(5));
        cb.before_call().unwrap();
        cb.on_success();
        assert_eq!(cb.state(), State::Closed);
        cb.before_call().unwrap();
    }
}
