//! Per-job resilience primitives (§4.2): retry policy, circuit breaker,
//! bulkhead, and rate limiter, composed by the dispatcher in that order
//! (outer to inner): rate-limit check, bulkhead acquire, circuit breaker,
//! retry loop, `job.Run`.

pub mod bulkhead;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::CircuitBreaker;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;

/// The resilience triplet attached to every job at `AddJob` time (§3
/// RuntimeFields, §4.4 defaults). Held by the scheduler in a name-keyed
/// map parallel to the registry — see `ofelia_core::job::RuntimeFields`'s
/// doc comment for why this lives in `ofelia-runtime` rather than on `Job`
/// itself.
pub struct ResilienceTriplet {
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreaker,
    pub bulkhead: Bulkhead,
    pub rate_limiter: RateLimiter,
}

impl Default for ResilienceTriplet {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreaker::with_defaults(),
            bulkhead: Bulkhead::with_defaults(),
            rate_limiter: RateLimiter::with_defaults(),
        }
    }
}
