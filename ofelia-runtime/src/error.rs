use thiserror::Error;

/// Runtime-level error taxonomy (§7), widening [`ofelia_core::Error`] and
/// [`ofelia_client::Error`] with the resilience-layer and dispatch-layer
/// kinds that only make sense once a job is actually running.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ofelia_core::Error),

    #[error(transparent)]
    Adapter(#[from] ofelia_client::Error),

    #[error(transparent)]
    Registry(#[from] ofelia_core::RegistryError),

    /// §7 `ErrRateLimitExceeded`: surfaced only to a manual `RunJob` caller
    /// that used the non-blocking rate-limiter path.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// §7 `ErrCircuitOpen`.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// §7 `ErrBulkheadFull`: only raised by the non-blocking bulkhead
    /// variant.
    #[error("bulkhead is full")]
    BulkheadFull,

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("job {0:?} is not active")]
    JobNotActive(String),

    #[error("job {0:?} was blocked by the workflow orchestrator")]
    WorkflowBlocked(String),
}

impl Error {
    /// §4.2 retry composition: cancellation-like errors and explicit
    /// "skipped" signals are non-retryable; adapter errors delegate to
    /// their own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Adapter(e) => e.is_retryable(),
            Error::Cancelled | Error::Timeout | Error::CircuitOpen | Error::BulkheadFull => false,
            Error::RateLimitExceeded | Error::JobNotActive(_) | Error::WorkflowBlocked(_) => false,
            Error::Core(_) | Error::Registry(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
