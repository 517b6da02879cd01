use thiserror::Error;

/// Errors raised by the container adapter (§7 Error Handling Design).
///
/// Every engine failure is categorized as transient or permanent at the
/// point it's observed; the adapter never retries on its own — "transient
/// ones are retried by the caller, not by the adapter" (§4.1).
#[derive(Error, Debug)]
pub enum Error {
    /// A 404/400-class or "not found"/"invalid" style failure. Not
    /// retryable by policy.
    #[error("container engine error (permanent): {0}")]
    Permanent(String),

    /// Connection resets, timeouts talking to the daemon, and other
    /// recoverable failures. Retryable by policy.
    #[error("container engine error (transient): {0}")]
    Transient(String),

    /// The operation's context was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// Underlying bollard/Docker Engine API error, preserved for its
    /// `Display` impl and classified via [`Error::from_bollard`].
    #[error("docker engine error: {0}")]
    Engine(#[from] bollard::errors::Error),
}

impl Error {
    /// True when `retryable(error)` (§4.2 Retry policy) should say yes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Engine(_))
    }

    pub fn from_bollard(err: bollard::errors::Error) -> Self {
        match &err {
            bollard::errors::Error::DockerResponseServerError { status_code, .. }
                if (400..500).contains(status_code) =>
            {
                Error::Permanent(err.to_string())
            }
            _ => Error::Transient(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
