use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// Downstream crates (`ofelia-client`, `ofelia-runtime`) widen this with
/// their own `#[from]` variants rather than replacing it.
#[derive(Error, Debug)]
pub enum Error {
    /// A job was registered with an empty schedule string.
    #[error("job schedule must not be empty")]
    EmptySchedule,

    /// A cron/schedule expression could not be parsed.
    #[error("invalid schedule {0:?}: {1}")]
    InvalidSchedule(String, String),

    /// The job's command string could not be tokenized.
    #[error("invalid command line {0:?}: {1}")]
    InvalidCommand(String, String),

    /// An execution was elided rather than run: coalesced, dependency-gated,
    /// or rate-limited. Not a failure.
    #[error("execution skipped: {0}")]
    SkippedExecution(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
