use thiserror::Error;

/// The facade's error type: a thin re-export of [`ofelia_runtime::Error`],
/// widened only with errors raised while wiring a [`crate::OfeliaBuilder`].
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Runtime(#[from] ofelia_runtime::Error),

    #[error(transparent)]
    Core(#[from] ofelia_core::Error),

    #[error(transparent)]
    Client(#[from] ofelia_client::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
