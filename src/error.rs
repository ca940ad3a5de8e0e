use crate::checkpoint::{BackendInitError, CheckpointError};
use crate::comm::CommError;
use thiserror::Error;

/// Fatal run failures. None of these are retried here, retry policy
/// belongs to the checkpoint backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any collective is entered, every rank fails
    /// identically.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("error initializing checkpoint backend: {0}")]
    BackendInit(#[from] BackendInitError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Comm(#[from] CommError),
}

impl Error {
    /// Process exit code for this failure, so operators can tell
    /// infrastructure failures from computation failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 3,
            Error::BackendInit(_) => 2,
            Error::Checkpoint(_) | Error::Comm(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
