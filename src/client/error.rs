use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    error::ServiceError,
    state::{session::EditError, spin::SpinError, tiebreak::NotApplicable},
};

/// Failures surfaced by the session client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session, user or game does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The id is already taken.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The store could not be reached; the next poll retries.
    #[error("transient I/O failure: {0}")]
    TransientIo(String),
    /// Input rejected before reaching the store.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Game and vote edits need a bound identity.
    #[error("pick or create a profile first")]
    IdentityRequired,
    /// No session has been loaded yet.
    #[error("session not loaded")]
    NotReady,
    /// The client is already loading or syncing a session.
    #[error("client is busy with session `{0}`")]
    Busy(String),
    /// The list holds no tie to draw from; a clear winner is carried along.
    #[error("no draw: {0}")]
    NoDraw(#[from] NotApplicable),
    /// The wheel rejected the draw.
    #[error("spin failed: {0}")]
    Spin(#[from] SpinError),
}

impl From<EditError> for ClientError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::UnknownGame(_) | EditError::UnknownUser(_) => {
                ClientError::NotFound(err.to_string())
            }
            EditError::DuplicateGame(_) | EditError::DuplicateUser(_) => {
                ClientError::Conflict(err.to_string())
            }
            EditError::Blank(_) => ClientError::Validation(err.to_string()),
        }
    }
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => ClientError::Conflict(err.to_string()),
            StorageError::NotFound { .. } => ClientError::NotFound(err.to_string()),
            StorageError::Unavailable { .. } => ClientError::TransientIo(err.to_string()),
        }
    }
}

impl From<ServiceError> for ClientError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => ClientError::NotFound(message),
            ServiceError::Conflict(message) | ServiceError::InvalidState(message) => {
                ClientError::Conflict(message)
            }
            ServiceError::InvalidInput(message) => ClientError::Validation(message),
            ServiceError::Unavailable(_) | ServiceError::Degraded | ServiceError::Unauthorized(_) => {
                ClientError::TransientIo(err.to_string())
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::TransientIo(err.to_string())
    }
}
