use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record with the same primary key already exists.
    #[error("session `{id}` already exists")]
    Conflict { id: String },
    /// The targeted record does not exist.
    #[error("session `{id}` not found")]
    NotFound { id: String },
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Duplicate primary key on insert.
    pub fn conflict(id: impl Into<String>) -> Self {
        StorageError::Conflict { id: id.into() }
    }

    /// Missing record on read or overwrite.
    pub fn not_found(id: impl Into<String>) -> Self {
        StorageError::NotFound { id: id.into() }
    }
}
