//! Error types for the store module.

use thiserror::Error;

use tessera_core::{ChunkError, CoreError, ValidationError};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite, including busy timeouts and constraint
    /// violations. Never retried here.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value encoding or decoding error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid input from the caller.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A write through a read-only view or connection.
    #[error("read-only: writes are not permitted")]
    ReadOnly,

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ChunkError<rusqlite::Error>> for StoreError {
    fn from(e: ChunkError<rusqlite::Error>) -> Self {
        match e {
            ChunkError::Codec(e) => StoreError::Core(e),
            ChunkError::Sink(e) => StoreError::Database(e),
        }
    }
}

impl StoreError {
    pub(crate) fn into_io(self) -> std::io::Error {
        use std::io::{Error, ErrorKind};
        match self {
            StoreError::Io(e) => e,
            StoreError::Validation(e) => Error::new(ErrorKind::InvalidInput, e),
            StoreError::ReadOnly => Error::new(ErrorKind::PermissionDenied, StoreError::ReadOnly),
            other => Error::new(ErrorKind::Other, other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
