//! Error types for the database facade.

use tessera_core::{CoreError, ValidationError};
use tessera_store::StoreError;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A blocking task failed to complete.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<CoreError> for TesseraError {
    fn from(e: CoreError) -> Self {
        TesseraError::Store(e.into())
    }
}

impl From<ValidationError> for TesseraError {
    fn from(e: ValidationError) -> Self {
        TesseraError::Store(e.into())
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, TesseraError>;
