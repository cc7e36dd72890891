//! Error types for tessera core.

use thiserror::Error;

/// Errors that can occur while turning values into payload bytes and back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The value has no datatype tag and cannot be stored.
    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Invalid input supplied by the caller.
///
/// These are reported synchronously and are never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An offset that is not allowed for its seek origin.
    #[error("invalid offset {offset} for seek origin '{origin}'")]
    InvalidSeekOffset { origin: &'static str, offset: i64 },

    /// A seek that would move the cursor outside `[0, len]`.
    #[error("offset out of range: {position} is outside [0, {len}]")]
    PositionOutOfRange { position: i128, len: u64 },

    /// Slices over a blob only support a step of 1.
    #[error("slice step must be 1, got {0}")]
    NonUnitStep(i64),

    /// A key that cannot be mapped to an integer or string key.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// A chunk ordinal past the record's known extent.
    #[error("chunk index {index} out of range (record has {chunks} chunks)")]
    ChunkOutOfRange { index: usize, chunks: usize },
}
