//! # Tessera Core
//!
//! Pure primitives for tessera: the value codec, chunking, byte range
//! arithmetic, key normalization and relative timestamps.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! values and byte offsets; `tessera-store` binds it to SQLite.
//!
//! ## Key Types
//!
//! - [`Value`] - A storable value (CBOR data model)
//! - [`Datatype`] - Coarse tag selecting the decode path
//! - [`Key`] - Integer or string key-value store key
//! - [`ChunkSlice`] - One chunk's share of a byte range
//! - [`Clock`] - A store's epoch and timestamp unit
//!
//! ## Chunking
//!
//! Payloads are split into fixed-size chunks on write and streamed back
//! through the deserializer on read. See the [`chunk`] module.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod key;
pub mod range;
pub mod time;
pub mod types;

pub use ciborium::value::Value;

pub use chunk::{
    decode, decode_chunks, encode, encode_chunks, split_binary, ChunkError, ChunkReader,
    ChunkWriter, Encoded, DEFAULT_CHUNK_SIZE,
};
pub use codec::{deserialize, deserialize_range, from_value, serialize, serialize_into, to_value, FieldRange};
pub use error::{CoreError, ValidationError};
pub use key::normalize_key;
pub use range::{byte_index, resolve_range, update_position, ByteSlice, ChunkSlice};
pub use time::{Clock, TimeRange, TimestampPrecision};
pub use types::{describe, Datatype, Key, RecordId};

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
