//! Store configuration.

use std::time::Duration;

use tessera_core::{TimestampPrecision, DEFAULT_CHUNK_SIZE};

/// Configuration for opening a store.
///
/// `chunk_size` and `timestamp_precision` only apply when the database is
/// created; an existing database keeps the values it was created with.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum chunk length in bytes. 0 falls back to the default.
    pub chunk_size: usize,
    /// Resolution of record timestamps.
    pub timestamp_precision: TimestampPrecision,
    /// How long to wait on a locked database before failing.
    pub timeout: Duration,
    /// Open the database read-only.
    pub read_only: bool,
    /// Create the database file if it does not exist.
    pub auto_create: bool,
    /// Treat string keys made only of ASCII digits as integer keys in the kv
    /// store. Other Unicode digits never coerce.
    pub coerce_ascii_numeric_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timestamp_precision: TimestampPrecision::Milliseconds,
            timeout: Duration::from_secs(5),
            read_only: false,
            auto_create: true,
            coerce_ascii_numeric_keys: true,
        }
    }
}

impl StoreConfig {
    /// The chunk size to use for a new database.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}
