//! # Tessera
//!
//! An embedded record store with four data models in one SQLite file.
//!
//! ## Overview
//!
//! - **Key-value**: values under integer or string keys
//! - **Depot**: an append-only log, addressed by uid or position
//! - **Queue** and **Stack**: FIFO and LIFO
//!
//! Every value is stored as a record whose serialized payload is split into
//! fixed-size chunks. Large payloads can be streamed through a seekable
//! reader, and a single top-level field of a map can be loaded without
//! decoding the rest.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tessera::{Tessera, StoreConfig};
//! use tessera::core::{to_value, Value};
//!
//! let db = Tessera::open("app.db", StoreConfig::default()).unwrap();
//!
//! let user = to_value(&("alex", 42)).unwrap();
//! db.kv().set("user:1", &user).unwrap();
//!
//! db.depot().append(&Value::Text("event".into())).unwrap();
//! db.queue().enqueue(&Value::Bool(true)).unwrap();
//!
//! // Several stores, one atomic commit.
//! db.write_transaction(|tx| {
//!     tx.stack().push(&Value::Integer(1.into()))?;
//!     tx.kv().delete("user:1")?;
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! ## Re-exports
//!
//! - `tessera::core` - Values, codec, chunking and byte-range arithmetic
//! - `tessera::store` - The SQLite binding and the four stores

pub mod error;
pub mod handle;
pub mod tessera;

pub use tessera_core as core;
pub use tessera_store as store;

pub use crate::error::{Result, TesseraError};
pub use crate::handle::AsyncTessera;
pub use crate::tessera::{ModelStats, Tessera};

pub use tessera_core::{Datatype, Key, RecordId, TimeRange, TimestampPrecision, Value};
pub use tessera_store::{
    BlobReader, Depot, JournalMode, Kv, ListOptions, Model, Queue, RecordInfo, Stack, Store,
    StoreConfig, StoreError, SyncMode, Txn,
};
