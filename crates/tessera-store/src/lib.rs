//! # Tessera Store
//!
//! SQLite binding for tessera. Values are stored as records, each split into
//! ordered chunk rows, in four data models sharing one layout.
//!
//! ## Overview
//!
//! A [`SqliteStore`] owns the connection and the database's persisted
//! settings. The stores it hands out are cheap handles that borrow it:
//!
//! - [`Kv`] - Values addressed by integer or string key
//! - [`Depot`] - Append-only log addressed by uid or position
//! - [`Queue`] - FIFO
//! - [`Stack`] - LIFO
//!
//! Operations common to all four (counters, `latest`, `delete_all`) come
//! from the [`Store`] trait. A record's payload can be streamed without
//! loading it through a [`BlobReader`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tessera_store::{SqliteStore, Store, StoreConfig};
//! use tessera_core::Value;
//!
//! let store = SqliteStore::open("data.db", StoreConfig::default()).unwrap();
//!
//! let kv = store.kv();
//! kv.set("greeting", &Value::Text("hello".into())).unwrap();
//! assert!(kv.exists("greeting").unwrap());
//!
//! // Batches commit atomically.
//! store
//!     .write_transaction(|tx| {
//!         tx.queue().enqueue(&Value::Bool(true))?;
//!         tx.depot().append(&Value::Integer(1.into()))?;
//!         Ok(())
//!     })
//!     .unwrap();
//! assert_eq!(store.queue().count_records().unwrap(), 1);
//! ```
//!
//! ## Design Notes
//!
//! - **Delete-then-insert**: setting an existing key replaces its record; the
//!   uid changes
//! - **Snapshot readers**: a blob reader's byte and chunk totals are fixed
//!   when it opens
//! - **Joined transactions**: operations inside a transaction handle run in
//!   that transaction instead of opening their own

pub mod blob;
pub mod config;
pub mod depot;
pub mod error;
pub mod kv;
pub mod migration;
pub mod model;
pub mod queue;
pub mod records;
pub mod sqlite;
pub mod stack;
pub mod traits;

pub use blob::{BlobReader, ChunkAccess, ChunkSource, MemoryChunks, SqliteChunks};
pub use config::StoreConfig;
pub use depot::{Depot, DepotIter};
pub use error::{Result, StoreError};
pub use kv::{Kv, KvIter};
pub use model::Model;
pub use queue::Queue;
pub use records::RecordInfo;
pub use sqlite::{JournalMode, Meta, Scope, SqliteStore, SyncMode, Txn, FORMAT_VERSION};
pub use stack::Stack;
pub use traits::{ListOptions, Store, StoreCore};
