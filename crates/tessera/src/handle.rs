//! Async handle for tokio applications.
//!
//! SQLite calls block, so every call runs on tokio's blocking pool against a
//! shared [`Tessera`]. Calls on one handle are serialized by the database's
//! connection lock.

use std::path::Path;
use std::sync::Arc;

use tessera_core::{Key, RecordId, Value};
use tessera_store::StoreConfig;

use crate::error::{Result, TesseraError};
use crate::tessera::Tessera;

/// Cloneable async handle to a database.
#[derive(Debug, Clone)]
pub struct AsyncTessera {
    db: Arc<Tessera>,
}

impl AsyncTessera {
    pub fn new(db: Tessera) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Open a database file on the blocking pool.
    pub async fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || Tessera::open(path, config))
            .await
            .map_err(join_error)??;
        Ok(Self::new(db))
    }

    /// The shared database, for synchronous use.
    pub fn inner(&self) -> &Tessera {
        &self.db
    }

    /// Run `f` against the database on the blocking pool.
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tessera) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(join_error)?
    }

    pub async fn kv_get(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = key.into();
        self.call(move |db| Ok(db.kv().get(key)?)).await
    }

    pub async fn kv_set(&self, key: impl Into<Key>, value: Value) -> Result<Option<RecordId>> {
        let key = key.into();
        self.call(move |db| Ok(db.kv().set(key, &value)?)).await
    }

    pub async fn append(&self, value: Value) -> Result<Option<RecordId>> {
        self.call(move |db| Ok(db.depot().append(&value)?)).await
    }

    pub async fn enqueue(&self, value: Value) -> Result<Option<RecordId>> {
        self.call(move |db| Ok(db.queue().enqueue(&value)?)).await
    }

    pub async fn dequeue(&self) -> Result<Option<Value>> {
        self.call(|db| Ok(db.queue().dequeue()?)).await
    }

    pub async fn push(&self, value: Value) -> Result<Option<RecordId>> {
        self.call(move |db| Ok(db.stack().push(&value)?)).await
    }

    pub async fn pop(&self) -> Result<Option<Value>> {
        self.call(|db| Ok(db.stack().pop()?)).await
    }
}

impl From<Tessera> for AsyncTessera {
    fn from(db: Tessera) -> Self {
        Self::new(db)
    }
}

fn join_error(e: tokio::task::JoinError) -> TesseraError {
    TesseraError::Runtime(format!("blocking task failed: {}", e))
}
