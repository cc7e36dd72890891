//! The database: one file holding the four stores.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use tessera_core::TimestampPrecision;
use tessera_store::{
    Depot, JournalMode, Kv, Model, Queue, SqliteStore, Stack, StoreConfig, SyncMode, Txn,
};

use crate::error::Result;

/// Record and byte totals of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStats {
    pub model: Model,
    pub records: u64,
    pub bytes: u64,
}

/// An open tessera database.
///
/// Store handles borrow the database; every call on them runs in its own
/// transaction unless made through a transaction handle.
pub struct Tessera {
    store: SqliteStore,
}

impl Tessera {
    /// Open a database file, creating it if allowed by `config`.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let store = SqliteStore::open(path, config)?;
        Ok(Self { store })
    }

    /// Open a private in-memory database.
    pub fn open_memory(config: StoreConfig) -> Result<Self> {
        let store = SqliteStore::open_memory(config)?;
        Ok(Self { store })
    }

    /// The underlying SQLite binding.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn kv(&self) -> Kv<'_> {
        self.store.kv()
    }

    pub fn depot(&self) -> Depot<'_> {
        self.store.depot()
    }

    pub fn queue(&self) -> Queue<'_> {
        self.store.queue()
    }

    pub fn stack(&self) -> Stack<'_> {
        self.store.stack()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Aggregates
    // ─────────────────────────────────────────────────────────────────────────

    /// Record and byte totals per model, read in one transaction.
    pub fn scan(&self) -> Result<Vec<ModelStats>> {
        Ok(self.store.read_transaction(|tx| {
            Model::ALL
                .iter()
                .map(|&model| -> tessera_store::Result<ModelStats> {
                    let core = tx.core(model);
                    Ok(ModelStats {
                        model,
                        records: core.count_records()?,
                        bytes: core.count_bytes()?,
                    })
                })
                .collect()
        })?)
    }

    /// Creation time of the newest record in any model.
    pub fn latest(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.store.read_transaction(|tx| {
            let mut latest: Option<DateTime<Utc>> = None;
            for model in Model::ALL {
                latest = latest.max(tx.core(model).latest()?);
            }
            Ok(latest)
        })?)
    }

    pub fn count_records(&self) -> Result<u64> {
        self.sum(|tx, model| tx.core(model).count_records())
    }

    pub fn count_bytes(&self) -> Result<u64> {
        self.sum(|tx, model| tx.core(model).count_bytes())
    }

    pub fn count_chunks(&self) -> Result<u64> {
        self.sum(|tx, model| tx.core(model).count_chunks())
    }

    fn sum<F>(&self, f: F) -> Result<u64>
    where
        F: Fn(&Txn<'_>, Model) -> tessera_store::Result<u64>,
    {
        Ok(self.store.read_transaction(|tx| {
            Model::ALL
                .iter()
                .try_fold(0u64, |total, &model| -> tessera_store::Result<u64> {
                    Ok(total + f(tx, model)?)
                })
        })?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `f` in one read transaction; the stores it uses see one snapshot.
    pub fn read_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> tessera_store::Result<T>,
    {
        Ok(self.store.read_transaction(f)?)
    }

    /// Run `f` in one write transaction. If `f` fails, nothing it wrote is
    /// kept.
    pub fn write_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> tessera_store::Result<T>,
    {
        Ok(self.store.write_transaction(f)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    pub fn in_memory(&self) -> bool {
        self.store.in_memory()
    }

    pub fn is_new(&self) -> bool {
        self.store.is_new()
    }

    pub fn is_readonly(&self) -> bool {
        self.store.is_readonly()
    }

    pub fn timeout(&self) -> Duration {
        self.store.timeout()
    }

    pub fn chunk_size(&self) -> usize {
        self.store.meta().chunk_size
    }

    pub fn timestamp_precision(&self) -> TimestampPrecision {
        self.store.meta().clock.precision()
    }

    /// The database's epoch.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.store.meta().clock.epoch()
    }

    /// Format version recorded at creation.
    pub fn version(&self) -> u32 {
        self.store.meta().version
    }

    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    pub fn vacuum(&self) -> Result<()> {
        debug!(path = ?self.path(), "vacuum");
        Ok(self.store.vacuum()?)
    }

    /// Write a compacted copy of the database to `dest`.
    pub fn vacuum_into(&self, dest: impl AsRef<Path>) -> Result<()> {
        Ok(self.store.vacuum_into(dest)?)
    }

    pub fn journal_mode(&self) -> Result<JournalMode> {
        Ok(self.store.journal_mode()?)
    }

    pub fn set_journal_mode(&self, mode: JournalMode) -> Result<JournalMode> {
        Ok(self.store.set_journal_mode(mode)?)
    }

    pub fn sync_mode(&self) -> Result<SyncMode> {
        Ok(self.store.sync_mode()?)
    }

    pub fn set_sync_mode(&self, mode: SyncMode) -> Result<()> {
        Ok(self.store.set_sync_mode(mode)?)
    }

    /// A new, independent connection to the same file.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            store: self.store.try_clone()?,
        })
    }
}

impl std::fmt::Debug for Tessera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tessera").field("store", &self.store).finish()
    }
}
