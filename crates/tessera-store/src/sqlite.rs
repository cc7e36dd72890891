//! SQLite binding: connection, persisted metadata and transaction scoping.
//!
//! A [`SqliteStore`] owns one connection behind a mutex. Every public store
//! operation runs inside a transaction: reads use `BEGIN DEFERRED`, writes
//! use `BEGIN IMMEDIATE` so the write lock is taken before any row is
//! touched. Operations called from inside another operation's transaction
//! join it instead of opening their own, so batches commit atomically.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use tracing::debug;

use tessera_core::{Clock, TimestampPrecision};

use crate::config::StoreConfig;
use crate::depot::Depot;
use crate::error::{Result, StoreError};
use crate::kv::Kv;
use crate::migration;
use crate::model::Model;
use crate::queue::Queue;
use crate::stack::Stack;
use crate::traits::StoreCore;

/// Format version written to new databases.
pub const FORMAT_VERSION: u32 = 1;

/// Database-wide settings, fixed at creation and read back on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub clock: Clock,
    pub chunk_size: usize,
    pub coerce_ascii_numeric_keys: bool,
    pub read_only: bool,
}

/// SQLite-based record store.
///
/// Thread-safe via an internal mutex; one operation holds the connection at a
/// time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    meta: Meta,
    path: Option<PathBuf>,
    is_new: bool,
    config: StoreConfig,
}

impl SqliteStore {
    /// Open a database file, creating and initializing it if needed.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();

        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if config.auto_create {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }

        let conn = Connection::open_with_flags(path, flags)?;
        Self::init(conn, config, Some(path.to_path_buf()), is_new)
    }

    /// Open a private in-memory database.
    ///
    /// Useful for testing.
    pub fn open_memory(config: StoreConfig) -> Result<Self> {
        let config = StoreConfig {
            read_only: false,
            ..config
        };
        let conn = Connection::open_in_memory()?;
        Self::init(conn, config, None, true)
    }

    fn init(
        mut conn: Connection,
        config: StoreConfig,
        path: Option<PathBuf>,
        is_new: bool,
    ) -> Result<Self> {
        conn.busy_timeout(config.timeout)?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA synchronous=NORMAL;")?;

        if !config.read_only {
            migration::migrate(&mut conn)?;
        }
        let meta = load_or_create_meta(&mut conn, &config)?;

        debug!(
            path = ?path,
            is_new,
            version = meta.version,
            chunk_size = meta.chunk_size,
            precision = ?meta.clock.precision(),
            read_only = meta.read_only,
            "opened store"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            meta,
            path,
            is_new,
            config,
        })
    }

    /// Open a second, independent connection to the same file.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.path {
            Some(path) => Self::open(path, self.config.clone()),
            None => Err(StoreError::InvalidData(
                "an in-memory database cannot be reopened".into(),
            )),
        }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Database file path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn in_memory(&self) -> bool {
        self.path.is_none()
    }

    /// Whether this open created the database.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_readonly(&self) -> bool {
        self.meta.read_only
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stores
    // ─────────────────────────────────────────────────────────────────────────

    pub fn kv(&self) -> Kv<'_> {
        Kv::new(self.scope())
    }

    pub fn depot(&self) -> Depot<'_> {
        Depot::new(self.scope())
    }

    pub fn queue(&self) -> Queue<'_> {
        Queue::new(self.scope())
    }

    pub fn stack(&self) -> Stack<'_> {
        Stack::new(self.scope())
    }

    pub(crate) fn scope(&self) -> Scope<'_> {
        Scope {
            target: Target::Database(self),
            meta: &self.meta,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `f` inside one deferred transaction.
    pub fn read_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> Result<T>,
    {
        self.transaction(TransactionBehavior::Deferred, |conn| {
            f(&Txn::new(Scope::within(conn, &self.meta)))
        })
    }

    /// Run `f` inside one immediate transaction; everything it does commits
    /// or rolls back together.
    pub fn write_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> Result<T>,
    {
        if self.meta.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.transaction(TransactionBehavior::Immediate, |conn| {
            f(&Txn::new(Scope::within(conn, &self.meta)))
        })
    }

    fn transaction<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Execute a blocking operation on the connection, outside any
    /// transaction.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild the database file, reclaiming free pages.
    pub fn vacuum(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM")?;
            Ok(())
        })
    }

    /// Write a compacted copy of the database to `dest`.
    pub fn vacuum_into(&self, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref().to_string_lossy().into_owned();
        self.with_conn(|conn| {
            conn.execute("VACUUM INTO ?1", [dest])?;
            Ok(())
        })
    }

    pub fn journal_mode(&self) -> Result<JournalMode> {
        self.with_conn(|conn| {
            let mode: String =
                conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
            mode.parse()
        })
    }

    /// Set the journal mode, returning the mode SQLite actually applied.
    pub fn set_journal_mode(&self, mode: JournalMode) -> Result<JournalMode> {
        self.with_conn(|conn| {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode.as_str(), |row| {
                    row.get(0)
                })?;
            applied.parse()
        })
    }

    pub fn sync_mode(&self) -> Result<SyncMode> {
        self.with_conn(|conn| {
            let level: i64 = conn.pragma_query_value(None, "synchronous", |row| row.get(0))?;
            SyncMode::from_level(level)
                .ok_or_else(|| StoreError::InvalidData(format!("unknown sync level: {}", level)))
        })
    }

    pub fn set_sync_mode(&self, mode: SyncMode) -> Result<()> {
        self.with_conn(|conn| {
            conn.pragma_update(None, "synchronous", mode.as_str())?;
            Ok(())
        })
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Read the info row, writing it first for a new database.
fn load_or_create_meta(conn: &mut Connection, config: &StoreConfig) -> Result<Meta> {
    let has_info: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'tessera_info'",
        [],
        |row| row.get(0),
    )?;
    if !has_info {
        return Err(StoreError::InvalidData("not a tessera database".into()));
    }

    let select = "SELECT version, created_at, chunk_size, timestamp_precision FROM tessera_info";
    let read = |conn: &Connection| -> Result<Option<(u32, String, i64, u32)>> {
        Ok(conn
            .query_row(select, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?)
    };

    let row = if config.read_only {
        read(&*conn)?
    } else {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let row = match read(&*tx)? {
            Some(row) => Some(row),
            None => {
                let epoch = Utc::now();
                let chunk_size = config.effective_chunk_size();
                let exponent = config.timestamp_precision.exponent();
                tx.execute(
                    "INSERT INTO tessera_info (version, created_at, chunk_size, timestamp_precision)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        FORMAT_VERSION,
                        epoch.to_rfc3339_opts(SecondsFormat::Nanos, true),
                        chunk_size as i64,
                        exponent
                    ],
                )?;
                debug!(chunk_size, exponent, "initialized database info");
                read(&*tx)?
            }
        };
        tx.commit()?;
        row
    };

    let (version, created_at, chunk_size, exponent) =
        row.ok_or_else(|| StoreError::InvalidData("missing database info".into()))?;

    let epoch = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::InvalidData(format!("bad created_at {:?}: {}", created_at, e)))?
        .with_timezone(&Utc);
    let precision = TimestampPrecision::from_exponent(exponent)
        .ok_or_else(|| StoreError::InvalidData(format!("bad timestamp precision: {}", exponent)))?;
    let chunk_size = usize::try_from(chunk_size)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| StoreError::InvalidData(format!("bad chunk size: {}", chunk_size)))?;

    Ok(Meta {
        version,
        clock: Clock::new(epoch, precision),
        chunk_size,
        coerce_ascii_numeric_keys: config.coerce_ascii_numeric_keys,
        read_only: config.read_only,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Scopes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Target<'a> {
    /// Not in a transaction yet; each operation opens its own.
    Database(&'a SqliteStore),
    /// Inside an open transaction; operations join it.
    Transaction(&'a Connection),
}

/// Where a store operation runs.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    target: Target<'a>,
    meta: &'a Meta,
}

impl<'a> Scope<'a> {
    pub(crate) fn within(conn: &'a Connection, meta: &'a Meta) -> Self {
        Self {
            target: Target::Transaction(conn),
            meta,
        }
    }

    pub fn meta(&self) -> &'a Meta {
        self.meta
    }

    /// Run `f` in a read transaction, or in the enclosing one.
    pub(crate) fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        match self.target {
            Target::Transaction(conn) => f(conn),
            Target::Database(store) => store.transaction(TransactionBehavior::Deferred, f),
        }
    }

    /// Run `f` in a write transaction, or in the enclosing one.
    pub(crate) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.meta.read_only {
            return Err(StoreError::ReadOnly);
        }
        match self.target {
            Target::Transaction(conn) => f(conn),
            Target::Database(store) => store.transaction(TransactionBehavior::Immediate, f),
        }
    }
}

/// Handle to an open transaction.
///
/// Stores obtained here join the transaction instead of opening their own.
/// Do not use the [`SqliteStore`] itself inside the closure: the connection is
/// held for the duration of the transaction.
pub struct Txn<'a> {
    scope: Scope<'a>,
}

impl<'a> Txn<'a> {
    fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    pub fn kv(&self) -> Kv<'a> {
        Kv::new(self.scope)
    }

    pub fn depot(&self) -> Depot<'a> {
        Depot::new(self.scope)
    }

    pub fn queue(&self) -> Queue<'a> {
        Queue::new(self.scope)
    }

    pub fn stack(&self) -> Stack<'a> {
        Stack::new(self.scope)
    }

    /// The shared operations of any model, for whole-database aggregates.
    pub fn core(&self, model: Model) -> StoreCore<'a> {
        StoreCore::new(self.scope, model)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pragmas
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

impl FromStr for JournalMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(JournalMode::Delete),
            "TRUNCATE" => Ok(JournalMode::Truncate),
            "PERSIST" => Ok(JournalMode::Persist),
            "MEMORY" => Ok(JournalMode::Memory),
            "WAL" => Ok(JournalMode::Wal),
            "OFF" => Ok(JournalMode::Off),
            other => Err(StoreError::InvalidData(format!("unknown journal mode: {}", other))),
        }
    }
}

/// SQLite `synchronous` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
            SyncMode::Extra => "EXTRA",
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(SyncMode::Off),
            1 => Some(SyncMode::Normal),
            2 => Some(SyncMode::Full),
            3 => Some(SyncMode::Extra),
            _ => None,
        }
    }
}
