//! Store trait: the operations every data model shares.
//!
//! The four stores are thin policies over one [`StoreCore`], which knows the
//! model's tables and the transaction scope to run in. Whole-store counters,
//! `latest` and `delete_all` are provided here once for all of them.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::trace;
use tessera_core::{deserialize_range, ByteSlice, Clock, RecordId, TimeRange, Value};

use crate::blob::{BlobReader, SqliteChunks};
use crate::error::Result;
use crate::model::Model;
use crate::records::{self, RecordInfo, RecordRow};
use crate::sqlite::{Meta, Scope};

/// Shared record/chunk operations for one model.
#[derive(Clone, Copy)]
pub struct StoreCore<'a> {
    scope: Scope<'a>,
    model: Model,
}

impl<'a> StoreCore<'a> {
    pub(crate) fn new(scope: Scope<'a>, model: Model) -> Self {
        Self { scope, model }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn meta(&self) -> &'a Meta {
        self.scope.meta()
    }

    pub(crate) fn scope(&self) -> Scope<'a> {
        self.scope
    }

    /// A copy of this core bound to an open transaction.
    pub(crate) fn within<'c>(&self, conn: &'c Connection) -> StoreCore<'c>
    where
        'a: 'c,
    {
        StoreCore {
            scope: Scope::within(conn, self.scope.meta()),
            model: self.model,
        }
    }

    pub(crate) fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.scope.read(f)
    }

    pub(crate) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.scope.write(f)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Whole-store operations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn count_records(&self) -> Result<u64> {
        self.read(|conn| records::count_records(conn, self.model))
    }

    pub fn count_bytes(&self) -> Result<u64> {
        self.read(|conn| records::count_bytes(conn, self.model))
    }

    pub fn count_chunks(&self) -> Result<u64> {
        self.read(|conn| records::count_chunks(conn, self.model))
    }

    pub fn latest(&self) -> Result<Option<DateTime<Utc>>> {
        let ts = self.read(|conn| records::latest_timestamp(conn, self.model))?;
        Ok(ts.map(|ts| self.meta().clock.datetime(ts)))
    }

    pub fn delete_all(&self) -> Result<u64> {
        self.write(|conn| records::delete_all(conn, self.model))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-record helpers (caller holds a transaction)
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn info_of(&self, row: &RecordRow) -> RecordInfo {
        RecordInfo {
            uid: row.id,
            datatype: row.datatype,
            created_at: self.meta().clock.datetime(row.timestamp),
        }
    }

    pub(crate) fn insert(&self, conn: &Connection, value: &Value) -> Result<Option<RecordId>> {
        let meta = self.meta();
        records::insert_value(conn, self.model, value, meta.clock.now(), meta.chunk_size)
    }

    pub(crate) fn load(&self, conn: &Connection, row: &RecordRow) -> Result<Value> {
        records::load_payload(conn, self.model, row.id, row.datatype)
    }

    /// Open a reader over a record's payload, run `f`, then close the reader.
    pub(crate) fn with_blob<T, F>(&self, conn: &Connection, id: RecordId, f: F) -> Result<T>
    where
        F: FnOnce(&mut BlobReader<SqliteChunks<'_>>) -> Result<T>,
    {
        let bytes = records::record_bytes(conn, self.model, id)?;
        let chunks = records::record_chunks(conn, self.model, id)?;
        let mut blob = BlobReader::new(
            SqliteChunks::new(conn, self.model, id),
            bytes,
            chunks as usize,
            self.meta().chunk_size,
        );
        let out = f(&mut blob);
        blob.close();
        out
    }

    /// Decode one top-level field through its pointer.
    ///
    /// Only the field's byte range is read.
    pub(crate) fn load_field(
        &self,
        conn: &Connection,
        id: RecordId,
        field: &str,
    ) -> Result<Option<Value>> {
        let Some((start, stop)) = records::pointer(conn, self.model, field, id)? else {
            return Ok(None);
        };
        let slice = ByteSlice::new(Some(start as i64), Some(stop as i64));
        let data = self.with_blob(conn, id, |blob| blob.slice(slice))?;
        Ok(Some(deserialize_range(&data)?))
    }

    pub(crate) fn fields(&self) -> Result<Vec<String>> {
        self.read(|conn| records::pointed_fields(conn, self.model))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ordered models
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a value in its own write scope. `Null` is not stored.
    pub(crate) fn append(&self, value: &Value) -> Result<Option<RecordId>> {
        if records::check_value(value)?.is_none() {
            return Ok(None);
        }
        self.write(|conn| {
            let uid = self.insert(conn, value)?;
            trace!(model = %self.model, uid, "appended");
            Ok(uid)
        })
    }

    /// Append values in one write scope.
    pub(crate) fn append_many<'v, I>(&self, values: I) -> Result<Vec<Option<RecordId>>>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        self.write(|conn| {
            let core = self.within(conn);
            values.into_iter().map(|value| core.append(value)).collect()
        })
    }

    fn edge_record(&self, conn: &Connection, edge: Edge) -> Result<Option<RecordRow>> {
        match edge {
            Edge::Oldest => records::first_record(conn, self.model),
            Edge::Newest => records::last_record(conn, self.model),
        }
    }

    pub(crate) fn peek(&self, edge: Edge) -> Result<Option<Value>> {
        self.read(|conn| match self.edge_record(conn, edge)? {
            Some(row) => Ok(Some(self.load(conn, &row)?)),
            None => Ok(None),
        })
    }

    /// Read and delete the record at `edge` in one write scope.
    pub(crate) fn take(&self, edge: Edge) -> Result<Option<Value>> {
        self.write(|conn| {
            let Some(row) = self.edge_record(conn, edge)? else {
                return Ok(None);
            };
            let value = self.load(conn, &row)?;
            records::delete_record(conn, self.model, row.id)?;
            Ok(Some(value))
        })
    }

    pub(crate) fn edge_uid(&self, edge: Edge) -> Result<Option<RecordId>> {
        self.read(|conn| Ok(self.edge_record(conn, edge)?.map(|row| row.id)))
    }

    pub(crate) fn edge_info(&self, edge: Edge) -> Result<Option<RecordInfo>> {
        self.read(|conn| Ok(self.edge_record(conn, edge)?.map(|row| self.info_of(&row))))
    }

    pub(crate) fn edge_bytes(&self, edge: Edge) -> Result<u64> {
        self.read(|conn| match self.edge_record(conn, edge)? {
            Some(row) => records::record_bytes(conn, self.model, row.id),
            None => Ok(0),
        })
    }

    pub(crate) fn edge_chunks(&self, edge: Edge) -> Result<u64> {
        self.read(|conn| match self.edge_record(conn, edge)? {
            Some(row) => records::record_chunks(conn, self.model, row.id),
            None => Ok(0),
        })
    }
}

/// One end of an id-ordered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    /// Lowest id.
    Oldest,
    /// Highest id.
    Newest,
}

/// Operations shared by every store.
pub trait Store {
    /// The shared core this store is built on.
    fn core(&self) -> StoreCore<'_>;

    fn model(&self) -> Model {
        self.core().model()
    }

    /// Number of records in the store.
    fn count_records(&self) -> Result<u64> {
        self.core().count_records()
    }

    /// Total payload bytes across all records.
    fn count_bytes(&self) -> Result<u64> {
        self.core().count_bytes()
    }

    /// Total chunk rows across all records.
    fn count_chunks(&self) -> Result<u64> {
        self.core().count_chunks()
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.count_records()? == 0)
    }

    /// Creation time of the newest record, `None` for an empty store.
    fn latest(&self) -> Result<Option<DateTime<Utc>>> {
        self.core().latest()
    }

    /// Delete every record, returning how many were removed.
    fn delete_all(&self) -> Result<u64> {
        self.core().delete_all()
    }
}

/// Listing options for key and id scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only records created within this range.
    pub time_range: Option<TimeRange>,
    /// At most this many results.
    pub limit: Option<usize>,
    /// Newest/largest first.
    pub descending: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub(crate) fn order(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }

    /// Inclusive timestamp bounds, when a time range is set.
    pub(crate) fn bounds(&self, clock: &Clock) -> Option<(i64, i64)> {
        self.time_range.as_ref().map(|range| clock.bounds(range))
    }

    /// SQLite treats a negative limit as no limit.
    pub(crate) fn sql_limit(&self) -> i64 {
        self.limit
            .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
    }
}
