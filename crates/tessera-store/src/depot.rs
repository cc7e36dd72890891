//! Depot: an append-only log of values.
//!
//! Records are addressed by uid, or by zero-based position in uid order.
//! Positions are not stored; they are computed against the live records, so
//! deleting a record shifts the positions after it while every uid stays put.

use rusqlite::Connection;

use tessera_core::{RecordId, Value};

use crate::blob::{BlobReader, SqliteChunks};
use crate::error::Result;
use crate::model::Model;
use crate::records::{self, Criteria, RecordInfo};
use crate::sqlite::Scope;
use crate::traits::{Edge, ListOptions, Store, StoreCore};

/// Depot handle.
#[derive(Clone, Copy)]
pub struct Depot<'a> {
    core: StoreCore<'a>,
}

impl<'a> Depot<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self {
            core: StoreCore::new(scope, Model::Depot),
        }
    }

    /// Append a value, returning its uid. `Null` is not stored.
    pub fn append(&self, value: &Value) -> Result<Option<RecordId>> {
        self.core.append(value)
    }

    /// Append many values in one transaction.
    pub fn extend<'v, I>(&self, values: I) -> Result<Vec<Option<RecordId>>>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        self.core.append_many(values)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Positions
    // ─────────────────────────────────────────────────────────────────────────

    /// Uid of the record at `position`; negative positions count from the
    /// end of the current records.
    pub fn uid(&self, position: i64) -> Result<Option<RecordId>> {
        self.core.read(|conn| {
            let offset = if position >= 0 {
                position as u64
            } else {
                let count = records::count_records(conn, Model::Depot)?;
                match count.checked_sub(position.unsigned_abs()) {
                    Some(offset) => offset,
                    None => return Ok(None),
                }
            };
            Ok(records::record_at(conn, Model::Depot, offset)?.map(|row| row.id))
        })
    }

    /// Zero-based position of `uid`, `None` if it does not exist.
    pub fn position(&self, uid: RecordId) -> Result<Option<u64>> {
        self.core.read(|conn| {
            if records::record_by_id(conn, Model::Depot, uid)?.is_none() {
                return Ok(None);
            }
            let at_or_before: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tessera_depot_record WHERE id <= ?1",
                [uid],
                |row| row.get(0),
            )?;
            Ok(Some((at_or_before - 1).max(0) as u64))
        })
    }

    /// Uids of records created within the time range, which defaults to
    /// the epoch through now.
    pub fn uids(&self, opts: ListOptions) -> Result<Vec<RecordId>> {
        let clock = &self.core.meta().clock;
        let bounds = opts.bounds(clock).unwrap_or_else(|| (0, clock.now()));
        let mut criteria = Criteria::new();
        criteria.timestamps(Some(bounds));
        let sql = format!(
            "SELECT id FROM tessera_depot_record {} ORDER BY id {} LIMIT ?",
            criteria.sql(),
            opts.order()
        );
        self.core.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let uids = stmt
                .query_map(criteria.params_with_limit(opts.sql_limit()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<RecordId>>>()?;
            Ok(uids)
        })
    }

    /// Iterate `(uid, value)` pairs; records deleted after listing are
    /// skipped.
    pub fn iterate(&self, opts: ListOptions) -> Result<DepotIter<'a>> {
        Ok(DepotIter {
            depot: *self,
            uids: self.uids(opts)?.into_iter(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub fn exists(&self, uid: RecordId) -> Result<bool> {
        self.core
            .read(|conn| Ok(records::record_by_id(conn, Model::Depot, uid)?.is_some()))
    }

    pub fn info(&self, uid: RecordId) -> Result<Option<RecordInfo>> {
        self.core.read(|conn| {
            Ok(records::record_by_id(conn, Model::Depot, uid)?.map(|row| self.core.info_of(&row)))
        })
    }

    pub fn get(&self, uid: RecordId) -> Result<Option<Value>> {
        self.core.read(|conn| self.get_in(conn, uid))
    }

    pub fn get_or(&self, uid: RecordId, default: Value) -> Result<Value> {
        Ok(self.get(uid)?.unwrap_or(default))
    }

    /// Oldest value.
    pub fn get_first(&self) -> Result<Option<Value>> {
        self.core.peek(Edge::Oldest)
    }

    /// Newest value.
    pub fn get_last(&self) -> Result<Option<Value>> {
        self.core.peek(Edge::Newest)
    }

    fn get_in(&self, conn: &Connection, uid: RecordId) -> Result<Option<Value>> {
        match records::record_by_id(conn, Model::Depot, uid)? {
            Some(row) => Ok(Some(self.core.load(conn, &row)?)),
            None => Ok(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payload access
    // ─────────────────────────────────────────────────────────────────────────

    /// Payload length of one record, 0 when missing.
    pub fn count_record_bytes(&self, uid: RecordId) -> Result<u64> {
        self.core
            .read(|conn| records::record_bytes(conn, Model::Depot, uid))
    }

    /// Chunk count of one record, 0 when missing.
    pub fn count_record_chunks(&self, uid: RecordId) -> Result<u64> {
        self.core
            .read(|conn| records::record_chunks(conn, Model::Depot, uid))
    }

    /// Run `f` with a blob reader over the record's payload, inside one read
    /// transaction. `None` when the record is missing.
    pub fn open_blob<T, F>(&self, uid: RecordId, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut BlobReader<SqliteChunks<'_>>) -> Result<T>,
    {
        self.core.read(|conn| {
            if records::record_by_id(conn, Model::Depot, uid)?.is_none() {
                return Ok(None);
            }
            Ok(Some(self.core.with_blob(conn, uid, f)?))
        })
    }

    /// Decode a single top-level field of a mapping value.
    pub fn load_field(&self, uid: RecordId, field: &str) -> Result<Option<Value>> {
        self.core
            .read(|conn| self.core.load_field(conn, uid, field))
    }

    pub fn load_field_or(&self, uid: RecordId, field: &str, default: Value) -> Result<Value> {
        Ok(self.load_field(uid, field)?.unwrap_or(default))
    }

    /// Field names that have a pointer in any record, ascending.
    pub fn fields(&self) -> Result<Vec<String>> {
        self.core.fields()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deletion
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete one record. Returns whether it existed.
    pub fn delete(&self, uid: RecordId) -> Result<bool> {
        self.core
            .write(|conn| records::delete_record(conn, Model::Depot, uid))
    }

    /// Delete many records in one transaction, returning the uids that
    /// existed.
    pub fn delete_many<I>(&self, uids: I) -> Result<Vec<RecordId>>
    where
        I: IntoIterator<Item = RecordId>,
    {
        self.core.write(|conn| {
            let mut deleted = Vec::new();
            for uid in uids {
                if records::delete_record(conn, Model::Depot, uid)? {
                    deleted.push(uid);
                }
            }
            Ok(deleted)
        })
    }
}

impl Store for Depot<'_> {
    fn core(&self) -> StoreCore<'_> {
        self.core
    }
}

/// Iterator returned by [`Depot::iterate`].
pub struct DepotIter<'a> {
    depot: Depot<'a>,
    uids: std::vec::IntoIter<RecordId>,
}

impl Iterator for DepotIter<'_> {
    type Item = Result<(RecordId, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        for uid in self.uids.by_ref() {
            match self.depot.get(uid) {
                Ok(Some(value)) => return Some(Ok((uid, value))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
