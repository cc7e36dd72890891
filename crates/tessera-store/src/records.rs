//! Record and chunk primitives shared by every store.
//!
//! All functions here run against a connection that is already inside a
//! transaction; callers own the transaction scope.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ParamsFromIter};
use tracing::trace;

use tessera_core::{
    decode_chunks, describe, encode_chunks, CoreError, Datatype, Encoded, RecordId, Value,
};

use crate::error::{Result, StoreError};
use crate::model::Model;

/// Metadata of one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    pub uid: RecordId,
    pub datatype: Datatype,
    pub created_at: DateTime<Utc>,
}

/// A record row as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordRow {
    pub id: RecordId,
    pub datatype: Datatype,
    pub timestamp: i64,
}

pub(crate) fn datatype_from_db(n: i64) -> Result<Datatype> {
    u8::try_from(n)
        .ok()
        .and_then(Datatype::from_u8)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown datatype tag: {}", n)))
}

/// Read `(id, datatype, timestamp)` from a query returning those columns.
pub(crate) fn query_record<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<RecordRow>> {
    let row = conn
        .query_row(sql, params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .optional()?;
    match row {
        Some((id, datatype, timestamp)) => Ok(Some(RecordRow {
            id,
            datatype: datatype_from_db(datatype)?,
            timestamp,
        })),
        None => Ok(None),
    }
}

/// Look up a record by id.
pub(crate) fn record_by_id(conn: &Connection, model: Model, id: RecordId) -> Result<Option<RecordRow>> {
    query_record(
        conn,
        &format!(
            "SELECT id, datatype, timestamp FROM {} WHERE id = ?1",
            model.record_table()
        ),
        [id],
    )
}

/// The record with the lowest id.
pub(crate) fn first_record(conn: &Connection, model: Model) -> Result<Option<RecordRow>> {
    query_record(
        conn,
        &format!(
            "SELECT id, datatype, timestamp FROM {} ORDER BY id ASC LIMIT 1",
            model.record_table()
        ),
        [],
    )
}

/// The record with the highest id.
pub(crate) fn last_record(conn: &Connection, model: Model) -> Result<Option<RecordRow>> {
    query_record(
        conn,
        &format!(
            "SELECT id, datatype, timestamp FROM {} ORDER BY id DESC LIMIT 1",
            model.record_table()
        ),
        [],
    )
}

/// The record at zero-based `offset` in id order.
pub(crate) fn record_at(conn: &Connection, model: Model, offset: u64) -> Result<Option<RecordRow>> {
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    query_record(
        conn,
        &format!(
            "SELECT id, datatype, timestamp FROM {} ORDER BY id ASC LIMIT 1 OFFSET ?1",
            model.record_table()
        ),
        [offset],
    )
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

pub(crate) fn count_records(conn: &Connection, model: Model) -> Result<u64> {
    count(
        conn,
        &format!("SELECT COUNT(*) FROM {}", model.record_table()),
        [],
    )
}

pub(crate) fn count_bytes(conn: &Connection, model: Model) -> Result<u64> {
    count(
        conn,
        &format!(
            "SELECT COALESCE(SUM(LENGTH(chunk)), 0) FROM {}",
            model.chunk_table()
        ),
        [],
    )
}

pub(crate) fn count_chunks(conn: &Connection, model: Model) -> Result<u64> {
    count(
        conn,
        &format!("SELECT COUNT(*) FROM {}", model.chunk_table()),
        [],
    )
}

/// Payload length of one record. 0 for a missing record.
pub(crate) fn record_bytes(conn: &Connection, model: Model, id: RecordId) -> Result<u64> {
    count(
        conn,
        &format!(
            "SELECT COALESCE(SUM(LENGTH(chunk)), 0) FROM {} WHERE record_id = ?1",
            model.chunk_table()
        ),
        [id],
    )
}

/// Chunk count of one record. 0 for a missing record.
pub(crate) fn record_chunks(conn: &Connection, model: Model, id: RecordId) -> Result<u64> {
    count(
        conn,
        &format!(
            "SELECT COUNT(*) FROM {} WHERE record_id = ?1",
            model.chunk_table()
        ),
        [id],
    )
}

/// Highest stored timestamp, `None` when the store is empty.
pub(crate) fn latest_timestamp(conn: &Connection, model: Model) -> Result<Option<i64>> {
    let ts: Option<i64> = conn.query_row(
        &format!("SELECT MAX(timestamp) FROM {}", model.record_table()),
        [],
        |row| row.get(0),
    )?;
    Ok(ts)
}

/// Delete every record; chunks and pointers cascade.
pub(crate) fn delete_all(conn: &Connection, model: Model) -> Result<u64> {
    let n = conn.execute(&format!("DELETE FROM {}", model.record_table()), [])?;
    trace!(model = %model, n, "deleted all records");
    Ok(n as u64)
}

/// Delete one record; chunks and pointers cascade.
pub(crate) fn delete_record(conn: &Connection, model: Model, id: RecordId) -> Result<bool> {
    let n = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", model.record_table()),
        [id],
    )?;
    if n > 0 {
        trace!(model = %model, id, "deleted record");
    }
    Ok(n > 0)
}

/// Check that a value can be stored, returning its datatype.
///
/// `None` means the value is absent and must not be stored.
pub(crate) fn check_value(value: &Value) -> Result<Option<Datatype>> {
    if matches!(value, Value::Null) {
        return Ok(None);
    }
    Datatype::of(value)
        .map(Some)
        .ok_or_else(|| CoreError::UnsupportedType(describe(value).into()).into())
}

/// Insert a record row and its payload for a model without keys.
pub(crate) fn insert_value(
    conn: &Connection,
    model: Model,
    value: &Value,
    timestamp: i64,
    chunk_size: usize,
) -> Result<Option<RecordId>> {
    let Some(datatype) = check_value(value)? else {
        return Ok(None);
    };
    conn.execute(
        &format!(
            "INSERT INTO {} (datatype, timestamp) VALUES (?1, ?2)",
            model.record_table()
        ),
        params![datatype.to_u8(), timestamp],
    )?;
    let id = conn.last_insert_rowid();
    store_payload(conn, model, id, value, chunk_size)?;
    Ok(Some(id))
}

/// Write the chunk rows and field pointers of a freshly inserted record.
pub(crate) fn store_payload(
    conn: &Connection,
    model: Model,
    id: RecordId,
    value: &Value,
    chunk_size: usize,
) -> Result<Encoded> {
    let mut insert = conn.prepare_cached(&format!(
        "INSERT INTO {} (record_id, chunk) VALUES (?1, ?2)",
        model.chunk_table()
    ))?;
    let encoded = encode_chunks(value, chunk_size, |chunk| {
        insert.execute(params![id, &chunk[..]]).map(|_| ())
    })?;

    if let Some(table) = model.pointer_table() {
        if encoded.datatype.is_mapping() {
            let mut pointer = conn.prepare_cached(&format!(
                "INSERT OR REPLACE INTO {} (field, record_id, start_offset, stop_offset)
                 VALUES (?1, ?2, ?3, ?4)",
                table
            ))?;
            for field in &encoded.fields {
                pointer.execute(params![field.field, id, field.start as i64, field.stop as i64])?;
            }
        }
    }

    trace!(
        model = %model,
        id,
        datatype = %encoded.datatype,
        chunks = encoded.chunks,
        bytes = encoded.bytes,
        "stored payload"
    );
    Ok(encoded)
}

/// Stream a record's chunks through the decoder.
pub(crate) fn load_payload(
    conn: &Connection,
    model: Model,
    id: RecordId,
    datatype: Datatype,
) -> Result<Value> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT chunk FROM {} WHERE record_id = ?1 ORDER BY id ASC",
        model.chunk_table()
    ))?;
    let rows = stmt.query_map([id], |row| row.get::<_, Vec<u8>>(0))?;
    Ok(decode_chunks(rows, datatype)?)
}

/// Byte range of a field in a record's payload.
pub(crate) fn pointer(
    conn: &Connection,
    model: Model,
    field: &str,
    id: RecordId,
) -> Result<Option<(u64, u64)>> {
    let Some(table) = model.pointer_table() else {
        return Ok(None);
    };
    let range = conn
        .query_row(
            &format!(
                "SELECT start_offset, stop_offset FROM {} WHERE field = ?1 AND record_id = ?2",
                table
            ),
            params![field, id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    Ok(range.map(|(start, stop)| (start.max(0) as u64, stop.max(0) as u64)))
}

/// Distinct field names with a pointer, ascending.
pub(crate) fn pointed_fields(conn: &Connection, model: Model) -> Result<Vec<String>> {
    let Some(table) = model.pointer_table() else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT DISTINCT field FROM {} ORDER BY field ASC",
        table
    ))?;
    let fields = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(fields)
}

/// WHERE-clause builder with positional parameters.
#[derive(Debug, Default)]
pub(crate) struct Criteria {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause using `?` placeholders for `params`, in order.
    pub fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    /// Restrict to records whose timestamp falls within `bounds`, inclusive.
    pub fn timestamps(&mut self, bounds: Option<(i64, i64)>) {
        if let Some((start, stop)) = bounds {
            self.push(
                "timestamp BETWEEN ? AND ?",
                [SqlValue::Integer(start), SqlValue::Integer(stop)],
            );
        }
    }

    /// `WHERE a AND b`, or nothing when there are no clauses.
    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Parameters followed by a trailing `LIMIT ?` value.
    pub fn params_with_limit(&self, limit: i64) -> ParamsFromIter<Vec<SqlValue>> {
        let mut params = self.params.clone();
        params.push(SqlValue::Integer(limit));
        params_from_iter(params)
    }
}
