//! Key-value store.
//!
//! Keys are integers or strings. A key is normalized once on the way in, so
//! with numeric coercion on, `"42"` and `42` address the same record. Setting
//! an existing key deletes the old record and inserts a new one: the key keeps
//! one live record but its uid changes.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use tessera_core::{from_value, normalize_key, to_value, Datatype, Key, RecordId, Value};

use crate::blob::{BlobReader, SqliteChunks};
use crate::error::{Result, StoreError};
use crate::model::Model;
use crate::records::{self, check_value, query_record, Criteria, RecordInfo, RecordRow};
use crate::sqlite::Scope;
use crate::traits::{ListOptions, Store, StoreCore};

const SELECT_RECORD: &str = "SELECT id, datatype, timestamp FROM tessera_kv_record";

/// Key-value store handle.
#[derive(Clone, Copy)]
pub struct Kv<'a> {
    core: StoreCore<'a>,
}

impl<'a> Kv<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self {
            core: StoreCore::new(scope, Model::Kv),
        }
    }

    fn within<'c>(&self, conn: &'c Connection) -> Kv<'c>
    where
        'a: 'c,
    {
        Kv {
            core: self.core.within(conn),
        }
    }

    fn normalize(&self, key: impl Into<Key>) -> Result<Key> {
        Ok(normalize_key(key.into(), self.core.meta().coerce_ascii_numeric_keys)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub fn exists(&self, key: impl Into<Key>) -> Result<bool> {
        Ok(self.uid(key)?.is_some())
    }

    /// Record id currently holding `key`.
    pub fn uid(&self, key: impl Into<Key>) -> Result<Option<RecordId>> {
        let key = self.normalize(key)?;
        self.core
            .read(|conn| Ok(record_by_key(conn, &key)?.map(|row| row.id)))
    }

    /// Reverse lookup: the key of a record id.
    pub fn key(&self, uid: RecordId) -> Result<Option<Key>> {
        self.core.read(|conn| {
            let columns = conn
                .query_row(
                    "SELECT int_key, str_key FROM tessera_kv_record WHERE id = ?1",
                    [uid],
                    |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<String>>(1)?)),
                )
                .optional()?;
            columns
                .map(|(int_key, str_key)| key_from_columns(int_key, str_key))
                .transpose()
        })
    }

    pub fn info(&self, key: impl Into<Key>) -> Result<Option<RecordInfo>> {
        let key = self.normalize(key)?;
        self.core.read(|conn| {
            Ok(record_by_key(conn, &key)?.map(|row| self.core.info_of(&row)))
        })
    }

    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = self.normalize(key)?;
        self.core.read(|conn| match record_by_key(conn, &key)? {
            Some(row) => Ok(Some(self.core.load(conn, &row)?)),
            None => Ok(None),
        })
    }

    /// Like [`Kv::get`], returning `default` for a missing key.
    pub fn get_or(&self, key: impl Into<Key>, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Fetch and deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Into<Key>) -> Result<Option<T>> {
        Ok(self.get(key)?.map(|v| from_value(&v)).transpose()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Store `value` under `key`, returning the new record id.
    ///
    /// A `Null` value is not stored and returns `None`.
    pub fn set(&self, key: impl Into<Key>, value: &Value) -> Result<Option<RecordId>> {
        let key = self.normalize(key)?;
        let Some(datatype) = check_value(value)? else {
            return Ok(None);
        };
        self.core
            .write(|conn| self.insert(conn, &key, datatype, value).map(Some))
    }

    /// Serialize `value` and store it under `key`.
    pub fn set_as<T: Serialize + ?Sized>(
        &self,
        key: impl Into<Key>,
        value: &T,
    ) -> Result<Option<RecordId>> {
        self.set(key, &to_value(value)?)
    }

    /// Overwrite an existing key, returning the previous value.
    ///
    /// Nothing is written when the key is missing or `value` is `Null`.
    pub fn replace(&self, key: impl Into<Key>, value: &Value) -> Result<Option<Value>> {
        let key = self.normalize(key)?;
        let Some(datatype) = check_value(value)? else {
            return Ok(None);
        };
        self.core.write(|conn| {
            let Some(row) = record_by_key(conn, &key)? else {
                return Ok(None);
            };
            let old = self.core.load(conn, &row)?;
            self.insert(conn, &key, datatype, value)?;
            Ok(Some(old))
        })
    }

    /// Set many keys in one transaction.
    pub fn update<K, I>(&self, items: I) -> Result<Vec<(Key, Option<RecordId>)>>
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.core.write(|conn| {
            let kv = self.within(conn);
            let mut uids = Vec::new();
            for (key, value) in items {
                let key = kv.normalize(key)?;
                let uid = kv.set(key.clone(), &value)?;
                uids.push((key, uid));
            }
            Ok(uids)
        })
    }

    /// Delete a key. Returns whether it existed.
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        let key = self.normalize(key)?;
        self.core.write(|conn| match record_by_key(conn, &key)? {
            Some(row) => records::delete_record(conn, Model::Kv, row.id),
            None => Ok(false),
        })
    }

    /// Delete many keys in one transaction, returning those that existed.
    pub fn delete_many<K, I>(&self, keys: I) -> Result<Vec<Key>>
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        self.core.write(|conn| {
            let kv = self.within(conn);
            let mut deleted = Vec::new();
            for key in keys {
                let key = kv.normalize(key)?;
                if kv.delete(key.clone())? {
                    deleted.push(key);
                }
            }
            Ok(deleted)
        })
    }

    fn insert(
        &self,
        conn: &Connection,
        key: &Key,
        datatype: Datatype,
        value: &Value,
    ) -> Result<RecordId> {
        if let Some(old) = record_by_key(conn, key)? {
            records::delete_record(conn, Model::Kv, old.id)?;
        }
        let (int_key, str_key) = match key {
            Key::Int(n) => (Some(*n), None),
            Key::Str(s) => (None, Some(s.as_str())),
        };
        let meta = self.core.meta();
        conn.execute(
            "INSERT INTO tessera_kv_record (datatype, timestamp, int_key, str_key)
             VALUES (?1, ?2, ?3, ?4)",
            params![datatype.to_u8(), meta.clock.now(), int_key, str_key],
        )?;
        let id = conn.last_insert_rowid();
        records::store_payload(conn, Model::Kv, id, value, meta.chunk_size)?;
        trace!(key = %key, id, "set key");
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    /// All keys, integers before strings.
    pub fn keys(&self, opts: ListOptions) -> Result<Vec<Key>> {
        let mut criteria = Criteria::new();
        criteria.timestamps(opts.bounds(&self.core.meta().clock));
        let sql = format!(
            "SELECT int_key, str_key FROM tessera_kv_record {} \
             ORDER BY COALESCE(int_key, str_key) {} LIMIT ?",
            criteria.sql(),
            opts.order()
        );
        self.core.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(criteria.params_with_limit(opts.sql_limit()), |row| {
                Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let mut keys = Vec::new();
            for row in rows {
                let (int_key, str_key) = row?;
                keys.push(key_from_columns(int_key, str_key)?);
            }
            Ok(keys)
        })
    }

    /// Integer keys within the inclusive `[first, last]` bounds.
    ///
    /// Reversed bounds are swapped.
    pub fn int_keys(
        &self,
        first: Option<i64>,
        last: Option<i64>,
        opts: ListOptions,
    ) -> Result<Vec<i64>> {
        let (first, last) = match (first, last) {
            (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
            bounds => bounds,
        };
        let mut criteria = Criteria::new();
        criteria.push("int_key IS NOT NULL", []);
        if let Some(first) = first {
            criteria.push("int_key >= ?", [SqlValue::Integer(first)]);
        }
        if let Some(last) = last {
            criteria.push("int_key <= ?", [SqlValue::Integer(last)]);
        }
        criteria.timestamps(opts.bounds(&self.core.meta().clock));
        let sql = format!(
            "SELECT int_key FROM tessera_kv_record {} ORDER BY int_key {} LIMIT ?",
            criteria.sql(),
            opts.order()
        );
        self.core.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let keys = stmt
                .query_map(criteria.params_with_limit(opts.sql_limit()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(keys)
        })
    }

    /// String keys, optionally filtered by a SQLite GLOB pattern.
    pub fn str_keys(&self, glob: Option<&str>, opts: ListOptions) -> Result<Vec<String>> {
        let mut criteria = Criteria::new();
        criteria.push("str_key IS NOT NULL", []);
        if let Some(glob) = glob.filter(|g| !g.is_empty()) {
            criteria.push("str_key GLOB ?", [SqlValue::Text(glob.to_owned())]);
        }
        criteria.timestamps(opts.bounds(&self.core.meta().clock));
        let sql = format!(
            "SELECT str_key FROM tessera_kv_record {} ORDER BY str_key {} LIMIT ?",
            criteria.sql(),
            opts.order()
        );
        self.core.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let keys = stmt
                .query_map(criteria.params_with_limit(opts.sql_limit()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }

    /// Iterate `(key, value)` pairs.
    ///
    /// Keys are listed up front and values fetched one at a time; a key
    /// deleted in between is skipped.
    pub fn iterate(&self, opts: ListOptions) -> Result<KvIter<'a>> {
        Ok(KvIter {
            kv: *self,
            keys: self.keys(opts)?.into_iter(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payload access
    // ─────────────────────────────────────────────────────────────────────────

    /// Payload length of one key's record, 0 when missing.
    pub fn count_record_bytes(&self, key: impl Into<Key>) -> Result<u64> {
        let key = self.normalize(key)?;
        self.core.read(|conn| match record_by_key(conn, &key)? {
            Some(row) => records::record_bytes(conn, Model::Kv, row.id),
            None => Ok(0),
        })
    }

    /// Chunk count of one key's record, 0 when missing.
    pub fn count_record_chunks(&self, key: impl Into<Key>) -> Result<u64> {
        let key = self.normalize(key)?;
        self.core.read(|conn| match record_by_key(conn, &key)? {
            Some(row) => records::record_chunks(conn, Model::Kv, row.id),
            None => Ok(0),
        })
    }

    /// Run `f` with a blob reader over the key's payload.
    ///
    /// The reader lives inside one read transaction and is closed when `f`
    /// returns. `None` when the key is missing.
    pub fn open_blob<T, F>(&self, key: impl Into<Key>, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut BlobReader<SqliteChunks<'_>>) -> Result<T>,
    {
        let key = self.normalize(key)?;
        self.core.read(|conn| match record_by_key(conn, &key)? {
            Some(row) => Ok(Some(self.core.with_blob(conn, row.id, f)?)),
            None => Ok(None),
        })
    }

    /// Decode a single top-level field of a mapping value.
    ///
    /// `None` when the key or field is missing.
    pub fn load_field(&self, key: impl Into<Key>, field: &str) -> Result<Option<Value>> {
        let key = self.normalize(key)?;
        self.core.read(|conn| match record_by_key(conn, &key)? {
            Some(row) => self.core.load_field(conn, row.id, field),
            None => Ok(None),
        })
    }

    pub fn load_field_or(&self, key: impl Into<Key>, field: &str, default: Value) -> Result<Value> {
        Ok(self.load_field(key, field)?.unwrap_or(default))
    }

    /// Field names that have a pointer in any record, ascending.
    pub fn fields(&self) -> Result<Vec<String>> {
        self.core.fields()
    }
}

impl Store for Kv<'_> {
    fn core(&self) -> StoreCore<'_> {
        self.core
    }
}

/// Iterator returned by [`Kv::iterate`].
pub struct KvIter<'a> {
    kv: Kv<'a>,
    keys: std::vec::IntoIter<Key>,
}

impl Iterator for KvIter<'_> {
    type Item = Result<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        for key in self.keys.by_ref() {
            match self.kv.get(key.clone()) {
                Ok(Some(value)) => return Some(Ok((key, value))),
                Ok(None) => debug!(key = %key, "key vanished during iteration"),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

fn record_by_key(conn: &Connection, key: &Key) -> Result<Option<RecordRow>> {
    match key {
        Key::Int(n) => query_record(conn, &format!("{} WHERE int_key = ?1", SELECT_RECORD), [n]),
        Key::Str(s) => query_record(conn, &format!("{} WHERE str_key = ?1", SELECT_RECORD), [s]),
    }
}

fn key_from_columns(int_key: Option<i64>, str_key: Option<String>) -> Result<Key> {
    match (int_key, str_key) {
        (Some(n), None) => Ok(Key::Int(n)),
        (None, Some(s)) => Ok(Key::Str(s)),
        (int_key, str_key) => Err(StoreError::InvalidData(format!(
            "kv record must have exactly one key, got {:?} / {:?}",
            int_key, str_key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::sqlite::SqliteStore;
    use serde_json::json;
    use tessera_core::CoreError;

    fn store(chunk_size: usize) -> SqliteStore {
        SqliteStore::open_memory(StoreConfig {
            chunk_size,
            ..Default::default()
        })
        .unwrap()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_owned())
    }

    #[test]
    fn test_set_get() {
        let store = store(4);
        let kv = store.kv();
        let value = to_value(&json!({"a": [1, 2, 3], "b": "hello"})).unwrap();

        assert!(kv.set("doc", &value).unwrap().is_some());
        assert_eq!(kv.get("doc").unwrap(), Some(value));
        assert_eq!(kv.get("other").unwrap(), None);
        assert_eq!(kv.get_or("other", text("x")).unwrap(), text("x"));
    }

    #[test]
    fn test_set_existing_key_replaces_record() {
        let store = store(4);
        let kv = store.kv();

        let first = kv.set("k", &text("one")).unwrap().unwrap();
        let second = kv.set("k", &text("two")).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(kv.count_records().unwrap(), 1);
        assert_eq!(kv.get("k").unwrap(), Some(text("two")));
        assert_eq!(kv.uid("k").unwrap(), Some(second));
        assert_eq!(kv.key(first).unwrap(), None);
    }

    #[test]
    fn test_numeric_string_key_coerces() {
        let store = store(16);
        let kv = store.kv();

        let uid = kv.set("007", &Value::Bool(true)).unwrap().unwrap();
        assert!(kv.exists(7).unwrap());
        assert_eq!(kv.key(uid).unwrap(), Some(Key::Int(7)));
        assert!(kv.str_keys(None, ListOptions::new()).unwrap().is_empty());
    }

    #[test]
    fn test_coercion_disabled() {
        let store = SqliteStore::open_memory(StoreConfig {
            coerce_ascii_numeric_keys: false,
            ..Default::default()
        })
        .unwrap();
        let kv = store.kv();

        kv.set("007", &Value::Bool(true)).unwrap();
        assert!(!kv.exists(7).unwrap());
        assert_eq!(kv.keys(ListOptions::new()).unwrap(), vec![Key::Str("007".into())]);
    }

    #[test]
    fn test_non_ascii_digit_keys_stay_text() {
        let store = store(16);
        let kv = store.kv();

        kv.set("١٢", &Value::Bool(true)).unwrap();
        kv.set("12", &Value::Bool(false)).unwrap();
        assert_eq!(kv.count_records().unwrap(), 2);
        assert_eq!(kv.str_keys(None, ListOptions::new()).unwrap(), vec!["١٢".to_string()]);
        assert_eq!(kv.int_keys(None, None, ListOptions::new()).unwrap(), vec![12]);
        assert_eq!(kv.get("١٢").unwrap(), Some(Value::Bool(true)));
    }

    #[test]
    fn test_empty_bytes_round_trip() {
        let store = store(4);
        let kv = store.kv();

        kv.set("empty", &Value::Bytes(vec![])).unwrap().unwrap();
        assert_eq!(kv.count_record_chunks("empty").unwrap(), 1);
        assert_eq!(kv.count_record_bytes("empty").unwrap(), 0);
        assert_eq!(kv.get("empty").unwrap(), Some(Value::Bytes(vec![])));
        assert_eq!(
            kv.open_blob("empty", |blob| blob.read_all()).unwrap(),
            Some(Vec::new())
        );
        assert_eq!(kv.load_field("empty", "x").unwrap(), None);
    }

    #[test]
    fn test_null_is_not_stored() {
        let store = store(16);
        let kv = store.kv();

        assert_eq!(kv.set("k", &Value::Null).unwrap(), None);
        assert!(!kv.exists("k").unwrap());
        assert!(kv.is_empty().unwrap());
    }

    #[test]
    fn test_tagged_value_rejected_without_partial_record() {
        let store = store(16);
        let kv = store.kv();

        let tagged = Value::Tag(1, Box::new(Value::Integer(5.into())));
        let result = kv.set("k", &tagged);
        assert!(matches!(result, Err(StoreError::Core(CoreError::UnsupportedType(_)))));

        let nested = Value::Array(vec![Value::Tag(1, Box::new(Value::Bool(true)))]);
        assert!(kv.set("k", &nested).is_err());
        assert_eq!(kv.count_records().unwrap(), 0);
        assert_eq!(kv.count_chunks().unwrap(), 0);
    }

    #[test]
    fn test_replace() {
        let store = store(16);
        let kv = store.kv();

        assert_eq!(kv.replace("k", &text("new")).unwrap(), None);
        assert!(!kv.exists("k").unwrap());

        kv.set("k", &text("old")).unwrap();
        assert_eq!(kv.replace("k", &text("new")).unwrap(), Some(text("old")));
        assert_eq!(kv.get("k").unwrap(), Some(text("new")));
    }

    #[test]
    fn test_update_and_delete_many() {
        let store = store(16);
        let kv = store.kv();

        let uids = kv
            .update(vec![("a", text("1")), ("b", text("2")), ("c", Value::Null)])
            .unwrap();
        assert_eq!(uids.len(), 3);
        assert!(uids[0].1.is_some());
        assert_eq!(uids[2].1, None);
        assert_eq!(kv.count_records().unwrap(), 2);

        let deleted = kv.delete_many(["a", "missing", "b"]).unwrap();
        assert_eq!(deleted, vec![Key::from("a"), Key::from("b")]);
        assert!(kv.is_empty().unwrap());
    }

    #[test]
    fn test_delete_missing_key() {
        let store = store(16);
        assert!(!store.kv().delete("nope").unwrap());
    }

    #[test]
    fn test_keys_order_and_limit() {
        let store = store(16);
        let kv = store.kv();
        for key in [Key::from(3), Key::from("b"), Key::from(1), Key::from("a")] {
            kv.set(key, &Value::Bool(true)).unwrap();
        }

        assert_eq!(
            kv.keys(ListOptions::new()).unwrap(),
            vec![Key::from(1), Key::from(3), Key::from("a"), Key::from("b")]
        );
        assert_eq!(
            kv.keys(ListOptions::new().descending().limit(2)).unwrap(),
            vec![Key::from("b"), Key::from("a")]
        );
    }

    #[test]
    fn test_int_keys_bounds_are_swapped() {
        let store = store(16);
        let kv = store.kv();
        for n in 0..10 {
            kv.set(n, &Value::Integer(n.into())).unwrap();
        }
        kv.set("x", &Value::Bool(true)).unwrap();

        assert_eq!(kv.int_keys(Some(5), Some(2), ListOptions::new()).unwrap(), vec![2, 3, 4, 5]);
        assert_eq!(kv.int_keys(Some(8), None, ListOptions::new()).unwrap(), vec![8, 9]);
        assert_eq!(
            kv.int_keys(None, Some(1), ListOptions::new().descending()).unwrap(),
            vec![1, 0]
        );
    }

    #[test]
    fn test_str_keys_glob() {
        let store = store(16);
        let kv = store.kv();
        for key in ["user:1", "user:2", "item:1"] {
            kv.set(key, &Value::Bool(true)).unwrap();
        }

        assert_eq!(
            kv.str_keys(Some("user:*"), ListOptions::new()).unwrap(),
            vec!["user:1".to_string(), "user:2".to_string()]
        );
        assert_eq!(kv.str_keys(Some(""), ListOptions::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_iterate() {
        let store = store(16);
        let kv = store.kv();
        kv.set("a", &text("1")).unwrap();
        kv.set("b", &text("2")).unwrap();

        let pairs = kv
            .iterate(ListOptions::new())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(pairs, vec![(Key::from("a"), text("1")), (Key::from("b"), text("2"))]);
    }

    #[test]
    fn test_iterate_skips_vanished_keys() {
        let store = store(16);
        let kv = store.kv();
        kv.set("a", &text("1")).unwrap();
        kv.set("b", &text("2")).unwrap();

        let mut iter = kv.iterate(ListOptions::new()).unwrap();
        kv.delete("a").unwrap();
        assert_eq!(iter.next().unwrap().unwrap(), (Key::from("b"), text("2")));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_load_field() {
        let store = store(3);
        let kv = store.kv();
        kv.set("user", &to_value(&json!({"id": 42, "name": "alex"})).unwrap())
            .unwrap();

        assert_eq!(kv.load_field("user", "id").unwrap(), Some(Value::Integer(42.into())));
        assert_eq!(kv.load_field("user", "name").unwrap(), Some(text("alex")));
        assert_eq!(kv.load_field("user", "missing").unwrap(), None);
        assert_eq!(kv.load_field("nobody", "id").unwrap(), None);
        assert_eq!(
            kv.load_field_or("user", "missing", Value::Bool(false)).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(kv.fields().unwrap(), vec!["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_pointers_removed_with_record() {
        let store = store(16);
        let kv = store.kv();
        kv.set("user", &to_value(&json!({"id": 1})).unwrap()).unwrap();
        kv.set("user", &text("plain")).unwrap();

        assert!(kv.fields().unwrap().is_empty());
        assert_eq!(kv.load_field("user", "id").unwrap(), None);
    }

    #[test]
    fn test_record_counters_and_blob() {
        let store = store(2);
        let kv = store.kv();
        kv.set("bin", &Value::Bytes(b"hello".to_vec())).unwrap();

        assert_eq!(kv.count_record_bytes("bin").unwrap(), 5);
        assert_eq!(kv.count_record_chunks("bin").unwrap(), 3);
        assert_eq!(kv.count_record_bytes("missing").unwrap(), 0);

        let data = kv.open_blob("bin", |blob| blob.read_all()).unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert_eq!(kv.open_blob("missing", |blob| blob.read_all()).unwrap(), None);
    }

    #[test]
    fn test_info_and_typed_access() {
        let store = store(16);
        let kv = store.kv();
        kv.set_as("point", &json!({"x": 1, "y": 2})).unwrap();

        let info = kv.info("point").unwrap().unwrap();
        assert_eq!(info.datatype, Datatype::Dict);
        assert_eq!(Some(info.uid), kv.uid("point").unwrap());

        let point: serde_json::Value = kv.get_as("point").unwrap().unwrap();
        assert_eq!(point, json!({"x": 1, "y": 2}));
    }
}
