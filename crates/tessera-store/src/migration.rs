//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL batch
//! that transforms the schema from version N to N+1.

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::model::Model;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            debug!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Singleton row describing the database
        CREATE TABLE tessera_info (
            id INTEGER NOT NULL UNIQUE DEFAULT 0 CHECK (id = 0),
            version INTEGER NOT NULL,
            created_at TEXT NOT NULL,          -- epoch, RFC 3339 UTC
            chunk_size INTEGER NOT NULL,
            timestamp_precision INTEGER NOT NULL  -- decimal exponent: 0, 3, 6 or 9
        );

        -- Key-value records: exactly one of int_key / str_key is set
        CREATE TABLE tessera_kv_record (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            datatype INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            int_key INTEGER UNIQUE,
            str_key TEXT UNIQUE,
            CHECK ((int_key IS NULL AND str_key IS NOT NULL)
                OR (int_key IS NOT NULL AND str_key IS NULL))
        );
        "#,
    )?;

    for model in [Model::Depot, Model::Queue, Model::Stack] {
        conn.execute_batch(&format!(
            "CREATE TABLE {record} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datatype INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );",
            record = model.record_table(),
        ))?;
    }

    for model in Model::ALL {
        conn.execute_batch(&format!(
            "CREATE INDEX idx_{name}_record_timestamp ON {record} (timestamp);

            CREATE TABLE {chunk} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id INTEGER NOT NULL
                    REFERENCES {record} (id) ON DELETE CASCADE,
                chunk BLOB NOT NULL
            );
            CREATE INDEX idx_{name}_chunk_record_id ON {chunk} (record_id);",
            name = model.name(),
            record = model.record_table(),
            chunk = model.chunk_table(),
        ))?;

        if let Some(pointer) = model.pointer_table() {
            conn.execute_batch(&format!(
                "CREATE TABLE {pointer} (
                    field TEXT NOT NULL,
                    record_id INTEGER NOT NULL
                        REFERENCES {record} (id) ON DELETE CASCADE,
                    start_offset INTEGER NOT NULL,
                    stop_offset INTEGER NOT NULL,
                    PRIMARY KEY (field, record_id)
                );
                CREATE INDEX idx_{name}_pointer_record_id ON {pointer} (record_id);",
                name = model.name(),
                record = model.record_table(),
            ))?;
        }
    }

    Ok(())
}
