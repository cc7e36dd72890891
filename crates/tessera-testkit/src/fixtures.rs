//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use tessera::{StoreConfig, Tessera, Value};

/// A database in a temporary directory, removed on drop.
pub struct TestFixture {
    pub db: Tessera,
    pub path: PathBuf,
    /// Held for its lifetime; `None` for in-memory fixtures.
    dir: Option<TempDir>,
}

impl TestFixture {
    /// A fresh on-disk database with the given chunk size.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or database cannot be created.
    pub fn on_disk(chunk_size: usize) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("test.tessera");
        let db = Tessera::open(&path, config(chunk_size)).expect("open database");
        Self {
            db,
            path,
            dir: Some(dir),
        }
    }

    /// A fresh in-memory database with the given chunk size.
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created.
    pub fn in_memory(chunk_size: usize) -> Self {
        let db = Tessera::open_memory(config(chunk_size)).expect("open database");
        Self {
            db,
            path: PathBuf::new(),
            dir: None,
        }
    }

    /// Open the fixture's file again with default settings.
    ///
    /// # Panics
    ///
    /// Panics for in-memory fixtures.
    pub fn reopen(&self) -> Tessera {
        assert!(self.dir.is_some(), "in-memory fixtures cannot be reopened");
        Tessera::open(&self.path, StoreConfig::default()).expect("reopen database")
    }

    /// Open the fixture's file read-only.
    pub fn reopen_readonly(&self) -> Tessera {
        assert!(self.dir.is_some(), "in-memory fixtures cannot be reopened");
        let config = StoreConfig {
            read_only: true,
            ..StoreConfig::default()
        };
        Tessera::open(&self.path, config).expect("reopen database read-only")
    }
}

fn config(chunk_size: usize) -> StoreConfig {
    StoreConfig {
        chunk_size,
        ..StoreConfig::default()
    }
}

/// A typed record for serde round trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub stars: u32,
}

impl Note {
    pub fn sample(n: u32) -> Self {
        Self {
            title: format!("note {}", n),
            body: "lorem ipsum dolor sit amet ".repeat(n as usize % 5 + 1),
            tags: (0..n % 3).map(|i| format!("tag{}", i)).collect(),
            stars: n,
        }
    }
}

/// Text value shorthand.
pub fn text(s: &str) -> Value {
    Value::Text(s.into())
}

/// Integer value shorthand.
pub fn int(n: i64) -> Value {
    Value::Integer(n.into())
}

/// Mapping with text keys, in the order given.
pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (text(k), v)).collect())
}

/// The 26 lowercase letters, a payload that spans many chunks at small
/// chunk sizes.
pub fn alphabet() -> Value {
    Value::Bytes((b'a'..=b'z').collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera::Store;

    #[test]
    fn test_on_disk_fixture_persists() {
        let fixture = TestFixture::on_disk(3);
        fixture.db.depot().append(&alphabet()).unwrap();
        assert_eq!(fixture.db.chunk_size(), 3);

        let reopened = fixture.reopen();
        assert_eq!(reopened.chunk_size(), 3);
        assert_eq!(reopened.depot().get_first().unwrap(), Some(alphabet()));
    }

    #[test]
    fn test_in_memory_fixture() {
        let fixture = TestFixture::in_memory(8);
        assert!(fixture.db.in_memory());
        fixture.db.kv().set("k", &int(1)).unwrap();
        assert_eq!(fixture.db.kv().count_records().unwrap(), 1);
    }

    #[test]
    fn test_note_through_kv() {
        let fixture = TestFixture::in_memory(16);
        let note = Note::sample(7);
        fixture.db.kv().set_as("note", &note).unwrap();
        let back: Option<Note> = fixture.db.kv().get_as("note").unwrap();
        assert_eq!(back, Some(note));
    }
}
