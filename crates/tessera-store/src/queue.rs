//! FIFO queue.
//!
//! Values leave in the order they were enqueued. `dequeue` reads and deletes
//! the front record in one immediate transaction, so two consumers never
//! receive the same value.

use tessera_core::{RecordId, Value};

use crate::error::Result;
use crate::model::Model;
use crate::records::RecordInfo;
use crate::sqlite::Scope;
use crate::traits::{Edge, Store, StoreCore};

/// Queue handle.
#[derive(Clone, Copy)]
pub struct Queue<'a> {
    core: StoreCore<'a>,
}

impl<'a> Queue<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self {
            core: StoreCore::new(scope, Model::Queue),
        }
    }

    /// Add a value at the back. `Null` is not stored.
    pub fn enqueue(&self, value: &Value) -> Result<Option<RecordId>> {
        self.core.append(value)
    }

    /// Add values at the back in one transaction.
    pub fn enqueue_many<'v, I>(&self, values: I) -> Result<Vec<Option<RecordId>>>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        self.core.append_many(values)
    }

    /// Remove and return the front value.
    pub fn dequeue(&self) -> Result<Option<Value>> {
        self.core.take(Edge::Oldest)
    }

    pub fn dequeue_or(&self, default: Value) -> Result<Value> {
        Ok(self.dequeue()?.unwrap_or(default))
    }

    pub fn peek_front(&self) -> Result<Option<Value>> {
        self.core.peek(Edge::Oldest)
    }

    pub fn peek_back(&self) -> Result<Option<Value>> {
        self.core.peek(Edge::Newest)
    }

    pub fn front_uid(&self) -> Result<Option<RecordId>> {
        self.core.edge_uid(Edge::Oldest)
    }

    pub fn back_uid(&self) -> Result<Option<RecordId>> {
        self.core.edge_uid(Edge::Newest)
    }

    /// Payload length of the front record, 0 when empty.
    pub fn count_front_bytes(&self) -> Result<u64> {
        self.core.edge_bytes(Edge::Oldest)
    }

    pub fn count_back_bytes(&self) -> Result<u64> {
        self.core.edge_bytes(Edge::Newest)
    }

    pub fn count_front_chunks(&self) -> Result<u64> {
        self.core.edge_chunks(Edge::Oldest)
    }

    pub fn count_back_chunks(&self) -> Result<u64> {
        self.core.edge_chunks(Edge::Newest)
    }

    pub fn info_front(&self) -> Result<Option<RecordInfo>> {
        self.core.edge_info(Edge::Oldest)
    }

    pub fn info_back(&self) -> Result<Option<RecordInfo>> {
        self.core.edge_info(Edge::Newest)
    }
}

impl Store for Queue<'_> {
    fn core(&self) -> StoreCore<'_> {
        self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::sqlite::SqliteStore;

    fn text(s: &str) -> Value {
        Value::Text(s.to_owned())
    }

    #[test]
    fn test_fifo_order() {
        let store = SqliteStore::open_memory(StoreConfig::default()).unwrap();
        let queue = store.queue();
        queue.enqueue_many(&[text("a"), text("b"), text("c")]).unwrap();

        assert_eq!(queue.dequeue().unwrap(), Some(text("a")));
        assert_eq!(queue.dequeue().unwrap(), Some(text("b")));
        assert_eq!(queue.dequeue().unwrap(), Some(text("c")));
        assert_eq!(queue.dequeue().unwrap(), None);
        assert_eq!(queue.dequeue_or(text("empty")).unwrap(), text("empty"));
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let store = SqliteStore::open_memory(StoreConfig::default()).unwrap();
        let queue = store.queue();
        let first = queue.enqueue(&text("front")).unwrap().unwrap();
        let last = queue.enqueue(&text("back")).unwrap().unwrap();

        assert_eq!(queue.peek_front().unwrap(), Some(text("front")));
        assert_eq!(queue.peek_back().unwrap(), Some(text("back")));
        assert_eq!(queue.front_uid().unwrap(), Some(first));
        assert_eq!(queue.back_uid().unwrap(), Some(last));
        assert_eq!(queue.info_front().unwrap().unwrap().uid, first);
        assert_eq!(queue.info_back().unwrap().unwrap().uid, last);
        assert_eq!(queue.count_records().unwrap(), 2);
    }

    #[test]
    fn test_edge_counters() {
        let store = SqliteStore::open_memory(StoreConfig {
            chunk_size: 2,
            ..Default::default()
        })
        .unwrap();
        let queue = store.queue();
        assert_eq!(queue.count_front_bytes().unwrap(), 0);
        assert_eq!(queue.count_back_chunks().unwrap(), 0);

        queue.enqueue(&Value::Bytes(vec![1, 2, 3])).unwrap();
        queue.enqueue(&Value::Bytes(vec![1])).unwrap();
        assert_eq!(queue.count_front_bytes().unwrap(), 3);
        assert_eq!(queue.count_front_chunks().unwrap(), 2);
        assert_eq!(queue.count_back_bytes().unwrap(), 1);
        assert_eq!(queue.count_back_chunks().unwrap(), 1);
        assert_eq!(queue.count_bytes().unwrap(), 4);
    }

    #[test]
    fn test_dequeue_removes_chunks() {
        let store = SqliteStore::open_memory(StoreConfig {
            chunk_size: 1,
            ..Default::default()
        })
        .unwrap();
        let queue = store.queue();
        queue.enqueue(&Value::Bytes(b"abcd".to_vec())).unwrap();
        assert_eq!(queue.count_chunks().unwrap(), 4);

        queue.dequeue().unwrap();
        assert_eq!(queue.count_chunks().unwrap(), 0);
    }
}
