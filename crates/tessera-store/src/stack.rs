//! LIFO stack.
//!
//! The top is the record with the highest uid. `pop` reads and deletes it in
//! one immediate transaction.

use tessera_core::{RecordId, Value};

use crate::error::Result;
use crate::model::Model;
use crate::records::RecordInfo;
use crate::sqlite::Scope;
use crate::traits::{Edge, Store, StoreCore};

/// Stack handle.
#[derive(Clone, Copy)]
pub struct Stack<'a> {
    core: StoreCore<'a>,
}

impl<'a> Stack<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self {
            core: StoreCore::new(scope, Model::Stack),
        }
    }

    /// Push a value. `Null` is not stored.
    pub fn push(&self, value: &Value) -> Result<Option<RecordId>> {
        self.core.append(value)
    }

    /// Push values in order, in one transaction; the last ends on top.
    pub fn push_many<'v, I>(&self, values: I) -> Result<Vec<Option<RecordId>>>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        self.core.append_many(values)
    }

    /// Remove and return the top value.
    pub fn pop(&self) -> Result<Option<Value>> {
        self.core.take(Edge::Newest)
    }

    pub fn pop_or(&self, default: Value) -> Result<Value> {
        Ok(self.pop()?.unwrap_or(default))
    }

    pub fn peek(&self) -> Result<Option<Value>> {
        self.core.peek(Edge::Newest)
    }

    pub fn top_uid(&self) -> Result<Option<RecordId>> {
        self.core.edge_uid(Edge::Newest)
    }

    pub fn count_top_bytes(&self) -> Result<u64> {
        self.core.edge_bytes(Edge::Newest)
    }

    pub fn count_top_chunks(&self) -> Result<u64> {
        self.core.edge_chunks(Edge::Newest)
    }

    pub fn info_top(&self) -> Result<Option<RecordInfo>> {
        self.core.edge_info(Edge::Newest)
    }
}

impl Store for Stack<'_> {
    fn core(&self) -> StoreCore<'_> {
        self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::sqlite::SqliteStore;
    use tessera_core::Datatype;

    fn int(n: i64) -> Value {
        Value::Integer(n.into())
    }

    #[test]
    fn test_lifo_order() {
        let store = SqliteStore::open_memory(StoreConfig::default()).unwrap();
        let stack = store.stack();
        stack.push_many(&[int(1), int(2), int(3)]).unwrap();

        assert_eq!(stack.pop().unwrap(), Some(int(3)));
        assert_eq!(stack.pop().unwrap(), Some(int(2)));
        assert_eq!(stack.pop().unwrap(), Some(int(1)));
        assert_eq!(stack.pop().unwrap(), None);
        assert_eq!(stack.pop_or(int(0)).unwrap(), int(0));
    }

    #[test]
    fn test_peek_and_top() {
        let store = SqliteStore::open_memory(StoreConfig {
            chunk_size: 3,
            ..Default::default()
        })
        .unwrap();
        let stack = store.stack();
        assert_eq!(stack.peek().unwrap(), None);
        assert_eq!(stack.top_uid().unwrap(), None);
        assert_eq!(stack.count_top_bytes().unwrap(), 0);

        stack.push(&int(1)).unwrap();
        let top = stack.push(&Value::Bytes(vec![0; 7])).unwrap().unwrap();
        assert_eq!(stack.peek().unwrap(), Some(Value::Bytes(vec![0; 7])));
        assert_eq!(stack.top_uid().unwrap(), Some(top));
        assert_eq!(stack.count_top_bytes().unwrap(), 7);
        assert_eq!(stack.count_top_chunks().unwrap(), 3);

        let info = stack.info_top().unwrap().unwrap();
        assert_eq!(info.uid, top);
        assert_eq!(info.datatype, Datatype::Bin);
        assert_eq!(stack.count_records().unwrap(), 2);
    }
}
