//! Record store abstraction.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::error::Result;

/// A key to compressed-record store with a single owning process.
///
/// Implementations must be safe to call from several load workers at once.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Fetch the payload stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `payload` under `key`, replacing any previous payload.
    fn put(&self, key: &str, payload: &[u8]) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<HashSet<String>>;

    /// Delete every key in `keys` in one batch. Returns the number deleted.
    fn delete_many(&self, keys: &[String]) -> Result<usize>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Flush pending writes.
    fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}

/// An in-memory record store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), payload.to_vec());
        Ok(())
    }

    fn keys(&self) -> Result<HashSet<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let mut entries = self.entries.write();
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_operations() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.get("a0").unwrap(), None);

        store.put("a0", b"one").unwrap();
        store.put("b0", b"two").unwrap();
        store.put("a0", b"uno").unwrap();

        assert_eq!(store.get("a0").unwrap(), Some(b"uno".to_vec()));
        assert_eq!(store.len().unwrap(), 2);

        let deleted = store
            .delete_many(&["a0".to_string(), "zz0".to_string()])
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.keys().unwrap(), HashSet::from(["b0".to_string()]));
    }
}
