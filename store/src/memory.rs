//! In-memory store backend for tests and single-process tooling.

use crate::{Store, StoreError};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A [`Store`] backed by a `BTreeMap` behind a read/write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.inner.read().expect("store lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut map = self.inner.write().expect("store lock poisoned");
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut map = self.inner.write().expect("store lock poisoned");
        map.remove(key);
        Ok(())
    }

    fn put_batch(&self, items: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StoreError> {
        let mut map = self.inner.write().expect("store lock poisoned");
        for (key, value) in items {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
