//! In-memory adapters for tests and memory-only nodes.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;

use crate::domain::errors::{KVStoreError, StorageError};
use crate::domain::lifecycle::LifecycleToken;
use crate::domain::update::{DatabaseUpdateResult, StorageUpdate};
use crate::ports::outbound::{BatchOperation, KeyValueStore, StorageUpdateChannel};

/// Ordered in-memory key-value store.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        // Nothing here can fail midway, so applying in order is atomic.
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(self
            .data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn find_last_at_or_before(
        &self,
        prefix: &[u8],
        key: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        if key < prefix {
            return Ok(None);
        }
        Ok(self
            .data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Included(key)))
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// Update channel for stores without persistence.
///
/// Accepts every update. Its lifecycle can still be closed, which makes the
/// bound store refuse reads and commits the same way a closed database does.
#[derive(Debug, Default, Clone)]
pub struct MemoryOnlyChannel {
    lifecycle: LifecycleToken,
}

impl MemoryOnlyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) -> Result<(), StorageError> {
        self.lifecycle.close()
    }
}

#[async_trait]
impl StorageUpdateChannel for MemoryOnlyChannel {
    async fn on_storage_update(
        &self,
        _update: &StorageUpdate,
    ) -> Result<DatabaseUpdateResult, StorageError> {
        self.lifecycle.ensure_open("on_storage_update")?;
        Ok(DatabaseUpdateResult::empty())
    }

    fn lifecycle(&self) -> LifecycleToken {
        self.lifecycle.clone()
    }
}
