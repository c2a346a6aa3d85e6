//! # Driven Ports (SPI)
//!
//! Interfaces the chain store depends on.

use async_trait::async_trait;

use crate::domain::errors::{KVStoreError, StorageError};
use crate::domain::lifecycle::LifecycleToken;
use crate::domain::update::{DatabaseUpdateResult, StorageUpdate};

/// Abstract interface for key-value database operations.
///
/// Production: `RocksDbStore` (`adapters::rocksdb_store`, feature `rocksdb`)
/// Testing: `InMemoryKVStore`
///
/// Implementations must return `prefix_scan` results in ascending key order.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All entries under `prefix`, ascending by key.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;

    /// The entry with the greatest key `<= key` that still starts with
    /// `prefix`.
    fn find_last_at_or_before(
        &self,
        prefix: &[u8],
        key: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(self
            .prefix_scan(prefix)?
            .into_iter()
            .take_while(|(k, _)| k.as_slice() <= key)
            .last())
    }

    /// Flush and release the backend. Called once by `Database::close`.
    fn close(&mut self) -> Result<(), KVStoreError> {
        Ok(())
    }
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Sink for committed store updates.
///
/// A `Store` pushes each committed transaction through exactly one channel
/// and only publishes the update in memory once the channel accepted it.
#[async_trait]
pub trait StorageUpdateChannel: Send + Sync {
    /// Durably apply `update`. An error leaves the store untouched.
    async fn on_storage_update(
        &self,
        update: &StorageUpdate,
    ) -> Result<DatabaseUpdateResult, StorageError>;

    /// Lifecycle of the backing database, checked by store reads.
    fn lifecycle(&self) -> LifecycleToken;
}
