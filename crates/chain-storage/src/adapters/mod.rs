//! Adapters for the storage ports.

pub mod codec;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;
