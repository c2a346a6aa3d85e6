//! # Chain Storage
//!
//! Transactional chain store backed by a durable key-value database.
//!
//! ## Architecture
//!
//! ```text
//! ForkChoice ──stages──→ Transaction ──commit──→ Store ──on_storage_update──→ Database
//!                          (overlay)           (Arc snapshot)                (KeyValueStore)
//! ```
//!
//! A commit first validates the update against the latest snapshot, then
//! persists it through the store's `StorageUpdateChannel`, and only then
//! swaps in the new in-memory snapshot. A failure at any step leaves both
//! sides untouched.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Known checkpoints | Justified and finalized roots are stored blocks |
//! | 2 | Checkpoint order | `finalized.epoch <= justified.epoch` |
//! | 3 | Finalization Monotonicity | Finalization cannot regress |
//! | 4 | Atomic Writes | All or nothing, in memory and on disk |
//! | 5 | Closed is terminal | Every operation fails once the database closed |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - errors, key layout, config, lifecycle, update records
//! - `ports/` - `KeyValueStore` and `StorageUpdateChannel`
//! - `adapters/` - in-memory and RocksDB backends, bincode codec
//! - `store`, `transaction`, `database` - the application layer
//!
//! ## Usage
//!
//! ```ignore
//! let db = Arc::new(Database::open(InMemoryKVStore::new(), StorageConfig::default()));
//! let genesis = StoreSnapshot::from_genesis(genesis_state);
//! db.store_genesis(&genesis)?;
//! let store = Store::new(genesis, db.clone());
//!
//! let mut tx = store.start_transaction()?;
//! tx.set_time(now);
//! tx.commit().await?;
//! ```

pub mod adapters;
pub mod database;
pub mod domain;
pub mod ports;
pub mod store;
pub mod transaction;

pub use adapters::memory::{InMemoryKVStore, MemoryOnlyChannel};
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb_store::{RocksDbConfig, RocksDbStore};
pub use database::Database;
pub use domain::config::{StateStorageMode, StorageConfig};
pub use domain::errors::{KVStoreError, StorageError};
pub use domain::keys::KeyPrefix;
pub use domain::lifecycle::LifecycleToken;
pub use domain::update::{DatabaseUpdateResult, ForkChoiceEvent, StorageUpdate};
pub use ports::outbound::{BatchOperation, KeyValueStore, StorageUpdateChannel};
pub use store::{ReadOnlyStore, Store, StoreSnapshot};
pub use transaction::Transaction;
