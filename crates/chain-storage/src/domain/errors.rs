//! # Storage Errors
//!
//! Two families share one enum:
//!
//! - **Illegal state**: lifecycle or invariant misuse (closed database,
//!   finalization regression, dangling checkpoint roots). Not recoverable
//!   in-process; see [`StorageError::is_illegal_state`].
//! - **System faults**: backend I/O and encoding failures.

use std::fmt;

use shared_types::{Epoch, Hash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Any operation attempted after `Database::close`.
    #[error("Illegal state: database already closed (operation: {operation})")]
    DatabaseClosed { operation: &'static str },

    #[error("Illegal state: finalized epoch cannot regress from {current} to {requested}")]
    FinalizationRegression { requested: Epoch, current: Epoch },

    #[error("Illegal state: {kind} checkpoint root 0x{} is not a known block", hex::encode(.root))]
    UnknownCheckpointRoot { kind: &'static str, root: Hash },

    #[error("Illegal state: finalized epoch {finalized} is ahead of justified epoch {justified}")]
    InconsistentCheckpoints { justified: Epoch, finalized: Epoch },

    /// Reads or updates against a database without a stored genesis.
    #[error("Illegal state: database holds no genesis")]
    NotInitialized,

    #[error("Database error: {0}")]
    KeyValue(#[from] KVStoreError),

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl StorageError {
    /// `true` for lifecycle and invariant violations, `false` for I/O and
    /// encoding faults.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            StorageError::DatabaseClosed { .. }
                | StorageError::FinalizationRegression { .. }
                | StorageError::UnknownCheckpointRoot { .. }
                | StorageError::InconsistentCheckpoints { .. }
                | StorageError::NotInitialized
        )
    }
}

/// Errors from the key-value store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    IOError { message: String },
    /// Data corruption in the store.
    CorruptionError { message: String },
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
            KVStoreError::CorruptionError { message } => {
                write!(f, "KV store corruption: {}", message)
            }
        }
    }
}

impl std::error::Error for KVStoreError {}
