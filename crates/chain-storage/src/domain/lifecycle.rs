//! Open/closed lifecycle token.
//!
//! A database owns the token and hands clones to every store bound to it.
//! Closing flips one shared atomic; every public operation checks it first,
//! so the guard holds regardless of what the storage engine beneath does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::errors::StorageError;

#[derive(Debug, Clone, Default)]
pub struct LifecycleToken {
    closed: Arc<AtomicBool>,
}

impl LifecycleToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fails with [`StorageError::DatabaseClosed`] once closed.
    pub fn ensure_open(&self, operation: &'static str) -> Result<(), StorageError> {
        if self.is_closed() {
            tracing::warn!("[storage] Rejected {} on closed database", operation);
            return Err(StorageError::DatabaseClosed { operation });
        }
        Ok(())
    }

    /// Transition to closed. Only the first caller succeeds.
    pub fn close(&self) -> Result<(), StorageError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StorageError::DatabaseClosed { operation: "close" });
        }
        Ok(())
    }
}
