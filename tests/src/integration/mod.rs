//! # Integration Tests
//!
//! Each module drives the public API of `fork-choice` and `chain-storage`
//! together, the way a node would.

pub mod block_import;
pub mod concurrency;
pub mod database_lifecycle;
pub mod finalization;
pub mod persistence;
