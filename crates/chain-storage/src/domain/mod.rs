//! Domain layer: errors, key layout, configuration, lifecycle and the update
//! records exchanged with the durable store.

pub mod config;
pub mod errors;
pub mod keys;
pub mod lifecycle;
pub mod update;
