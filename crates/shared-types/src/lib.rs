//! # Shared Types Crate
//!
//! Beacon-chain data model shared by validation, fork choice and storage.
//!
//! ## Contents
//!
//! - `entities`: blocks, block bodies and their operations, checkpoints
//! - `state`: `BeaconState`, the validator registry and genesis construction
//! - `tree_hash`: commitment roots over every consensus object
//! - `helpers`: epoch math, proposer selection, signature domains
//! - `constants`: protocol parameters
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every crate in the workspace uses these
//!   definitions; no crate redefines a consensus type.
//! - **Deterministic Commitments**: a root is a pure function of an object's
//!   fields, so two nodes applying the same block agree on the post-state
//!   root bit for bit.

pub mod constants;
pub mod entities;
pub mod errors;
pub mod helpers;
pub mod state;
pub mod tree_hash;

pub use entities::*;
pub use errors::StateError;
pub use state::{genesis_block, BeaconState, Fork, Validator};
pub use tree_hash::{RootHasher, TreeHash};
