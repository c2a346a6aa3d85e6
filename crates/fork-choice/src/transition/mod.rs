//! # State Transition
//!
//! `StateTransition` is the deterministic `(pre_state, block) -> post_state`
//! function the import pipeline treats as a black box. `BasicStateTransition`
//! covers slot processing, the block header, randao mixing and block
//! operations. It performs no signature checks; those belong to the
//! `BlockValidator` run before it.

mod basic;

pub use basic::BasicStateTransition;

use shared_types::{BeaconState, SignedBeaconBlock};

use crate::domain::StateTransitionError;

pub trait StateTransition: Send + Sync {
    /// Advance `pre_state` to the block's slot and apply the block.
    fn apply(
        &self,
        pre_state: &BeaconState,
        block: &SignedBeaconBlock,
    ) -> Result<BeaconState, StateTransitionError>;
}
