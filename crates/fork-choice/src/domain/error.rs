//! Error types for block import.
//!
//! Two families that must never be mixed:
//!
//! - `BlockValidationError` and `StateTransitionError` are rejections. The
//!   block is bad; the import returns them as data inside a
//!   `BlockImportResult`.
//! - `ForkChoiceError` is a system fault. Validation or storage itself broke
//!   and the caller should alert rather than drop the block.

use chain_storage::StorageError;
use shared_types::{Slot, StateError, ValidatorIndex};
use thiserror::Error;

/// Protocol-defined reasons to reject a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockValidationError {
    #[error("Invalid signature on block {block_root} at slot {slot}, proposer {proposer_index}")]
    InvalidBlockSignature {
        block_root: String,
        slot: Slot,
        proposer_index: ValidatorIndex,
    },

    #[error("Invalid randao reveal from proposer {proposer_index}")]
    InvalidRandaoReveal { proposer_index: ValidatorIndex },

    #[error("Invalid attestation #{index}: {reason}")]
    InvalidAttestation { index: usize, reason: String },

    #[error("Invalid proposer slashing #{index}: {reason}")]
    InvalidProposerSlashing { index: usize, reason: String },

    #[error("Invalid attester slashing #{index}: {reason}")]
    InvalidAttesterSlashing { index: usize, reason: String },

    #[error("Invalid voluntary exit #{index}: {reason}")]
    InvalidVoluntaryExit { index: usize, reason: String },

    #[error("State root mismatch: block {block_state_root}, computed {computed_state_root}")]
    InvalidStateRoot {
        block_state_root: String,
        computed_state_root: String,
    },
}

/// Reasons the state transition refused a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateTransitionError {
    #[error("Cannot advance state at slot {state_slot} to slot {target_slot}")]
    SlotNotAfterState { target_slot: Slot, state_slot: Slot },

    #[error("Block slot {block_slot} does not match state slot {state_slot}")]
    SlotMismatch { block_slot: Slot, state_slot: Slot },

    #[error("Block slot {block_slot} not after parent slot {parent_slot}")]
    SlotNotAfterParent { block_slot: Slot, parent_slot: Slot },

    #[error("Wrong proposer: expected {expected}, block claims {actual}")]
    ProposerMismatch {
        expected: ValidatorIndex,
        actual: ValidatorIndex,
    },

    #[error("Parent root mismatch: state {expected}, block {actual}")]
    ParentRootMismatch { expected: String, actual: String },

    #[error("Proposer {proposer_index} is slashed")]
    ProposerSlashed { proposer_index: ValidatorIndex },

    #[error("Too many {kind}: {count} > {max}")]
    TooManyOperations {
        kind: &'static str,
        count: usize,
        max: usize,
    },

    #[error("Invalid {kind} #{index}: {reason}")]
    InvalidOperation {
        kind: &'static str,
        index: usize,
        reason: String,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl StateTransitionError {
    pub(crate) fn operation(kind: &'static str, index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            kind,
            index,
            reason: reason.into(),
        }
    }
}

/// Faults in the import machinery itself.
#[derive(Debug, Error)]
pub enum ForkChoiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Blocking task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Known block {0} has no stored state")]
    MissingState(String),
}
