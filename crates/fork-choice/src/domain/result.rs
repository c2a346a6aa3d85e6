//! Outcomes of importing a block or an attestation.

use std::fmt;
use std::sync::Arc;

use shared_types::{Checkpoint, Epoch, Hash, SignedBeaconBlock, Slot};

use super::error::{BlockValidationError, StateTransitionError};

/// Exactly one of these holds per `on_block` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockImportResult {
    Successful(Arc<SignedBeaconBlock>),
    FailedStateTransition(StateTransitionError),
    FailedSignature(BlockValidationError),
    FailedAttestation(BlockValidationError),
    /// Randao, slashing or exit rejected.
    FailedBlockBody(BlockValidationError),
    /// Parent not known yet; the caller may buffer and retry.
    UnknownParent { parent_root: Hash },
    BlockAlreadyProcessed { root: Hash },
    InvalidStateRoot(BlockValidationError),
    BlockIsFromFuture { slot: Slot, current_slot: Slot },
    /// Block does not descend from the finalized checkpoint.
    InvalidAncestry { slot: Slot, finalized: Checkpoint },
}

impl BlockImportResult {
    /// Sort a validator rejection into its import outcome.
    pub fn from_validation_error(error: BlockValidationError) -> Self {
        match error {
            BlockValidationError::InvalidBlockSignature { .. } => Self::FailedSignature(error),
            BlockValidationError::InvalidAttestation { .. } => Self::FailedAttestation(error),
            BlockValidationError::InvalidStateRoot { .. } => Self::InvalidStateRoot(error),
            BlockValidationError::InvalidRandaoReveal { .. }
            | BlockValidationError::InvalidProposerSlashing { .. }
            | BlockValidationError::InvalidAttesterSlashing { .. }
            | BlockValidationError::InvalidVoluntaryExit { .. } => Self::FailedBlockBody(error),
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Successful(_))
    }

    /// The imported block, if the import succeeded.
    pub fn block(&self) -> Option<&Arc<SignedBeaconBlock>> {
        match self {
            Self::Successful(block) => Some(block),
            _ => None,
        }
    }

    /// Stable label for the failure kind. `None` on success.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            Self::Successful(_) => None,
            Self::FailedStateTransition(_) => Some("failed_state_transition"),
            Self::FailedSignature(_) => Some("failed_signature"),
            Self::FailedAttestation(_) => Some("failed_attestation"),
            Self::FailedBlockBody(_) => Some("failed_block_body"),
            Self::UnknownParent { .. } => Some("unknown_parent"),
            Self::BlockAlreadyProcessed { .. } => Some("block_already_processed"),
            Self::InvalidStateRoot(_) => Some("invalid_state_root"),
            Self::BlockIsFromFuture { .. } => Some("block_is_from_future"),
            Self::InvalidAncestry { .. } => Some("invalid_ancestry"),
        }
    }
}

impl fmt::Display for BlockImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful(block) => write!(f, "imported {}", hex::encode(block.root())),
            Self::FailedStateTransition(e) => write!(f, "state transition failed: {e}"),
            Self::FailedSignature(e) | Self::FailedAttestation(e) | Self::FailedBlockBody(e) => {
                write!(f, "{e}")
            }
            Self::UnknownParent { parent_root } => {
                write!(f, "unknown parent {}", hex::encode(parent_root))
            }
            Self::BlockAlreadyProcessed { root } => {
                write!(f, "block {} already processed", hex::encode(root))
            }
            Self::InvalidStateRoot(e) => write!(f, "{e}"),
            Self::BlockIsFromFuture { slot, current_slot } => {
                write!(f, "block slot {slot} is after current slot {current_slot}")
            }
            Self::InvalidAncestry { slot, finalized } => {
                write!(f, "block at slot {slot} does not descend from finalized {finalized}")
            }
        }
    }
}

/// Outcome of `on_attestation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationProcessingResult {
    Successful,
    /// Target or voted block not in the store.
    UnknownBlock { root: Hash },
    InvalidTargetEpoch { target_epoch: Epoch, current_epoch: Epoch },
    /// Target epoch is not the epoch of the attestation slot.
    SlotEpochMismatch { slot: Slot, target_epoch: Epoch },
    /// Voted block is not an ancestor-or-self at the target epoch start.
    InvalidTargetRoot { expected: Hash, actual: Hash },
    BlockNewerThanAttestation { block_slot: Slot, attestation_slot: Slot },
    FromFuture { slot: Slot, current_slot: Slot },
    InvalidIndices,
    InvalidSignature,
}

impl AttestationProcessingResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Successful)
    }
}
