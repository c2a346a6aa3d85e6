//! State accessor errors.

use thiserror::Error;

use crate::entities::{Slot, ValidatorIndex};

/// Failures of the state helper functions.
///
/// These signal a malformed state or an out-of-range query, never a
/// rejected block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Validator {index} not in registry of size {registry_size}")]
    UnknownValidator {
        index: ValidatorIndex,
        registry_size: usize,
    },

    #[error("No active validators at epoch {epoch}")]
    NoActiveValidators { epoch: u64 },

    #[error("Slot {slot} outside history window of state at slot {state_slot}")]
    SlotOutOfRange { slot: Slot, state_slot: Slot },
}
