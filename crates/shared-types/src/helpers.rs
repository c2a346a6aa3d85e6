//! # Protocol Helpers
//!
//! Pure functions over `BeaconState`: epoch math, validator sets, proposer
//! selection and signature domains.
//!
//! Proposer selection for a slot depends only on the active set of the
//! slot's epoch, the randao mix `MIN_SEED_LOOKAHEAD + 1` epochs back and the
//! genesis validators root. Slot processing alters none of these, so a
//! parent state and the same state advanced to the block's slot select the
//! same proposer.

use crate::constants::{
    DOMAIN_BEACON_PROPOSER, EPOCHS_PER_HISTORICAL_VECTOR, MAX_SEED_LOOKAHEAD, MIN_SEED_LOOKAHEAD,
    SLOTS_PER_EPOCH,
};
use crate::entities::{AttestationData, DomainType, Epoch, Hash, Slot, ValidatorIndex, Version};
use crate::errors::StateError;
use crate::state::BeaconState;
use crate::tree_hash::{sha256, RootHasher};

pub fn compute_epoch_at_slot(slot: Slot) -> Epoch {
    slot / SLOTS_PER_EPOCH
}

pub fn compute_start_slot_at_epoch(epoch: Epoch) -> Slot {
    epoch.saturating_mul(SLOTS_PER_EPOCH)
}

pub fn compute_slots_since_epoch_start(slot: Slot) -> u64 {
    slot - compute_start_slot_at_epoch(compute_epoch_at_slot(slot))
}

/// Earliest epoch an exit initiated during `epoch` may take effect.
pub fn compute_activation_exit_epoch(epoch: Epoch) -> Epoch {
    epoch + 1 + MAX_SEED_LOOKAHEAD
}

pub fn get_active_validator_indices(state: &BeaconState, epoch: Epoch) -> Vec<ValidatorIndex> {
    state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_active_at(epoch))
        .map(|(i, _)| i as ValidatorIndex)
        .collect()
}

pub fn get_randao_mix(state: &BeaconState, epoch: Epoch) -> Hash {
    state.randao_mixes[(epoch % EPOCHS_PER_HISTORICAL_VECTOR) as usize]
}

/// Seed for `domain_type` duties in `epoch`.
pub fn get_seed(state: &BeaconState, epoch: Epoch, domain_type: DomainType) -> Hash {
    let mix = get_randao_mix(
        state,
        epoch + EPOCHS_PER_HISTORICAL_VECTOR - MIN_SEED_LOOKAHEAD - 1,
    );
    sha256(&[
        &domain_type[..],
        &epoch.to_le_bytes()[..],
        &mix[..],
        &state.genesis_validators_root[..],
    ])
}

/// The validator entitled to propose at `slot`.
pub fn get_beacon_proposer_index(
    state: &BeaconState,
    slot: Slot,
) -> Result<ValidatorIndex, StateError> {
    let epoch = compute_epoch_at_slot(slot);
    let active = get_active_validator_indices(state, epoch);
    if active.is_empty() {
        return Err(StateError::NoActiveValidators { epoch });
    }
    let seed = get_seed(state, epoch, DOMAIN_BEACON_PROPOSER);
    let digest = sha256(&[&seed[..], &slot.to_le_bytes()[..]]);
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    let pick = u64::from_le_bytes(word) % active.len() as u64;
    Ok(active[pick as usize])
}

/// Domain = domain type followed by the first 28 bytes of the fork data root.
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: Version,
    genesis_validators_root: &Hash,
) -> Hash {
    let fork_data_root = RootHasher::new(b"fork_data")
        .bytes(&fork_version)
        .root(genesis_validators_root)
        .finish();
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    domain
}

pub fn get_domain(state: &BeaconState, domain_type: DomainType, epoch: Epoch) -> Hash {
    let fork_version = if epoch < state.fork.epoch {
        state.fork.previous_version
    } else {
        state.fork.current_version
    };
    compute_domain(domain_type, fork_version, &state.genesis_validators_root)
}

/// The message actually signed for an object with root `object_root`.
pub fn compute_signing_root(object_root: &Hash, domain: &Hash) -> Hash {
    sha256(&[&object_root[..], &domain[..]])
}

/// Double vote or surround vote.
pub fn is_slashable_attestation_data(a: &AttestationData, b: &AttestationData) -> bool {
    let double_vote = a != b && a.target.epoch == b.target.epoch;
    let surround_vote = a.source.epoch < b.source.epoch && b.target.epoch < a.target.epoch;
    double_vote || surround_vote
}

/// Attesting indices must be non-empty, bounded, sorted and unique.
pub fn is_valid_attesting_indices(indices: &[ValidatorIndex], max: usize) -> bool {
    !indices.is_empty() && indices.len() <= max && indices.windows(2).all(|w| w[0] < w[1])
}
