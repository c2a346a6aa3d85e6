use shared_types::constants::{
    EPOCHS_PER_HISTORICAL_VECTOR, EPOCHS_PER_SLASHINGS_VECTOR, FAR_FUTURE_EPOCH,
    MAX_ATTESTATIONS, MAX_ATTESTER_SLASHINGS, MAX_PROPOSER_SLASHINGS,
    MAX_VALIDATORS_PER_COMMITTEE, MAX_VOLUNTARY_EXITS, MIN_ATTESTATION_INCLUSION_DELAY,
    MIN_SLASHING_PENALTY_QUOTIENT, MIN_VALIDATOR_WITHDRAWABILITY_DELAY, SHARD_COMMITTEE_PERIOD,
    SLOTS_PER_EPOCH, SLOTS_PER_HISTORICAL_ROOT, WHISTLEBLOWER_REWARD_QUOTIENT,
};
use shared_types::helpers::{
    compute_activation_exit_epoch, compute_epoch_at_slot, get_beacon_proposer_index,
    get_randao_mix, is_slashable_attestation_data, is_valid_attesting_indices,
};
use shared_types::tree_hash::sha256;
use shared_types::{
    Attestation, AttesterSlashing, BeaconBlock, BeaconBlockHeader, BeaconState, Gwei,
    ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit, Slot, StateError, TreeHash,
    ValidatorIndex, ZERO_HASH,
};

use super::StateTransition;
use crate::domain::StateTransitionError;

/// Block-level state transition without epoch processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicStateTransition;

impl StateTransition for BasicStateTransition {
    fn apply(
        &self,
        pre_state: &BeaconState,
        block: &SignedBeaconBlock,
    ) -> Result<BeaconState, StateTransitionError> {
        let mut state = pre_state.clone();
        Self::process_slots(&mut state, block.slot())?;
        Self::process_block(&mut state, &block.message)?;
        Ok(state)
    }
}

impl BasicStateTransition {
    /// Advance `state` to `slot`, caching roots of every slot passed.
    pub fn process_slots(state: &mut BeaconState, slot: Slot) -> Result<(), StateTransitionError> {
        if slot <= state.slot {
            return Err(StateTransitionError::SlotNotAfterState {
                target_slot: slot,
                state_slot: state.slot,
            });
        }
        while state.slot < slot {
            Self::process_slot(state);
            state.slot += 1;
        }
        Ok(())
    }

    fn process_slot(state: &mut BeaconState) {
        let index = (state.slot % SLOTS_PER_HISTORICAL_ROOT) as usize;
        let previous_state_root = state.hash_tree_root();
        state.state_roots[index] = previous_state_root;

        // The header of the latest block was stored before its state root
        // was known.
        if state.latest_block_header.state_root == ZERO_HASH {
            state.latest_block_header.state_root = previous_state_root;
        }
        state.block_roots[index] = state.latest_block_header.hash_tree_root();
    }

    fn process_block(
        state: &mut BeaconState,
        block: &BeaconBlock,
    ) -> Result<(), StateTransitionError> {
        Self::process_block_header(state, block)?;
        Self::process_randao(state, block);
        Self::process_operations(state, block)
    }

    fn process_block_header(
        state: &mut BeaconState,
        block: &BeaconBlock,
    ) -> Result<(), StateTransitionError> {
        if block.slot != state.slot {
            return Err(StateTransitionError::SlotMismatch {
                block_slot: block.slot,
                state_slot: state.slot,
            });
        }
        if block.slot <= state.latest_block_header.slot {
            return Err(StateTransitionError::SlotNotAfterParent {
                block_slot: block.slot,
                parent_slot: state.latest_block_header.slot,
            });
        }
        let expected = get_beacon_proposer_index(state, block.slot)?;
        if block.proposer_index != expected {
            return Err(StateTransitionError::ProposerMismatch {
                expected,
                actual: block.proposer_index,
            });
        }
        let parent_root = state.latest_block_header.hash_tree_root();
        if block.parent_root != parent_root {
            return Err(StateTransitionError::ParentRootMismatch {
                expected: hex::encode(parent_root),
                actual: hex::encode(block.parent_root),
            });
        }

        state.latest_block_header = BeaconBlockHeader {
            slot: block.slot,
            proposer_index: block.proposer_index,
            parent_root: block.parent_root,
            state_root: ZERO_HASH,
            body_root: block.body.hash_tree_root(),
        };

        if state.validator(block.proposer_index)?.slashed {
            return Err(StateTransitionError::ProposerSlashed {
                proposer_index: block.proposer_index,
            });
        }
        Ok(())
    }

    fn process_randao(state: &mut BeaconState, block: &BeaconBlock) {
        let epoch = state.current_epoch();
        let reveal_hash = sha256(&[&block.body.randao_reveal.0[..]]);
        let mut mix = get_randao_mix(state, epoch);
        for (byte, reveal) in mix.iter_mut().zip(reveal_hash.iter()) {
            *byte ^= reveal;
        }
        state.randao_mixes[(epoch % EPOCHS_PER_HISTORICAL_VECTOR) as usize] = mix;
    }

    fn process_operations(
        state: &mut BeaconState,
        block: &BeaconBlock,
    ) -> Result<(), StateTransitionError> {
        let body = &block.body;
        check_count("proposer slashings", body.proposer_slashings.len(), MAX_PROPOSER_SLASHINGS)?;
        check_count("attester slashings", body.attester_slashings.len(), MAX_ATTESTER_SLASHINGS)?;
        check_count("attestations", body.attestations.len(), MAX_ATTESTATIONS)?;
        check_count("voluntary exits", body.voluntary_exits.len(), MAX_VOLUNTARY_EXITS)?;

        for (index, slashing) in body.proposer_slashings.iter().enumerate() {
            process_proposer_slashing(state, index, slashing)?;
        }
        for (index, slashing) in body.attester_slashings.iter().enumerate() {
            process_attester_slashing(state, index, slashing)?;
        }
        for (index, attestation) in body.attestations.iter().enumerate() {
            process_attestation(state, index, attestation)?;
        }
        for (index, exit) in body.voluntary_exits.iter().enumerate() {
            process_voluntary_exit(state, index, exit)?;
        }
        Ok(())
    }
}

fn check_count(kind: &'static str, count: usize, max: usize) -> Result<(), StateTransitionError> {
    if count > max {
        return Err(StateTransitionError::TooManyOperations { kind, count, max });
    }
    Ok(())
}

fn process_proposer_slashing(
    state: &mut BeaconState,
    index: usize,
    slashing: &ProposerSlashing,
) -> Result<(), StateTransitionError> {
    const KIND: &str = "proposer slashing";
    let header_1 = &slashing.signed_header_1.message;
    let header_2 = &slashing.signed_header_2.message;

    if header_1.slot != header_2.slot {
        return Err(StateTransitionError::operation(KIND, index, "header slots differ"));
    }
    if header_1.proposer_index != header_2.proposer_index {
        return Err(StateTransitionError::operation(KIND, index, "header proposers differ"));
    }
    if header_1 == header_2 {
        return Err(StateTransitionError::operation(KIND, index, "headers are identical"));
    }
    let epoch = state.current_epoch();
    let proposer = state
        .validator(header_1.proposer_index)
        .map_err(|e| StateTransitionError::operation(KIND, index, e.to_string()))?;
    if !proposer.is_slashable_at(epoch) {
        return Err(StateTransitionError::operation(KIND, index, "proposer is not slashable"));
    }
    slash_validator(state, header_1.proposer_index)?;
    Ok(())
}

fn process_attester_slashing(
    state: &mut BeaconState,
    index: usize,
    slashing: &AttesterSlashing,
) -> Result<(), StateTransitionError> {
    const KIND: &str = "attester slashing";
    let attestation_1 = &slashing.attestation_1;
    let attestation_2 = &slashing.attestation_2;

    if !is_slashable_attestation_data(&attestation_1.data, &attestation_2.data) {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            "attestations are not slashable",
        ));
    }
    for attestation in [attestation_1, attestation_2] {
        if !is_valid_attesting_indices(
            &attestation.attesting_indices,
            MAX_VALIDATORS_PER_COMMITTEE,
        ) {
            return Err(StateTransitionError::operation(KIND, index, "invalid attesting indices"));
        }
    }

    let epoch = state.current_epoch();
    let mut slashed_any = false;
    for validator_index in attestation_1
        .attesting_indices
        .iter()
        .filter(|i| attestation_2.attesting_indices.binary_search(i).is_ok())
    {
        let slashable = state
            .validator(*validator_index)
            .map_err(|e| StateTransitionError::operation(KIND, index, e.to_string()))?
            .is_slashable_at(epoch);
        if slashable {
            slash_validator(state, *validator_index)?;
            slashed_any = true;
        }
    }
    if !slashed_any {
        return Err(StateTransitionError::operation(KIND, index, "no slashable validators"));
    }
    Ok(())
}

fn process_attestation(
    state: &BeaconState,
    index: usize,
    attestation: &Attestation,
) -> Result<(), StateTransitionError> {
    const KIND: &str = "attestation";
    let data = &attestation.data;
    let current_epoch = state.current_epoch();

    if data.target.epoch != current_epoch && data.target.epoch != state.previous_epoch() {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            format!("target epoch {} is neither current nor previous", data.target.epoch),
        ));
    }
    if data.target.epoch != compute_epoch_at_slot(data.slot) {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            "target epoch does not match slot",
        ));
    }
    if data.slot + MIN_ATTESTATION_INCLUSION_DELAY > state.slot
        || state.slot > data.slot + SLOTS_PER_EPOCH
    {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            format!("slot {} outside inclusion window at slot {}", data.slot, state.slot),
        ));
    }
    let expected_source = if data.target.epoch == current_epoch {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };
    if data.source != expected_source {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            "source is not the justified checkpoint",
        ));
    }
    if !is_valid_attesting_indices(&attestation.attesting_indices, MAX_VALIDATORS_PER_COMMITTEE) {
        return Err(StateTransitionError::operation(KIND, index, "invalid attesting indices"));
    }
    for validator_index in &attestation.attesting_indices {
        state
            .validator(*validator_index)
            .map_err(|e| StateTransitionError::operation(KIND, index, e.to_string()))?;
    }
    Ok(())
}

fn process_voluntary_exit(
    state: &mut BeaconState,
    index: usize,
    signed_exit: &SignedVoluntaryExit,
) -> Result<(), StateTransitionError> {
    const KIND: &str = "voluntary exit";
    let exit = &signed_exit.message;
    let current_epoch = state.current_epoch();
    let validator = state
        .validator(exit.validator_index)
        .map_err(|e| StateTransitionError::operation(KIND, index, e.to_string()))?;

    if !validator.is_active_at(current_epoch) {
        return Err(StateTransitionError::operation(KIND, index, "validator is not active"));
    }
    if validator.exit_epoch != FAR_FUTURE_EPOCH {
        return Err(StateTransitionError::operation(KIND, index, "exit already initiated"));
    }
    if current_epoch < exit.epoch {
        return Err(StateTransitionError::operation(KIND, index, "exit epoch is in the future"));
    }
    if current_epoch < validator.activation_epoch + SHARD_COMMITTEE_PERIOD {
        return Err(StateTransitionError::operation(
            KIND,
            index,
            "validator has not been active long enough",
        ));
    }
    initiate_validator_exit(state, exit.validator_index)?;
    Ok(())
}

fn initiate_validator_exit(
    state: &mut BeaconState,
    index: ValidatorIndex,
) -> Result<(), StateError> {
    let exit_epoch = compute_activation_exit_epoch(state.current_epoch());
    let validator = state.validator_mut(index)?;
    if validator.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }
    validator.exit_epoch = exit_epoch;
    validator.withdrawable_epoch = exit_epoch + MIN_VALIDATOR_WITHDRAWABILITY_DELAY;
    Ok(())
}

fn slash_validator(state: &mut BeaconState, index: ValidatorIndex) -> Result<(), StateError> {
    let epoch = state.current_epoch();
    initiate_validator_exit(state, index)?;

    let validator = state.validator_mut(index)?;
    validator.slashed = true;
    validator.withdrawable_epoch = validator
        .withdrawable_epoch
        .max(epoch + EPOCHS_PER_SLASHINGS_VECTOR);
    let effective_balance = validator.effective_balance;

    let penalty = effective_balance / MIN_SLASHING_PENALTY_QUOTIENT;
    let balance = balance_mut(state, index)?;
    *balance = balance.saturating_sub(penalty);

    let whistleblower = state.latest_block_header.proposer_index;
    let reward = effective_balance / WHISTLEBLOWER_REWARD_QUOTIENT;
    let balance = balance_mut(state, whistleblower)?;
    *balance = balance.saturating_add(reward);
    Ok(())
}

fn balance_mut(state: &mut BeaconState, index: ValidatorIndex) -> Result<&mut Gwei, StateError> {
    let registry_size = state.balances.len();
    state
        .balances
        .get_mut(index as usize)
        .ok_or(StateError::UnknownValidator {
            index,
            registry_size,
        })
}
