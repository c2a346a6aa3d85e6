//! Signature checks for the block proposal and each body operation.
//!
//! Every check reads the pre-state only and returns
//! `Ok(Err(rejection))` for a bad block. `Err(StateError)` means the state
//! itself could not answer the query.

use shared_crypto::SignatureVerifier;
use shared_types::constants::{
    DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_RANDAO, DOMAIN_VOLUNTARY_EXIT,
    MAX_VALIDATORS_PER_COMMITTEE,
};
use shared_types::helpers::{
    compute_epoch_at_slot, compute_signing_root, get_beacon_proposer_index, get_domain,
    is_valid_attesting_indices,
};
use shared_types::{
    Attestation, AttesterSlashing, BeaconState, PublicKeyBytes, ProposerSlashing,
    SignedBeaconBlock, SignedBeaconBlockHeader, SignedVoluntaryExit, StateError, TreeHash,
};

use super::BlockValidationResult;
use crate::domain::BlockValidationError;

/// The block must be signed by the proposer the state selects for its slot.
pub fn verify_block_signature(
    state: &BeaconState,
    block: &SignedBeaconBlock,
    verifier: &dyn SignatureVerifier,
) -> Result<BlockValidationResult, StateError> {
    let slot = block.slot();
    let proposer_index = get_beacon_proposer_index(state, slot)?;
    let proposer = state.validator(proposer_index)?;
    let domain = get_domain(state, DOMAIN_BEACON_PROPOSER, compute_epoch_at_slot(slot));
    let signing_root = compute_signing_root(&block.message.hash_tree_root(), &domain);

    if verifier
        .verify_and_fail(
            &proposer.pubkey,
            &signing_root,
            &block.signature,
            "block proposal",
        )
        .is_err()
    {
        return Ok(Err(BlockValidationError::InvalidBlockSignature {
            block_root: hex::encode(block.root()),
            slot,
            proposer_index,
        }));
    }
    Ok(Ok(()))
}

/// The randao reveal is the proposer's signature over the block epoch.
pub fn verify_randao(
    state: &BeaconState,
    block: &SignedBeaconBlock,
    verifier: &dyn SignatureVerifier,
) -> Result<BlockValidationResult, StateError> {
    let epoch = compute_epoch_at_slot(block.slot());
    let proposer_index = get_beacon_proposer_index(state, block.slot())?;
    let proposer = state.validator(proposer_index)?;
    let domain = get_domain(state, DOMAIN_RANDAO, epoch);
    let signing_root = compute_signing_root(&epoch.hash_tree_root(), &domain);

    if !verifier.verify(
        &proposer.pubkey,
        &signing_root,
        &block.message.body.randao_reveal,
    ) {
        return Ok(Err(BlockValidationError::InvalidRandaoReveal { proposer_index }));
    }
    Ok(Ok(()))
}

pub fn verify_attestations(
    state: &BeaconState,
    attestations: &[Attestation],
    verifier: &dyn SignatureVerifier,
) -> BlockValidationResult {
    for (index, attestation) in attestations.iter().enumerate() {
        if let Err(reason) = check_indexed_attestation(state, attestation, verifier) {
            return Err(BlockValidationError::InvalidAttestation { index, reason });
        }
    }
    Ok(())
}

pub fn verify_proposer_slashings(
    state: &BeaconState,
    slashings: &[ProposerSlashing],
    verifier: &dyn SignatureVerifier,
) -> BlockValidationResult {
    for (index, slashing) in slashings.iter().enumerate() {
        for header in [&slashing.signed_header_1, &slashing.signed_header_2] {
            if let Err(reason) = check_header_signature(state, header, verifier) {
                return Err(BlockValidationError::InvalidProposerSlashing { index, reason });
            }
        }
    }
    Ok(())
}

pub fn verify_attester_slashings(
    state: &BeaconState,
    slashings: &[AttesterSlashing],
    verifier: &dyn SignatureVerifier,
) -> BlockValidationResult {
    for (index, slashing) in slashings.iter().enumerate() {
        for attestation in [&slashing.attestation_1, &slashing.attestation_2] {
            if let Err(reason) = check_indexed_attestation(state, attestation, verifier) {
                return Err(BlockValidationError::InvalidAttesterSlashing { index, reason });
            }
        }
    }
    Ok(())
}

pub fn verify_voluntary_exits(
    state: &BeaconState,
    exits: &[SignedVoluntaryExit],
    verifier: &dyn SignatureVerifier,
) -> BlockValidationResult {
    for (index, exit) in exits.iter().enumerate() {
        let Ok(validator) = state.validator(exit.message.validator_index) else {
            return Err(BlockValidationError::InvalidVoluntaryExit {
                index,
                reason: format!("unknown validator {}", exit.message.validator_index),
            });
        };
        let domain = get_domain(state, DOMAIN_VOLUNTARY_EXIT, exit.message.epoch);
        let signing_root = compute_signing_root(&exit.message.hash_tree_root(), &domain);
        if !verifier.verify(&validator.pubkey, &signing_root, &exit.signature) {
            return Err(BlockValidationError::InvalidVoluntaryExit {
                index,
                reason: "invalid signature".into(),
            });
        }
    }
    Ok(())
}

/// Well-formed indices, all registered, and a valid aggregate signature.
pub(crate) fn check_indexed_attestation(
    state: &BeaconState,
    attestation: &Attestation,
    verifier: &dyn SignatureVerifier,
) -> Result<(), String> {
    let indices = &attestation.attesting_indices;
    if !is_valid_attesting_indices(indices, MAX_VALIDATORS_PER_COMMITTEE) {
        return Err("attesting indices must be non-empty, sorted and unique".into());
    }
    let pubkeys = indices
        .iter()
        .map(|i| state.validator(*i).map(|v| v.pubkey))
        .collect::<Result<Vec<PublicKeyBytes>, _>>()
        .map_err(|e| e.to_string())?;

    let domain = get_domain(state, DOMAIN_BEACON_ATTESTER, attestation.data.target.epoch);
    let signing_root = compute_signing_root(&attestation.data.hash_tree_root(), &domain);
    if !verifier.verify_aggregate(&pubkeys, &signing_root, &attestation.signature) {
        return Err("invalid aggregate signature".into());
    }
    Ok(())
}

fn check_header_signature(
    state: &BeaconState,
    header: &SignedBeaconBlockHeader,
    verifier: &dyn SignatureVerifier,
) -> Result<(), String> {
    let proposer = state
        .validator(header.message.proposer_index)
        .map_err(|e| e.to_string())?;
    let domain = get_domain(
        state,
        DOMAIN_BEACON_PROPOSER,
        compute_epoch_at_slot(header.message.slot),
    );
    let signing_root = compute_signing_root(&header.message.hash_tree_root(), &domain);
    if !verifier.verify(&proposer.pubkey, &signing_root, &header.signature) {
        return Err(format!(
            "invalid signature on header at slot {}",
            header.message.slot
        ));
    }
    Ok(())
}
