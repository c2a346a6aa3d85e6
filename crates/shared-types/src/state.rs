//! # Beacon State
//!
//! Full chain state after applying a block: validator registry, balances,
//! recent block/state roots, randao mixes and the FFG checkpoints.

use serde::{Deserialize, Serialize};

use crate::constants::{
    EPOCHS_PER_HISTORICAL_VECTOR, FAR_FUTURE_EPOCH, GENESIS_EPOCH, GENESIS_FORK_VERSION,
    MAX_EFFECTIVE_BALANCE, SLOTS_PER_HISTORICAL_ROOT,
};
use crate::entities::{
    BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Checkpoint, Epoch, Gwei, Hash,
    PublicKeyBytes, Slot, ValidatorIndex, Version, ZERO_HASH,
};
use crate::errors::StateError;
use crate::helpers::compute_epoch_at_slot;
use crate::tree_hash::{RootHasher, TreeHash};

/// Fork versioning. Signatures mix in the version active at their epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    /// Epoch at which `current_version` took effect.
    pub epoch: Epoch,
}

/// Registry entry for one validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Active validators participate in proposing and attesting.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    pub fn is_slashable_at(&self, epoch: Epoch) -> bool {
        !self.slashed && self.activation_epoch <= epoch && epoch < self.withdrawable_epoch
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeaconState {
    pub genesis_time: u64,
    pub genesis_validators_root: Hash,
    pub slot: Slot,
    pub fork: Fork,

    /// Header of the latest processed block, with `state_root` zeroed until
    /// the next slot is processed.
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Vec<Hash>,
    pub state_roots: Vec<Hash>,

    pub validators: Vec<Validator>,
    pub balances: Vec<Gwei>,

    pub randao_mixes: Vec<Hash>,

    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

impl BeaconState {
    /// Build a genesis state in which every key is an active validator.
    pub fn genesis(genesis_time: u64, pubkeys: &[PublicKeyBytes]) -> Self {
        let validators: Vec<Validator> = pubkeys
            .iter()
            .map(|pubkey| Validator {
                pubkey: *pubkey,
                effective_balance: MAX_EFFECTIVE_BALANCE,
                slashed: false,
                activation_epoch: GENESIS_EPOCH,
                exit_epoch: FAR_FUTURE_EPOCH,
                withdrawable_epoch: FAR_FUTURE_EPOCH,
            })
            .collect();
        let genesis_validators_root = RootHasher::new(b"validators").list(&validators).finish();

        Self {
            genesis_time,
            genesis_validators_root,
            slot: 0,
            fork: Fork {
                previous_version: GENESIS_FORK_VERSION,
                current_version: GENESIS_FORK_VERSION,
                epoch: GENESIS_EPOCH,
            },
            latest_block_header: BeaconBlockHeader {
                body_root: BeaconBlockBody::default().hash_tree_root(),
                ..BeaconBlockHeader::default()
            },
            block_roots: vec![ZERO_HASH; SLOTS_PER_HISTORICAL_ROOT as usize],
            state_roots: vec![ZERO_HASH; SLOTS_PER_HISTORICAL_ROOT as usize],
            balances: vec![MAX_EFFECTIVE_BALANCE; validators.len()],
            validators,
            randao_mixes: vec![ZERO_HASH; EPOCHS_PER_HISTORICAL_VECTOR as usize],
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
        }
    }

    pub fn current_epoch(&self) -> Epoch {
        compute_epoch_at_slot(self.slot)
    }

    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1)
    }

    pub fn validator(&self, index: ValidatorIndex) -> Result<&Validator, StateError> {
        self.validators
            .get(index as usize)
            .ok_or(StateError::UnknownValidator {
                index,
                registry_size: self.validators.len(),
            })
    }

    pub fn validator_mut(&mut self, index: ValidatorIndex) -> Result<&mut Validator, StateError> {
        let registry_size = self.validators.len();
        self.validators
            .get_mut(index as usize)
            .ok_or(StateError::UnknownValidator {
                index,
                registry_size,
            })
    }

    /// Recorded block root at a recent slot.
    pub fn block_root_at_slot(&self, slot: Slot) -> Result<Hash, StateError> {
        if slot >= self.slot || self.slot > slot + SLOTS_PER_HISTORICAL_ROOT {
            return Err(StateError::SlotOutOfRange {
                slot,
                state_slot: self.slot,
            });
        }
        Ok(self.block_roots[(slot % SLOTS_PER_HISTORICAL_ROOT) as usize])
    }
}

/// The slot-0 block committing to `genesis_state`.
pub fn genesis_block(genesis_state: &BeaconState) -> BeaconBlock {
    BeaconBlock {
        slot: 0,
        proposer_index: 0,
        parent_root: ZERO_HASH,
        state_root: genesis_state.hash_tree_root(),
        body: BeaconBlockBody::default(),
    }
}

impl TreeHash for Fork {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"fork")
            .bytes(&self.previous_version)
            .bytes(&self.current_version)
            .u64(self.epoch)
            .finish()
    }
}

impl TreeHash for Validator {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"validator")
            .bytes(&self.pubkey.0)
            .u64(self.effective_balance)
            .bool(self.slashed)
            .u64(self.activation_epoch)
            .u64(self.exit_epoch)
            .u64(self.withdrawable_epoch)
            .finish()
    }
}

impl TreeHash for BeaconState {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"state")
            .u64(self.genesis_time)
            .root(&self.genesis_validators_root)
            .u64(self.slot)
            .root(&self.fork.hash_tree_root())
            .root(&self.latest_block_header.hash_tree_root())
            .list(&self.block_roots)
            .list(&self.state_roots)
            .list(&self.validators)
            .u64_list(&self.balances)
            .list(&self.randao_mixes)
            .root(&self.previous_justified_checkpoint.hash_tree_root())
            .root(&self.current_justified_checkpoint.hash_tree_root())
            .root(&self.finalized_checkpoint.hash_tree_root())
            .finish()
    }
}
