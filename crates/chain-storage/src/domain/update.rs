//! Pending writes handed from a committing transaction to the database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared_types::{
    BeaconState, Checkpoint, Epoch, Hash, SignedBeaconBlock, Slot, ValidatorIndex,
};

/// Every write buffered by one transaction.
///
/// `None` fields are unchanged. Maps only ever add or overwrite entries;
/// removal happens through pruning on finalization.
#[derive(Debug, Clone, Default)]
pub struct StorageUpdate {
    pub genesis_time: Option<u64>,
    pub time: Option<u64>,
    pub justified_checkpoint: Option<Checkpoint>,
    pub best_justified_checkpoint: Option<Checkpoint>,
    pub finalized_checkpoint: Option<Checkpoint>,
    pub head: Option<Hash>,
    pub blocks: HashMap<Hash, Arc<SignedBeaconBlock>>,
    pub block_states: HashMap<Hash, Arc<BeaconState>>,
    pub latest_messages: HashMap<ValidatorIndex, Checkpoint>,
}

impl StorageUpdate {
    pub fn is_empty(&self) -> bool {
        self.genesis_time.is_none()
            && self.time.is_none()
            && self.justified_checkpoint.is_none()
            && self.best_justified_checkpoint.is_none()
            && self.finalized_checkpoint.is_none()
            && self.head.is_none()
            && self.blocks.is_empty()
            && self.block_states.is_empty()
            && self.latest_messages.is_empty()
    }
}

/// Head-selection input staged by a transaction.
///
/// Not persisted. The fork-choice strategy only sees these once the
/// transaction that staged them has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkChoiceEvent {
    Block {
        root: Hash,
        parent_root: Hash,
        slot: Slot,
        state: Arc<BeaconState>,
    },
    Vote {
        validator: ValidatorIndex,
        block_root: Hash,
        target_epoch: Epoch,
    },
}

/// What a durable update did beyond writing the buffered values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseUpdateResult {
    /// Hot blocks removed because they fell below the new finalized slot.
    pub pruned_block_roots: HashSet<Hash>,
    /// Canonical blocks newly added to the finalized slot index, ascending.
    pub finalized_blocks: Vec<(Slot, Hash)>,
}

impl DatabaseUpdateResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
