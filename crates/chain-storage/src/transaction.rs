//! # Transaction
//!
//! Staged, isolated writes against one store snapshot. Reads fall through
//! to the base snapshot when the overlay has no entry. Dropping a
//! transaction without committing has no effect anywhere.
//!
//! Besides storage writes a transaction carries the fork-choice events
//! staged by block and attestation import. They are never persisted; the
//! importer hands them to its head-selection strategy after a successful
//! commit.

use std::sync::Arc;

use shared_types::{BeaconState, Checkpoint, Hash, SignedBeaconBlock, ValidatorIndex};

use crate::domain::errors::StorageError;
use crate::domain::update::{ForkChoiceEvent, StorageUpdate};
use crate::store::{ReadOnlyStore, Store, StoreSnapshot};

pub struct Transaction {
    store: Arc<Store>,
    base: Arc<StoreSnapshot>,
    pending: StorageUpdate,
    fork_choice_events: Vec<ForkChoiceEvent>,
}

impl Transaction {
    pub(crate) fn new(store: Arc<Store>, base: Arc<StoreSnapshot>) -> Self {
        Self {
            store,
            base,
            pending: StorageUpdate::default(),
            fork_choice_events: Vec::new(),
        }
    }

    /// The committed snapshot this transaction reads through to.
    pub fn base_snapshot(&self) -> &Arc<StoreSnapshot> {
        &self.base
    }

    pub fn put_block(&mut self, root: Hash, block: Arc<SignedBeaconBlock>) {
        self.pending.blocks.insert(root, block);
    }

    pub fn put_block_state(&mut self, root: Hash, state: Arc<BeaconState>) {
        self.pending.block_states.insert(root, state);
    }

    pub fn set_time(&mut self, time: u64) {
        self.pending.time = Some(time);
    }

    pub fn set_genesis_time(&mut self, genesis_time: u64) {
        self.pending.genesis_time = Some(genesis_time);
    }

    pub fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.pending.justified_checkpoint = Some(checkpoint);
    }

    pub fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.pending.best_justified_checkpoint = Some(checkpoint);
    }

    pub fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.pending.finalized_checkpoint = Some(checkpoint);
    }

    pub fn set_head(&mut self, root: Hash) {
        self.pending.head = Some(root);
    }

    pub fn put_latest_message(&mut self, validator: ValidatorIndex, target: Checkpoint) {
        self.pending.latest_messages.insert(validator, target);
    }

    pub fn stage_fork_choice_event(&mut self, event: ForkChoiceEvent) {
        self.fork_choice_events.push(event);
    }

    /// Fork-choice events staged so far, in staging order.
    pub fn fork_choice_events(&self) -> &[ForkChoiceEvent] {
        &self.fork_choice_events
    }

    /// `true` if no storage write has been staged.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of blocks staged in this transaction.
    pub fn pending_block_count(&self) -> usize {
        self.pending.blocks.len()
    }

    /// Atomically apply every staged write to the database and then to the
    /// in-memory store.
    ///
    /// Fails without touching either when the database is closed, when the
    /// write would regress finalization or dangle a checkpoint, or when the
    /// durable write fails.
    pub async fn commit(self) -> Result<(), StorageError> {
        self.store.commit_update(self.pending).await
    }
}

impl ReadOnlyStore for Transaction {
    fn time(&self) -> u64 {
        self.pending.time.unwrap_or(self.base.time)
    }

    fn genesis_time(&self) -> u64 {
        self.pending.genesis_time.unwrap_or(self.base.genesis_time)
    }

    fn justified_checkpoint(&self) -> Checkpoint {
        self.pending
            .justified_checkpoint
            .unwrap_or(self.base.justified_checkpoint)
    }

    fn best_justified_checkpoint(&self) -> Checkpoint {
        self.pending
            .best_justified_checkpoint
            .unwrap_or(self.base.best_justified_checkpoint)
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.pending
            .finalized_checkpoint
            .unwrap_or(self.base.finalized_checkpoint)
    }

    fn head(&self) -> Hash {
        self.pending.head.unwrap_or(self.base.head)
    }

    fn get_block(&self, root: &Hash) -> Option<Arc<SignedBeaconBlock>> {
        self.pending
            .blocks
            .get(root)
            .cloned()
            .or_else(|| self.base.get_block(root))
    }

    fn get_block_state(&self, root: &Hash) -> Option<Arc<BeaconState>> {
        self.pending
            .block_states
            .get(root)
            .cloned()
            .or_else(|| self.base.get_block_state(root))
    }

    fn latest_message(&self, validator: ValidatorIndex) -> Option<Checkpoint> {
        self.pending
            .latest_messages
            .get(&validator)
            .copied()
            .or_else(|| self.base.latest_message(validator))
    }
}
