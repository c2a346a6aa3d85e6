//! # LMD-GHOST Fork Choice Rule
//!
//! Latest Message Driven GHOST (Greedy Heaviest Observed Subtree).
//!
//! ## Algorithm
//!
//! 1. Keep the tree of imported blocks and the latest vote per validator
//! 2. Weight of a block = effective balance of validators voting for it or
//!    for any of its descendants
//! 3. From the justified root, repeatedly step to the heaviest child;
//!    equal weights go to the larger root
//!
//! Head queries with pending events run on a copy of the tree, so an
//! uncommitted transaction never leaves a trace here.

use std::collections::{HashMap, HashSet};

use chain_storage::ForkChoiceEvent;
use parking_lot::RwLock;
use shared_types::{BeaconState, Checkpoint, Epoch, Gwei, Hash, Slot, ValidatorIndex};
use tracing::debug;

use super::ForkChoiceStrategy;

#[derive(Debug, Clone, Copy)]
struct BlockNode {
    parent_root: Hash,
    slot: Slot,
}

#[derive(Debug, Clone, Copy)]
struct Vote {
    root: Hash,
    epoch: Epoch,
}

#[derive(Debug, Default, Clone)]
struct Inner {
    blocks: HashMap<Hash, BlockNode>,
    children: HashMap<Hash, Vec<Hash>>,
    votes: HashMap<ValidatorIndex, Vote>,
}

impl Inner {
    fn insert_block(&mut self, root: Hash, parent_root: Hash, slot: Slot) {
        if self.blocks.contains_key(&root) {
            return;
        }
        self.children.entry(parent_root).or_default().push(root);
        self.blocks.insert(root, BlockNode { parent_root, slot });
    }

    fn record_vote(&mut self, validator: ValidatorIndex, block_root: Hash, target_epoch: Epoch) {
        let newer = self
            .votes
            .get(&validator)
            .map_or(true, |vote| target_epoch > vote.epoch);
        if newer {
            self.votes.insert(
                validator,
                Vote {
                    root: block_root,
                    epoch: target_epoch,
                },
            );
        }
    }

    fn apply(&mut self, event: &ForkChoiceEvent) {
        match event {
            ForkChoiceEvent::Block {
                root,
                parent_root,
                slot,
                ..
            } => self.insert_block(*root, *parent_root, *slot),
            ForkChoiceEvent::Vote {
                validator,
                block_root,
                target_epoch,
            } => self.record_vote(*validator, *block_root, *target_epoch),
        }
    }

    fn find_head(&self, justified: &Checkpoint, justified_state: &BeaconState) -> Option<Hash> {
        if !self.blocks.contains_key(&justified.root) {
            return None;
        }
        let weights = self.weights(justified_state);
        let weight = |root: &Hash| weights.get(root).copied().unwrap_or(0);

        let mut current = justified.root;
        loop {
            let best_child = self
                .children
                .get(&current)
                .and_then(|children| children.iter().max_by_key(|c| (weight(*c), **c)));
            match best_child {
                Some(child) => current = *child,
                None => return Some(current),
            }
        }
    }

    fn weights(&self, state: &BeaconState) -> HashMap<Hash, Gwei> {
        let epoch = state.current_epoch();
        let mut weights: HashMap<Hash, Gwei> = HashMap::new();

        for (validator, vote) in &self.votes {
            let stake = match state.validator(*validator) {
                Ok(v) if v.is_active_at(epoch) && !v.slashed => v.effective_balance,
                _ => continue,
            };

            let mut current = vote.root;
            let mut visited = HashSet::new();
            while visited.insert(current) {
                let Some(node) = self.blocks.get(&current) else {
                    break;
                };
                *weights.entry(current).or_insert(0) += stake;
                current = node.parent_root;
            }
        }
        weights
    }
}

/// LMD-GHOST over the blocks reported through `on_block`.
#[derive(Debug)]
pub struct LmdGhostForkChoice {
    inner: RwLock<Inner>,
}

impl LmdGhostForkChoice {
    /// Start from a trusted anchor, usually the genesis block.
    pub fn new(anchor_root: Hash, anchor_slot: Slot) -> Self {
        let mut inner = Inner::default();
        inner.blocks.insert(
            anchor_root,
            BlockNode {
                parent_root: anchor_root,
                slot: anchor_slot,
            },
        );
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn contains_block(&self, root: &Hash) -> bool {
        self.inner.read().blocks.contains_key(root)
    }

    pub fn block_slot(&self, root: &Hash) -> Option<Slot> {
        self.inner.read().blocks.get(root).map(|node| node.slot)
    }

    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    pub fn vote_count(&self) -> usize {
        self.inner.read().votes.len()
    }
}

impl ForkChoiceStrategy for LmdGhostForkChoice {
    fn on_block(&self, root: Hash, parent_root: Hash, slot: Slot, _state: &BeaconState) {
        self.inner.write().insert_block(root, parent_root, slot);
    }

    fn on_attestation(&self, validator: ValidatorIndex, block_root: Hash, target_epoch: Epoch) {
        self.inner
            .write()
            .record_vote(validator, block_root, target_epoch);
    }

    fn find_head(
        &self,
        justified: &Checkpoint,
        justified_state: &BeaconState,
        pending: &[ForkChoiceEvent],
    ) -> Option<Hash> {
        if pending.is_empty() {
            return self.inner.read().find_head(justified, justified_state);
        }
        let mut view = self.inner.read().clone();
        for event in pending {
            view.apply(event);
        }
        view.find_head(justified, justified_state)
    }

    fn prune(&self, finalized: &Checkpoint) {
        let mut inner = self.inner.write();
        if !inner.blocks.contains_key(&finalized.root) {
            return;
        }

        let mut keep = HashSet::new();
        let mut pending = vec![finalized.root];
        while let Some(root) = pending.pop() {
            if keep.insert(root) {
                if let Some(children) = inner.children.get(&root) {
                    pending.extend(children.iter().copied());
                }
            }
        }

        let before = inner.blocks.len();
        inner.blocks.retain(|root, _| keep.contains(root));
        inner.children.retain(|root, _| keep.contains(root));
        debug!(
            "[fork-choice] Pruned {} blocks below finalized {}",
            before - inner.blocks.len(),
            finalized
        );
    }
}
