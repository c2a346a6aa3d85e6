//! # Store
//!
//! Authoritative in-memory view of every known block and state reachable
//! from the finalized checkpoint, plus time and the fork-choice checkpoints.
//!
//! ## Ownership
//!
//! The live data is an immutable [`StoreSnapshot`] behind an `Arc`. Readers
//! clone the `Arc`; a commit builds the next snapshot off to the side and
//! swaps it in only after the update channel accepted the write. No reader
//! ever observes a half-applied transaction.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Checkpoint roots are known blocks | `StoreSnapshot::check_update` |
//! | `finalized.epoch <= justified.epoch` | `StoreSnapshot::check_update` |
//! | Finalization never regresses | `StoreSnapshot::check_update` |
//! | No reads after the database closed | `LifecycleToken` |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::constants::SECONDS_PER_SLOT;
use shared_types::{
    genesis_block, BeaconState, Checkpoint, Hash, SignatureBytes, SignedBeaconBlock,
    ValidatorIndex,
};
use tokio::sync::Mutex;

use crate::adapters::memory::MemoryOnlyChannel;
use crate::domain::errors::StorageError;
use crate::domain::lifecycle::LifecycleToken;
use crate::domain::update::StorageUpdate;
use crate::ports::outbound::StorageUpdateChannel;
use crate::transaction::Transaction;

/// Read access shared by snapshots and transactions.
pub trait ReadOnlyStore {
    fn time(&self) -> u64;
    fn genesis_time(&self) -> u64;
    fn justified_checkpoint(&self) -> Checkpoint;
    fn best_justified_checkpoint(&self) -> Checkpoint;
    fn finalized_checkpoint(&self) -> Checkpoint;
    /// Root of the current best block.
    fn head(&self) -> Hash;
    fn get_block(&self, root: &Hash) -> Option<Arc<SignedBeaconBlock>>;
    fn get_block_state(&self, root: &Hash) -> Option<Arc<BeaconState>>;
    fn latest_message(&self, validator: ValidatorIndex) -> Option<Checkpoint>;

    fn contains_block(&self, root: &Hash) -> bool {
        self.get_block(root).is_some()
    }
}

/// Immutable copy of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub(crate) time: u64,
    pub(crate) genesis_time: u64,
    pub(crate) justified_checkpoint: Checkpoint,
    pub(crate) best_justified_checkpoint: Checkpoint,
    pub(crate) finalized_checkpoint: Checkpoint,
    pub(crate) head: Hash,
    pub(crate) blocks: HashMap<Hash, Arc<SignedBeaconBlock>>,
    pub(crate) block_states: HashMap<Hash, Arc<BeaconState>>,
    pub(crate) latest_messages: HashMap<ValidatorIndex, Checkpoint>,
}

impl StoreSnapshot {
    /// Store anchored at the genesis block of `genesis_state`.
    pub fn from_genesis(genesis_state: BeaconState) -> Self {
        let block = SignedBeaconBlock {
            message: genesis_block(&genesis_state),
            signature: SignatureBytes::empty(),
        };
        Self::from_anchor(block, genesis_state)
    }

    /// Store anchored at a trusted block and its post-state.
    ///
    /// The anchor is justified, finalized and head at once.
    pub fn from_anchor(anchor_block: SignedBeaconBlock, anchor_state: BeaconState) -> Self {
        let anchor_root = anchor_block.root();
        let anchor = Checkpoint::new(anchor_state.current_epoch(), anchor_root);
        let genesis_time = anchor_state.genesis_time;
        let time = genesis_time + anchor_state.slot * SECONDS_PER_SLOT;

        tracing::info!(
            "[storage] Anchored store at slot {} root 0x{}",
            anchor_block.slot(),
            hex::encode(anchor_root)
        );

        let mut blocks = HashMap::new();
        blocks.insert(anchor_root, Arc::new(anchor_block));
        let mut block_states = HashMap::new();
        block_states.insert(anchor_root, Arc::new(anchor_state));

        Self {
            time,
            genesis_time,
            justified_checkpoint: anchor,
            best_justified_checkpoint: anchor,
            finalized_checkpoint: anchor,
            head: anchor_root,
            blocks,
            block_states,
            latest_messages: HashMap::new(),
        }
    }

    pub fn block_roots(&self) -> impl Iterator<Item = &Hash> {
        self.blocks.keys()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn state_count(&self) -> usize {
        self.block_states.len()
    }

    /// Reject updates that would break a store invariant. Runs against the
    /// latest committed snapshot, not the transaction's base.
    pub(crate) fn check_update(&self, update: &StorageUpdate) -> Result<(), StorageError> {
        let known =
            |root: &Hash| self.blocks.contains_key(root) || update.blocks.contains_key(root);

        let finalized = update
            .finalized_checkpoint
            .unwrap_or(self.finalized_checkpoint);
        let justified = update
            .justified_checkpoint
            .unwrap_or(self.justified_checkpoint);

        if finalized.epoch < self.finalized_checkpoint.epoch {
            tracing::warn!(
                "[storage] Refusing finalization regression {} -> {}",
                self.finalized_checkpoint,
                finalized
            );
            return Err(StorageError::FinalizationRegression {
                requested: finalized.epoch,
                current: self.finalized_checkpoint.epoch,
            });
        }
        if let (Some(current), Some(requested)) = (
            self.blocks.get(&self.finalized_checkpoint.root),
            update
                .blocks
                .get(&finalized.root)
                .or_else(|| self.blocks.get(&finalized.root)),
        ) {
            if requested.slot() < current.slot() {
                return Err(StorageError::FinalizationRegression {
                    requested: finalized.epoch,
                    current: self.finalized_checkpoint.epoch,
                });
            }
        }

        for (kind, checkpoint) in [
            ("finalized", update.finalized_checkpoint),
            ("justified", update.justified_checkpoint),
            ("best justified", update.best_justified_checkpoint),
        ] {
            let Some(checkpoint) = checkpoint else {
                continue;
            };
            if !known(&checkpoint.root) {
                return Err(StorageError::UnknownCheckpointRoot {
                    kind,
                    root: checkpoint.root,
                });
            }
        }
        if finalized.epoch > justified.epoch {
            return Err(StorageError::InconsistentCheckpoints {
                justified: justified.epoch,
                finalized: finalized.epoch,
            });
        }
        if let Some(head) = update.head {
            if !known(&head) {
                return Err(StorageError::UnknownCheckpointRoot {
                    kind: "head",
                    root: head,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&mut self, update: StorageUpdate) {
        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(genesis_time) = update.genesis_time {
            self.genesis_time = genesis_time;
        }
        if let Some(checkpoint) = update.justified_checkpoint {
            self.justified_checkpoint = checkpoint;
        }
        if let Some(checkpoint) = update.best_justified_checkpoint {
            self.best_justified_checkpoint = checkpoint;
        }
        if let Some(checkpoint) = update.finalized_checkpoint {
            self.finalized_checkpoint = checkpoint;
        }
        if let Some(head) = update.head {
            self.head = head;
        }
        self.blocks.extend(update.blocks);
        self.block_states.extend(update.block_states);
        self.latest_messages.extend(update.latest_messages);
    }

    /// Drop blocks and states below the finalized block's slot.
    pub(crate) fn prune_below_finalized(&mut self) -> HashSet<Hash> {
        let Some(finalized_slot) = self
            .blocks
            .get(&self.finalized_checkpoint.root)
            .map(|b| b.slot())
        else {
            return HashSet::new();
        };
        let pruned: HashSet<Hash> = self
            .blocks
            .iter()
            .filter(|(_, block)| block.slot() < finalized_slot)
            .map(|(root, _)| *root)
            .collect();
        for root in &pruned {
            self.blocks.remove(root);
            self.block_states.remove(root);
        }
        pruned
    }
}

impl ReadOnlyStore for StoreSnapshot {
    fn time(&self) -> u64 {
        self.time
    }

    fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    fn best_justified_checkpoint(&self) -> Checkpoint {
        self.best_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn head(&self) -> Hash {
        self.head
    }

    fn get_block(&self, root: &Hash) -> Option<Arc<SignedBeaconBlock>> {
        self.blocks.get(root).cloned()
    }

    fn get_block_state(&self, root: &Hash) -> Option<Arc<BeaconState>> {
        self.block_states.get(root).cloned()
    }

    fn latest_message(&self, validator: ValidatorIndex) -> Option<Checkpoint> {
        self.latest_messages.get(&validator).copied()
    }
}

/// Shared, transactional chain store.
pub struct Store {
    data: RwLock<Arc<StoreSnapshot>>,
    commit_lock: Mutex<()>,
    channel: Arc<dyn StorageUpdateChannel>,
    lifecycle: LifecycleToken,
}

impl Store {
    /// Bind `snapshot` to the channel that persists its updates.
    pub fn new(snapshot: StoreSnapshot, channel: Arc<dyn StorageUpdateChannel>) -> Arc<Self> {
        let lifecycle = channel.lifecycle();
        Arc::new(Self {
            data: RwLock::new(Arc::new(snapshot)),
            commit_lock: Mutex::new(()),
            channel,
            lifecycle,
        })
    }

    /// Store without persistence.
    pub fn memory_only(snapshot: StoreSnapshot) -> Arc<Self> {
        Self::new(snapshot, Arc::new(MemoryOnlyChannel::new()))
    }

    /// Open a write batch over the current snapshot.
    pub fn start_transaction(self: &Arc<Self>) -> Result<Transaction, StorageError> {
        self.lifecycle.ensure_open("start_transaction")?;
        let base = self.data.read().clone();
        Ok(Transaction::new(Arc::clone(self), base))
    }

    fn read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&StoreSnapshot) -> T,
    ) -> Result<T, StorageError> {
        self.lifecycle.ensure_open(operation)?;
        Ok(f(&self.data.read()))
    }

    /// Immutable copy of the current data.
    pub fn snapshot(&self) -> Result<Arc<StoreSnapshot>, StorageError> {
        self.read("snapshot", |data| Arc::new(data.clone()))
    }

    pub fn time(&self) -> Result<u64, StorageError> {
        self.read("time", |data| data.time)
    }

    pub fn genesis_time(&self) -> Result<u64, StorageError> {
        self.read("genesis_time", |data| data.genesis_time)
    }

    pub fn justified_checkpoint(&self) -> Result<Checkpoint, StorageError> {
        self.read("justified_checkpoint", |data| data.justified_checkpoint)
    }

    pub fn best_justified_checkpoint(&self) -> Result<Checkpoint, StorageError> {
        self.read("best_justified_checkpoint", |data| {
            data.best_justified_checkpoint
        })
    }

    pub fn finalized_checkpoint(&self) -> Result<Checkpoint, StorageError> {
        self.read("finalized_checkpoint", |data| data.finalized_checkpoint)
    }

    pub fn head(&self) -> Result<Hash, StorageError> {
        self.read("head", |data| data.head)
    }

    pub fn get_block(&self, root: &Hash) -> Result<Option<Arc<SignedBeaconBlock>>, StorageError> {
        self.read("get_block", |data| data.get_block(root))
    }

    pub fn get_block_state(&self, root: &Hash) -> Result<Option<Arc<BeaconState>>, StorageError> {
        self.read("get_block_state", |data| data.get_block_state(root))
    }

    pub fn contains_block(&self, root: &Hash) -> Result<bool, StorageError> {
        self.read("contains_block", |data| data.blocks.contains_key(root))
    }

    pub fn latest_message(
        &self,
        validator: ValidatorIndex,
    ) -> Result<Option<Checkpoint>, StorageError> {
        self.read("latest_message", |data| data.latest_message(validator))
    }

    /// Validate, persist, then publish `update`.
    ///
    /// Commits are serialized so validation always sees the snapshot the
    /// update will be applied to.
    pub(crate) async fn commit_update(&self, update: StorageUpdate) -> Result<(), StorageError> {
        let _guard = self.commit_lock.lock().await;
        self.lifecycle.ensure_open("commit")?;

        let current = self.data.read().clone();
        current.check_update(&update)?;
        if update.is_empty() {
            return Ok(());
        }

        let result = self.channel.on_storage_update(&update).await?;

        let finalized_changed = update
            .finalized_checkpoint
            .is_some_and(|cp| cp != current.finalized_checkpoint);
        let mut next = StoreSnapshot::clone(&current);
        next.apply(update);
        let pruned = if finalized_changed {
            next.prune_below_finalized()
        } else {
            HashSet::new()
        };
        if finalized_changed {
            tracing::info!(
                "[storage] Finalized {} ({} blocks pruned, {} newly indexed)",
                next.finalized_checkpoint,
                pruned.len(),
                result.finalized_blocks.len()
            );
        }
        *self.data.write() = Arc::new(next);
        Ok(())
    }
}
