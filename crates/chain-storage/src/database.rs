//! # Database
//!
//! Durable persistence for the part of the store needed across restarts.
//!
//! ## Lifecycle
//!
//! `Open -> Closed`, one-way. Every public operation, `close` included,
//! checks the [`LifecycleToken`] first and fails with
//! [`StorageError::DatabaseClosed`] once closed.
//!
//! ## Hot and finalized data
//!
//! Blocks and states enter as "hot". When the finalized checkpoint
//! advances, the canonical chain between the previous and the new
//! finalized block is copied to the finalized tables and indexed by slot;
//! hot entries below the new finalized slot are then deleted. All of it
//! happens in the same atomic batch as the update that triggered it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use shared_types::{BeaconState, Checkpoint, Hash, SignedBeaconBlock, Slot, ZERO_HASH};

use crate::adapters::codec::{decode, encode};
use crate::domain::config::{StateStorageMode, StorageConfig};
use crate::domain::errors::StorageError;
use crate::domain::keys::{KeyPrefix, Variable};
use crate::domain::lifecycle::LifecycleToken;
use crate::domain::update::{DatabaseUpdateResult, StorageUpdate};
use crate::ports::outbound::{BatchOperation, KeyValueStore, StorageUpdateChannel};
use crate::store::StoreSnapshot;

pub struct Database<KV: KeyValueStore> {
    kv: RwLock<KV>,
    lifecycle: LifecycleToken,
    config: StorageConfig,
}

impl<KV: KeyValueStore> Database<KV> {
    /// Wrap an opened backend.
    pub fn open(kv: KV, config: StorageConfig) -> Self {
        Self {
            kv: RwLock::new(kv),
            lifecycle: LifecycleToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    /// Persist a freshly anchored store in one batch. The anchor is
    /// recorded as both hot and finalized.
    pub fn store_genesis(&self, genesis: &StoreSnapshot) -> Result<(), StorageError> {
        self.lifecycle.ensure_open("store_genesis")?;
        let mut ops = Vec::new();
        put_variable(&mut ops, Variable::GenesisTime, &genesis.genesis_time)?;
        put_variable(&mut ops, Variable::Time, &genesis.time)?;
        put_variable(
            &mut ops,
            Variable::JustifiedCheckpoint,
            &genesis.justified_checkpoint,
        )?;
        put_variable(
            &mut ops,
            Variable::BestJustifiedCheckpoint,
            &genesis.best_justified_checkpoint,
        )?;
        put_variable(
            &mut ops,
            Variable::FinalizedCheckpoint,
            &genesis.finalized_checkpoint,
        )?;
        put_variable(&mut ops, Variable::Head, &genesis.head)?;

        for (root, block) in &genesis.blocks {
            ops.push(BatchOperation::put(
                KeyPrefix::HotBlock.root_key(root),
                encode(block.as_ref())?,
            ));
        }
        for (root, state) in &genesis.block_states {
            ops.push(BatchOperation::put(
                KeyPrefix::HotState.root_key(root),
                encode(state.as_ref())?,
            ));
        }

        let anchor_root = genesis.finalized_checkpoint.root;
        if let Some(block) = genesis.blocks.get(&anchor_root) {
            ops.push(BatchOperation::put(
                KeyPrefix::slot_key(block.slot()),
                anchor_root.to_vec(),
            ));
            ops.push(BatchOperation::put(
                KeyPrefix::FinalizedBlock.root_key(&anchor_root),
                encode(block.as_ref())?,
            ));
        }
        if let Some(state) = genesis.block_states.get(&anchor_root) {
            ops.push(BatchOperation::put(
                KeyPrefix::FinalizedState.root_key(&anchor_root),
                encode(state.as_ref())?,
            ));
        }

        let mut kv = self.kv.write();
        self.lifecycle.ensure_open("store_genesis")?;
        kv.atomic_batch_write(ops)?;
        tracing::info!(
            "[storage] 📦 Stored genesis anchor 0x{}",
            hex::encode(anchor_root)
        );
        Ok(())
    }

    /// Apply one committed transaction atomically.
    pub fn update(&self, update: &StorageUpdate) -> Result<DatabaseUpdateResult, StorageError> {
        self.lifecycle.ensure_open("update")?;
        let mut kv = self.kv.write();
        // close() may have won the race for the write lock.
        self.lifecycle.ensure_open("update")?;

        let previous_finalized: Option<Checkpoint> =
            get_variable(&*kv, Variable::FinalizedCheckpoint)?;
        if previous_finalized.is_none() {
            return Err(StorageError::NotInitialized);
        }

        let mut ops = Vec::new();
        if let Some(time) = &update.genesis_time {
            put_variable(&mut ops, Variable::GenesisTime, time)?;
        }
        if let Some(time) = &update.time {
            put_variable(&mut ops, Variable::Time, time)?;
        }
        if let Some(checkpoint) = &update.justified_checkpoint {
            put_variable(&mut ops, Variable::JustifiedCheckpoint, checkpoint)?;
        }
        if let Some(checkpoint) = &update.best_justified_checkpoint {
            put_variable(&mut ops, Variable::BestJustifiedCheckpoint, checkpoint)?;
        }
        if let Some(checkpoint) = &update.finalized_checkpoint {
            put_variable(&mut ops, Variable::FinalizedCheckpoint, checkpoint)?;
        }
        if let Some(head) = &update.head {
            put_variable(&mut ops, Variable::Head, head)?;
        }
        for (root, block) in &update.blocks {
            ops.push(BatchOperation::put(
                KeyPrefix::HotBlock.root_key(root),
                encode(block.as_ref())?,
            ));
        }
        for (root, state) in &update.block_states {
            ops.push(BatchOperation::put(
                KeyPrefix::HotState.root_key(root),
                encode(state.as_ref())?,
            ));
        }
        for (validator, target) in &update.latest_messages {
            ops.push(BatchOperation::put(
                KeyPrefix::latest_message_key(*validator),
                encode(target)?,
            ));
        }

        let mut result = DatabaseUpdateResult::empty();
        if let Some(new_finalized) = update.finalized_checkpoint {
            if previous_finalized != Some(new_finalized) {
                let finalization = Finalization {
                    kv: &*kv,
                    update,
                    mode: self.config.state_storage_mode,
                };
                finalization.record(previous_finalized, new_finalized, &mut ops, &mut result)?;
            }
        }

        let op_count = ops.len();
        kv.atomic_batch_write(ops)?;
        tracing::debug!(
            "[storage] Applied update: {} ops, {} blocks, {} pruned",
            op_count,
            update.blocks.len(),
            result.pruned_block_roots.len()
        );
        Ok(result)
    }

    /// Rebuild the in-memory store from persisted hot data. `None` when no
    /// genesis was ever stored.
    pub fn create_memory_store(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        self.lifecycle.ensure_open("create_memory_store")?;
        let kv = self.kv.read();

        let Some(genesis_time) = get_variable::<u64, _>(&*kv, Variable::GenesisTime)? else {
            return Ok(None);
        };
        let required = |variable| -> Result<Checkpoint, StorageError> {
            get_variable(&*kv, variable)?.ok_or(StorageError::NotInitialized)
        };
        let justified_checkpoint = required(Variable::JustifiedCheckpoint)?;
        let best_justified_checkpoint = required(Variable::BestJustifiedCheckpoint)?;
        let finalized_checkpoint = required(Variable::FinalizedCheckpoint)?;
        let time = get_variable(&*kv, Variable::Time)?.unwrap_or(genesis_time);
        let head = get_variable(&*kv, Variable::Head)?.unwrap_or(finalized_checkpoint.root);

        let mut blocks = HashMap::new();
        for (key, value) in kv.prefix_scan(KeyPrefix::HotBlock.as_bytes())? {
            if let Some(root) = KeyPrefix::HotBlock.root_from_key(&key) {
                blocks.insert(root, Arc::new(decode::<SignedBeaconBlock>(&value)?));
            }
        }
        let mut block_states = HashMap::new();
        for (key, value) in kv.prefix_scan(KeyPrefix::HotState.as_bytes())? {
            if let Some(root) = KeyPrefix::HotState.root_from_key(&key) {
                block_states.insert(root, Arc::new(decode::<BeaconState>(&value)?));
            }
        }
        let mut latest_messages = HashMap::new();
        for (key, value) in kv.prefix_scan(KeyPrefix::LatestMessage.as_bytes())? {
            if let Some(validator) = KeyPrefix::LatestMessage.u64_from_key(&key) {
                latest_messages.insert(validator, decode::<Checkpoint>(&value)?);
            }
        }

        tracing::info!(
            "[storage] Loaded store: {} blocks, finalized {}",
            blocks.len(),
            finalized_checkpoint
        );
        Ok(Some(StoreSnapshot {
            time,
            genesis_time,
            justified_checkpoint,
            best_justified_checkpoint,
            finalized_checkpoint,
            head,
            blocks,
            block_states,
            latest_messages,
        }))
    }

    /// Hot block first, then finalized history.
    pub fn get_signed_block(&self, root: &Hash) -> Result<Option<SignedBeaconBlock>, StorageError> {
        self.lifecycle.ensure_open("get_signed_block")?;
        let kv = self.kv.read();
        get_first(
            &*kv,
            &[
                KeyPrefix::HotBlock.root_key(root),
                KeyPrefix::FinalizedBlock.root_key(root),
            ],
        )
    }

    /// Hot state first, then finalized history.
    pub fn get_state(&self, root: &Hash) -> Result<Option<BeaconState>, StorageError> {
        self.lifecycle.ensure_open("get_state")?;
        let kv = self.kv.read();
        get_first(
            &*kv,
            &[
                KeyPrefix::HotState.root_key(root),
                KeyPrefix::FinalizedState.root_key(root),
            ],
        )
    }

    /// Root of the finalized block at exactly `slot`, if one exists.
    pub fn get_finalized_root_at_slot(&self, slot: Slot) -> Result<Option<Hash>, StorageError> {
        self.lifecycle.ensure_open("get_finalized_root_at_slot")?;
        let kv = self.kv.read();
        kv.get(&KeyPrefix::slot_key(slot))?
            .map(|bytes| root_from_bytes(&bytes))
            .transpose()
    }

    /// Root of the latest finalized block at or before `slot`. Skipped
    /// slots resolve to the preceding block.
    pub fn get_latest_finalized_root_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<Hash>, StorageError> {
        self.lifecycle
            .ensure_open("get_latest_finalized_root_at_slot")?;
        let kv = self.kv.read();
        kv.find_last_at_or_before(
            KeyPrefix::FinalizedRootBySlot.as_bytes(),
            &KeyPrefix::slot_key(slot),
        )?
        .map(|(_, bytes)| root_from_bytes(&bytes))
        .transpose()
    }

    /// Close the database. Waits for an in-flight update, then flushes.
    pub fn close(&self) -> Result<(), StorageError> {
        self.lifecycle.close()?;
        self.kv.write().close()?;
        tracing::info!("[storage] Database closed");
        Ok(())
    }

    /// Release the backend, e.g. to reopen it in a new `Database`.
    pub fn into_backend(self) -> KV {
        self.kv.into_inner()
    }
}

#[async_trait]
impl<KV: KeyValueStore + 'static> StorageUpdateChannel for Database<KV> {
    async fn on_storage_update(
        &self,
        update: &StorageUpdate,
    ) -> Result<DatabaseUpdateResult, StorageError> {
        self.update(update)
    }

    fn lifecycle(&self) -> LifecycleToken {
        self.lifecycle.clone()
    }
}

/// Finalization bookkeeping for one update.
struct Finalization<'a, KV: KeyValueStore> {
    kv: &'a KV,
    update: &'a StorageUpdate,
    mode: StateStorageMode,
}

impl<KV: KeyValueStore> Finalization<'_, KV> {
    fn block(&self, root: &Hash) -> Result<Option<Arc<SignedBeaconBlock>>, StorageError> {
        if let Some(block) = self.update.blocks.get(root) {
            return Ok(Some(Arc::clone(block)));
        }
        let found: Option<SignedBeaconBlock> = get_first(
            self.kv,
            &[
                KeyPrefix::HotBlock.root_key(root),
                KeyPrefix::FinalizedBlock.root_key(root),
            ],
        )?;
        Ok(found.map(Arc::new))
    }

    fn state(&self, root: &Hash) -> Result<Option<Arc<BeaconState>>, StorageError> {
        if let Some(state) = self.update.block_states.get(root) {
            return Ok(Some(Arc::clone(state)));
        }
        let found: Option<BeaconState> =
            get_first(self.kv, &[KeyPrefix::HotState.root_key(root)])?;
        Ok(found.map(Arc::new))
    }

    fn record(
        &self,
        previous: Option<Checkpoint>,
        finalized: Checkpoint,
        ops: &mut Vec<BatchOperation>,
        result: &mut DatabaseUpdateResult,
    ) -> Result<(), StorageError> {
        let previous_slot = match previous {
            Some(cp) => self.block(&cp.root)?.map(|b| b.slot()),
            None => None,
        };

        // Walk back from the new finalized block to the previous one.
        let mut canonical = Vec::new();
        let mut cursor = finalized.root;
        while let Some(block) = self.block(&cursor)? {
            if previous_slot.is_some_and(|slot| block.slot() <= slot) {
                break;
            }
            let parent = block.parent_root();
            canonical.push((block.slot(), cursor, block));
            if parent == ZERO_HASH {
                break;
            }
            cursor = parent;
        }
        canonical.reverse();

        for (slot, root, block) in &canonical {
            ops.push(BatchOperation::put(KeyPrefix::slot_key(*slot), root.to_vec()));
            ops.push(BatchOperation::put(
                KeyPrefix::FinalizedBlock.root_key(root),
                encode(block.as_ref())?,
            ));
            if self.mode == StateStorageMode::Archive {
                if let Some(state) = self.state(root)? {
                    ops.push(BatchOperation::put(
                        KeyPrefix::FinalizedState.root_key(root),
                        encode(state.as_ref())?,
                    ));
                }
            }
            result.finalized_blocks.push((*slot, *root));
        }

        if let Some(state) = self.state(&finalized.root)? {
            ops.push(BatchOperation::put(
                KeyPrefix::FinalizedState.root_key(&finalized.root),
                encode(state.as_ref())?,
            ));
        }
        if self.mode == StateStorageMode::Prune {
            if let Some(previous) = previous.filter(|cp| cp.root != finalized.root) {
                ops.push(BatchOperation::delete(
                    KeyPrefix::FinalizedState.root_key(&previous.root),
                ));
            }
        }

        let Some(finalized_slot) = self.block(&finalized.root)?.map(|b| b.slot()) else {
            return Ok(());
        };
        self.prune_hot(finalized_slot, ops, result)
    }

    fn prune_hot(
        &self,
        finalized_slot: Slot,
        ops: &mut Vec<BatchOperation>,
        result: &mut DatabaseUpdateResult,
    ) -> Result<(), StorageError> {
        let mut stale: HashSet<Hash> = HashSet::new();
        for (key, value) in self.kv.prefix_scan(KeyPrefix::HotBlock.as_bytes())? {
            let Some(root) = KeyPrefix::HotBlock.root_from_key(&key) else {
                continue;
            };
            let block: SignedBeaconBlock = decode(&value)?;
            if block.slot() < finalized_slot {
                stale.insert(root);
            }
        }
        for (root, block) in &self.update.blocks {
            if block.slot() < finalized_slot {
                stale.insert(*root);
            }
        }
        for root in &stale {
            ops.push(BatchOperation::delete(KeyPrefix::HotBlock.root_key(root)));
            ops.push(BatchOperation::delete(KeyPrefix::HotState.root_key(root)));
        }
        result.pruned_block_roots = stale;
        Ok(())
    }
}

fn put_variable<T: serde::Serialize>(
    ops: &mut Vec<BatchOperation>,
    variable: Variable,
    value: &T,
) -> Result<(), StorageError> {
    ops.push(BatchOperation::put(variable.key(), encode(value)?));
    Ok(())
}

fn get_variable<T: DeserializeOwned, KV: KeyValueStore + ?Sized>(
    kv: &KV,
    variable: Variable,
) -> Result<Option<T>, StorageError> {
    kv.get(&variable.key())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

fn get_first<T: DeserializeOwned, KV: KeyValueStore + ?Sized>(
    kv: &KV,
    keys: &[Vec<u8>],
) -> Result<Option<T>, StorageError> {
    for key in keys {
        if let Some(bytes) = kv.get(key)? {
            return decode(&bytes).map(Some);
        }
    }
    Ok(None)
}

fn root_from_bytes(bytes: &[u8]) -> Result<Hash, StorageError> {
    bytes.try_into().map_err(|_| StorageError::Serialization {
        message: format!("expected 32-byte root, found {} bytes", bytes.len()),
    })
}
