//! Fork Choice Service - block and attestation import
//!
//! # Pipeline
//!
//! ```text
//! on_block:
//!   parent lookup → duplicate check → future slot → finalized ancestry
//!     → validate_pre_state → StateTransition::apply → validate_post_state
//!     → stage block + state, checkpoints, votes, head
//! ```
//!
//! Every step works on the caller's `Transaction`. Nothing is visible to
//! other readers until the caller commits, and the service never commits
//! on its own, so several blocks can share one durable write.
//!
//! Blocks and votes meant for the head-selection strategy are staged in the
//! transaction as well. [`ForkChoice::commit`] hands them to the strategy
//! after the storage commit succeeded; a dropped or failed transaction
//! leaves the strategy as it was.

use std::sync::Arc;
use std::time::Instant;

use chain_storage::{ForkChoiceEvent, ReadOnlyStore, Transaction};
use shared_crypto::SignatureVerifier;
use shared_types::constants::{
    DOMAIN_BEACON_ATTESTER, GENESIS_SLOT, MAX_VALIDATORS_PER_COMMITTEE, SECONDS_PER_SLOT,
};
use shared_types::helpers::{
    compute_epoch_at_slot, compute_signing_root, compute_slots_since_epoch_start,
    compute_start_slot_at_epoch, get_domain, is_valid_attesting_indices,
};
use shared_types::{
    Attestation, BeaconState, Checkpoint, Hash, PublicKeyBytes, SignedBeaconBlock, Slot,
    TreeHash,
};
use tokio::task;
use tracing::{debug, info};

use crate::domain::{
    AttestationProcessingResult, BlockImportResult, ForkChoiceConfig, ForkChoiceError,
};
use crate::metrics;
use crate::strategy::ForkChoiceStrategy;
use crate::transition::StateTransition;
use crate::validation::BlockValidator;

/// Slot implied by the store's clock.
pub fn get_current_slot<S: ReadOnlyStore + ?Sized>(store: &S) -> Slot {
    GENESIS_SLOT + store.time().saturating_sub(store.genesis_time()) / SECONDS_PER_SLOT
}

/// Root of the latest block at or before `slot` on the chain ending at
/// `root`. `None` if the walk leaves the known block tree.
pub fn get_ancestor<S: ReadOnlyStore + ?Sized>(store: &S, root: Hash, slot: Slot) -> Option<Hash> {
    let mut current = root;
    loop {
        let block = store.get_block(&current)?;
        if block.slot() <= slot {
            return Some(current);
        }
        current = block.parent_root();
    }
}

pub struct ForkChoice {
    validator: Arc<dyn BlockValidator>,
    verifier: Arc<dyn SignatureVerifier>,
    config: ForkChoiceConfig,
}

impl ForkChoice {
    /// `verifier` checks attestations passed to `on_attestation`; block
    /// signatures are the validator's job.
    pub fn new(validator: Arc<dyn BlockValidator>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            validator,
            verifier,
            config: ForkChoiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ForkChoiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ForkChoiceConfig {
        &self.config
    }

    /// Import `block` into `tx`.
    ///
    /// Rejections come back as `Ok(BlockImportResult::..)`. `Err` means the
    /// import machinery failed and the block's validity is unknown.
    pub async fn on_block(
        &self,
        tx: &mut Transaction,
        block: SignedBeaconBlock,
        transition: Arc<dyn StateTransition>,
        strategy: &dyn ForkChoiceStrategy,
    ) -> Result<BlockImportResult, ForkChoiceError> {
        let started = Instant::now();
        let result = self.import_block(tx, Arc::new(block), transition, strategy).await;
        metrics::record_import_latency(started.elapsed().as_secs_f64());

        if let Ok(outcome) = &result {
            match outcome.failure_reason() {
                None => metrics::record_block_imported(),
                Some(reason) => {
                    debug!("[fork-choice] Block rejected: {}", outcome);
                    metrics::record_block_rejected(reason);
                }
            }
        }
        result
    }

    async fn import_block(
        &self,
        tx: &mut Transaction,
        block: Arc<SignedBeaconBlock>,
        transition: Arc<dyn StateTransition>,
        strategy: &dyn ForkChoiceStrategy,
    ) -> Result<BlockImportResult, ForkChoiceError> {
        let root = block.root();
        let parent_root = block.parent_root();
        let slot = block.slot();

        if !tx.contains_block(&parent_root) {
            return Ok(BlockImportResult::UnknownParent { parent_root });
        }
        if tx.contains_block(&root) {
            return Ok(BlockImportResult::BlockAlreadyProcessed { root });
        }

        let current_slot = get_current_slot(&*tx);
        if slot > current_slot {
            return Ok(BlockImportResult::BlockIsFromFuture { slot, current_slot });
        }

        let finalized = tx.finalized_checkpoint();
        let finalized_slot = compute_start_slot_at_epoch(finalized.epoch);
        if slot <= finalized_slot
            || get_ancestor(&*tx, parent_root, finalized_slot) != Some(finalized.root)
        {
            return Ok(BlockImportResult::InvalidAncestry { slot, finalized });
        }

        let pre_state = tx
            .get_block_state(&parent_root)
            .ok_or_else(|| ForkChoiceError::MissingState(hex::encode(parent_root)))?;

        if let Err(e) = self
            .validator
            .validate_pre_state(pre_state.clone(), block.clone())
            .await?
        {
            return Ok(BlockImportResult::from_validation_error(e));
        }

        let transition_block = block.clone();
        let applied =
            task::spawn_blocking(move || transition.apply(&pre_state, &transition_block)).await?;
        let post_state = match applied {
            Ok(state) => Arc::new(state),
            Err(e) => return Ok(BlockImportResult::FailedStateTransition(e)),
        };

        if let Err(e) = self
            .validator
            .validate_post_state(post_state.clone(), block.clone())
            .await?
        {
            return Ok(BlockImportResult::from_validation_error(e));
        }

        tx.put_block(root, block.clone());
        tx.put_block_state(root, post_state.clone());
        tx.stage_fork_choice_event(ForkChoiceEvent::Block {
            root,
            parent_root,
            slot,
            state: post_state.clone(),
        });

        self.update_checkpoints(tx, &post_state);

        for attestation in &block.message.body.attestations {
            for validator in &attestation.attesting_indices {
                tx.stage_fork_choice_event(ForkChoiceEvent::Vote {
                    validator: *validator,
                    block_root: attestation.data.beacon_block_root,
                    target_epoch: attestation.data.target.epoch,
                });
            }
        }

        self.update_head(tx, strategy, parent_root, root);

        info!(
            "[fork-choice] Imported block 0x{} at slot {}",
            hex::encode(root),
            slot
        );
        Ok(BlockImportResult::Successful(block))
    }

    fn update_checkpoints(&self, tx: &mut Transaction, post_state: &BeaconState) {
        let state_justified = post_state.current_justified_checkpoint;
        let state_finalized = post_state.finalized_checkpoint;

        if state_justified.epoch > tx.justified_checkpoint().epoch {
            if state_justified.epoch > tx.best_justified_checkpoint().epoch {
                tx.set_best_justified_checkpoint(state_justified);
            }
            if self.should_update_justified_checkpoint(&*tx, &state_justified) {
                info!("[fork-choice] Justified {}", state_justified);
                tx.set_justified_checkpoint(state_justified);
            }
        }

        if state_finalized.epoch > tx.finalized_checkpoint().epoch {
            info!("[fork-choice] Finalized {}", state_finalized);
            tx.set_finalized_checkpoint(state_finalized);

            let justified = tx.justified_checkpoint();
            let finalized_slot = compute_start_slot_at_epoch(state_finalized.epoch);
            if state_justified.epoch > justified.epoch
                || get_ancestor(&*tx, justified.root, finalized_slot) != Some(state_finalized.root)
            {
                tx.set_justified_checkpoint(state_justified);
            }
        }
    }

    /// Adopting a new justified checkpoint late in an epoch is only safe
    /// if it descends from the current one.
    pub fn should_update_justified_checkpoint<S: ReadOnlyStore + ?Sized>(
        &self,
        store: &S,
        new_justified: &Checkpoint,
    ) -> bool {
        if compute_slots_since_epoch_start(get_current_slot(store))
            < self.config.safe_slots_to_update_justified
        {
            return true;
        }
        let justified = store.justified_checkpoint();
        let justified_slot = compute_start_slot_at_epoch(justified.epoch);
        get_ancestor(store, new_justified.root, justified_slot) == Some(justified.root)
    }

    fn strategy_head(tx: &Transaction, strategy: &dyn ForkChoiceStrategy) -> Option<Hash> {
        let justified = tx.justified_checkpoint();
        tx.get_block_state(&justified.root)
            .and_then(|state| strategy.find_head(&justified, &state, tx.fork_choice_events()))
            .filter(|head| tx.contains_block(head))
    }

    fn update_head(
        &self,
        tx: &mut Transaction,
        strategy: &dyn ForkChoiceStrategy,
        parent_root: Hash,
        root: Hash,
    ) {
        let current_head = tx.head();
        let new_head = match Self::strategy_head(tx, strategy) {
            Some(head) => head,
            None if parent_root == current_head => root,
            None => return,
        };
        if new_head != current_head {
            info!("[fork-choice] Head changed to 0x{}", hex::encode(new_head));
            tx.set_head(new_head);
        }
    }

    /// Re-run head selection, e.g. after a batch of attestations. Keeps the
    /// current head when the strategy cannot decide.
    pub fn process_head(&self, tx: &mut Transaction, strategy: &dyn ForkChoiceStrategy) -> Hash {
        if let Some(head) = Self::strategy_head(tx, strategy) {
            if head != tx.head() {
                info!("[fork-choice] Head changed to 0x{}", hex::encode(head));
                tx.set_head(head);
            }
        }
        tx.head()
    }

    /// Advance the store clock. At the first slot of an epoch a newer
    /// best-justified checkpoint becomes the justified checkpoint.
    pub fn on_tick(&self, tx: &mut Transaction, time: u64) {
        if time <= tx.time() {
            return;
        }
        let previous_slot = get_current_slot(&*tx);
        tx.set_time(time);
        let current_slot = get_current_slot(&*tx);

        if current_slot > previous_slot && compute_slots_since_epoch_start(current_slot) == 0 {
            let best_justified = tx.best_justified_checkpoint();
            if best_justified.epoch > tx.justified_checkpoint().epoch {
                info!(
                    "[fork-choice] Promoting best justified {} at slot {}",
                    best_justified, current_slot
                );
                tx.set_justified_checkpoint(best_justified);
            }
        }
    }

    /// Stage a gossiped attestation's votes in `tx`, both as latest messages
    /// and as strategy votes.
    pub async fn on_attestation(
        &self,
        tx: &mut Transaction,
        attestation: &Attestation,
    ) -> Result<AttestationProcessingResult, ForkChoiceError> {
        let data = attestation.data;
        let target = data.target;
        let current_slot = get_current_slot(&*tx);
        let current_epoch = compute_epoch_at_slot(current_slot);
        let previous_epoch = current_epoch.saturating_sub(1);

        if target.epoch != current_epoch && target.epoch != previous_epoch {
            return Ok(AttestationProcessingResult::InvalidTargetEpoch {
                target_epoch: target.epoch,
                current_epoch,
            });
        }
        if target.epoch != compute_epoch_at_slot(data.slot) {
            return Ok(AttestationProcessingResult::SlotEpochMismatch {
                slot: data.slot,
                target_epoch: target.epoch,
            });
        }
        let Some(target_state) = tx.get_block_state(&target.root) else {
            return Ok(AttestationProcessingResult::UnknownBlock { root: target.root });
        };
        let Some(voted_block) = tx.get_block(&data.beacon_block_root) else {
            return Ok(AttestationProcessingResult::UnknownBlock {
                root: data.beacon_block_root,
            });
        };
        if voted_block.slot() > data.slot {
            return Ok(AttestationProcessingResult::BlockNewerThanAttestation {
                block_slot: voted_block.slot(),
                attestation_slot: data.slot,
            });
        }
        let target_slot = compute_start_slot_at_epoch(target.epoch);
        let ancestor = get_ancestor(&*tx, data.beacon_block_root, target_slot);
        if ancestor != Some(target.root) {
            return Ok(AttestationProcessingResult::InvalidTargetRoot {
                expected: target.root,
                actual: ancestor.unwrap_or_default(),
            });
        }
        if current_slot < data.slot + 1 {
            return Ok(AttestationProcessingResult::FromFuture {
                slot: data.slot,
                current_slot,
            });
        }

        let indices = attestation.attesting_indices.clone();
        if !is_valid_attesting_indices(&indices, MAX_VALIDATORS_PER_COMMITTEE) {
            return Ok(AttestationProcessingResult::InvalidIndices);
        }
        let Ok(pubkeys) = indices
            .iter()
            .map(|i| target_state.validator(*i).map(|v| v.pubkey))
            .collect::<Result<Vec<PublicKeyBytes>, _>>()
        else {
            return Ok(AttestationProcessingResult::InvalidIndices);
        };

        let domain = get_domain(&target_state, DOMAIN_BEACON_ATTESTER, target.epoch);
        let signing_root = compute_signing_root(&data.hash_tree_root(), &domain);
        let verifier = self.verifier.clone();
        let signature = attestation.signature;
        let valid = task::spawn_blocking(move || {
            verifier.verify_aggregate(&pubkeys, &signing_root, &signature)
        })
        .await?;
        if !valid {
            return Ok(AttestationProcessingResult::InvalidSignature);
        }

        let message = Checkpoint::new(target.epoch, data.beacon_block_root);
        for validator in indices {
            let newer = tx
                .latest_message(validator)
                .map_or(true, |latest| target.epoch > latest.epoch);
            if newer {
                tx.put_latest_message(validator, message);
            }
            tx.stage_fork_choice_event(ForkChoiceEvent::Vote {
                validator,
                block_root: data.beacon_block_root,
                target_epoch: target.epoch,
            });
        }
        metrics::record_attestation_processed();
        Ok(AttestationProcessingResult::Successful)
    }

    /// Commit `tx`, then feed its staged blocks and votes to `strategy`
    /// and prune the strategy if finalization advanced.
    ///
    /// On error the strategy is untouched, like the store.
    pub async fn commit(
        &self,
        tx: Transaction,
        strategy: &dyn ForkChoiceStrategy,
    ) -> Result<(), ForkChoiceError> {
        let events = tx.fork_choice_events().to_vec();
        let finalized = tx.finalized_checkpoint();
        let finalization_advanced = finalized != tx.base_snapshot().finalized_checkpoint();

        tx.commit().await?;

        for event in &events {
            strategy.apply(event);
        }
        if finalization_advanced {
            strategy.prune(&finalized);
        }
        debug!("[fork-choice] Committed {} fork-choice events", events.len());
        Ok(())
    }
}
