//! # Test Fixtures
//!
//! Deterministic chains signed with interop BLS keys.
//!
//! Every block produced here is fully valid unless a test asks otherwise:
//! correct proposer, proposer signature, randao reveal and post-state root.

use std::sync::Arc;

use chain_storage::{Database, InMemoryKVStore, ReadOnlyStore, StorageConfig, Store, StoreSnapshot};
use fork_choice::{
    create_block_validator, BasicStateTransition, BlockImportResult, BlockValidatorKind,
    ForkChoice, ForkChoiceError, ForkChoiceStrategy, LmdGhostForkChoice, StateTransition,
};
use shared_crypto::{BlsKeyPair, BlsSignature, BlsSignatureVerifier};
use shared_types::constants::{
    DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_RANDAO, SECONDS_PER_SLOT,
};
use shared_types::helpers::{
    compute_epoch_at_slot, compute_signing_root, get_beacon_proposer_index, get_domain,
};
use shared_types::{
    Attestation, AttestationData, BeaconBlock, BeaconState, Hash, SignatureBytes,
    SignedBeaconBlock, Slot, TreeHash, ValidatorIndex,
};
use tracing_subscriber::EnvFilter;

pub type MemoryDatabase = Database<InMemoryKVStore>;

/// Who signs a produced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proposer {
    /// The validator selected for the slot.
    Correct,
    /// Another validator, claiming to be the proposer.
    Wrong,
}

/// Route `tracing` output through the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn interop_keys(count: u64) -> Vec<BlsKeyPair> {
    (0..count)
        .map(|i| BlsKeyPair::interop(i).expect("interop key"))
        .collect()
}

pub fn genesis_state(keys: &[BlsKeyPair]) -> BeaconState {
    let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key_bytes()).collect();
    BeaconState::genesis(0, &pubkeys)
}

/// Sign `message` as its claimed proposer.
pub fn sign_block(
    keys: &[BlsKeyPair],
    parent_state: &BeaconState,
    message: BeaconBlock,
) -> SignedBeaconBlock {
    let signer = message.proposer_index;
    sign_block_as(keys, parent_state, message, signer)
}

/// Sign `message` with `signer`'s key, whoever it names as proposer.
pub fn sign_block_as(
    keys: &[BlsKeyPair],
    parent_state: &BeaconState,
    message: BeaconBlock,
    signer: ValidatorIndex,
) -> SignedBeaconBlock {
    let domain = get_domain(
        parent_state,
        DOMAIN_BEACON_PROPOSER,
        compute_epoch_at_slot(message.slot),
    );
    let signing_root = compute_signing_root(&message.hash_tree_root(), &domain);
    SignedBeaconBlock {
        signature: keys[signer as usize].sign_root(&signing_root),
        message,
    }
}

/// Block at `slot` on top of `parent_root`, whose post-state is
/// `parent_state`. A `Proposer::Wrong` block keeps a zero state root.
pub fn produce_block(
    keys: &[BlsKeyPair],
    parent_state: &BeaconState,
    parent_root: Hash,
    slot: Slot,
    proposer: Proposer,
) -> SignedBeaconBlock {
    produce_block_with_attestations(keys, parent_state, parent_root, slot, proposer, Vec::new())
}

/// Like [`produce_block`], carrying `attestations` in the body.
pub fn produce_block_with_attestations(
    keys: &[BlsKeyPair],
    parent_state: &BeaconState,
    parent_root: Hash,
    slot: Slot,
    proposer: Proposer,
    attestations: Vec<Attestation>,
) -> SignedBeaconBlock {
    let epoch = compute_epoch_at_slot(slot);
    let expected = get_beacon_proposer_index(parent_state, slot).expect("active validators");
    let proposer_index = match proposer {
        Proposer::Correct => expected,
        Proposer::Wrong if expected == 0 => 1,
        Proposer::Wrong => expected - 1,
    };

    let mut message = BeaconBlock {
        slot,
        proposer_index,
        parent_root,
        ..BeaconBlock::default()
    };
    message.body.attestations = attestations;
    let randao_domain = get_domain(parent_state, DOMAIN_RANDAO, epoch);
    message.body.randao_reveal = keys[proposer_index as usize]
        .sign_root(&compute_signing_root(&epoch.hash_tree_root(), &randao_domain));

    let unsigned = SignedBeaconBlock {
        message: message.clone(),
        signature: SignatureBytes::empty(),
    };
    if let Ok(post) = BasicStateTransition.apply(parent_state, &unsigned) {
        message.state_root = post.hash_tree_root();
    }
    sign_block(keys, parent_state, message)
}

/// Aggregate attestation by `indices`, signed over `data` in the domain of
/// `target_state`.
pub fn sign_attestation(
    keys: &[BlsKeyPair],
    target_state: &BeaconState,
    indices: &[ValidatorIndex],
    data: AttestationData,
) -> Attestation {
    let domain = get_domain(target_state, DOMAIN_BEACON_ATTESTER, data.target.epoch);
    let signing_root = compute_signing_root(&data.hash_tree_root(), &domain);
    let signatures: Vec<BlsSignature> = indices
        .iter()
        .map(|i| keys[*i as usize].sign(&signing_root))
        .collect();
    let aggregate = BlsSignature::aggregate(&signatures).expect("non-empty aggregate");
    Attestation {
        attesting_indices: indices.to_vec(),
        data,
        signature: SignatureBytes(aggregate.to_bytes()),
    }
}

pub fn open_database() -> Arc<MemoryDatabase> {
    Arc::new(Database::open(InMemoryKVStore::new(), StorageConfig::default()))
}

/// A validating node: BLS-checked fork choice, LMD-GHOST head selection and
/// a store that is either memory-only or backed by a database.
pub struct Harness {
    pub keys: Vec<BlsKeyPair>,
    pub store: Arc<Store>,
    pub fork_choice: ForkChoice,
    pub strategy: LmdGhostForkChoice,
    pub genesis_root: Hash,
}

impl Harness {
    pub fn memory(validators: u64) -> Self {
        let keys = interop_keys(validators);
        let store = Store::memory_only(StoreSnapshot::from_genesis(genesis_state(&keys)));
        Self::with_store(keys, store)
    }

    /// Harness whose store persists to a fresh in-memory database.
    pub fn persistent(validators: u64) -> (Self, Arc<MemoryDatabase>) {
        let keys = interop_keys(validators);
        let db = open_database();
        let genesis = StoreSnapshot::from_genesis(genesis_state(&keys));
        db.store_genesis(&genesis).expect("store genesis");
        let store = Store::new(genesis, db.clone());
        (Self::with_store(keys, store), db)
    }

    /// Wrap an existing store, e.g. one reloaded from a database.
    /// `genesis_root` is then the store's finalized root.
    pub fn with_store(keys: Vec<BlsKeyPair>, store: Arc<Store>) -> Self {
        let snapshot = store.snapshot().expect("open store");
        let finalized = snapshot.finalized_checkpoint();
        let anchor_slot = snapshot
            .get_block(&finalized.root)
            .map_or(0, |block| block.slot());
        let strategy = LmdGhostForkChoice::new(finalized.root, anchor_slot);

        // Rebuild the block tree and votes a restarted node would have.
        let mut blocks: Vec<_> = snapshot
            .block_roots()
            .filter_map(|root| snapshot.get_block(root).map(|block| (*root, block)))
            .collect();
        blocks.sort_by_key(|(_, block)| block.slot());
        for (root, block) in &blocks {
            if let Some(state) = snapshot.get_block_state(root) {
                strategy.on_block(*root, block.parent_root(), block.slot(), &state);
            }
        }
        let validator_count = snapshot
            .get_block_state(&finalized.root)
            .map_or(0, |state| state.validators.len() as u64);
        for validator in 0..validator_count {
            if let Some(message) = snapshot.latest_message(validator) {
                strategy.on_attestation(validator, message.root, message.epoch);
            }
        }

        let verifier = Arc::new(BlsSignatureVerifier);
        Self {
            keys,
            fork_choice: ForkChoice::new(
                create_block_validator(BlockValidatorKind::Full, verifier.clone()),
                verifier,
            ),
            strategy,
            genesis_root: finalized.root,
            store,
        }
    }

    pub fn state(&self, root: &Hash) -> Arc<BeaconState> {
        self.store
            .get_block_state(root)
            .expect("open store")
            .expect("known block state")
    }

    pub fn block_at(&self, parent_root: Hash, slot: Slot, proposer: Proposer) -> SignedBeaconBlock {
        produce_block(&self.keys, &self.state(&parent_root), parent_root, slot, proposer)
    }

    /// Import `block` in its own transaction after advancing the clock to
    /// its slot. Commits only successful imports, through the fork choice so
    /// the strategy sees the block.
    pub async fn import(
        &self,
        block: SignedBeaconBlock,
    ) -> Result<BlockImportResult, ForkChoiceError> {
        let mut tx = self.store.start_transaction()?;
        let time = tx.genesis_time() + block.slot() * SECONDS_PER_SLOT;
        self.fork_choice.on_tick(&mut tx, time);
        let result = self
            .fork_choice
            .on_block(&mut tx, block, Arc::new(BasicStateTransition), &self.strategy)
            .await?;
        if result.is_successful() {
            self.fork_choice.commit(tx, &self.strategy).await?;
        }
        Ok(result)
    }

    /// Build and import a chain of correct blocks at `slots`, starting from
    /// `parent_root`. Returns the roots in order.
    pub async fn extend(&self, mut parent_root: Hash, slots: &[Slot]) -> Vec<Hash> {
        let mut roots = Vec::with_capacity(slots.len());
        for slot in slots {
            let block = self.block_at(parent_root, *slot, Proposer::Correct);
            let root = block.root();
            let result = self.import(block).await.expect("import machinery");
            assert!(result.is_successful(), "block at slot {slot} rejected: {result}");
            roots.push(root);
            parent_root = root;
        }
        roots
    }
}
