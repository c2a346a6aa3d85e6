//! # Core Domain Entities
//!
//! Beacon-chain entities exchanged between validation, fork choice and
//! storage.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Slot`, `Epoch`, `ValidatorIndex`, byte newtypes
//! - **Chain**: `BeaconBlock`, `BeaconBlockHeader`, `SignedBeaconBlock`
//! - **Operations**: `Attestation`, `ProposerSlashing`, `AttesterSlashing`,
//!   `SignedVoluntaryExit`
//! - **Finality**: `Checkpoint`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::tree_hash::{RootHasher, TreeHash};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte commitment root (block root, state root, body root).
pub type Hash = [u8; 32];

/// Slot number (one proposal opportunity).
pub type Slot = u64;

/// Epoch number (`SLOTS_PER_EPOCH` slots).
pub type Epoch = u64;

/// Index into the validator registry.
pub type ValidatorIndex = u64;

/// Balance denomination.
pub type Gwei = u64;

/// Fork version tag.
pub type Version = [u8; 4];

/// Domain type tag used for signature domain separation.
pub type DomainType = [u8; 4];

/// Zero root, used for "no parent" and unset header state roots.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compressed BLS12-381 public key (48 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes(#[serde_as(as = "Bytes")] pub [u8; 48]);

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyBytes(0x{})", hex::encode(&self.0[..8]))
    }
}

/// Compressed BLS12-381 signature (96 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureBytes(#[serde_as(as = "Bytes")] pub [u8; 96]);

impl SignatureBytes {
    /// The all-zero placeholder used for unsigned genesis objects.
    pub const fn empty() -> Self {
        Self([0u8; 96])
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes(0x{})", hex::encode(&self.0[..8]))
    }
}

// =============================================================================
// FINALITY
// =============================================================================

/// An (epoch, root) pair anchoring justification and finalization.
///
/// Compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch this checkpoint belongs to.
    pub epoch: Epoch,
    /// Root of the block anchoring the epoch.
    pub root: Hash,
}

impl Checkpoint {
    /// Create a checkpoint.
    pub const fn new(epoch: Epoch, root: Hash) -> Self {
        Self { epoch, root }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@0x{}", self.epoch, hex::encode(&self.root[..4]))
    }
}

// =============================================================================
// CHAIN
// =============================================================================

/// Block header. The root of a block is the root of its header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash,
    pub state_root: Hash,
    pub body_root: Hash,
}

/// Block header with the proposer's signature (used by proposer slashings).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}

/// Vote payload of an attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttestationData {
    pub slot: Slot,
    /// Committee index.
    pub index: u64,
    /// LMD-GHOST vote.
    pub beacon_block_root: Hash,
    /// FFG source.
    pub source: Checkpoint,
    /// FFG target.
    pub target: Checkpoint,
}

/// An aggregate attestation carrying its attesting validator indices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attestation {
    /// Sorted, unique validator indices.
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    /// Aggregate signature of all attesters over `data`.
    pub signature: SignatureBytes,
}

/// Evidence of a proposer signing two different headers for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

/// Evidence of a double or surround vote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttesterSlashing {
    pub attestation_1: Attestation,
    pub attestation_2: Attestation,
}

/// Request by a validator to leave the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoluntaryExit {
    /// Earliest epoch the exit may be processed.
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

/// Block body. Every operation list is independently verifiable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeaconBlockBody {
    /// Proposer's signature over the block epoch.
    pub randao_reveal: SignatureBytes,
    pub graffiti: Hash,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
}

/// Unsigned block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash,
    /// Claimed root of the post-state.
    pub state_root: Hash,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    /// Header view with the body replaced by its root.
    pub fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.hash_tree_root(),
        }
    }
}

/// Block with the proposer's signature over its signing root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBeaconBlock {
    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    pub fn parent_root(&self) -> Hash {
        self.message.parent_root
    }

    pub fn state_root(&self) -> Hash {
        self.message.state_root
    }

    /// Root of the block message (the signature is not committed to).
    pub fn root(&self) -> Hash {
        self.message.hash_tree_root()
    }
}

// =============================================================================
// COMMITMENT ROOTS
// =============================================================================

impl TreeHash for Checkpoint {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"checkpoint")
            .u64(self.epoch)
            .root(&self.root)
            .finish()
    }
}

impl TreeHash for BeaconBlockHeader {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"block")
            .u64(self.slot)
            .u64(self.proposer_index)
            .root(&self.parent_root)
            .root(&self.state_root)
            .root(&self.body_root)
            .finish()
    }
}

impl TreeHash for BeaconBlock {
    fn hash_tree_root(&self) -> Hash {
        self.to_header().hash_tree_root()
    }
}

impl TreeHash for SignedBeaconBlockHeader {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"signed_header")
            .root(&self.message.hash_tree_root())
            .bytes(&self.signature.0)
            .finish()
    }
}

impl TreeHash for AttestationData {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"attestation_data")
            .u64(self.slot)
            .u64(self.index)
            .root(&self.beacon_block_root)
            .root(&self.source.hash_tree_root())
            .root(&self.target.hash_tree_root())
            .finish()
    }
}

impl TreeHash for Attestation {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"attestation")
            .u64_list(&self.attesting_indices)
            .root(&self.data.hash_tree_root())
            .bytes(&self.signature.0)
            .finish()
    }
}

impl TreeHash for ProposerSlashing {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"proposer_slashing")
            .root(&self.signed_header_1.hash_tree_root())
            .root(&self.signed_header_2.hash_tree_root())
            .finish()
    }
}

impl TreeHash for AttesterSlashing {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"attester_slashing")
            .root(&self.attestation_1.hash_tree_root())
            .root(&self.attestation_2.hash_tree_root())
            .finish()
    }
}

impl TreeHash for VoluntaryExit {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"voluntary_exit")
            .u64(self.epoch)
            .u64(self.validator_index)
            .finish()
    }
}

impl TreeHash for SignedVoluntaryExit {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"signed_voluntary_exit")
            .root(&self.message.hash_tree_root())
            .bytes(&self.signature.0)
            .finish()
    }
}

impl TreeHash for BeaconBlockBody {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"block_body")
            .bytes(&self.randao_reveal.0)
            .root(&self.graffiti)
            .list(&self.proposer_slashings)
            .list(&self.attester_slashings)
            .list(&self.attestations)
            .list(&self.voluntary_exits)
            .finish()
    }
}
