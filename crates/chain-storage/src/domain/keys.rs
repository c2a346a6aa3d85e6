//! Key layout of the durable store.
//!
//! All keys are prefixed to namespace different record types. Slot and
//! validator suffixes are big-endian so lexicographic order matches numeric
//! order for ordered scans.

use shared_types::{Hash, Slot, ValidatorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// `v:{name}` -> bincode variable (times, checkpoints, head)
    Variable,
    /// `hb:{root}` -> SignedBeaconBlock not yet finalized
    HotBlock,
    /// `hs:{root}` -> BeaconState for a hot block
    HotState,
    /// `fb:{root}` -> finalized SignedBeaconBlock
    FinalizedBlock,
    /// `fs:{root}` -> finalized BeaconState
    FinalizedState,
    /// `fr:{slot}` -> root of the canonical finalized block at that slot
    FinalizedRootBySlot,
    /// `lm:{validator}` -> latest target Checkpoint voted by that validator
    LatestMessage,
}

impl KeyPrefix {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Variable => b"v:",
            KeyPrefix::HotBlock => b"hb:",
            KeyPrefix::HotState => b"hs:",
            KeyPrefix::FinalizedBlock => b"fb:",
            KeyPrefix::FinalizedState => b"fs:",
            KeyPrefix::FinalizedRootBySlot => b"fr:",
            KeyPrefix::LatestMessage => b"lm:",
        }
    }

    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn root_key(&self, root: &Hash) -> Vec<u8> {
        self.key(root)
    }

    pub fn slot_key(slot: Slot) -> Vec<u8> {
        KeyPrefix::FinalizedRootBySlot.key(&slot.to_be_bytes())
    }

    pub fn latest_message_key(validator: ValidatorIndex) -> Vec<u8> {
        KeyPrefix::LatestMessage.key(&validator.to_be_bytes())
    }

    /// Recover the root suffix of a root-keyed record.
    pub fn root_from_key(&self, key: &[u8]) -> Option<Hash> {
        key.strip_prefix(self.as_bytes())?.try_into().ok()
    }

    /// Recover the big-endian u64 suffix of a slot or validator key.
    pub fn u64_from_key(&self, key: &[u8]) -> Option<u64> {
        let suffix: [u8; 8] = key.strip_prefix(self.as_bytes())?.try_into().ok()?;
        Some(u64::from_be_bytes(suffix))
    }
}

/// Named singleton values under [`KeyPrefix::Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    GenesisTime,
    Time,
    JustifiedCheckpoint,
    BestJustifiedCheckpoint,
    FinalizedCheckpoint,
    Head,
}

impl Variable {
    pub fn key(&self) -> Vec<u8> {
        let name: &[u8] = match self {
            Variable::GenesisTime => b"genesis_time",
            Variable::Time => b"time",
            Variable::JustifiedCheckpoint => b"justified",
            Variable::BestJustifiedCheckpoint => b"best_justified",
            Variable::FinalizedCheckpoint => b"finalized",
            Variable::Head => b"head",
        };
        KeyPrefix::Variable.key(name)
    }
}
