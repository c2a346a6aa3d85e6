//! Protocol constants.

use crate::entities::{DomainType, Epoch, Gwei, Slot, Version};

// Time
pub const SLOTS_PER_EPOCH: u64 = 32;
pub const SECONDS_PER_SLOT: u64 = 12;
pub const GENESIS_SLOT: Slot = 0;
pub const GENESIS_EPOCH: Epoch = 0;
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;
pub const MIN_ATTESTATION_INCLUSION_DELAY: u64 = 1;
pub const MIN_SEED_LOOKAHEAD: u64 = 1;
pub const MAX_SEED_LOOKAHEAD: u64 = 4;
pub const MIN_VALIDATOR_WITHDRAWABILITY_DELAY: u64 = 256;
pub const SHARD_COMMITTEE_PERIOD: u64 = 256;

// Fork choice
pub const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 8;

// State list lengths
pub const SLOTS_PER_HISTORICAL_ROOT: u64 = 64;
pub const EPOCHS_PER_HISTORICAL_VECTOR: u64 = 64;
pub const EPOCHS_PER_SLASHINGS_VECTOR: u64 = 64;

// Balances
pub const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
pub const MIN_SLASHING_PENALTY_QUOTIENT: u64 = 32;
pub const WHISTLEBLOWER_REWARD_QUOTIENT: u64 = 512;

// Block body limits
pub const MAX_PROPOSER_SLASHINGS: usize = 16;
pub const MAX_ATTESTER_SLASHINGS: usize = 2;
pub const MAX_ATTESTATIONS: usize = 128;
pub const MAX_VOLUNTARY_EXITS: usize = 16;
pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;

// Signature domains
pub const DOMAIN_BEACON_PROPOSER: DomainType = [0, 0, 0, 0];
pub const DOMAIN_BEACON_ATTESTER: DomainType = [1, 0, 0, 0];
pub const DOMAIN_RANDAO: DomainType = [2, 0, 0, 0];
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = [4, 0, 0, 0];

pub const GENESIS_FORK_VERSION: Version = [0, 0, 0, 0];
