//! # fork-choice
//!
//! Block import and head selection for the beacon chain.
//!
//! ## Architecture
//!
//! ```text
//! SignedBeaconBlock
//!       │
//!       ↓
//! ForkChoice::on_block ──→ BlockValidator::validate_pre_state
//!       │              ──→ StateTransition::apply        (blocking pool)
//!       │              ──→ BlockValidator::validate_post_state
//!       ↓
//! Transaction (staged) ──→ ForkChoiceStrategy::find_head
//! ```
//!
//! Import never commits. The caller owns the `Transaction` and decides
//! when staged blocks become visible. Committing through
//! [`ForkChoice::commit`] also hands the staged blocks and votes to the
//! head-selection strategy.
//!
//! ### Two kinds of failure
//!
//! A block that breaks a consensus rule is reported as a
//! [`BlockImportResult`] variant inside `Ok`. An `Err(ForkChoiceError)`
//! means the machinery itself failed (closed database, panicked task) and
//! says nothing about the block.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fork_choice::{create_block_validator, BasicStateTransition, BlockValidatorKind, ForkChoice};
//!
//! let verifier = Arc::new(BlsSignatureVerifier);
//! let fork_choice = ForkChoice::new(
//!     create_block_validator(BlockValidatorKind::Full, verifier.clone()),
//!     verifier,
//! );
//!
//! let mut tx = store.start_transaction()?;
//! fork_choice.on_tick(&mut tx, now);
//! let result = fork_choice
//!     .on_block(&mut tx, block, Arc::new(BasicStateTransition), &strategy)
//!     .await?;
//! if result.is_successful() {
//!     fork_choice.commit(tx, &strategy).await?;
//! }
//! ```
//!
//! ## Features
//!
//! - `metrics` - Prometheus counters for imports, rejections and latency

pub mod domain;
pub mod metrics;
pub mod service;
pub mod strategy;
pub mod transition;
pub mod validation;

// Re-export main types
pub use domain::{
    AttestationProcessingResult, BlockImportResult, BlockValidationError, ForkChoiceConfig,
    ForkChoiceError, StateTransitionError,
};
pub use service::{get_ancestor, get_current_slot, ForkChoice};
pub use strategy::{ForkChoiceStrategy, LmdGhostForkChoice, StubForkChoiceStrategy};
pub use transition::{BasicStateTransition, StateTransition};
pub use validation::{
    create_block_validator, BlockValidationResult, BlockValidator, BlockValidatorConfig,
    BlockValidatorKind, SimpleBlockValidator, StubBlockValidator,
};
