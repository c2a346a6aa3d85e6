//! # Block Validation
//!
//! Admissibility of a signed block against its pre-state, and agreement of
//! the computed post-state with the block's `state_root`.
//!
//! Results are nested: the outer `Result` carries a `ForkChoiceError` when
//! validation itself broke, the inner `BlockValidationResult` carries the
//! verdict on the block.

pub mod operations;
pub mod simple;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use shared_crypto::{NoopSignatureVerifier, SignatureVerifier};
use shared_types::{BeaconState, SignedBeaconBlock};

use crate::domain::{BlockValidationError, ForkChoiceError};

pub use simple::SimpleBlockValidator;
pub use stub::StubBlockValidator;

/// Verdict on a block. `Err` is a rejection, not a fault.
pub type BlockValidationResult = Result<(), BlockValidationError>;

#[async_trait]
pub trait BlockValidator: Send + Sync {
    /// Signature and body checks against the parent's post-state.
    async fn validate_pre_state(
        &self,
        pre_state: Arc<BeaconState>,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError>;

    /// The block's claimed `state_root` against the computed post-state.
    async fn validate_post_state(
        &self,
        post_state: Arc<BeaconState>,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError>;
}

/// Toggles for `SimpleBlockValidator`. All on in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockValidatorConfig {
    pub verify_block_signature: bool,
    /// Attestations, randao, slashings and exits.
    pub verify_block_body: bool,
    pub verify_post_state_root: bool,
}

impl Default for BlockValidatorConfig {
    fn default() -> Self {
        Self {
            verify_block_signature: true,
            verify_block_body: true,
            verify_post_state_root: true,
        }
    }
}

impl BlockValidatorConfig {
    pub fn with_block_signature(mut self, enabled: bool) -> Self {
        self.verify_block_signature = enabled;
        self
    }

    pub fn with_block_body(mut self, enabled: bool) -> Self {
        self.verify_block_body = enabled;
        self
    }

    pub fn with_post_state_root(mut self, enabled: bool) -> Self {
        self.verify_post_state_root = enabled;
        self
    }
}

/// Validator variants, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockValidatorKind {
    /// Every check with the supplied verifier.
    #[default]
    Full,
    /// Every structural check, but all signatures accepted.
    NoSignatureCheck,
    /// Accepts everything.
    Stub,
}

pub fn create_block_validator(
    kind: BlockValidatorKind,
    verifier: Arc<dyn SignatureVerifier>,
) -> Arc<dyn BlockValidator> {
    match kind {
        BlockValidatorKind::Full => Arc::new(SimpleBlockValidator::new(
            BlockValidatorConfig::default(),
            verifier,
        )),
        BlockValidatorKind::NoSignatureCheck => Arc::new(SimpleBlockValidator::new(
            BlockValidatorConfig::default(),
            Arc::new(NoopSignatureVerifier),
        )),
        BlockValidatorKind::Stub => Arc::new(StubBlockValidator),
    }
}
