//! Toggle-driven validator. Cryptographic work runs on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use shared_crypto::SignatureVerifier;
use shared_types::{BeaconState, SignedBeaconBlock, StateError, TreeHash};
use tokio::task;
use tracing::debug;

use super::operations;
use super::{BlockValidationResult, BlockValidator, BlockValidatorConfig};
use crate::domain::{BlockValidationError, ForkChoiceError};

pub struct SimpleBlockValidator {
    config: BlockValidatorConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl SimpleBlockValidator {
    pub fn new(config: BlockValidatorConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { config, verifier }
    }

    pub fn config(&self) -> &BlockValidatorConfig {
        &self.config
    }

    fn check_pre_state(
        config: BlockValidatorConfig,
        verifier: &dyn SignatureVerifier,
        state: &BeaconState,
        block: &SignedBeaconBlock,
    ) -> Result<BlockValidationResult, StateError> {
        if config.verify_block_signature {
            if let Err(e) = operations::verify_block_signature(state, block, verifier)? {
                return Ok(Err(e));
            }
        }

        if config.verify_block_body {
            let body = &block.message.body;
            if let Err(e) = operations::verify_attestations(state, &body.attestations, verifier) {
                return Ok(Err(e));
            }
            if let Err(e) = operations::verify_randao(state, block, verifier)? {
                return Ok(Err(e));
            }
            let body_checks = operations::verify_proposer_slashings(
                state,
                &body.proposer_slashings,
                verifier,
            )
            .and_then(|()| {
                operations::verify_attester_slashings(state, &body.attester_slashings, verifier)
            })
            .and_then(|()| {
                operations::verify_voluntary_exits(state, &body.voluntary_exits, verifier)
            });
            if let Err(e) = body_checks {
                return Ok(Err(e));
            }
        }

        Ok(Ok(()))
    }
}

#[async_trait]
impl BlockValidator for SimpleBlockValidator {
    async fn validate_pre_state(
        &self,
        pre_state: Arc<BeaconState>,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError> {
        let config = self.config;
        let verifier = self.verifier.clone();
        let result = task::spawn_blocking(move || {
            Self::check_pre_state(config, verifier.as_ref(), &pre_state, &block)
        })
        .await??;

        if let Err(e) = &result {
            debug!("[validator] Pre-state validation rejected block: {}", e);
        }
        Ok(result)
    }

    async fn validate_post_state(
        &self,
        post_state: Arc<BeaconState>,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError> {
        if !self.config.verify_post_state_root {
            return Ok(Ok(()));
        }

        let computed = task::spawn_blocking(move || post_state.hash_tree_root()).await?;
        let claimed = block.state_root();
        if claimed != computed {
            let err = BlockValidationError::InvalidStateRoot {
                block_state_root: hex::encode(claimed),
                computed_state_root: hex::encode(computed),
            };
            debug!("[validator] {}", err);
            return Ok(Err(err));
        }
        Ok(Ok(()))
    }
}
