use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{BeaconState, SignedBeaconBlock};

use super::{BlockValidationResult, BlockValidator};
use crate::domain::ForkChoiceError;

/// Accepts every block. For import-pipeline tests that build blocks by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubBlockValidator;

#[async_trait]
impl BlockValidator for StubBlockValidator {
    async fn validate_pre_state(
        &self,
        _pre_state: Arc<BeaconState>,
        _block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError> {
        Ok(Ok(()))
    }

    async fn validate_post_state(
        &self,
        _post_state: Arc<BeaconState>,
        _block: Arc<SignedBeaconBlock>,
    ) -> Result<BlockValidationResult, ForkChoiceError> {
        Ok(Ok(()))
    }
}
