use chain_storage::ForkChoiceEvent;
use shared_types::{BeaconState, Checkpoint, Epoch, Hash, Slot, ValidatorIndex};

use super::ForkChoiceStrategy;

/// Never picks a head, so imports only move the head along its own chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubForkChoiceStrategy;

impl ForkChoiceStrategy for StubForkChoiceStrategy {
    fn on_block(&self, _root: Hash, _parent_root: Hash, _slot: Slot, _state: &BeaconState) {}

    fn on_attestation(&self, _validator: ValidatorIndex, _block_root: Hash, _target_epoch: Epoch) {}

    fn find_head(
        &self,
        _justified: &Checkpoint,
        _justified_state: &BeaconState,
        _pending: &[ForkChoiceEvent],
    ) -> Option<Hash> {
        None
    }

    fn prune(&self, _finalized: &Checkpoint) {}
}
