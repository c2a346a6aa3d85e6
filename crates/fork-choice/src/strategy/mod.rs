//! # Fork-Choice Strategies
//!
//! The head-selection rule is pluggable. A strategy only ever holds
//! committed blocks and votes. While a transaction is open its staged
//! [`ForkChoiceEvent`]s are passed to `find_head` as an overlay and are
//! replayed into the strategy once the transaction commits.

mod lmd_ghost;
mod stub;

pub use lmd_ghost::LmdGhostForkChoice;
pub use stub::StubForkChoiceStrategy;

use chain_storage::ForkChoiceEvent;
use shared_types::{BeaconState, Checkpoint, Epoch, Hash, Slot, ValidatorIndex};

pub trait ForkChoiceStrategy: Send + Sync {
    fn on_block(&self, root: Hash, parent_root: Hash, slot: Slot, state: &BeaconState);

    /// Record `validator`'s vote. Only a vote for a later target epoch
    /// replaces an earlier one.
    fn on_attestation(&self, validator: ValidatorIndex, block_root: Hash, target_epoch: Epoch);

    /// Best descendant of `justified`, weighted by balances in
    /// `justified_state`, as if `pending` had been applied. Must not change
    /// the strategy. `None` when the strategy cannot decide.
    fn find_head(
        &self,
        justified: &Checkpoint,
        justified_state: &BeaconState,
        pending: &[ForkChoiceEvent],
    ) -> Option<Hash>;

    /// Forget everything that does not descend from `finalized`.
    fn prune(&self, finalized: &Checkpoint);

    /// Feed one committed event.
    fn apply(&self, event: &ForkChoiceEvent) {
        match event {
            ForkChoiceEvent::Block {
                root,
                parent_root,
                slot,
                state,
            } => self.on_block(*root, *parent_root, *slot, state),
            ForkChoiceEvent::Vote {
                validator,
                block_root,
                target_epoch,
            } => self.on_attestation(*validator, *block_root, *target_epoch),
        }
    }
}
