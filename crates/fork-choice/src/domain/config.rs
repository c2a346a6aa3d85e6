//! Fork-choice configuration.

use shared_types::constants::SAFE_SLOTS_TO_UPDATE_JUSTIFIED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkChoiceConfig {
    /// Slots at the start of an epoch during which a newly justified
    /// checkpoint is adopted without an ancestry check.
    pub safe_slots_to_update_justified: u64,
}

impl Default for ForkChoiceConfig {
    fn default() -> Self {
        Self {
            safe_slots_to_update_justified: SAFE_SLOTS_TO_UPDATE_JUSTIFIED,
        }
    }
}

impl ForkChoiceConfig {
    pub fn with_safe_slots_to_update_justified(mut self, slots: u64) -> Self {
        self.safe_slots_to_update_justified = slots;
        self
    }
}
