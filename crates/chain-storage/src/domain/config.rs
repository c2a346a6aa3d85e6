//! Storage configuration.

/// How many finalized states the database retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateStorageMode {
    /// Keep the state of every finalized block.
    Archive,
    /// Keep only the latest finalized state.
    #[default]
    Prune,
}

/// Configuration for the chain database.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Finalized-state retention (default: `Prune`).
    pub state_storage_mode: StateStorageMode,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_storage_mode(mut self, mode: StateStorageMode) -> Self {
        self.state_storage_mode = mode;
        self
    }

    pub fn archive() -> Self {
        Self::new().with_state_storage_mode(StateStorageMode::Archive)
    }
}
