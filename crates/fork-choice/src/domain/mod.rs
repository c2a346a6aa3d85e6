//! Domain layer: import outcomes, errors and configuration.

pub mod config;
pub mod error;
pub mod result;

pub use config::ForkChoiceConfig;
pub use error::{BlockValidationError, ForkChoiceError, StateTransitionError};
pub use result::{AttestationProcessingResult, BlockImportResult};
