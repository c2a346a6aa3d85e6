//! # Fork-Choice Metrics
//!
//! Prometheus metrics for block and attestation import.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! fork-choice = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `fork_choice_blocks_imported_total` - Counter of successfully imported blocks
//! - `fork_choice_blocks_rejected_total` - Counter of rejected blocks (by reason)
//! - `fork_choice_import_latency_seconds` - Histogram of `on_block` times
//! - `fork_choice_attestations_processed_total` - Counter of accepted attestations

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks successfully imported
    pub static ref BLOCKS_IMPORTED: IntCounter = register_int_counter!(
        "fork_choice_blocks_imported_total",
        "Total number of blocks successfully imported"
    )
    .expect("Failed to create BLOCKS_IMPORTED metric");

    /// Total blocks rejected, labeled by import result
    pub static ref BLOCKS_REJECTED: CounterVec = register_counter_vec!(
        "fork_choice_blocks_rejected_total",
        "Total number of blocks rejected",
        &["reason"]
    )
    .expect("Failed to create BLOCKS_REJECTED metric");

    /// Histogram of block import latency
    pub static ref IMPORT_LATENCY: Histogram = register_histogram!(
        "fork_choice_import_latency_seconds",
        "Time taken to import a block in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create IMPORT_LATENCY metric");

    /// Total attestations accepted by fork choice
    pub static ref ATTESTATIONS_PROCESSED: IntCounter = register_int_counter!(
        "fork_choice_attestations_processed_total",
        "Total number of attestations applied to fork choice"
    )
    .expect("Failed to create ATTESTATIONS_PROCESSED metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_imported() {
    BLOCKS_IMPORTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_rejected(reason: &str) {
    BLOCKS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_import_latency(seconds: f64) {
    IMPORT_LATENCY.observe(seconds);
}

#[cfg(feature = "metrics")]
pub fn record_attestation_processed() {
    ATTESTATIONS_PROCESSED.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_block_imported() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_import_latency(_seconds: f64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_attestation_processed() {}
