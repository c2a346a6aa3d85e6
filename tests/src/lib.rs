//! # Beacon Core Test Suite
//!
//! Cross-crate scenarios that run real BLS-signed chains through fork
//! choice and the transactional store.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks
//! └── src/
//!     ├── fixtures.rs   # Interop keys, block production, Harness
//!     └── integration/  # Import, persistence, lifecycle, concurrency
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p chain-tests
//!
//! # By category
//! cargo test -p chain-tests integration::block_import::
//! cargo test -p chain-tests integration::database_lifecycle::
//!
//! # With logs
//! RUST_LOG=debug cargo test -p chain-tests -- --nocapture
//!
//! # Benchmarks
//! cargo bench -p chain-tests
//! ```

pub mod fixtures;
pub mod integration;
