//! # Shared Crypto - Signature Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `bls` | BLS12-381 (min-pk) | Block, randao, exit and attestation signatures |
//! | `verifier` | - | `SignatureVerifier` port, BLS and no-op implementations |
//!
//! ## Security Properties
//!
//! - **BLS**: proof-of-possession ciphersuite, subgroup checks on every
//!   signature and public key during verification
//! - **Key material**: random input key material is zeroized after derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod errors;
pub mod verifier;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use errors::CryptoError;
pub use verifier::{BlsSignatureVerifier, NoopSignatureVerifier, SignatureVerifier};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
