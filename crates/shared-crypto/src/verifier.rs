//! Signature verification port.
//!
//! Validation code never calls BLS directly; it goes through a
//! `SignatureVerifier` so tests and benchmarks can swap in
//! `NoopSignatureVerifier`.

use shared_types::{PublicKeyBytes, SignatureBytes};

use crate::bls::{BlsPublicKey, BlsSignature};
use crate::CryptoError;

/// Black-box signature verification capability.
pub trait SignatureVerifier: Send + Sync {
    /// Verify one signature. Malformed keys or signatures verify as `false`.
    fn verify(&self, pubkey: &PublicKeyBytes, message: &[u8], signature: &SignatureBytes) -> bool;

    /// Verify an aggregate signature of `pubkeys` over a common message.
    fn verify_aggregate(
        &self,
        pubkeys: &[PublicKeyBytes],
        message: &[u8],
        signature: &SignatureBytes,
    ) -> bool;

    /// Strict variant of [`verify`](Self::verify): a failed check becomes
    /// `CryptoError::SignatureVerificationFailed` carrying `context`.
    fn verify_and_fail(
        &self,
        pubkey: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
        context: &str,
    ) -> Result<(), CryptoError> {
        if self.verify(pubkey, message, signature) {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed(context.to_string()))
        }
    }
}

/// BLS12-381 verifier backed by `blst`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlsSignatureVerifier;

impl SignatureVerifier for BlsSignatureVerifier {
    fn verify(&self, pubkey: &PublicKeyBytes, message: &[u8], signature: &SignatureBytes) -> bool {
        let Ok(pk) = BlsPublicKey::try_from(pubkey) else {
            return false;
        };
        let Ok(sig) = BlsSignature::try_from(signature) else {
            return false;
        };
        pk.verify(message, &sig)
    }

    fn verify_aggregate(
        &self,
        pubkeys: &[PublicKeyBytes],
        message: &[u8],
        signature: &SignatureBytes,
    ) -> bool {
        let Ok(keys) = pubkeys
            .iter()
            .map(BlsPublicKey::try_from)
            .collect::<Result<Vec<_>, _>>()
        else {
            return false;
        };
        let Ok(sig) = BlsSignature::try_from(signature) else {
            return false;
        };
        sig.fast_aggregate_verify(message, &keys)
    }
}

/// Accepts every signature. For tests that exercise everything but crypto.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignatureVerifier;

impl SignatureVerifier for NoopSignatureVerifier {
    fn verify(&self, _: &PublicKeyBytes, _: &[u8], _: &SignatureBytes) -> bool {
        true
    }

    fn verify_aggregate(&self, _: &[PublicKeyBytes], _: &[u8], _: &SignatureBytes) -> bool {
        true
    }
}
