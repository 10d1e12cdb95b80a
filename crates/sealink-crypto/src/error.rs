//! Cryptographic errors.

use thiserror::Error;

/// Failure of a cryptographic check.
///
/// None of these indicate a local bug: they all mean "the remote material
/// does not verify", and callers reject the offending message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature did not verify under the claimed key
    #[error("signature verification failed")]
    InvalidSignature,

    /// Public key bytes are not a valid curve point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Input has the wrong size
    #[error("malformed {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Kind of input
        what: &'static str,
        /// Required size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Ciphertext could not be decapsulated
    #[error("decapsulation failed: {reason}")]
    DecapsulationFailed {
        /// Why decapsulation was refused
        reason: &'static str,
    },

    /// AEAD authentication failed
    #[error("decryption failed")]
    DecryptionFailed,
}
