//! Ed25519 identity signatures.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of a verification key (32 bytes)
pub const VERIFICATION_KEY_SIZE: usize = 32;

/// Size of a signature (64 bytes)
pub const SIGNATURE_SIZE: usize = 64;

/// Public verification key. Also serves as the cryptographic identity of a
/// user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerificationKey([u8; VERIFICATION_KEY_SIZE]);

impl VerificationKey {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidPublicKey` if the bytes do not decompress to a
    /// curve point.
    pub fn from_bytes(bytes: [u8; VERIFICATION_KEY_SIZE]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; VERIFICATION_KEY_SIZE] {
        &self.0
    }

    /// Verify `signature` over `message`.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidSignature` on mismatch.
    pub fn verify(&self, message: &[u8], signature: &SignatureBytes) -> Result<(), CryptoError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(message, &signature).map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKey({:02x}{:02x}{:02x}{:02x})", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Detached Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureBytes([u8; SIGNATURE_SIZE]);

impl SignatureBytes {
    /// Wrap raw signature bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Ed25519 signing key pair. The secret half is zeroized on drop by
/// `ed25519-dalek`.
#[derive(Clone)]
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate a key pair from caller-provided randomness.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let pair = Self::from_seed(&seed);
        seed.zeroize();
        pair
    }

    /// Deterministic key pair from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(seed) }
    }

    /// Public verification key.
    #[must_use]
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> SignatureBytes {
        SignatureBytes(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("verification_key", &self.verification_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn sign_then_verify() {
        let pair = SigningKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(1));
        let signature = pair.sign(b"hello");
        assert_eq!(pair.verification_key().verify(b"hello", &signature), Ok(()));
    }

    #[test]
    fn tampered_message_rejected() {
        let pair = SigningKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(2));
        let signature = pair.sign(b"hello");
        assert_eq!(
            pair.verification_key().verify(b"hellp", &signature),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_signature_rejected() {
        let pair = SigningKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(3));
        let mut raw = *pair.sign(b"hello").as_bytes();
        raw[10] ^= 0x01;
        assert_eq!(
            pair.verification_key().verify(b"hello", &SignatureBytes::from_bytes(raw)),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn other_key_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let alice = SigningKeyPair::generate(&mut rng);
        let bob = SigningKeyPair::generate(&mut rng);
        let signature = alice.sign(b"hello");
        assert_eq!(
            bob.verification_key().verify(b"hello", &signature),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn verification_key_round_trips_through_bytes() {
        let pair = SigningKeyPair::from_seed(&[7; 32]);
        let key = pair.verification_key();
        assert_eq!(VerificationKey::from_bytes(*key.as_bytes()), Ok(key));
    }
}
