//! Sealing messages on a confirmed channel using `XChaCha20-Poly1305`
//!
//! All functions are pure - the nonce must be provided by the caller.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::{error::CryptoError, kem::SymmetricKey};

/// Size of an `XChaCha20` nonce (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// A sealed channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    /// The 24-byte `XChaCha20` nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl SealedMessage {
    /// Plaintext length (ciphertext length minus authentication tag).
    #[must_use]
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(POLY1305_TAG_SIZE)
    }
}

/// Seal `plaintext` under `key`.
///
/// # Security
///
/// - Caller MUST NOT reuse a nonce under the same key; random 24-byte nonces
///   are safe
#[must_use]
pub fn seal(key: &SymmetricKey, plaintext: &[u8], nonce: [u8; NONCE_SIZE]) -> SealedMessage {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    SealedMessage { nonce, ciphertext }
}

/// Open a sealed message.
///
/// # Errors
///
/// - `DecryptionFailed`: wrong key or tampered ciphertext
pub fn open(key: &SymmetricKey, sealed: &SealedMessage) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = SymmetricKey::from_bytes([3; 32]);
        let sealed = seal(&key, b"ack", [9; NONCE_SIZE]);
        assert_eq!(sealed.plaintext_len(), 3);
        assert_eq!(open(&key, &sealed), Ok(b"ack".to_vec()));
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&SymmetricKey::from_bytes([3; 32]), b"ack", [9; NONCE_SIZE]);
        assert_eq!(
            open(&SymmetricKey::from_bytes([4; 32]), &sealed),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = SymmetricKey::from_bytes([3; 32]);
        let mut sealed = seal(&key, b"ack", [9; NONCE_SIZE]);
        sealed.ciphertext[0] ^= 0x80;
        assert_eq!(open(&key, &sealed), Err(CryptoError::DecryptionFailed));
    }
}
