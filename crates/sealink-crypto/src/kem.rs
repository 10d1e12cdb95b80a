//! Key encapsulation over X25519.
//!
//! Ephemeral-static Diffie-Hellman: the sender generates a one-time key
//! pair, the ciphertext is its public key, and the shared key is HKDF over
//! the DH output bound to both public keys.
//!
//! ```text
//! sender                                recipient (pk_R, sk_R)
//!   e, E = gen()
//!   dh = X25519(e, pk_R)                  dh = X25519(sk_R, E)
//!   k  = HKDF(dh, label || E || pk_R)     k  = HKDF(dh, label || E || pk_R)
//!   ciphertext = E  ─────────────────────▶
//! ```

use std::fmt;

use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Label for KEM key derivation
const KEM_LABEL: &[u8] = b"sealinkKemV1";

/// Size of a KEM public key (32 bytes)
pub const KEM_PUBLIC_KEY_SIZE: usize = 32;

/// Size of a KEM ciphertext (32 bytes, the ephemeral public key)
pub const KEM_CIPHERTEXT_SIZE: usize = 32;

/// Size of a symmetric key (32 bytes)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Public half of a KEM key pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KemPublicKey([u8; KEM_PUBLIC_KEY_SIZE]);

impl KemPublicKey {
    /// Wrap raw X25519 public key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEM_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEM_PUBLIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for KemPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KemPublicKey({:02x}{:02x}{:02x}{:02x})", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Private half of a KEM key pair. Zeroized on drop.
#[derive(Clone)]
pub struct KemPrivateKey(StaticSecret);

impl KemPrivateKey {
    /// Wrap raw X25519 secret bytes. Clamping happens at use.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Raw secret bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SYMMETRIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Matching public key.
    #[must_use]
    pub fn public_key(&self) -> KemPublicKey {
        KemPublicKey(PublicKey::from(&self.0).to_bytes())
    }
}

impl PartialEq for KemPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for KemPrivateKey {}

impl fmt::Debug for KemPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KemPrivateKey(..)")
    }
}

/// A KEM key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemKeyPair {
    /// Public key, shared with the peer
    pub public: KemPublicKey,
    /// Private key, kept in protocol state
    pub private: KemPrivateKey,
}

impl KemKeyPair {
    /// Generate a fresh key pair from caller-provided randomness.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        let private = KemPrivateKey::from_bytes(bytes);
        bytes.zeroize();
        Self { public: private.public_key(), private }
    }
}

/// Encapsulated key, sent to the holder of the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemCiphertext(Vec<u8>);

impl KemCiphertext {
    /// Wrap received ciphertext bytes. Size is checked at decapsulation.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw ciphertext bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// 32-byte symmetric key. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Encapsulate a fresh symmetric key to `recipient`.
///
/// # Security
///
/// - The ephemeral secret never leaves this function
/// - The derived key is bound to both public keys, so a ciphertext cannot be
///   redirected to another recipient
///
/// # Errors
///
/// - `CryptoError::InvalidPublicKey` if `recipient` is a low-order point; the
///   shared secret would not depend on the ephemeral secret
pub fn encapsulate<R: RngCore + CryptoRng>(
    recipient: &KemPublicKey,
    rng: &mut R,
) -> Result<(KemCiphertext, SymmetricKey), CryptoError> {
    let ephemeral = KemKeyPair::generate(rng);
    let shared = ephemeral.private.0.diffie_hellman(&PublicKey::from(recipient.0));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }
    let key = derive_key(shared.as_bytes(), &ephemeral.public.0, &recipient.0);
    Ok((KemCiphertext(ephemeral.public.0.to_vec()), key))
}

/// Recover the symmetric key encapsulated in `ciphertext`.
///
/// # Errors
///
/// - `CryptoError::InvalidLength` if the ciphertext is not 32 bytes
/// - `CryptoError::DecapsulationFailed` if the ephemeral key is a low-order
///   point (the shared secret would be all zeros)
pub fn decapsulate(
    ciphertext: &KemCiphertext,
    recipient: &KemPrivateKey,
) -> Result<SymmetricKey, CryptoError> {
    let ephemeral: [u8; KEM_CIPHERTEXT_SIZE] =
        ciphertext.0.as_slice().try_into().map_err(|_| CryptoError::InvalidLength {
            what: "KEM ciphertext",
            expected: KEM_CIPHERTEXT_SIZE,
            actual: ciphertext.0.len(),
        })?;

    let shared = recipient.0.diffie_hellman(&PublicKey::from(ephemeral));
    if !shared.was_contributory() {
        return Err(CryptoError::DecapsulationFailed { reason: "non-contributory shared secret" });
    }

    Ok(derive_key(shared.as_bytes(), &ephemeral, &recipient.public_key().0))
}

fn derive_key(
    shared: &[u8; 32],
    ephemeral: &[u8; KEM_PUBLIC_KEY_SIZE],
    recipient: &[u8; KEM_PUBLIC_KEY_SIZE],
) -> SymmetricKey {
    let hkdf = Hkdf::<Sha256>::new(None, shared);

    // label || ephemeral || recipient
    let mut info = Vec::with_capacity(KEM_LABEL.len() + 2 * KEM_PUBLIC_KEY_SIZE);
    info.extend_from_slice(KEM_LABEL);
    info.extend_from_slice(ephemeral);
    info.extend_from_slice(recipient);

    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    SymmetricKey(key)
}
