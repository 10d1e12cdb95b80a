//! Channel seed derivation.
//!
//! Channel creation runs two independent key encapsulations. The channel seed
//! combines both keys so that leaking either exchange alone does not expose
//! the channel:
//!
//! ```text
//! seed = HKDF-SHA256(salt = SEED_LABEL, ikm = k1 || k2)
//! directional key (A -> B) = HKDF-Expand(seed, DIRECTION_LABEL || A || B)
//! ```

use std::fmt;

use hkdf::Hkdf;
use sealink_encoding::Uid;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::kem::{SYMMETRIC_KEY_SIZE, SymmetricKey};

/// Salt for combining KEM keys into a channel seed
const SEED_LABEL: &[u8] = b"sealinkChannelSeedV1";

/// Label for per-direction channel keys
const DIRECTION_LABEL: &[u8] = b"sealinkChannelDirectionV1";

/// Size of a channel seed (32 bytes)
pub const CHANNEL_SEED_SIZE: usize = 32;

/// Root key material of a confirmed channel. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelSeed([u8; CHANNEL_SEED_SIZE]);

impl ChannelSeed {
    /// Combine encapsulated keys into a seed.
    ///
    /// Order matters: both sides must pass `[k1, k2]` in the same order.
    #[must_use]
    pub fn from_keys(keys: &[&SymmetricKey]) -> Self {
        let mut ikm = Vec::with_capacity(keys.len() * SYMMETRIC_KEY_SIZE);
        for key in keys {
            ikm.extend_from_slice(key.as_bytes());
        }

        let hkdf = Hkdf::<Sha256>::new(Some(SEED_LABEL), &ikm);
        ikm.zeroize();

        let mut seed = [0u8; CHANNEL_SEED_SIZE];
        let Ok(()) = hkdf.expand(&[], &mut seed) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        Self(seed)
    }

    /// Wrap raw seed bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CHANNEL_SEED_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw seed bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CHANNEL_SEED_SIZE] {
        &self.0
    }

    /// Key for traffic from `sender` to `recipient`.
    ///
    /// Each direction gets its own key, so the two devices never encrypt
    /// under the same key and nonce space.
    #[must_use]
    pub fn directional_key(&self, sender: &Uid, recipient: &Uid) -> SymmetricKey {
        let Ok(hkdf) = Hkdf::<Sha256>::from_prk(&self.0) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 PRK length");
        };

        let mut info = Vec::with_capacity(DIRECTION_LABEL.len() + 2 * Uid::LEN);
        info.extend_from_slice(DIRECTION_LABEL);
        info.extend_from_slice(sender.as_bytes());
        info.extend_from_slice(recipient.as_bytes());

        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        let Ok(()) = hkdf.expand(&info, &mut key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        SymmetricKey::from_bytes(key)
    }
}

impl fmt::Debug for ChannelSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChannelSeed(..)")
    }
}

impl Drop for ChannelSeed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([byte; 32])
    }

    #[test]
    fn seed_is_deterministic() {
        let (k1, k2) = (key(1), key(2));
        assert_eq!(ChannelSeed::from_keys(&[&k1, &k2]), ChannelSeed::from_keys(&[&k1, &k2]));
    }

    #[test]
    fn key_order_matters() {
        let (k1, k2) = (key(1), key(2));
        assert_ne!(ChannelSeed::from_keys(&[&k1, &k2]), ChannelSeed::from_keys(&[&k2, &k1]));
    }

    #[test]
    fn each_key_contributes() {
        let (k1, k2, k3) = (key(1), key(2), key(3));
        let base = ChannelSeed::from_keys(&[&k1, &k2]);
        assert_ne!(base, ChannelSeed::from_keys(&[&k3, &k2]));
        assert_ne!(base, ChannelSeed::from_keys(&[&k1, &k3]));
    }

    #[test]
    fn directions_differ() {
        let seed = ChannelSeed::from_keys(&[&key(1), &key(2)]);
        let (a, b) = (Uid::from_bytes([0xa; 32]), Uid::from_bytes([0xb; 32]));
        assert_ne!(seed.directional_key(&a, &b), seed.directional_key(&b, &a));
        assert_eq!(seed.directional_key(&a, &b), seed.directional_key(&a, &b));
    }
}
