//! 32-byte random identifiers.
//!
//! Device identifiers and protocol instance identifiers are `Uid`s. They are
//! totally ordered by their bytes; channel creation uses that order to decide
//! which device drives the key exchange.

use std::fmt;

use rand::{CryptoRng, RngCore};

use crate::{
    Decode, Encode, EncodedValue, Tag,
    codec::fixed_payload,
    errors::Result,
};

/// A 256-bit random identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uid([u8; 32]);

impl Uid {
    /// Identifier length in bytes.
    pub const LEN: usize = 32;

    /// Wrap raw identifier bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh random identifier.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; Self::LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Short hex prefix for log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex_prefix(&self.0[..4])
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.short())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_prefix(&self.0))
    }
}

impl Encode for Uid {
    fn encode(&self) -> EncodedValue {
        self.0.encode()
    }
}

impl Decode for Uid {
    fn decode(value: &EncodedValue) -> Result<Self> {
        fixed_payload::<{ Self::LEN }>(value, Tag::Bytes, "uid").map(Self)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::DecodeError;

    #[test]
    fn ordering_follows_bytes() {
        let mut low = [0u8; 32];
        let mut high = [0u8; 32];
        low[31] = 1;
        high[0] = 1;
        assert!(Uid::from_bytes(low) < Uid::from_bytes(high));
    }

    #[test]
    fn random_is_seed_deterministic() {
        let a = Uid::random(&mut StdRng::seed_from_u64(7));
        let b = Uid::random(&mut StdRng::seed_from_u64(7));
        let c = Uid::random(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn decode_requires_32_bytes() {
        let short = EncodedValue::new(Tag::Bytes, vec![0u8; 31]);
        assert_eq!(
            Uid::decode(&short),
            Err(DecodeError::InvalidWidth { kind: "uid", expected: 32, actual: 31 })
        );
    }

    #[test]
    fn display_is_full_hex() {
        let uid = Uid::from_bytes([0xab; 32]);
        assert_eq!(uid.to_string().len(), 64);
        assert_eq!(format!("{uid:?}"), "Uid(abababab)");
    }
}
