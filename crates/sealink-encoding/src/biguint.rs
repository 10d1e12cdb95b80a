//! Arbitrary-precision unsigned integers.
//!
//! Only the encoding matters here, so the integer is kept as its normalized
//! big-endian magnitude. Arithmetic is left to the callers that need it.

use crate::{
    Decode, Encode, EncodedValue, Tag,
    errors::Result,
};

/// Unsigned integer stored as a big-endian magnitude with no leading zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnsignedBigInt {
    magnitude: Vec<u8>,
}

impl UnsignedBigInt {
    /// Build from big-endian bytes. Leading zeros are ignored.
    #[must_use]
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Self { magnitude: bytes[start..].to_vec() }
    }

    /// Minimal big-endian bytes. Zero is a single `0x00` byte.
    #[must_use]
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.magnitude.is_empty() { vec![0] } else { self.magnitude.clone() }
    }

    /// Whether the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Number of significant bytes (zero has none).
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.magnitude.len()
    }

    /// Encode left-padded to exactly `inner_length` payload bytes.
    ///
    /// Fixed-width encodings keep sizes independent of the value, which
    /// matters when the integer is secret. Returns `None` if the value needs
    /// more than `inner_length` bytes.
    #[must_use]
    pub fn encode_with_inner_length(&self, inner_length: usize) -> Option<EncodedValue> {
        let padding = inner_length.checked_sub(self.magnitude.len())?;
        let mut payload = vec![0u8; padding];
        payload.extend_from_slice(&self.magnitude);
        Some(EncodedValue::new(Tag::UnsignedBigInt, payload))
    }
}

impl From<u128> for UnsignedBigInt {
    fn from(value: u128) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

impl From<u64> for UnsignedBigInt {
    fn from(value: u64) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

impl Encode for UnsignedBigInt {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::UnsignedBigInt, self.to_be_bytes())
    }
}

impl Decode for UnsignedBigInt {
    fn decode(value: &EncodedValue) -> Result<Self> {
        Ok(Self::from_be_bytes(value.payload_of(Tag::UnsignedBigInt)?))
    }
}
