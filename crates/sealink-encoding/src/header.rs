//! Value header with zero-copy parsing.
//!
//! Every encoded value starts with a fixed 5-byte header: one tag byte and a
//! big-endian `u32` payload length. The header is cast directly from the
//! input buffer; the payload is never copied to read it.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Tag,
    errors::{DecodeError, Result},
};

/// Fixed 5-byte value header (Big Endian)
///
/// Fields are raw byte arrays so the struct has alignment 1 and every 5-byte
/// pattern is a valid header. Tag validity is checked by [`Self::tag`], not
/// by the cast.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ValueHeader {
    tag: u8,
    length: [u8; 4],
}

impl ValueHeader {
    /// Size of the serialized header
    pub const SIZE: usize = 5;

    /// Create a header for a payload of `length` bytes.
    #[must_use]
    pub fn new(tag: Tag, length: u32) -> Self {
        Self { tag: tag.to_u8(), length: length.to_be_bytes() }
    }

    /// Cast the first [`Self::SIZE`] bytes of `bytes` to a header.
    ///
    /// # Errors
    ///
    /// `DecodeError::TooShort` if fewer than 5 bytes are available. The tag
    /// byte is not validated here.
    pub fn from_prefix(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| DecodeError::TooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Raw tag byte.
    #[must_use]
    pub fn raw_tag(&self) -> u8 {
        self.tag
    }

    /// Validated tag.
    ///
    /// # Errors
    ///
    /// `DecodeError::UnknownTag` for unassigned tag bytes.
    pub fn tag(&self) -> Result<Tag> {
        Tag::from_u8(self.tag).ok_or(DecodeError::UnknownTag(self.tag))
    }

    /// Declared payload length.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_be_bytes(self.length)
    }

    /// Header as wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }
}

impl std::fmt::Debug for ValueHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueHeader")
            .field("tag", &format_args!("{:#04x}", self.raw_tag()))
            .field("length", &self.length())
            .finish()
    }
}
