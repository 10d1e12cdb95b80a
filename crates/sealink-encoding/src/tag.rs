//! Value tags.
//!
//! The first byte of every encoded value names its semantic kind. Tags are
//! part of the wire contract and are never renumbered.

use std::fmt;

/// Semantic kind of an encoded value.
///
/// Tags below `0x80` are structural primitives. `0x80` and above are
/// domain kinds (big integers and cryptographic material) whose payload
/// format is defined by the type that owns them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// Raw byte string. UTF-8 strings use this tag too.
    Bytes = 0x00,
    /// 64-bit signed integer, 8 bytes big-endian two's complement.
    Int = 0x01,
    /// Boolean, exactly one byte `0x00` or `0x01`.
    Bool = 0x02,
    /// Concatenation of full element encodings.
    List = 0x03,
    /// Alternating key/value elements with unique byte-string keys.
    Dictionary = 0x04,
    /// Variable-width big-endian magnitude.
    UnsignedBigInt = 0x80,
    /// Symmetric key material.
    SymmetricKey = 0x90,
    /// Public key (encryption or signature verification).
    PublicKey = 0x91,
    /// Private key.
    PrivateKey = 0x92,
    /// Detached signature.
    Signature = 0x93,
}

impl Tag {
    /// All known tags, in byte order.
    pub const ALL: [Self; 10] = [
        Self::Bytes,
        Self::Int,
        Self::Bool,
        Self::List,
        Self::Dictionary,
        Self::UnsignedBigInt,
        Self::SymmetricKey,
        Self::PublicKey,
        Self::PrivateKey,
        Self::Signature,
    ];

    /// Convert from a wire byte. Returns `None` for unassigned bytes.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Bytes),
            0x01 => Some(Self::Int),
            0x02 => Some(Self::Bool),
            0x03 => Some(Self::List),
            0x04 => Some(Self::Dictionary),
            0x80 => Some(Self::UnsignedBigInt),
            0x90 => Some(Self::SymmetricKey),
            0x91 => Some(Self::PublicKey),
            0x92 => Some(Self::PrivateKey),
            0x93 => Some(Self::Signature),
            _ => None,
        }
    }

    /// Wire byte for this tag.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether values with this tag carry nested encoded values.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Dictionary)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bytes => "bytes",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dictionary => "dictionary",
            Self::UnsignedBigInt => "unsigned-big-int",
            Self::SymmetricKey => "symmetric-key",
            Self::PublicKey => "public-key",
            Self::PrivateKey => "private-key",
            Self::Signature => "signature",
        };
        f.write_str(name)
    }
}
