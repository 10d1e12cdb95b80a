//! Decoding errors.

use thiserror::Error;

use crate::Tag;

/// Result alias for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Failure to interpret bytes or an encoded value as a requested type.
///
/// Every variant means "reject this value". Decoding never guesses intent
/// and never coerces between tags.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the fixed value header
    #[error("value too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Tag byte is not assigned
    #[error("unknown tag byte {0:#04x}")]
    UnknownTag(u8),

    /// Declared payload length disagrees with the available bytes
    #[error("length mismatch: header declares {declared} payload bytes, {available} available")]
    LengthMismatch {
        /// Length from the header
        declared: usize,
        /// Payload bytes actually present
        available: usize,
    },

    /// Bytes after a padded value are not all zero
    #[error("non-zero padding after encoded value")]
    InvalidPadding,

    /// Value has a different tag than the requested type
    #[error("tag mismatch: expected {expected}, got {actual}")]
    TagMismatch {
        /// Tag of the requested type
        expected: Tag,
        /// Tag of the value
        actual: Tag,
    },

    /// Fixed-width payload has the wrong size
    #[error("invalid width for {kind}: expected {expected} bytes, got {actual}")]
    InvalidWidth {
        /// Type being decoded
        kind: &'static str,
        /// Required payload size
        expected: usize,
        /// Actual payload size
        actual: usize,
    },

    /// Boolean payload byte is neither `0x00` nor `0x01`
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// List payload ends in the middle of an element
    #[error("truncated list element at payload offset {offset}")]
    TruncatedElement {
        /// Offset of the incomplete element within the list payload
        offset: usize,
    },

    /// List has the wrong number of elements for a fixed-arity decode
    #[error("arity mismatch: expected {expected} elements, got {actual}")]
    ArityMismatch {
        /// Required element count
        expected: usize,
        /// Element count found
        actual: usize,
    },

    /// Dictionary has an odd number of elements
    #[error("dictionary has an odd number of elements ({0})")]
    OddDictionary(usize),

    /// Dictionary key appears more than once
    #[error("duplicate dictionary key ({} bytes)", key.len())]
    DuplicateKey {
        /// The repeated key
        key: Vec<u8>,
    },

    /// Integer does not fit the requested type
    #[error("integer {value} out of range for {target}")]
    OutOfRange {
        /// Decoded 64-bit value
        value: i64,
        /// Requested type
        target: &'static str,
    },

    /// Byte string is not valid UTF-8
    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    /// Payload exceeds the configured maximum
    #[error("payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Declared payload size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Lists nested deeper than the configured maximum
    #[error("nesting depth exceeds maximum {max}")]
    TooDeep {
        /// Configured limit
        max: usize,
    },

    /// Cryptographic key payload has the wrong class, implementation or size
    #[error("invalid key encoding: {reason}")]
    InvalidKey {
        /// What was wrong
        reason: String,
    },

    /// Integer identifier does not name a known variant
    #[error("unknown {what} id {id}")]
    UnknownId {
        /// Kind of identifier (state, message, protocol, ...)
        what: &'static str,
        /// The decoded value
        id: i64,
    },
}

impl DecodeError {
    /// Build an `InvalidKey` error.
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey { reason: reason.into() }
    }

    /// Whether this error came from structural framing (header, lengths,
    /// nesting) rather than from interpreting a well-framed value.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::TooShort { .. }
                | Self::UnknownTag(_)
                | Self::LengthMismatch { .. }
                | Self::InvalidPadding
                | Self::TruncatedElement { .. }
                | Self::PayloadTooLarge { .. }
                | Self::TooDeep { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_classification() {
        assert!(DecodeError::UnknownTag(0x42).is_framing());
        assert!(DecodeError::TruncatedElement { offset: 3 }.is_framing());
        assert!(!DecodeError::InvalidBool(2).is_framing());
        assert!(
            !DecodeError::TagMismatch { expected: Tag::Int, actual: Tag::Bool }.is_framing()
        );
    }

    #[test]
    fn messages_name_the_problem() {
        let err = DecodeError::TagMismatch { expected: Tag::Bool, actual: Tag::Bytes };
        assert_eq!(err.to_string(), "tag mismatch: expected bool, got bytes");

        let err = DecodeError::ArityMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "arity mismatch: expected 3 elements, got 2");
    }
}
