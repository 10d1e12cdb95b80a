//! Encoded values.
//!
//! An [`EncodedValue`] is the unit every other layer exchanges: a tag plus an
//! opaque payload. Lists are decoded lazily, one level at a time, by slicing
//! `tag || length || payload` triples out of the list payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Decode, DecodeTuple, Tag, ValueHeader,
    errors::{DecodeError, Result},
};

/// Bounds applied when parsing untrusted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum list/dictionary nesting depth (the outermost value is depth 0).
    pub max_depth: usize,
    /// Maximum payload size of any single value.
    pub max_payload_size: usize,
}

impl DecodeLimits {
    /// Default maximum nesting depth.
    pub const DEFAULT_MAX_DEPTH: usize = 32;

    /// Default maximum payload size (16 MB).
    pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_payload_size: Self::DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// A tagged, length-delimited value.
///
/// The length is implicit in the payload, so `length == payload.len()` holds
/// by construction. Cloning is cheap: payloads are reference-counted and
/// list elements share the parent buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedValue {
    tag: Tag,
    payload: Bytes,
}

impl EncodedValue {
    /// Create a value from a tag and payload.
    pub fn new(tag: Tag, payload: impl Into<Bytes>) -> Self {
        Self { tag, payload: payload.into() }
    }

    /// The encoding of an empty list.
    #[must_use]
    pub fn empty_list() -> Self {
        Self { tag: Tag::List, payload: Bytes::new() }
    }

    /// Build a list from already-encoded elements.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut payload = BytesMut::new();
        for item in items {
            item.encode_into(&mut payload);
        }
        Self { tag: Tag::List, payload: payload.freeze() }
    }

    /// Value tag.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Raw payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Total size of the wire encoding (header plus payload).
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        ValueHeader::SIZE + self.payload.len()
    }

    /// Payload of a value that must carry `expected`.
    ///
    /// # Errors
    ///
    /// `DecodeError::TagMismatch` if the tag differs.
    pub fn payload_of(&self, expected: Tag) -> Result<&Bytes> {
        if self.tag == expected {
            Ok(&self.payload)
        } else {
            Err(DecodeError::TagMismatch { expected, actual: self.tag })
        }
    }

    /// Write the wire encoding into `dst`.
    pub fn encode_into(&self, dst: &mut impl BufMut) {
        // INVARIANT: values are built from in-memory protocol fields; no
        // single payload approaches 4 GiB.
        #[allow(clippy::expect_used)]
        let length = u32::try_from(self.payload.len()).expect("payload length exceeds u32");

        dst.put_slice(&ValueHeader::new(self.tag, length).to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Wire encoding as a byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Parse exactly one value occupying all of `raw`, with default limits.
    ///
    /// # Errors
    ///
    /// See [`Self::from_bytes_with_limits`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limits(raw, &DecodeLimits::default())
    }

    /// Parse exactly one value occupying all of `raw`.
    ///
    /// Nested lists and dictionaries are walked once to enforce `limits`, so a
    /// value accepted here can be taken apart with [`Self::as_list`] without
    /// framing surprises.
    ///
    /// # Errors
    ///
    /// - `DecodeError::TooShort` if `raw` is shorter than a header
    /// - `DecodeError::UnknownTag` for unassigned tag bytes
    /// - `DecodeError::LengthMismatch` if the declared length differs from the
    ///   bytes that follow the header (trailing bytes included)
    /// - `DecodeError::PayloadTooLarge` / `DecodeError::TooDeep` when `limits`
    ///   are exceeded
    /// - `DecodeError::TruncatedElement` for malformed nested lists
    pub fn from_bytes_with_limits(raw: &[u8], limits: &DecodeLimits) -> Result<Self> {
        let (value, consumed) = Self::parse_prefix(raw, limits)?;
        if consumed != raw.len() {
            return Err(DecodeError::LengthMismatch {
                declared: consumed - ValueHeader::SIZE,
                available: raw.len() - ValueHeader::SIZE,
            });
        }
        value.check_nesting(limits, 0)?;
        Ok(value)
    }

    /// Parse one value followed only by zero bytes.
    ///
    /// Storage layers pad values to fixed block sizes; the padding is
    /// stripped here.
    ///
    /// # Errors
    ///
    /// As [`Self::from_bytes`], plus `DecodeError::InvalidPadding` when a
    /// trailing byte is non-zero.
    pub fn from_padded_bytes(raw: &[u8]) -> Result<Self> {
        let limits = DecodeLimits::default();
        let (value, consumed) = Self::parse_prefix(raw, &limits)?;
        if raw[consumed..].iter().any(|&b| b != 0) {
            return Err(DecodeError::InvalidPadding);
        }
        value.check_nesting(&limits, 0)?;
        Ok(value)
    }

    fn parse_prefix(raw: &[u8], limits: &DecodeLimits) -> Result<(Self, usize)> {
        let header = ValueHeader::from_prefix(raw)?;
        let tag = header.tag()?;
        let declared = header.length() as usize;

        if declared > limits.max_payload_size {
            return Err(DecodeError::PayloadTooLarge {
                size: declared,
                max: limits.max_payload_size,
            });
        }

        let available = raw.len() - ValueHeader::SIZE;
        if declared > available {
            return Err(DecodeError::LengthMismatch { declared, available });
        }

        let end = ValueHeader::SIZE + declared;
        let payload = Bytes::copy_from_slice(&raw[ValueHeader::SIZE..end]);
        Ok((Self { tag, payload }, end))
    }

    fn check_nesting(&self, limits: &DecodeLimits, depth: usize) -> Result<()> {
        if !self.tag.is_container() {
            return Ok(());
        }
        if depth >= limits.max_depth {
            return Err(DecodeError::TooDeep { max: limits.max_depth });
        }
        for item in split_elements(&self.payload)? {
            if item.len() > limits.max_payload_size {
                return Err(DecodeError::PayloadTooLarge {
                    size: item.len(),
                    max: limits.max_payload_size,
                });
            }
            item.check_nesting(limits, depth + 1)?;
        }
        Ok(())
    }

    /// Elements of a list value.
    ///
    /// # Errors
    ///
    /// `DecodeError::TagMismatch` if this is not a list, or a framing error
    /// if the payload does not split into whole elements.
    pub fn as_list(&self) -> Result<Vec<Self>> {
        let payload = self.payload_of(Tag::List)?;
        split_elements(payload)
    }

    /// Decode as `T`.
    ///
    /// # Errors
    ///
    /// Whatever `T::decode` reports.
    pub fn decode<T: Decode>(&self) -> Result<T> {
        T::decode(self)
    }

    /// Decode a list of exactly N elements into an N-tuple.
    ///
    /// # Errors
    ///
    /// `DecodeError::ArityMismatch` if the list length is not the tuple
    /// arity, or the first element decode failure.
    pub fn decode_tuple<T: DecodeTuple>(&self) -> Result<T> {
        T::decode_tuple(&self.as_list()?)
    }
}

/// Split a list or dictionary payload into its elements.
///
/// Elements share `payload`'s buffer.
pub(crate) fn split_elements(payload: &Bytes) -> Result<Vec<EncodedValue>> {
    let mut items = Vec::new();
    let mut offset = 0;

    while offset < payload.len() {
        let rest = &payload[offset..];
        let header =
            ValueHeader::from_prefix(rest).map_err(|_| DecodeError::TruncatedElement { offset })?;
        let tag = header.tag()?;
        let start = offset + ValueHeader::SIZE;
        let end = start
            .checked_add(header.length() as usize)
            .filter(|&end| end <= payload.len())
            .ok_or(DecodeError::TruncatedElement { offset })?;

        items.push(EncodedValue { tag, payload: payload.slice(start..end) });
        offset = end;
    }

    Ok(items)
}

impl std::fmt::Debug for EncodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const PREVIEW: usize = 16;
        let shown = &self.payload[..self.payload.len().min(PREVIEW)];
        let mut hex = String::with_capacity(shown.len() * 2);
        for byte in shown {
            hex.push_str(&format!("{byte:02x}"));
        }
        if self.payload.len() > PREVIEW {
            hex.push_str("..");
        }
        f.debug_struct("EncodedValue")
            .field("tag", &self.tag)
            .field("len", &self.payload.len())
            .field("payload", &format_args!("{hex}"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_bytes_prefixes_header() {
        let value = EncodedValue::new(Tag::Bytes, vec![0x00]);
        assert_eq!(value.to_bytes(), vec![0x00, 0, 0, 0, 1, 0x00]);
    }

    #[test]
    fn from_bytes_exact() {
        let raw = [0x02, 0, 0, 0, 1, 0x01];
        let value = EncodedValue::from_bytes(&raw).expect("valid");
        assert_eq!(value.tag(), Tag::Bool);
        assert_eq!(value.payload().as_ref(), &[0x01]);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let raw = [0x02, 0, 0, 0, 1, 0x01, 0x00];
        assert_eq!(
            EncodedValue::from_bytes(&raw),
            Err(DecodeError::LengthMismatch { declared: 1, available: 2 })
        );
    }

    #[test]
    fn short_payload_rejected() {
        let raw = [0x00, 0, 0, 0, 4, 0xaa, 0xbb];
        assert_eq!(
            EncodedValue::from_bytes(&raw),
            Err(DecodeError::LengthMismatch { declared: 4, available: 2 })
        );
    }

    #[test]
    fn padded_bytes_accept_zero_tail() {
        let raw = [0x02, 0, 0, 0, 1, 0x01, 0, 0, 0, 0];
        let value = EncodedValue::from_padded_bytes(&raw).expect("zero padding");
        assert_eq!(value.to_bytes(), raw[..6].to_vec());
    }

    #[test]
    fn padded_bytes_reject_non_zero_tail() {
        let raw = [0x02, 0, 0, 0, 1, 0x01, 0, 7];
        assert_eq!(EncodedValue::from_padded_bytes(&raw), Err(DecodeError::InvalidPadding));
    }

    #[test]
    fn list_payload_is_concatenation() {
        let a = EncodedValue::new(Tag::Bytes, vec![1, 2, 3, 4]);
        let list = EncodedValue::list([a.clone()]);

        assert_eq!(list.to_bytes(), vec![0x03, 0, 0, 0, 9, 0x00, 0, 0, 0, 4, 1, 2, 3, 4]);
        assert_eq!(list.as_list(), Ok(vec![a]));
    }

    #[test]
    fn empty_list_has_no_elements() {
        let list = EncodedValue::empty_list();
        assert_eq!(list.to_bytes(), vec![0x03, 0, 0, 0, 0]);
        assert_eq!(list.as_list(), Ok(vec![]));
    }

    #[test]
    fn truncated_trailing_element_rejected() {
        // second element declares 4 payload bytes but only 2 follow
        let payload = vec![0x02, 0, 0, 0, 1, 0x01, 0x00, 0, 0, 0, 4, 0xaa, 0xbb];
        let list = EncodedValue::new(Tag::List, payload);
        assert_eq!(list.as_list(), Err(DecodeError::TruncatedElement { offset: 6 }));
    }

    #[test]
    fn partial_header_in_list_rejected() {
        let list = EncodedValue::new(Tag::List, vec![0x01, 0, 0]);
        assert_eq!(list.as_list(), Err(DecodeError::TruncatedElement { offset: 0 }));
    }

    #[test]
    fn as_list_requires_list_tag() {
        let value = EncodedValue::new(Tag::Bytes, vec![]);
        assert_eq!(
            value.as_list(),
            Err(DecodeError::TagMismatch { expected: Tag::List, actual: Tag::Bytes })
        );
    }

    #[test]
    fn nesting_limit_enforced() {
        let mut value = EncodedValue::empty_list();
        for _ in 0..4 {
            value = EncodedValue::list([value]);
        }
        let raw = value.to_bytes();

        let tight = DecodeLimits { max_depth: 4, ..DecodeLimits::default() };
        assert_eq!(
            EncodedValue::from_bytes_with_limits(&raw, &tight),
            Err(DecodeError::TooDeep { max: 4 })
        );

        let loose = DecodeLimits { max_depth: 5, ..DecodeLimits::default() };
        assert_eq!(EncodedValue::from_bytes_with_limits(&raw, &loose), Ok(value));
    }

    #[test]
    fn payload_limit_enforced() {
        let raw = EncodedValue::new(Tag::Bytes, vec![0u8; 64]).to_bytes();
        let limits = DecodeLimits { max_payload_size: 63, ..DecodeLimits::default() };
        assert_eq!(
            EncodedValue::from_bytes_with_limits(&raw, &limits),
            Err(DecodeError::PayloadTooLarge { size: 64, max: 63 })
        );
    }

    #[test]
    fn malformed_nested_list_rejected_at_parse() {
        let inner = EncodedValue::new(Tag::List, vec![0x01, 0, 0]);
        let raw = EncodedValue::list([inner]).to_bytes();
        assert_eq!(
            EncodedValue::from_bytes(&raw),
            Err(DecodeError::TruncatedElement { offset: 0 })
        );
    }
}
