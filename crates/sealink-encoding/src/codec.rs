//! Typed encode/decode contracts.
//!
//! `Encode` is total: every value of an implementing type has an encoding.
//! `Decode` is partial: it checks the tag first, then the payload shape, and
//! rejects anything that does not match exactly.

use bytes::Bytes;
use uuid::Uuid;

use crate::{
    EncodedValue, Tag,
    errors::{DecodeError, Result},
};

/// Types with a canonical encoding.
pub trait Encode {
    /// Encode `self`.
    fn encode(&self) -> EncodedValue;
}

/// Types that can be recovered from an encoded value.
pub trait Decode: Sized {
    /// Decode from `value`.
    ///
    /// # Errors
    ///
    /// A `DecodeError` when the tag or payload shape does not match.
    fn decode(value: &EncodedValue) -> Result<Self>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> EncodedValue {
        (**self).encode()
    }
}

impl Encode for EncodedValue {
    fn encode(&self) -> EncodedValue {
        self.clone()
    }
}

impl Decode for EncodedValue {
    fn decode(value: &EncodedValue) -> Result<Self> {
        Ok(value.clone())
    }
}

/// Payload of `value`, which must carry `tag` and exactly `N` bytes.
///
/// # Errors
///
/// `TagMismatch` or `InvalidWidth`.
pub fn fixed_payload<const N: usize>(
    value: &EncodedValue,
    tag: Tag,
    kind: &'static str,
) -> Result<[u8; N]> {
    let payload = value.payload_of(tag)?;
    <[u8; N]>::try_from(payload.as_ref()).map_err(|_| DecodeError::InvalidWidth {
        kind,
        expected: N,
        actual: payload.len(),
    })
}

impl Encode for bool {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::Bool, vec![u8::from(*self)])
    }
}

impl Decode for bool {
    fn decode(value: &EncodedValue) -> Result<Self> {
        match fixed_payload::<1>(value, Tag::Bool, "bool")? {
            [0x00] => Ok(false),
            [0x01] => Ok(true),
            [other] => Err(DecodeError::InvalidBool(other)),
        }
    }
}

impl Encode for i64 {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::Int, self.to_be_bytes().to_vec())
    }
}

impl Decode for i64 {
    fn decode(value: &EncodedValue) -> Result<Self> {
        fixed_payload::<8>(value, Tag::Int, "int").map(i64::from_be_bytes)
    }
}

/// Integers narrower than the wire width go through `i64`.
macro_rules! impl_narrow_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self) -> EncodedValue {
                    i64::from(*self).encode()
                }
            }

            impl Decode for $ty {
                fn decode(value: &EncodedValue) -> Result<Self> {
                    let wide = i64::decode(value)?;
                    <$ty>::try_from(wide).map_err(|_| DecodeError::OutOfRange {
                        value: wide,
                        target: stringify!($ty),
                    })
                }
            }
        )+
    };
}

impl_narrow_int!(i32, u16, u32);

impl Encode for usize {
    fn encode(&self) -> EncodedValue {
        // usize values used on the wire are counts and indices well below
        // i64::MAX; saturate rather than wrap if that ever changes.
        i64::try_from(*self).unwrap_or(i64::MAX).encode()
    }
}

impl Decode for usize {
    fn decode(value: &EncodedValue) -> Result<Self> {
        let wide = i64::decode(value)?;
        Self::try_from(wide).map_err(|_| DecodeError::OutOfRange { value: wide, target: "usize" })
    }
}

impl Encode for str {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::Bytes, Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl Encode for String {
    fn encode(&self) -> EncodedValue {
        self.as_str().encode()
    }
}

impl Decode for String {
    fn decode(value: &EncodedValue) -> Result<Self> {
        let payload = value.payload_of(Tag::Bytes)?;
        Self::from_utf8(payload.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}

impl Encode for [u8] {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::Bytes, Bytes::copy_from_slice(self))
    }
}

impl Encode for Vec<u8> {
    fn encode(&self) -> EncodedValue {
        self.as_slice().encode()
    }
}

impl Decode for Vec<u8> {
    fn decode(value: &EncodedValue) -> Result<Self> {
        Ok(value.payload_of(Tag::Bytes)?.to_vec())
    }
}

impl Encode for Bytes {
    fn encode(&self) -> EncodedValue {
        EncodedValue::new(Tag::Bytes, self.clone())
    }
}

impl Decode for Bytes {
    fn decode(value: &EncodedValue) -> Result<Self> {
        value.payload_of(Tag::Bytes).cloned()
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self) -> EncodedValue {
        self.as_slice().encode()
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(value: &EncodedValue) -> Result<Self> {
        fixed_payload::<N>(value, Tag::Bytes, "byte array")
    }
}

impl Encode for Uuid {
    fn encode(&self) -> EncodedValue {
        self.as_bytes().encode()
    }
}

impl Decode for Uuid {
    fn decode(value: &EncodedValue) -> Result<Self> {
        fixed_payload::<16>(value, Tag::Bytes, "uuid").map(Self::from_bytes)
    }
}

/// Homogeneous lists. `Vec<u8>` is a byte string, not a list of integers.
macro_rules! impl_list {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Encode for Vec<$ty> {
                fn encode(&self) -> EncodedValue {
                    EncodedValue::list(self.iter().map(Encode::encode))
                }
            }

            impl Decode for Vec<$ty> {
                fn decode(value: &EncodedValue) -> Result<Self> {
                    value.as_list()?.iter().map(<$ty>::decode).collect()
                }
            }
        )+
    };
}

impl_list!(
    EncodedValue,
    bool,
    i64,
    i32,
    u16,
    u32,
    String,
    Vec<u8>,
    Bytes,
    Uuid,
    crate::Uid,
    crate::UnsignedBigInt,
    crate::Dictionary,
);

/// Encode a slice of encodable items as a list.
pub fn encode_list<T: Encode>(items: &[T]) -> EncodedValue {
    EncodedValue::list(items.iter().map(Encode::encode))
}

/// Decode every element of a list value as `T`.
///
/// # Errors
///
/// `TagMismatch` if `value` is not a list, or the first element failure.
pub fn decode_list<T: Decode>(value: &EncodedValue) -> Result<Vec<T>> {
    value.as_list()?.iter().map(T::decode).collect()
}
