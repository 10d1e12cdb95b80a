//! Fixed-arity list decoding.
//!
//! Protocol messages and states store their fields positionally in a list.
//! Decoding such a list into a tuple requires exactly as many elements as the
//! tuple has fields; field order is part of the wire contract.

use crate::{
    Decode, Encode, EncodedValue,
    errors::{DecodeError, Result},
};

/// Tuples decodable from a list of exactly [`Self::ARITY`] elements.
pub trait DecodeTuple: Sized {
    /// Number of elements required.
    const ARITY: usize;

    /// Decode from already-split list elements.
    ///
    /// # Errors
    ///
    /// `DecodeError::ArityMismatch` when `items.len() != ARITY`, otherwise
    /// the first element decode failure.
    fn decode_tuple(items: &[EncodedValue]) -> Result<Self>;
}

macro_rules! impl_tuple {
    ($arity:literal; $($ty:ident $var:ident $idx:tt),+) => {
        impl<$($ty: Encode),+> Encode for ($($ty,)+) {
            fn encode(&self) -> EncodedValue {
                EncodedValue::list([$(self.$idx.encode()),+])
            }
        }

        impl<$($ty: Decode),+> DecodeTuple for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn decode_tuple(items: &[EncodedValue]) -> Result<Self> {
                let [$($var),+] = items else {
                    return Err(DecodeError::ArityMismatch {
                        expected: Self::ARITY,
                        actual: items.len(),
                    });
                };
                Ok(($($ty::decode($var)?,)+))
            }
        }

        impl<$($ty: Decode),+> Decode for ($($ty,)+) {
            fn decode(value: &EncodedValue) -> Result<Self> {
                Self::decode_tuple(&value.as_list()?)
            }
        }
    };
}

impl_tuple!(1; A a 0);
impl_tuple!(2; A a 0, B b 1);
impl_tuple!(3; A a 0, B b 1, C c 2);
impl_tuple!(4; A a 0, B b 1, C c 2, D d 3);
impl_tuple!(5; A a 0, B b 1, C c 2, D d 3, E e 4);
impl_tuple!(6; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);
impl_tuple!(7; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6);
impl_tuple!(8; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7);
