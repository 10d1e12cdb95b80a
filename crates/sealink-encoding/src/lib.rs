//! Sealink value encoding.
//!
//! A self-describing tag-length-value format used for every value that
//! crosses a wire, a disk, or a protocol boundary:
//!
//! ```text
//! +--------+------------------+-----------------+
//! | tag u8 | length u32 (BE)  | payload         |
//! +--------+------------------+-----------------+
//! ```
//!
//! Lists are the concatenation of fully encoded elements. Dictionaries are
//! lists of alternating byte-string keys and values with unique keys.
//!
//! # Components
//!
//! - [`EncodedValue`]: tagged value with zero-copy header parsing
//! - [`Encode`] / [`Decode`]: typed contracts (total encode, partial decode)
//! - [`DecodeTuple`]: fixed-arity positional decoding for messages and states
//! - [`Dictionary`], [`UnsignedBigInt`], [`Uid`]: domain value types

#![forbid(unsafe_code)]

pub mod biguint;
pub mod codec;
pub mod dictionary;
pub mod errors;
pub mod header;
pub mod tag;
pub mod time;
pub mod tuple;
pub mod uid;
pub mod value;

pub use biguint::UnsignedBigInt;
pub use codec::{Decode, Encode, decode_list, encode_list, fixed_payload};
pub use dictionary::Dictionary;
pub use errors::{DecodeError, Result};
pub use header::ValueHeader;
pub use tag::Tag;
pub use time::{MICROS_PER_SECOND, from_unix_micros, to_unix_micros};
pub use tuple::DecodeTuple;
pub use uid::Uid;
pub use value::{DecodeLimits, EncodedValue};
