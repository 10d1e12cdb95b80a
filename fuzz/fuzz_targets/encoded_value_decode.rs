//! Fuzz target for `EncodedValue` parsing
//!
//! Arbitrary bytes must never panic the parser or anything that takes an
//! accepted value apart.
//!
//! # Invariants
//!
//! - An accepted value re-encodes to exactly the input bytes
//! - Every element of an accepted list is itself a complete value
//! - Padded parsing accepts whatever strict parsing accepts

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealink_encoding::{Dictionary, EncodedValue, Tag, UnsignedBigInt};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = EncodedValue::from_bytes(data) else {
        return;
    };

    assert_eq!(value.to_bytes(), data, "accepted value must re-encode byte for byte");
    assert_eq!(EncodedValue::from_padded_bytes(data).as_ref(), Ok(&value));

    match value.tag() {
        Tag::List => {
            if let Ok(items) = value.as_list() {
                let total: usize = items.iter().map(EncodedValue::encoded_len).sum();
                assert_eq!(total, value.len());
            }
        },
        Tag::Dictionary => {
            let _ = value.decode::<Dictionary>();
        },
        Tag::UnsignedBigInt => {
            let _ = value.decode::<UnsignedBigInt>();
        },
        _ => {
            let _ = value.decode::<i64>();
            let _ = value.decode::<bool>();
            let _ = value.decode::<String>();
        },
    }
});
