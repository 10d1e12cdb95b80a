//! Dictionaries: byte-string keys mapped to encoded values.
//!
//! On the wire a dictionary is tagged `Dictionary` and its payload is a
//! sequence of alternating key and value encodings. Keys are unique. Encoding
//! emits entries in key order so equal dictionaries have equal bytes.

use std::collections::{BTreeMap, btree_map};

use crate::{
    Decode, Encode, EncodedValue, Tag,
    errors::{DecodeError, Result},
    value::split_elements,
};

/// An ordered map from byte-string keys to encoded values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: BTreeMap<Vec<u8>, EncodedValue>,
}

impl Dictionary {
    /// Empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: &impl Encode) -> Option<EncodedValue> {
        self.entries.insert(key.into(), value.encode())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<Vec<u8>>, value: &impl Encode) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&EncodedValue> {
        self.entries.get(key)
    }

    /// Decode the value under `key`, if present.
    ///
    /// # Errors
    ///
    /// The decode failure of a present value.
    pub fn get_decoded<T: Decode>(&self, key: &[u8]) -> Result<Option<T>> {
        self.entries.get(key).map(T::decode).transpose()
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &[u8]) -> Option<EncodedValue> {
        self.entries.remove(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, EncodedValue> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a EncodedValue);
    type IntoIter = btree_map::Iter<'a, Vec<u8>, EncodedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Encode for Dictionary {
    fn encode(&self) -> EncodedValue {
        let list = EncodedValue::list(
            self.entries.iter().flat_map(|(key, value)| [key.encode(), value.clone()]),
        );
        EncodedValue::new(Tag::Dictionary, list.payload().clone())
    }
}

impl Decode for Dictionary {
    fn decode(value: &EncodedValue) -> Result<Self> {
        let items = split_elements(value.payload_of(Tag::Dictionary)?)?;
        if items.len() % 2 != 0 {
            return Err(DecodeError::OddDictionary(items.len()));
        }

        let mut entries = BTreeMap::new();
        for pair in items.chunks_exact(2) {
            let key = Vec::<u8>::decode(&pair[0])?;
            if entries.contains_key(&key) {
                return Err(DecodeError::DuplicateKey { key });
            }
            entries.insert(key, pair[1].clone());
        }

        Ok(Self { entries })
    }
}
