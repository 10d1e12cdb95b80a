//! Identities, devices and the details published alongside them.

use sealink_crypto::VerificationKey;
use sealink_encoding::{Decode, DecodeError, Dictionary, Encode, EncodedValue, Uid};

/// Cryptographic identity of a user: their long-term verification key.
pub type CryptoIdentity = VerificationKey;

/// One device of a (possibly owned) identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteDevice {
    /// Identity owning the device
    pub identity: CryptoIdentity,
    /// Device identifier
    pub device: Uid,
}

impl RemoteDevice {
    /// Pair an identity with one of its devices.
    #[must_use]
    pub const fn new(identity: CryptoIdentity, device: Uid) -> Self {
        Self { identity, device }
    }
}

impl Encode for RemoteDevice {
    fn encode(&self) -> EncodedValue {
        (&self.identity, &self.device).encode()
    }
}

impl Decode for RemoteDevice {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        let (identity, device) = value.decode_tuple()?;
        Ok(Self { identity, device })
    }
}

const NAME_KEY: &[u8] = b"name";
const VERSION_KEY: &[u8] = b"version";

/// Identity details exchanged in the channel acknowledgements.
///
/// Encoded as a dictionary so that later versions can add fields without
/// breaking older readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityDetails {
    /// Display name chosen by the user
    pub display_name: String,
    /// Monotonic version of the published details
    pub version: i64,
}

impl IdentityDetails {
    /// Details with the given display name at version 0.
    #[must_use]
    pub fn named(display_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), version: 0 }
    }
}

impl Encode for IdentityDetails {
    fn encode(&self) -> EncodedValue {
        Dictionary::new()
            .with(NAME_KEY, &self.display_name)
            .with(VERSION_KEY, &self.version)
            .encode()
    }
}

impl Decode for IdentityDetails {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        let dictionary = Dictionary::decode(value)?;
        let display_name = dictionary.get_decoded::<String>(NAME_KEY)?.unwrap_or_default();
        let version = dictionary.get_decoded::<i64>(VERSION_KEY)?.unwrap_or_default();
        Ok(Self { display_name, version })
    }
}

#[cfg(test)]
mod tests {
    use sealink_crypto::SigningKeyPair;
    use sealink_encoding::Tag;

    use super::*;

    #[test]
    fn details_round_trip() {
        let details = IdentityDetails { display_name: "Alice".into(), version: 3 };
        assert_eq!(IdentityDetails::decode(&details.encode()), Ok(details));
    }

    #[test]
    fn details_tolerate_unknown_and_missing_keys() {
        let newer = Dictionary::new()
            .with(NAME_KEY, &"Bob")
            .with(b"avatar".to_vec(), &vec![1u8, 2, 3])
            .encode();
        let details = IdentityDetails::decode(&newer).expect("extra keys ignored");
        assert_eq!(details, IdentityDetails::named("Bob"));
    }

    #[test]
    fn details_reject_wrong_field_type() {
        let bad = Dictionary::new().with(VERSION_KEY, &"three").encode();
        assert!(matches!(
            IdentityDetails::decode(&bad),
            Err(DecodeError::TagMismatch { expected: Tag::Int, .. })
        ));
    }

    #[test]
    fn remote_device_round_trip() {
        let identity = SigningKeyPair::from_seed(&[5; 32]).verification_key();
        let remote = RemoteDevice::new(identity, Uid::from_bytes([6; 32]));
        assert_eq!(RemoteDevice::decode(&remote.encode()), Ok(remote));
    }
}
