//! Encoding of cryptographic keys and signatures.
//!
//! Key payloads carry a two-byte algorithm header ahead of the raw key:
//!
//! ```text
//! algorithm_class (1) || implementation (1) || raw key
//! ```
//!
//! A key decoded under the wrong class or implementation, or with the wrong
//! raw length, is rejected as `DecodeError::InvalidKey`.

use sealink_encoding::{Decode, DecodeError, Encode, EncodedValue, Tag};

use crate::{
    challenge::{CHALLENGE_PREFIX_SIZE, ChallengeResponse},
    kem::{KEM_PUBLIC_KEY_SIZE, KemCiphertext, KemPrivateKey, KemPublicKey, SYMMETRIC_KEY_SIZE, SymmetricKey},
    seed::{CHANNEL_SEED_SIZE, ChannelSeed},
    signature::{SIGNATURE_SIZE, SignatureBytes, VERIFICATION_KEY_SIZE, VerificationKey},
};

/// Algorithm class byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmClass {
    /// Signature schemes
    Signature = 0x00,
    /// Public-key encryption and KEMs
    PublicKeyEncryption = 0x01,
    /// Symmetric encryption
    SymmetricEncryption = 0x02,
}

/// Implementation byte for Ed25519 / X25519.
pub const CURVE25519_IMPLEMENTATION: u8 = 0x01;

/// Implementation byte for XChaCha20-Poly1305 keys.
pub const XCHACHA20_POLY1305_IMPLEMENTATION: u8 = 0x01;

/// Implementation byte for channel seeds (HKDF-SHA256 root material).
pub const HKDF_SHA256_SEED_IMPLEMENTATION: u8 = 0x02;

fn encode_key(tag: Tag, class: AlgorithmClass, implementation: u8, raw: &[u8]) -> EncodedValue {
    let mut payload = Vec::with_capacity(2 + raw.len());
    payload.push(class as u8);
    payload.push(implementation);
    payload.extend_from_slice(raw);
    EncodedValue::new(tag, payload)
}

fn decode_key<const N: usize>(
    value: &EncodedValue,
    tag: Tag,
    class: AlgorithmClass,
    implementation: u8,
) -> Result<[u8; N], DecodeError> {
    let payload = value.payload_of(tag)?;
    let [found_class, found_implementation, raw @ ..] = payload.as_ref() else {
        return Err(DecodeError::invalid_key("missing algorithm header"));
    };

    if *found_class != class as u8 {
        return Err(DecodeError::invalid_key(format!(
            "algorithm class {found_class:#04x}, expected {:#04x}",
            class as u8
        )));
    }
    if *found_implementation != implementation {
        return Err(DecodeError::invalid_key(format!(
            "implementation {found_implementation:#04x}, expected {implementation:#04x}"
        )));
    }

    <[u8; N]>::try_from(raw)
        .map_err(|_| DecodeError::invalid_key(format!("{} key bytes, expected {N}", raw.len())))
}

impl Encode for KemPublicKey {
    fn encode(&self) -> EncodedValue {
        encode_key(
            Tag::PublicKey,
            AlgorithmClass::PublicKeyEncryption,
            CURVE25519_IMPLEMENTATION,
            self.as_bytes(),
        )
    }
}

impl Decode for KemPublicKey {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        decode_key::<KEM_PUBLIC_KEY_SIZE>(
            value,
            Tag::PublicKey,
            AlgorithmClass::PublicKeyEncryption,
            CURVE25519_IMPLEMENTATION,
        )
        .map(Self::from_bytes)
    }
}

impl Encode for KemPrivateKey {
    fn encode(&self) -> EncodedValue {
        encode_key(
            Tag::PrivateKey,
            AlgorithmClass::PublicKeyEncryption,
            CURVE25519_IMPLEMENTATION,
            &self.to_bytes(),
        )
    }
}

impl Decode for KemPrivateKey {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        decode_key::<SYMMETRIC_KEY_SIZE>(
            value,
            Tag::PrivateKey,
            AlgorithmClass::PublicKeyEncryption,
            CURVE25519_IMPLEMENTATION,
        )
        .map(Self::from_bytes)
    }
}

impl Encode for VerificationKey {
    fn encode(&self) -> EncodedValue {
        encode_key(Tag::PublicKey, AlgorithmClass::Signature, CURVE25519_IMPLEMENTATION, self.as_bytes())
    }
}

impl Decode for VerificationKey {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        let raw = decode_key::<VERIFICATION_KEY_SIZE>(
            value,
            Tag::PublicKey,
            AlgorithmClass::Signature,
            CURVE25519_IMPLEMENTATION,
        )?;
        Self::from_bytes(raw).map_err(|_| DecodeError::invalid_key("not a curve point"))
    }
}

impl Encode for SymmetricKey {
    fn encode(&self) -> EncodedValue {
        encode_key(
            Tag::SymmetricKey,
            AlgorithmClass::SymmetricEncryption,
            XCHACHA20_POLY1305_IMPLEMENTATION,
            self.as_bytes(),
        )
    }
}

impl Decode for SymmetricKey {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        decode_key::<SYMMETRIC_KEY_SIZE>(
            value,
            Tag::SymmetricKey,
            AlgorithmClass::SymmetricEncryption,
            XCHACHA20_POLY1305_IMPLEMENTATION,
        )
        .map(Self::from_bytes)
    }
}

impl Encode for ChannelSeed {
    fn encode(&self) -> EncodedValue {
        encode_key(
            Tag::SymmetricKey,
            AlgorithmClass::SymmetricEncryption,
            HKDF_SHA256_SEED_IMPLEMENTATION,
            self.as_bytes(),
        )
    }
}

impl Decode for ChannelSeed {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        decode_key::<CHANNEL_SEED_SIZE>(
            value,
            Tag::SymmetricKey,
            AlgorithmClass::SymmetricEncryption,
            HKDF_SHA256_SEED_IMPLEMENTATION,
        )
        .map(Self::from_bytes)
    }
}

impl Encode for SignatureBytes {
    fn encode(&self) -> EncodedValue {
        encode_key(Tag::Signature, AlgorithmClass::Signature, CURVE25519_IMPLEMENTATION, self.as_bytes())
    }
}

impl Decode for SignatureBytes {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        decode_key::<SIGNATURE_SIZE>(
            value,
            Tag::Signature,
            AlgorithmClass::Signature,
            CURVE25519_IMPLEMENTATION,
        )
        .map(Self::from_bytes)
    }
}

/// Challenge responses share the signature header; the raw part is
/// `prefix || signature`.
impl Encode for ChallengeResponse {
    fn encode(&self) -> EncodedValue {
        let mut raw = [0u8; CHALLENGE_PREFIX_SIZE + SIGNATURE_SIZE];
        raw[..CHALLENGE_PREFIX_SIZE].copy_from_slice(&self.prefix);
        raw[CHALLENGE_PREFIX_SIZE..].copy_from_slice(self.signature.as_bytes());
        encode_key(Tag::Signature, AlgorithmClass::Signature, CURVE25519_IMPLEMENTATION, &raw)
    }
}

impl Decode for ChallengeResponse {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        let raw = decode_key::<{ CHALLENGE_PREFIX_SIZE + SIGNATURE_SIZE }>(
            value,
            Tag::Signature,
            AlgorithmClass::Signature,
            CURVE25519_IMPLEMENTATION,
        )?;
        let (prefix, signature) = raw.split_at(CHALLENGE_PREFIX_SIZE);
        let prefix = <[u8; CHALLENGE_PREFIX_SIZE]>::try_from(prefix)
            .map_err(|_| DecodeError::invalid_key("challenge prefix"))?;
        let signature = <[u8; SIGNATURE_SIZE]>::try_from(signature)
            .map_err(|_| DecodeError::invalid_key("challenge signature"))?;
        Ok(Self { prefix, signature: SignatureBytes::from_bytes(signature) })
    }
}

impl Encode for KemCiphertext {
    fn encode(&self) -> EncodedValue {
        self.as_bytes().encode()
    }
}

impl Decode for KemCiphertext {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        Vec::<u8>::decode(value).map(Self::from_bytes)
    }
}
