//! Channel-creation messages. Kind ids and field order are wire contract.

use sealink_crypto::{ChallengeResponse, KemCiphertext, KemPublicKey};
use sealink_encoding::{DecodeError, DecodeTuple, Encode, EncodedValue, Uid};

use crate::{
    identity::{CryptoIdentity, IdentityDetails, RemoteDevice},
    protocol::{ConcreteProtocolMessage, KindId},
};

/// Channel-creation message kinds.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCreationMessageKind {
    /// Local request to create a channel
    Initial = 0,
    /// Signed proof that the sender has no channel with the recipient
    Ping = 1,
    /// Ping plus the ephemeral key of the device in charge
    AliceIdentityAndEphemeralKey = 2,
    /// Responder's ephemeral key and first encapsulation
    BobEphemeralKeyAndK1 = 3,
    /// Second encapsulation
    K2 = 4,
    /// First acknowledgement, over the new channel
    FirstAck = 5,
    /// Second acknowledgement, over the confirmed channel
    SecondAck = 6,
}

impl ChannelCreationMessageKind {
    const ALL: [Self; 7] = [
        Self::Initial,
        Self::Ping,
        Self::AliceIdentityAndEphemeralKey,
        Self::BobEphemeralKeyAndK1,
        Self::K2,
        Self::FirstAck,
        Self::SecondAck,
    ];
}

impl KindId for ChannelCreationMessageKind {
    const WHAT: &'static str = "channel creation message";

    fn id(self) -> u16 {
        self as u16
    }

    fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// Channel-creation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCreationMessage {
    /// Start creating a channel with a remote device
    Initial {
        /// Identity owning the remote device
        remote_identity: CryptoIdentity,
        /// Remote device
        remote_device: Uid,
    },
    /// Authenticated ping
    Ping {
        /// Sender identity
        identity: CryptoIdentity,
        /// Sender device
        device: Uid,
        /// Answer to the channel-creation challenge
        signature: ChallengeResponse,
    },
    /// Authenticated ephemeral key from the device in charge
    AliceIdentityAndEphemeralKey {
        /// Sender identity
        identity: CryptoIdentity,
        /// Sender device
        device: Uid,
        /// Answer to the channel-creation challenge
        signature: ChallengeResponse,
        /// Sender's ephemeral KEM key
        ephemeral_public: KemPublicKey,
    },
    /// Responder's ephemeral key and `k1` encapsulated to the initiator
    BobEphemeralKeyAndK1 {
        /// Responder's ephemeral KEM key
        ephemeral_public: KemPublicKey,
        /// Encapsulation of `k1`
        c1: KemCiphertext,
    },
    /// `k2` encapsulated to the responder
    K2 {
        /// Encapsulation of `k2`
        c2: KemCiphertext,
    },
    /// Sender's published details
    FirstAck {
        /// Published details
        details: IdentityDetails,
    },
    /// Sender's published details
    SecondAck {
        /// Published details
        details: IdentityDetails,
    },
}

impl ChannelCreationMessage {
    /// Remote device claimed by the sender of an authenticated message.
    pub fn sender(&self) -> Option<RemoteDevice> {
        match self {
            Self::Ping { identity, device, .. }
            | Self::AliceIdentityAndEphemeralKey { identity, device, .. } => {
                Some(RemoteDevice::new(*identity, *device))
            },
            _ => None,
        }
    }
}

fn inputs<T: DecodeTuple>(inputs: &[EncodedValue]) -> Result<T, DecodeError> {
    T::decode_tuple(inputs)
}

impl ConcreteProtocolMessage for ChannelCreationMessage {
    type Kind = ChannelCreationMessageKind;

    fn kind(&self) -> ChannelCreationMessageKind {
        match self {
            Self::Initial { .. } => ChannelCreationMessageKind::Initial,
            Self::Ping { .. } => ChannelCreationMessageKind::Ping,
            Self::AliceIdentityAndEphemeralKey { .. } => {
                ChannelCreationMessageKind::AliceIdentityAndEphemeralKey
            },
            Self::BobEphemeralKeyAndK1 { .. } => ChannelCreationMessageKind::BobEphemeralKeyAndK1,
            Self::K2 { .. } => ChannelCreationMessageKind::K2,
            Self::FirstAck { .. } => ChannelCreationMessageKind::FirstAck,
            Self::SecondAck { .. } => ChannelCreationMessageKind::SecondAck,
        }
    }

    fn encoded_inputs(&self) -> Vec<EncodedValue> {
        match self {
            Self::Initial { remote_identity, remote_device } => {
                vec![remote_identity.encode(), remote_device.encode()]
            },
            Self::Ping { identity, device, signature } => {
                vec![identity.encode(), device.encode(), signature.encode()]
            },
            Self::AliceIdentityAndEphemeralKey { identity, device, signature, ephemeral_public } => {
                vec![identity.encode(), device.encode(), signature.encode(), ephemeral_public.encode()]
            },
            Self::BobEphemeralKeyAndK1 { ephemeral_public, c1 } => {
                vec![ephemeral_public.encode(), c1.encode()]
            },
            Self::K2 { c2 } => vec![c2.encode()],
            Self::FirstAck { details } | Self::SecondAck { details } => vec![details.encode()],
        }
    }

    fn decode(
        kind: ChannelCreationMessageKind,
        encoded: &[EncodedValue],
    ) -> Result<Self, DecodeError> {
        Ok(match kind {
            ChannelCreationMessageKind::Initial => {
                let (remote_identity, remote_device) = inputs(encoded)?;
                Self::Initial { remote_identity, remote_device }
            },
            ChannelCreationMessageKind::Ping => {
                let (identity, device, signature) = inputs(encoded)?;
                Self::Ping { identity, device, signature }
            },
            ChannelCreationMessageKind::AliceIdentityAndEphemeralKey => {
                let (identity, device, signature, ephemeral_public) = inputs(encoded)?;
                Self::AliceIdentityAndEphemeralKey { identity, device, signature, ephemeral_public }
            },
            ChannelCreationMessageKind::BobEphemeralKeyAndK1 => {
                let (ephemeral_public, c1) = inputs(encoded)?;
                Self::BobEphemeralKeyAndK1 { ephemeral_public, c1 }
            },
            ChannelCreationMessageKind::K2 => {
                let (c2,) = inputs(encoded)?;
                Self::K2 { c2 }
            },
            ChannelCreationMessageKind::FirstAck => {
                let (details,) = inputs(encoded)?;
                Self::FirstAck { details }
            },
            ChannelCreationMessageKind::SecondAck => {
                let (details,) = inputs(encoded)?;
                Self::SecondAck { details }
            },
        })
    }
}
