//! Protocol message envelope.
//!
//! A [`CoreMessage`] is either on its way out (it names a [`SendChannel`]) or
//! has arrived (it carries [`ChannelInfo`] about how). [`Routing`] makes the
//! two cases exclusive.
//!
//! Wire form:
//!
//! ```text
//! List[ protocol_id: Int, instance_id: Bytes(32), message_kind: Int,
//!       inputs: List, timestamp: Int (microseconds) ]
//! ```

use std::{fmt, time::SystemTime};

use sealink_encoding::{DecodeError, DecodeLimits, EncodedValue, Encode, Uid};

use super::{KindId, ProtocolId};
use crate::{
    env::Environment,
    identity::{CryptoIdentity, RemoteDevice},
};

/// How a message reached this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelInfo {
    /// Posted by this device to itself
    Local,
    /// Public-key encrypted to this device; the sender is not authenticated
    AsymmetricChannel,
    /// Arrived over an established oblivious channel with `remote`
    ObliviousChannel {
        /// Authenticated sender
        remote: RemoteDevice,
    },
}

/// Where an outgoing message is to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendChannel {
    /// Loop back to this device
    Local {
        /// Identity the message is addressed to
        owned_identity: CryptoIdentity,
    },
    /// Encrypt under the recipients' long-term public keys
    AsymmetricChannel {
        /// Recipient identity
        to_identity: CryptoIdentity,
        /// Recipient devices
        remote_devices: Vec<Uid>,
    },
    /// Send over oblivious channels with the recipients
    ObliviousChannel {
        /// Recipient identity
        to_identity: CryptoIdentity,
        /// Recipient devices
        remote_devices: Vec<Uid>,
        /// Whether the channel must already be confirmed
        necessarily_confirmed: bool,
    },
}

/// Reception information or destination, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Message was received
    Received(ChannelInfo),
    /// Message is about to be sent
    Outgoing(SendChannel),
}

/// A typed protocol message.
///
/// Implementations encode their fields positionally; field order is part of
/// the wire contract.
pub trait ConcreteProtocolMessage: Sized + fmt::Debug {
    /// Closed set of message kinds.
    type Kind: KindId;

    /// Kind of this message.
    fn kind(&self) -> Self::Kind;

    /// Positional inputs carried by the message.
    fn encoded_inputs(&self) -> Vec<EncodedValue>;

    /// Rebuild a message of `kind` from received inputs.
    ///
    /// # Errors
    ///
    /// Any arity, tag or key-format mismatch.
    fn decode(kind: Self::Kind, inputs: &[EncodedValue]) -> Result<Self, DecodeError>;
}

/// Generic message envelope exchanged between protocol instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMessage {
    /// Target protocol
    pub protocol_id: ProtocolId,
    /// Target instance
    pub instance_id: Uid,
    /// Message kind id, scoped by protocol
    pub message_kind: u16,
    /// Positional payload
    pub encoded_inputs: Vec<EncodedValue>,
    /// Reception info or destination
    pub routing: Routing,
    /// Creation time
    pub timestamp: SystemTime,
}

impl CoreMessage {
    /// Envelope for a message a step wants to send, timestamped now.
    pub fn outgoing<M: ConcreteProtocolMessage, E: Environment>(
        protocol_id: ProtocolId,
        instance_id: Uid,
        message: &M,
        channel: SendChannel,
        env: &E,
    ) -> Self {
        Self {
            protocol_id,
            instance_id,
            message_kind: message.kind().id(),
            encoded_inputs: message.encoded_inputs(),
            routing: Routing::Outgoing(channel),
            timestamp: env.now(),
        }
    }

    /// Envelope for a message received in wire form.
    ///
    /// # Errors
    ///
    /// `DecodeError` if `wire` is not a well-formed envelope.
    pub fn received(wire: &EncodedValue, channel: ChannelInfo) -> Result<Self, DecodeError> {
        let (protocol_id, instance_id, message_kind, encoded_inputs, timestamp) =
            wire.decode_tuple::<(ProtocolId, Uid, u16, Vec<EncodedValue>, SystemTime)>()?;
        Ok(Self {
            protocol_id,
            instance_id,
            message_kind,
            encoded_inputs,
            routing: Routing::Received(channel),
            timestamp,
        })
    }

    /// Parse raw received bytes under `limits`.
    ///
    /// # Errors
    ///
    /// `DecodeError` on malformed bytes, exceeded limits or a malformed
    /// envelope.
    pub fn from_received_bytes(
        raw: &[u8],
        channel: ChannelInfo,
        limits: &DecodeLimits,
    ) -> Result<Self, DecodeError> {
        Self::received(&EncodedValue::from_bytes_with_limits(raw, limits)?, channel)
    }

    /// Same message as delivered over `channel`.
    #[must_use]
    pub fn into_received(self, channel: ChannelInfo) -> Self {
        Self { routing: Routing::Received(channel), ..self }
    }

    /// Wire encoding of the envelope. Routing is not part of it.
    #[must_use]
    pub fn to_wire(&self) -> EncodedValue {
        (
            &self.protocol_id,
            &self.instance_id,
            &self.message_kind,
            &self.encoded_inputs,
            &self.timestamp,
        )
            .encode()
    }

    /// Reception information, if the message was received.
    #[must_use]
    pub fn reception(&self) -> Option<&ChannelInfo> {
        match &self.routing {
            Routing::Received(info) => Some(info),
            Routing::Outgoing(_) => None,
        }
    }

    /// Destination, if the message is outgoing.
    #[must_use]
    pub fn destination(&self) -> Option<&SendChannel> {
        match &self.routing {
            Routing::Outgoing(channel) => Some(channel),
            Routing::Received(_) => None,
        }
    }

    /// Decode the typed message carried by the envelope.
    ///
    /// # Errors
    ///
    /// `DecodeError::UnknownId` for an unknown kind, or the decode failure of
    /// the inputs.
    pub fn decode_message<M: ConcreteProtocolMessage>(&self) -> Result<M, DecodeError> {
        M::decode(M::Kind::try_from_id(self.message_kind)?, &self.encoded_inputs)
    }
}

#[cfg(test)]
mod tests {
    use sealink_encoding::{Decode, Tag};

    use super::*;
    use crate::env::test_utils::MockEnv;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum EchoKind {
        Echo,
    }

    impl KindId for EchoKind {
        const WHAT: &'static str = "message";

        fn id(self) -> u16 {
            4
        }

        fn from_id(id: u16) -> Option<Self> {
            (id == 4).then_some(Self::Echo)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Echo {
        text: String,
        count: i64,
    }

    impl ConcreteProtocolMessage for Echo {
        type Kind = EchoKind;

        fn kind(&self) -> EchoKind {
            EchoKind::Echo
        }

        fn encoded_inputs(&self) -> Vec<EncodedValue> {
            vec![self.text.encode(), self.count.encode()]
        }

        fn decode(_: EchoKind, inputs: &[EncodedValue]) -> Result<Self, DecodeError> {
            let [text, count] = inputs else {
                return Err(DecodeError::ArityMismatch { expected: 2, actual: inputs.len() });
            };
            Ok(Self { text: String::decode(text)?, count: i64::decode(count)? })
        }
    }

    fn outgoing(env: &MockEnv) -> CoreMessage {
        CoreMessage::outgoing(
            ProtocolId::ChannelCreationWithOwnedDevice,
            Uid::from_bytes([0x11; 32]),
            &Echo { text: "hello".into(), count: 2 },
            SendChannel::Local {
                owned_identity: sealink_crypto::SigningKeyPair::from_seed(&[1; 32])
                    .verification_key(),
            },
            env,
        )
    }

    #[test]
    fn wire_round_trip_replaces_routing() {
        let env = MockEnv::with_seed(1);
        let sent = outgoing(&env);
        assert!(sent.destination().is_some());
        assert!(sent.reception().is_none());

        let received = CoreMessage::received(&sent.to_wire(), ChannelInfo::Local).expect("valid");
        assert_eq!(received.reception(), Some(&ChannelInfo::Local));
        assert!(received.destination().is_none());
        assert_eq!(received, sent.clone().into_received(ChannelInfo::Local));
        assert_eq!(
            received.decode_message::<Echo>(),
            Ok(Echo { text: "hello".into(), count: 2 })
        );
    }

    #[test]
    fn unknown_kind_fails() {
        let env = MockEnv::with_seed(1);
        let mut message = outgoing(&env).into_received(ChannelInfo::AsymmetricChannel);
        message.message_kind = 9;
        assert_eq!(
            message.decode_message::<Echo>(),
            Err(DecodeError::UnknownId { what: "message", id: 9 })
        );
    }

    #[test]
    fn input_mismatch_fails() {
        let env = MockEnv::with_seed(1);
        let mut message = outgoing(&env).into_received(ChannelInfo::AsymmetricChannel);

        message.encoded_inputs.pop();
        assert_eq!(
            message.decode_message::<Echo>(),
            Err(DecodeError::ArityMismatch { expected: 2, actual: 1 })
        );

        message.encoded_inputs.push(true.encode());
        assert!(matches!(
            message.decode_message::<Echo>(),
            Err(DecodeError::TagMismatch { expected: Tag::Int, actual: Tag::Bool })
        ));
    }

    #[test]
    fn malformed_envelope_fails() {
        let wire = (1u16, vec![0u8; 3]).encode();
        assert!(CoreMessage::received(&wire, ChannelInfo::Local).is_err());

        let raw = outgoing(&MockEnv::with_seed(2)).to_wire().to_bytes();
        let limits = DecodeLimits { max_depth: 1, ..DecodeLimits::default() };
        assert!(matches!(
            CoreMessage::from_received_bytes(&raw, ChannelInfo::Local, &limits),
            Err(DecodeError::TooDeep { .. })
        ));
    }
}
