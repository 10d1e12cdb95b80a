//! Protocol state container.

use std::fmt;

use sealink_encoding::{Decode, DecodeError, Encode, EncodedValue};

use super::KindId;

/// Persisted form of a protocol state: a per-protocol state id plus a payload
/// only the owning protocol can interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteProtocolState {
    /// State id, scoped by protocol
    pub state_id: u16,
    /// Encoded state fields
    pub payload: EncodedValue,
}

impl ConcreteProtocolState {
    /// Payload of states that carry no fields.
    #[must_use]
    pub fn sentinel_payload() -> EncodedValue {
        EncodedValue::empty_list()
    }
}

impl Encode for ConcreteProtocolState {
    fn encode(&self) -> EncodedValue {
        (&self.state_id, &self.payload).encode()
    }
}

impl Decode for ConcreteProtocolState {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        let (state_id, payload) = value.decode_tuple()?;
        Ok(Self { state_id, payload })
    }
}

/// A typed protocol state.
///
/// Round-trip law: `decode(s.id(), &s.encode_payload()) == s` for every
/// reachable state `s`.
pub trait ProtocolState: Sized + fmt::Debug {
    /// Closed set of state kinds.
    type Kind: KindId;

    /// Kind of this state.
    fn kind(&self) -> Self::Kind;

    /// Encoded fields of this state.
    fn encode_payload(&self) -> EncodedValue;

    /// Rebuild a state of `kind` from its payload.
    ///
    /// # Errors
    ///
    /// `DecodeError` if the payload does not have the shape of `kind`.
    fn decode(kind: Self::Kind, payload: &EncodedValue) -> Result<Self, DecodeError>;

    /// Whether the instance ends in this state.
    fn is_final(&self) -> bool;

    /// Stable state id.
    fn id(&self) -> u16 {
        self.kind().id()
    }

    /// Persisted form.
    fn to_concrete(&self) -> ConcreteProtocolState {
        ConcreteProtocolState { state_id: self.id(), payload: self.encode_payload() }
    }

    /// Rebuild from the persisted form.
    ///
    /// # Errors
    ///
    /// `DecodeError::UnknownId` for an unknown state id, or the payload
    /// decode failure.
    fn from_concrete(state: &ConcreteProtocolState) -> Result<Self, DecodeError> {
        Self::decode(Self::Kind::try_from_id(state.state_id)?, &state.payload)
    }
}
