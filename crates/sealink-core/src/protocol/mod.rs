//! Generic protocol machinery.
//!
//! A concrete protocol is a closed catalog: an enum of states, an enum of
//! messages and an enum of steps, each step keyed by the (state kind,
//! message kind, reception channel) triple it accepts. The engine decodes a
//! stored state and a received message, finds the single step that accepts
//! both, and runs it.
//!
//! # Components
//!
//! - [`message`]: the [`CoreMessage`] envelope and its wire form
//! - [`state`]: the [`ConcreteProtocolState`] container
//! - [`engine`]: step resolution and execution
//! - [`context`]: what a step may ask of, and tell, the device it runs on

pub mod context;
pub mod engine;
pub mod message;
pub mod state;

use std::fmt;

pub use context::{DeviceContext, StepAction, StepContext};
pub use engine::{
    ConcreteProtocol, ExpectedChannel, IgnoreReason, ProtocolInstance, Resolution, StepOutcome,
    StepSignature, Transition, abort, execute, resolve_step, validate_catalog,
};
pub use message::{ChannelInfo, ConcreteProtocolMessage, CoreMessage, Routing, SendChannel};
use sealink_encoding::{Decode, DecodeError, Encode, EncodedValue};
pub use state::{ConcreteProtocolState, ProtocolState};

/// Stable small-integer identifier of a state, message or step kind.
///
/// Ids are part of the wire contract: a shipped id is never reused for a
/// different meaning within one protocol.
pub trait KindId: Copy + Eq + fmt::Debug + 'static {
    /// Label used in decode errors ("state", "message", ...).
    const WHAT: &'static str;

    /// Wire id of this kind.
    fn id(self) -> u16;

    /// Kind for a wire id, if known.
    fn from_id(id: u16) -> Option<Self>;

    /// Kind for a wire id, failing with `DecodeError::UnknownId`.
    fn try_from_id(id: u16) -> Result<Self, DecodeError> {
        Self::from_id(id).ok_or(DecodeError::UnknownId { what: Self::WHAT, id: i64::from(id) })
    }
}

/// Identifier of a concrete protocol.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolId {
    /// Channel creation between a device and a device of a trusted contact
    ChannelCreationWithContactDevice = 1,
    /// Channel creation between two devices of the same owned identity
    ChannelCreationWithOwnedDevice = 2,
}

impl KindId for ProtocolId {
    const WHAT: &'static str = "protocol";

    fn id(self) -> u16 {
        self as u16
    }

    fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(Self::ChannelCreationWithContactDevice),
            2 => Some(Self::ChannelCreationWithOwnedDevice),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelCreationWithContactDevice => f.write_str("channel-creation-contact"),
            Self::ChannelCreationWithOwnedDevice => f.write_str("channel-creation-owned"),
        }
    }
}

impl Encode for ProtocolId {
    fn encode(&self) -> EncodedValue {
        self.id().encode()
    }
}

impl Decode for ProtocolId {
    fn decode(value: &EncodedValue) -> Result<Self, DecodeError> {
        Self::try_from_id(u16::decode(value)?)
    }
}
