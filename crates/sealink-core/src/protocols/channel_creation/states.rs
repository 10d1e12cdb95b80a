//! Channel-creation states.
//!
//! ```text
//! Initial ──SendPing──────────────────────────────▶ PingSent
//!    │ ──SendPingOrEphemeralKey (not in charge)───▶ PingSent
//!    │ ──SendPingOrEphemeralKey (in charge)───────▶ WaitingForK1 ──▶ WaitForFirstAck ──▶ ChannelConfirmed
//!    └ ──SendEphemeralKeyAndK1────────────────────▶ WaitingForK2 ──▶ WaitForSecondAck ─▶ ChannelConfirmed
//! ```
//!
//! Any state can be forced to `Cancelled` by an abort.

use sealink_crypto::{KemPrivateKey, SymmetricKey};
use sealink_encoding::{DecodeError, Encode, EncodedValue};

use crate::{
    identity::RemoteDevice,
    protocol::{ConcreteProtocolState, KindId, ProtocolState},
};

/// Channel-creation state kinds. Ids are stable.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCreationStateKind {
    /// Fresh instance
    Initial = 0,
    /// Channel established and confirmed by both sides
    ChannelConfirmed = 1,
    /// Ephemeral key sent, waiting for the first encapsulation
    WaitingForK1 = 2,
    /// First encapsulation sent, waiting for the second
    WaitingForK2 = 3,
    /// Channel created, waiting for the peer's acknowledgement
    WaitForFirstAck = 4,
    /// Channel created and acknowledged, waiting for the final acknowledgement
    WaitForSecondAck = 5,
    /// Ping sent; the peer drives the next instance
    PingSent = 6,
    /// Aborted or restarted
    Cancelled = 7,
}

impl ChannelCreationStateKind {
    const ALL: [Self; 8] = [
        Self::Initial,
        Self::ChannelConfirmed,
        Self::WaitingForK1,
        Self::WaitingForK2,
        Self::WaitForFirstAck,
        Self::WaitForSecondAck,
        Self::PingSent,
        Self::Cancelled,
    ];
}

impl KindId for ChannelCreationStateKind {
    const WHAT: &'static str = "channel creation state";

    fn id(self) -> u16 {
        self as u16
    }

    fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// Channel-creation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCreationState {
    /// Fresh instance
    Initial,
    /// Waiting for `BobEphemeralKeyAndK1`
    WaitingForK1 {
        /// Peer device
        remote: RemoteDevice,
        /// Our ephemeral KEM key
        ephemeral_private: KemPrivateKey,
    },
    /// Waiting for `K2`
    WaitingForK2 {
        /// Peer device
        remote: RemoteDevice,
        /// Our ephemeral KEM key
        ephemeral_private: KemPrivateKey,
        /// Key encapsulated to the peer
        k1: SymmetricKey,
    },
    /// Waiting for `FirstAck`
    WaitForFirstAck {
        /// Peer device
        remote: RemoteDevice,
    },
    /// Waiting for `SecondAck`
    WaitForSecondAck {
        /// Peer device
        remote: RemoteDevice,
    },
    /// Ping sent
    PingSent,
    /// Channel confirmed
    ChannelConfirmed,
    /// Aborted or restarted
    Cancelled,
}

impl ChannelCreationState {
    /// Peer device this state is bound to.
    pub fn remote(&self) -> Option<&RemoteDevice> {
        match self {
            Self::WaitingForK1 { remote, .. }
            | Self::WaitingForK2 { remote, .. }
            | Self::WaitForFirstAck { remote }
            | Self::WaitForSecondAck { remote } => Some(remote),
            Self::Initial | Self::PingSent | Self::ChannelConfirmed | Self::Cancelled => None,
        }
    }
}

impl ProtocolState for ChannelCreationState {
    type Kind = ChannelCreationStateKind;

    fn kind(&self) -> ChannelCreationStateKind {
        match self {
            Self::Initial => ChannelCreationStateKind::Initial,
            Self::WaitingForK1 { .. } => ChannelCreationStateKind::WaitingForK1,
            Self::WaitingForK2 { .. } => ChannelCreationStateKind::WaitingForK2,
            Self::WaitForFirstAck { .. } => ChannelCreationStateKind::WaitForFirstAck,
            Self::WaitForSecondAck { .. } => ChannelCreationStateKind::WaitForSecondAck,
            Self::PingSent => ChannelCreationStateKind::PingSent,
            Self::ChannelConfirmed => ChannelCreationStateKind::ChannelConfirmed,
            Self::Cancelled => ChannelCreationStateKind::Cancelled,
        }
    }

    fn encode_payload(&self) -> EncodedValue {
        match self {
            Self::WaitingForK1 { remote, ephemeral_private } => (remote, ephemeral_private).encode(),
            Self::WaitingForK2 { remote, ephemeral_private, k1 } => {
                (remote, ephemeral_private, k1).encode()
            },
            Self::WaitForFirstAck { remote } | Self::WaitForSecondAck { remote } => {
                (remote,).encode()
            },
            Self::Initial | Self::PingSent | Self::ChannelConfirmed | Self::Cancelled => {
                ConcreteProtocolState::sentinel_payload()
            },
        }
    }

    fn decode(
        kind: ChannelCreationStateKind,
        payload: &EncodedValue,
    ) -> Result<Self, DecodeError> {
        Ok(match kind {
            ChannelCreationStateKind::Initial => Self::Initial,
            ChannelCreationStateKind::WaitingForK1 => {
                let (remote, ephemeral_private) = payload.decode_tuple()?;
                Self::WaitingForK1 { remote, ephemeral_private }
            },
            ChannelCreationStateKind::WaitingForK2 => {
                let (remote, ephemeral_private, k1) = payload.decode_tuple()?;
                Self::WaitingForK2 { remote, ephemeral_private, k1 }
            },
            ChannelCreationStateKind::WaitForFirstAck => {
                let (remote,) = payload.decode_tuple()?;
                Self::WaitForFirstAck { remote }
            },
            ChannelCreationStateKind::WaitForSecondAck => {
                let (remote,) = payload.decode_tuple()?;
                Self::WaitForSecondAck { remote }
            },
            ChannelCreationStateKind::PingSent => Self::PingSent,
            ChannelCreationStateKind::ChannelConfirmed => Self::ChannelConfirmed,
            ChannelCreationStateKind::Cancelled => Self::Cancelled,
        })
    }

    fn is_final(&self) -> bool {
        matches!(self, Self::PingSent | Self::ChannelConfirmed | Self::Cancelled)
    }
}
