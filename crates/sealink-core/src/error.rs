//! Error types for the sealink protocol core.
//!
//! Three layers, matching how failures are handled:
//!
//! - [`StepRejection`]: a step looked at a message and declined it. The
//!   instance keeps its state; the caller decides whether to drop, retry or
//!   abort.
//! - [`ProtocolError`]: the engine could not run at all (corrupt stored
//!   state, ill-formed step catalog, collaborator failure).
//! - [`StoreError`] / [`TransportError`]: collaborator failures.

use sealink_crypto::CryptoError;
use sealink_encoding::{DecodeError, Uid};
use thiserror::Error;

use crate::protocol::{CoreMessage, ProtocolId};

/// Reasons a step declines a message without changing state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepRejection {
    /// Signature over the channel-creation challenge did not verify
    #[error("invalid ping signature")]
    InvalidSignature,

    /// Ping signature was already consumed by an earlier message
    #[error("ping signature already received")]
    ReplayedPing,

    /// Key encapsulation could not be opened
    #[error("decapsulation failed: {0}")]
    Decapsulation(CryptoError),

    /// Remote ephemeral key is not usable for encapsulation
    #[error("invalid remote ephemeral key: {0}")]
    InvalidEphemeralKey(CryptoError),

    /// Remote identity is not acceptable for this protocol
    #[error("remote identity rejected: {reason}")]
    RemoteIdentity {
        /// Why the identity is not acceptable
        reason: &'static str,
    },

    /// Message inputs do not decode for the resolved step
    #[error("malformed message: {0}")]
    Malformed(DecodeError),

    /// Step invoked on a state or message outside its signature
    #[error("step {step} does not apply to this input")]
    Inapplicable {
        /// Step id
        step: u16,
    },
}

/// Errors that prevent a protocol step from being evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// More than one catalog step accepts the same (state, message, channel)
    #[error("ambiguous step catalog for {protocol:?}: {candidates} candidate steps for state {state}, message {message}")]
    AmbiguousStep {
        /// Protocol whose catalog is ill-formed
        protocol: ProtocolId,
        /// State id the candidates share
        state: u16,
        /// Message kind the candidates share
        message: u16,
        /// Number of matching steps
        candidates: usize,
    },

    /// Message addressed to a different protocol than the one executing
    #[error("message for {actual:?} routed to {expected:?}")]
    WrongProtocol {
        /// Protocol executing
        expected: ProtocolId,
        /// Protocol named by the message
        actual: ProtocolId,
    },

    /// Message carries a destination instead of reception information
    #[error("message has no reception channel information")]
    NotReceived,

    /// Stored state could not be decoded
    #[error("corrupt state for instance {instance:?}: {source}")]
    CorruptState {
        /// Affected instance
        instance: Uid,
        /// Decode failure
        source: DecodeError,
    },

    /// Received bytes are not a well-formed message envelope
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(DecodeError),

    /// Persistence collaborator failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Transport collaborator failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The transition was committed but the sink refused an outgoing
    /// message. Redelivering the received message will not resend them.
    #[error("transition committed, {} message(s) undelivered: {source}", .pending.len())]
    Undelivered {
        /// Refusal of the first undelivered message
        source: TransportError,
        /// Messages not handed over, in posting order
        pending: Vec<CoreMessage>,
    },
}

impl ProtocolError {
    /// Whether retrying the same message later can succeed.
    ///
    /// Collaborator outages are transient. Corrupt state and catalog bugs are
    /// not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Transport(err) => err.is_transient(),
            Self::AmbiguousStep { .. }
            | Self::WrongProtocol { .. }
            | Self::NotReceived
            | Self::MalformedEnvelope(_)
            | Self::CorruptState { .. }
            | Self::Undelivered { .. } => false,
        }
    }
}

/// Persistence collaborator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend temporarily unavailable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes could not be read back
    #[error("stored record corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Whether the operation may succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Transport collaborator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No route to the destination device
    #[error("unknown device {0:?}")]
    UnknownDevice(Uid),

    /// Oblivious channel required but missing
    #[error("no oblivious channel with device {0:?}")]
    NoChannel(Uid),

    /// Oblivious channel exists but is not yet confirmed
    #[error("oblivious channel with device {0:?} is not confirmed")]
    ChannelNotConfirmed(Uid),

    /// Outgoing message had no destination
    #[error("message has no destination channel")]
    NoDestination,

    /// Delivery queue rejected the message
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether the operation may succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ChannelNotConfirmed(_) | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverability_follows_collaborator_classification() {
        assert!(ProtocolError::from(StoreError::Unavailable("busy".into())).is_recoverable());
        assert!(!ProtocolError::from(StoreError::Corrupted("bad".into())).is_recoverable());
        assert!(ProtocolError::from(TransportError::Closed).is_recoverable());
        assert!(
            !ProtocolError::from(TransportError::UnknownDevice(Uid::default())).is_recoverable()
        );
    }

    #[test]
    fn engine_bugs_are_fatal() {
        let err = ProtocolError::AmbiguousStep {
            protocol: ProtocolId::ChannelCreationWithOwnedDevice,
            state: 0,
            message: 1,
            candidates: 2,
        };
        assert!(!err.is_recoverable());
        assert!(!ProtocolError::NotReceived.is_recoverable());
    }

    #[test]
    fn committed_but_undelivered_is_not_retryable() {
        let err = ProtocolError::Undelivered { source: TransportError::Closed, pending: Vec::new() };
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "transition committed, 0 message(s) undelivered: transport closed");
    }
}
