//! Oblivious-channel creation between two devices.
//!
//! One implementation serves two protocols, selected by [`PeerKind`]:
//!
//! - [`OwnedDevice`]: both devices belong to the same identity
//! - [`ContactDevice`]: the remote device belongs to a trusted, active contact
//!
//! # Handshake
//!
//! The device with the smaller [`Uid`] is "in charge" and plays Alice:
//!
//! ```text
//!  A (in charge)                                   B
//!  Initial ── Ping ──────────────────────────────▶ Initial   (verify, ping back)
//!  Initial ◀──────────────────────────────── Ping ─ PingSent
//!  WaitingForK1 ── AliceIdentityAndEphemeralKey ─▶ Initial   (verify, encapsulate k1)
//!  WaitingForK1 ◀──────── BobEphemeralKeyAndK1 ── WaitingForK2
//!  WaitForFirstAck ── K2 ────────────────────────▶ WaitingForK2   (seed = [k1, k2])
//!  WaitForFirstAck ◀───────── FirstAck (channel) ─ WaitForSecondAck
//!  ChannelConfirmed ── SecondAck (channel) ──────▶ ChannelConfirmed
//! ```
//!
//! Either side may start with a local `Initial`. The instance id travels with
//! every message, so both devices run the same instance; an instance that
//! reaches a final state is deleted and the next message for that id starts
//! again from `Initial`.
//!
//! # Failure policy
//!
//! A bad or replayed ping signature, an unacceptable remote identity, a
//! malformed key or a failed decapsulation rejects the message and leaves the
//! state untouched. A request to create a channel with the current device
//! itself cancels the instance. Finding a stale instance or channel mid-way
//! cancels the instance and restarts from a fresh local `Initial`.

pub mod messages;
pub mod states;
mod steps;

use std::marker::PhantomData;

pub use messages::{ChannelCreationMessage, ChannelCreationMessageKind};
use sealink_encoding::Uid;
pub use states::{ChannelCreationState, ChannelCreationStateKind};

use crate::{
    env::Environment,
    error::StepRejection,
    identity::{CryptoIdentity, RemoteDevice},
    protocol::{
        ConcreteProtocol, CoreMessage, ExpectedChannel, ProtocolId, SendChannel, StepAction,
        StepContext, StepOutcome, StepSignature,
    },
};

/// Which kind of remote device a channel is created with.
pub trait PeerKind: Send + Sync + 'static {
    /// Protocol running the handshake for this kind of peer.
    const PROTOCOL_ID: ProtocolId;

    /// Whether the remote identity may take part.
    ///
    /// # Errors
    ///
    /// `StepRejection::RemoteIdentity` if it may not.
    fn check_remote<C: StepContext>(
        ctx: &C,
        identity: &CryptoIdentity,
    ) -> Result<(), StepRejection>;

    /// Action registering the remote device.
    fn add_device(remote: RemoteDevice) -> StepAction;
}

/// Channel with another device of the owned identity.
#[derive(Debug, Clone, Copy)]
pub struct OwnedDevice;

impl PeerKind for OwnedDevice {
    const PROTOCOL_ID: ProtocolId = ProtocolId::ChannelCreationWithOwnedDevice;

    fn check_remote<C: StepContext>(
        ctx: &C,
        identity: &CryptoIdentity,
    ) -> Result<(), StepRejection> {
        if identity != ctx.owned_identity() {
            return Err(StepRejection::RemoteIdentity { reason: "not the owned identity" });
        }
        Ok(())
    }

    fn add_device(remote: RemoteDevice) -> StepAction {
        StepAction::AddOwnedDevice(remote.device)
    }
}

/// Channel with a device of a contact.
#[derive(Debug, Clone, Copy)]
pub struct ContactDevice;

impl PeerKind for ContactDevice {
    const PROTOCOL_ID: ProtocolId = ProtocolId::ChannelCreationWithContactDevice;

    fn check_remote<C: StepContext>(
        ctx: &C,
        identity: &CryptoIdentity,
    ) -> Result<(), StepRejection> {
        if identity == ctx.owned_identity() {
            return Err(StepRejection::RemoteIdentity { reason: "contact is the owned identity" });
        }
        if !ctx.is_trusted_contact(identity) {
            return Err(StepRejection::RemoteIdentity { reason: "not a trusted contact" });
        }
        if !ctx.is_active_contact(identity) {
            return Err(StepRejection::RemoteIdentity { reason: "contact is not active" });
        }
        Ok(())
    }

    fn add_device(remote: RemoteDevice) -> StepAction {
        StepAction::AddContactDevice(remote)
    }
}

/// Channel-creation protocol for peers of kind `K`.
#[derive(Debug, Clone, Copy)]
pub struct ChannelCreation<K>(PhantomData<K>);

/// Channel creation with another owned device.
pub type ChannelCreationWithOwnedDevice = ChannelCreation<OwnedDevice>;

/// Channel creation with a contact device.
pub type ChannelCreationWithContactDevice = ChannelCreation<ContactDevice>;

/// Channel-creation steps. Ids are stable.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCreationStep {
    /// Local request: ping the remote device
    SendPing = 0,
    /// Verified ping: ping back, or send the ephemeral key if in charge
    SendPingOrEphemeralKey = 1,
    /// Recover `k1`, send `k2`, create the channel
    RecoverK1AndSendK2AndCreateChannel = 2,
    /// Confirm the channel, send the second acknowledgement
    ConfirmChannelAndSendAck = 3,
    /// Verified ephemeral key: send ours and `k1`
    SendEphemeralKeyAndK1 = 4,
    /// Recover `k2`, create the channel, send the first acknowledgement
    RecoverK2CreateChannelAndSendAck = 5,
    /// Confirm the channel
    ConfirmChannel = 6,
}

impl ChannelCreationStep {
    /// The step catalog.
    pub const ALL: [Self; 7] = [
        Self::SendPing,
        Self::SendPingOrEphemeralKey,
        Self::RecoverK1AndSendK2AndCreateChannel,
        Self::ConfirmChannelAndSendAck,
        Self::SendEphemeralKeyAndK1,
        Self::RecoverK2CreateChannelAndSendAck,
        Self::ConfirmChannel,
    ];

    /// What the step accepts.
    pub const fn signature(
        self,
    ) -> StepSignature<ChannelCreationStateKind, ChannelCreationMessageKind> {
        use ChannelCreationMessageKind as M;
        use ChannelCreationStateKind as S;

        let (state, message, channel) = match self {
            Self::SendPing => (S::Initial, M::Initial, ExpectedChannel::Local),
            Self::SendPingOrEphemeralKey => (S::Initial, M::Ping, ExpectedChannel::Asymmetric),
            Self::RecoverK1AndSendK2AndCreateChannel => {
                (S::WaitingForK1, M::BobEphemeralKeyAndK1, ExpectedChannel::Asymmetric)
            },
            Self::ConfirmChannelAndSendAck => {
                (S::WaitForFirstAck, M::FirstAck, ExpectedChannel::ObliviousFromBoundRemote)
            },
            Self::SendEphemeralKeyAndK1 => {
                (S::Initial, M::AliceIdentityAndEphemeralKey, ExpectedChannel::Asymmetric)
            },
            Self::RecoverK2CreateChannelAndSendAck => {
                (S::WaitingForK2, M::K2, ExpectedChannel::Asymmetric)
            },
            Self::ConfirmChannel => {
                (S::WaitForSecondAck, M::SecondAck, ExpectedChannel::ObliviousFromBoundRemote)
            },
        };
        StepSignature { state, message, channel }
    }
}

impl<K: PeerKind> ConcreteProtocol for ChannelCreation<K> {
    const ALL_STEPS: &'static [ChannelCreationStep] = &ChannelCreationStep::ALL;
    const ID: ProtocolId = K::PROTOCOL_ID;

    type Message = ChannelCreationMessage;
    type State = ChannelCreationState;
    type Step = ChannelCreationStep;

    fn step_id(step: ChannelCreationStep) -> u16 {
        step as u16
    }

    fn step_signature(
        step: ChannelCreationStep,
    ) -> StepSignature<ChannelCreationStateKind, ChannelCreationMessageKind> {
        step.signature()
    }

    fn initial_state() -> ChannelCreationState {
        ChannelCreationState::Initial
    }

    fn cancelled_state() -> ChannelCreationState {
        ChannelCreationState::Cancelled
    }

    fn bound_remote(state: &ChannelCreationState) -> Option<RemoteDevice> {
        state.remote().copied()
    }

    fn execute_step<C: StepContext, E: Environment>(
        step: ChannelCreationStep,
        ctx: &C,
        env: &E,
        instance_id: Uid,
        state: ChannelCreationState,
        message: ChannelCreationMessage,
    ) -> Result<StepOutcome<ChannelCreationState>, StepRejection> {
        steps::run::<K, C, E>(step, ctx, env, instance_id, state, message)
    }
}

/// Local `Initial` message starting a channel creation with `remote`.
pub fn initial_message<K: PeerKind, E: Environment>(
    owned_identity: CryptoIdentity,
    instance_id: Uid,
    remote: RemoteDevice,
    env: &E,
) -> CoreMessage {
    CoreMessage::outgoing(
        K::PROTOCOL_ID,
        instance_id,
        &ChannelCreationMessage::Initial {
            remote_identity: remote.identity,
            remote_device: remote.device,
        },
        SendChannel::Local { owned_identity },
        env,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::validate_catalog;

    #[test]
    fn catalogs_are_unambiguous() {
        assert_eq!(validate_catalog::<ChannelCreationWithOwnedDevice>(), Ok(()));
        assert_eq!(validate_catalog::<ChannelCreationWithContactDevice>(), Ok(()));
    }

    #[test]
    fn step_ids_are_stable() {
        let ids: Vec<u16> = ChannelCreationStep::ALL
            .into_iter()
            .map(ChannelCreationWithOwnedDevice::step_id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn protocols_have_distinct_ids() {
        assert_eq!(ChannelCreationWithContactDevice::ID.to_string(), "channel-creation-contact");
        assert_ne!(ChannelCreationWithOwnedDevice::ID, ChannelCreationWithContactDevice::ID);
    }
}
