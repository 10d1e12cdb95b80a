//! Step bodies.
//!
//! Actions are listed in the order the manager must apply them. Tracking an
//! instance always comes last so that aborting stale instances for the same
//! remote never hits the instance being advanced.

use std::marker::PhantomData;

use sealink_crypto::{
    CHALLENGE_PREFIX_SIZE, ChallengeResponse, ChannelCreationChallenge, ChannelSeed,
    KemCiphertext, KemKeyPair, KemPrivateKey, KemPublicKey, SymmetricKey, decapsulate,
    encapsulate,
};
use sealink_encoding::Uid;
use tracing::{debug, warn};

use super::{ChannelCreationMessage, ChannelCreationState, ChannelCreationStep, PeerKind};
use crate::{
    env::{EnvRng, Environment},
    error::StepRejection,
    identity::{IdentityDetails, RemoteDevice},
    protocol::{CoreMessage, SendChannel, StepAction, StepContext, StepOutcome},
};

type Outcome = Result<StepOutcome<ChannelCreationState>, StepRejection>;

pub(super) fn run<K: PeerKind, C: StepContext, E: Environment>(
    step: ChannelCreationStep,
    ctx: &C,
    env: &E,
    instance_id: Uid,
    state: ChannelCreationState,
    message: ChannelCreationMessage,
) -> Outcome {
    use ChannelCreationMessage as M;
    use ChannelCreationState as S;
    use ChannelCreationStep as Step;

    let body = Steps::<K, C, E> { ctx, env, instance_id, step, kind: PhantomData };
    match (step, state, message) {
        (Step::SendPing, S::Initial, M::Initial { remote_identity, remote_device }) => {
            body.send_ping(RemoteDevice::new(remote_identity, remote_device))
        },
        (Step::SendPingOrEphemeralKey, S::Initial, M::Ping { identity, device, signature }) => {
            body.send_ping_or_ephemeral_key(RemoteDevice::new(identity, device), signature)
        },
        (
            Step::SendEphemeralKeyAndK1,
            S::Initial,
            M::AliceIdentityAndEphemeralKey { identity, device, signature, ephemeral_public },
        ) => body.send_ephemeral_key_and_k1(
            RemoteDevice::new(identity, device),
            signature,
            ephemeral_public,
        ),
        (
            Step::RecoverK1AndSendK2AndCreateChannel,
            S::WaitingForK1 { remote, ephemeral_private },
            M::BobEphemeralKeyAndK1 { ephemeral_public, c1 },
        ) => body.recover_k1_and_send_k2(remote, &ephemeral_private, ephemeral_public, &c1),
        (
            Step::RecoverK2CreateChannelAndSendAck,
            S::WaitingForK2 { remote, ephemeral_private, k1 },
            M::K2 { c2 },
        ) => body.recover_k2_and_send_ack(remote, &ephemeral_private, &k1, &c2),
        (Step::ConfirmChannelAndSendAck, S::WaitForFirstAck { remote }, M::FirstAck { details }) => {
            Ok(body.confirm_channel(remote, details, true))
        },
        (Step::ConfirmChannel, S::WaitForSecondAck { remote }, M::SecondAck { details }) => {
            Ok(body.confirm_channel(remote, details, false))
        },
        (other, ..) => Err(StepRejection::Inapplicable { step: other as u16 }),
    }
}

/// Everything a step body needs besides its inputs.
struct Steps<'a, K, C, E> {
    ctx: &'a C,
    env: &'a E,
    instance_id: Uid,
    step: ChannelCreationStep,
    kind: PhantomData<K>,
}

impl<K: PeerKind, C: StepContext, E: Environment> Steps<'_, K, C, E> {
    fn send_ping(&self, remote: RemoteDevice) -> Outcome {
        if self.is_current_device(&remote) {
            return Ok(StepOutcome::new(ChannelCreationState::Cancelled));
        }
        K::check_remote(self.ctx, &remote.identity)?;

        let actions = vec![
            StepAction::AbortInstances { protocol: K::PROTOCOL_ID, remote },
            StepAction::DeleteChannel { remote },
            self.ping(&remote),
        ];
        Ok(StepOutcome::with_actions(ChannelCreationState::PingSent, actions))
    }

    fn send_ping_or_ephemeral_key(
        &self,
        remote: RemoteDevice,
        signature: ChallengeResponse,
    ) -> Outcome {
        if self.is_current_device(&remote) {
            return Ok(StepOutcome::new(ChannelCreationState::Cancelled));
        }
        K::check_remote(self.ctx, &remote.identity)?;
        self.verify_ping(&remote, &signature)?;

        // The remote has no channel with us: drop ours and any running attempt.
        let mut actions = vec![
            StepAction::RecordPingSignature(signature),
            StepAction::AbortInstances { protocol: K::PROTOCOL_ID, remote },
            StepAction::DeleteChannel { remote },
        ];

        if self.ctx.current_device() >= remote.device {
            debug!(remote = ?remote.device, "remote device is in charge, pinging back");
            actions.push(self.ping(&remote));
            return Ok(StepOutcome::with_actions(ChannelCreationState::PingSent, actions));
        }

        let ephemeral = KemKeyPair::generate(&mut EnvRng(self.env));
        actions.push(self.send(
            &ChannelCreationMessage::AliceIdentityAndEphemeralKey {
                identity: *self.ctx.owned_identity(),
                device: self.ctx.current_device(),
                signature: self.answer_ping(&remote),
                ephemeral_public: ephemeral.public,
            },
            asymmetric(&remote),
        ));
        actions.push(self.track(remote));
        Ok(StepOutcome::with_actions(
            ChannelCreationState::WaitingForK1 { remote, ephemeral_private: ephemeral.private },
            actions,
        ))
    }

    fn send_ephemeral_key_and_k1(
        &self,
        remote: RemoteDevice,
        signature: ChallengeResponse,
        remote_ephemeral: KemPublicKey,
    ) -> Outcome {
        if self.is_current_device(&remote) {
            return Ok(StepOutcome::new(ChannelCreationState::Cancelled));
        }
        K::check_remote(self.ctx, &remote.identity)?;
        self.verify_ping(&remote, &signature)?;

        let mut actions = vec![StepAction::RecordPingSignature(signature)];

        if !self.ctx.running_instances_for(K::PROTOCOL_ID, &remote).is_empty() {
            warn!(remote = ?remote.device, "stale channel creation running, restarting");
            actions.push(StepAction::AbortInstances { protocol: K::PROTOCOL_ID, remote });
            actions.push(self.restart(remote));
            return Ok(StepOutcome::with_actions(ChannelCreationState::Cancelled, actions));
        }

        let (c1, k1) = encapsulate(&remote_ephemeral, &mut EnvRng(self.env))
            .map_err(StepRejection::InvalidEphemeralKey)?;
        let ephemeral = KemKeyPair::generate(&mut EnvRng(self.env));
        actions.push(self.send(
            &ChannelCreationMessage::BobEphemeralKeyAndK1 { ephemeral_public: ephemeral.public, c1 },
            asymmetric(&remote),
        ));
        actions.push(self.track(remote));
        Ok(StepOutcome::with_actions(
            ChannelCreationState::WaitingForK2 {
                remote,
                ephemeral_private: ephemeral.private,
                k1,
            },
            actions,
        ))
    }

    fn recover_k1_and_send_k2(
        &self,
        remote: RemoteDevice,
        ephemeral_private: &KemPrivateKey,
        remote_ephemeral: KemPublicKey,
        c1: &KemCiphertext,
    ) -> Outcome {
        let k1 = decapsulate(c1, ephemeral_private).map_err(StepRejection::Decapsulation)?;
        let (c2, k2) = encapsulate(&remote_ephemeral, &mut EnvRng(self.env))
            .map_err(StepRejection::InvalidEphemeralKey)?;

        let mut actions = vec![K::add_device(remote)];
        if let Some(restart) = self.restart_if_channel_exists(remote) {
            actions.extend(restart);
            return Ok(StepOutcome::with_actions(ChannelCreationState::Cancelled, actions));
        }

        actions.push(StepAction::CreateChannel { remote, seed: ChannelSeed::from_keys(&[&k1, &k2]) });
        actions.push(self.send(&ChannelCreationMessage::K2 { c2 }, asymmetric(&remote)));
        Ok(StepOutcome::with_actions(ChannelCreationState::WaitForFirstAck { remote }, actions))
    }

    fn recover_k2_and_send_ack(
        &self,
        remote: RemoteDevice,
        ephemeral_private: &KemPrivateKey,
        k1: &SymmetricKey,
        c2: &KemCiphertext,
    ) -> Outcome {
        let k2 = decapsulate(c2, ephemeral_private).map_err(StepRejection::Decapsulation)?;

        let mut actions = vec![K::add_device(remote)];
        if let Some(restart) = self.restart_if_channel_exists(remote) {
            actions.extend(restart);
            return Ok(StepOutcome::with_actions(ChannelCreationState::Cancelled, actions));
        }

        actions.push(StepAction::CreateChannel { remote, seed: ChannelSeed::from_keys(&[k1, &k2]) });
        actions.push(self.send(
            &ChannelCreationMessage::FirstAck { details: self.ctx.published_details() },
            oblivious(&remote, false),
        ));
        Ok(StepOutcome::with_actions(ChannelCreationState::WaitForSecondAck { remote }, actions))
    }

    /// Both acknowledgement steps. Only the first acknowledgement is answered.
    fn confirm_channel(
        &self,
        remote: RemoteDevice,
        details: IdentityDetails,
        send_ack: bool,
    ) -> StepOutcome<ChannelCreationState> {
        let mut actions = vec![
            StepAction::ConfirmChannel { remote },
            StepAction::UpdateRemoteDetails { identity: remote.identity, details },
        ];
        if send_ack {
            actions.push(self.send(
                &ChannelCreationMessage::SecondAck { details: self.ctx.published_details() },
                oblivious(&remote, true),
            ));
        }
        debug!(remote = ?remote.device, step = ?self.step, "channel confirmed");
        StepOutcome::with_actions(ChannelCreationState::ChannelConfirmed, actions)
    }

    fn is_current_device(&self, remote: &RemoteDevice) -> bool {
        let is_current = remote.device == self.ctx.current_device();
        if is_current {
            warn!(step = ?self.step, "channel creation with the current device, cancelling");
        }
        is_current
    }

    fn restart_if_channel_exists(&self, remote: RemoteDevice) -> Option<Vec<StepAction>> {
        if !self.ctx.channel_exists(&remote) {
            return None;
        }
        warn!(remote = ?remote.device, step = ?self.step, "channel already exists, restarting");
        Some(vec![
            StepAction::DeleteChannel { remote },
            StepAction::AbortInstances { protocol: K::PROTOCOL_ID, remote },
            self.restart(remote),
        ])
    }

    /// Signed ping addressed to `remote`.
    fn ping(&self, remote: &RemoteDevice) -> StepAction {
        self.send(
            &ChannelCreationMessage::Ping {
                identity: *self.ctx.owned_identity(),
                device: self.ctx.current_device(),
                signature: self.answer_ping(remote),
            },
            asymmetric(remote),
        )
    }

    fn answer_ping(&self, remote: &RemoteDevice) -> ChallengeResponse {
        let mut prefix = [0u8; CHALLENGE_PREFIX_SIZE];
        self.env.random_bytes(&mut prefix);
        let challenge = ChannelCreationChallenge {
            first_device: remote.device,
            second_device: self.ctx.current_device(),
            first_identity: &remote.identity,
            second_identity: self.ctx.owned_identity(),
        };
        self.ctx.solve_challenge(&challenge, prefix)
    }

    fn verify_ping(
        &self,
        remote: &RemoteDevice,
        signature: &ChallengeResponse,
    ) -> Result<(), StepRejection> {
        let challenge = ChannelCreationChallenge {
            first_device: self.ctx.current_device(),
            second_device: remote.device,
            first_identity: self.ctx.owned_identity(),
            second_identity: &remote.identity,
        };
        challenge.check(signature).map_err(|_| StepRejection::InvalidSignature)?;
        if self.ctx.ping_signature_seen(signature) {
            return Err(StepRejection::ReplayedPing);
        }
        Ok(())
    }

    /// Fresh local `Initial` under a new instance id.
    fn restart(&self, remote: RemoteDevice) -> StepAction {
        StepAction::Send(super::initial_message::<K, E>(
            *self.ctx.owned_identity(),
            self.env.random_uid(),
            remote,
            self.env,
        ))
    }

    fn track(&self, remote: RemoteDevice) -> StepAction {
        StepAction::TrackInstance {
            protocol: K::PROTOCOL_ID,
            remote,
            instance_id: self.instance_id,
        }
    }

    fn send(&self, message: &ChannelCreationMessage, channel: SendChannel) -> StepAction {
        StepAction::Send(CoreMessage::outgoing(
            K::PROTOCOL_ID,
            self.instance_id,
            message,
            channel,
            self.env,
        ))
    }
}

fn asymmetric(remote: &RemoteDevice) -> SendChannel {
    SendChannel::AsymmetricChannel {
        to_identity: remote.identity,
        remote_devices: vec![remote.device],
    }
}

fn oblivious(remote: &RemoteDevice, necessarily_confirmed: bool) -> SendChannel {
    SendChannel::ObliviousChannel {
        to_identity: remote.identity,
        remote_devices: vec![remote.device],
        necessarily_confirmed,
    }
}
