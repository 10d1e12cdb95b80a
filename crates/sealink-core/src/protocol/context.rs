//! What a step can see and what it can ask for.
//!
//! Steps never mutate the device directly. They query a read-only
//! [`StepContext`] and return a list of [`StepAction`]s; the protocol manager
//! applies those once the new state has been committed.

use sealink_crypto::{ChallengeResponse, ChannelCreationChallenge, ChannelSeed, CHALLENGE_PREFIX_SIZE};
use sealink_encoding::Uid;

use super::{CoreMessage, ProtocolId};
use crate::identity::{CryptoIdentity, IdentityDetails, RemoteDevice};

/// Effect requested by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Post a message
    Send(CoreMessage),
    /// Create an unconfirmed oblivious channel with `remote`
    CreateChannel {
        /// Peer device
        remote: RemoteDevice,
        /// Channel key material
        seed: ChannelSeed,
    },
    /// Mark the channel with `remote` as confirmed
    ConfirmChannel {
        /// Peer device
        remote: RemoteDevice,
    },
    /// Delete any channel with `remote`
    DeleteChannel {
        /// Peer device
        remote: RemoteDevice,
    },
    /// Remember a consumed ping response
    RecordPingSignature(ChallengeResponse),
    /// Register a device of the owned identity
    AddOwnedDevice(Uid),
    /// Register a device of a contact
    AddContactDevice(RemoteDevice),
    /// Store the details published by a remote identity
    UpdateRemoteDetails {
        /// Identity the details belong to
        identity: CryptoIdentity,
        /// Published details
        details: IdentityDetails,
    },
    /// Remember that `instance_id` is handling `remote`
    TrackInstance {
        /// Protocol of the instance
        protocol: ProtocolId,
        /// Peer device
        remote: RemoteDevice,
        /// Instance
        instance_id: Uid,
    },
    /// Abort every instance of `protocol` handling `remote`
    AbortInstances {
        /// Protocol of the instances
        protocol: ProtocolId,
        /// Peer device
        remote: RemoteDevice,
    },
}

/// Read-only view of the device a step runs on.
pub trait StepContext {
    /// Identity owning this device.
    fn owned_identity(&self) -> &CryptoIdentity;

    /// Uid of this device.
    fn current_device(&self) -> Uid;

    /// Answer `challenge` with the owned identity's signing key.
    fn solve_challenge(
        &self,
        challenge: &ChannelCreationChallenge<'_>,
        prefix: [u8; CHALLENGE_PREFIX_SIZE],
    ) -> ChallengeResponse;

    /// Whether `identity` is a trusted contact.
    fn is_trusted_contact(&self, identity: &CryptoIdentity) -> bool;

    /// Whether the contact `identity` is active (not revoked or blocked).
    fn is_active_contact(&self, identity: &CryptoIdentity) -> bool;

    /// Details this device publishes about its owned identity.
    fn published_details(&self) -> IdentityDetails;

    /// Whether a channel (confirmed or not) exists with `remote`.
    fn channel_exists(&self, remote: &RemoteDevice) -> bool;

    /// Whether `response` was already consumed by an earlier ping.
    fn ping_signature_seen(&self, response: &ChallengeResponse) -> bool;

    /// Instances of `protocol` currently handling `remote`.
    fn running_instances_for(&self, protocol: ProtocolId, remote: &RemoteDevice) -> Vec<Uid>;
}

/// A device the manager can apply step actions to.
///
/// `Send` and `AbortInstances` are handled by the manager itself; every
/// other action is passed to [`DeviceContext::apply`].
pub trait DeviceContext: StepContext {
    /// Apply a local effect.
    fn apply(&mut self, action: &StepAction);

    /// Stop tracking an instance that ended or was aborted.
    fn forget_instance(&mut self, protocol: ProtocolId, instance_id: Uid);
}
