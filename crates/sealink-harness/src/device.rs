//! Simulated device: the identity, contacts, channels and bookkeeping a
//! protocol step reads, and the effects it requests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use sealink_core::{
    CryptoIdentity, DeviceContext, IdentityDetails, ProtocolId, RemoteDevice, StepAction,
    StepContext,
};
use sealink_crypto::{
    CHALLENGE_PREFIX_SIZE, ChallengeResponse, ChannelCreationChallenge, ChannelSeed,
    SigningKeyPair,
};
use sealink_encoding::Uid;
use tracing::{debug, warn};

/// Trust status of a contact identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactStatus {
    /// Identity is a trusted contact
    pub trusted: bool,
    /// Contact is neither revoked nor blocked
    pub active: bool,
}

/// Oblivious channel held by a device.
#[derive(Debug, Clone)]
pub struct SimChannel {
    /// Channel root key
    pub seed: ChannelSeed,
    /// Both sides acknowledged the channel
    pub confirmed: bool,
}

/// One simulated device.
pub struct SimDevice {
    signer: SigningKeyPair,
    identity: CryptoIdentity,
    device: Uid,
    details: IdentityDetails,
    contacts: HashMap<CryptoIdentity, ContactStatus>,
    owned_devices: BTreeSet<Uid>,
    contact_devices: BTreeSet<RemoteDevice>,
    channels: BTreeMap<RemoteDevice, SimChannel>,
    seen_pings: HashSet<ChallengeResponse>,
    running: BTreeMap<(ProtocolId, RemoteDevice), BTreeSet<Uid>>,
    remote_details: HashMap<CryptoIdentity, IdentityDetails>,
}

impl SimDevice {
    /// Device `device` of the identity held by `signer`.
    pub fn new(signer: SigningKeyPair, device: Uid, details: IdentityDetails) -> Self {
        let identity = signer.verification_key();
        Self {
            signer,
            identity,
            device,
            details,
            contacts: HashMap::new(),
            owned_devices: BTreeSet::new(),
            contact_devices: BTreeSet::new(),
            channels: BTreeMap::new(),
            seen_pings: HashSet::new(),
            running: BTreeMap::new(),
            remote_details: HashMap::new(),
        }
    }

    /// Identity owning the device.
    pub fn identity(&self) -> CryptoIdentity {
        self.identity
    }

    /// Device uid.
    pub fn device(&self) -> Uid {
        self.device
    }

    /// This device as seen by others.
    pub fn as_remote(&self) -> RemoteDevice {
        RemoteDevice::new(self.identity, self.device)
    }

    /// Record `identity` as a contact.
    pub fn set_contact(&mut self, identity: CryptoIdentity, status: ContactStatus) {
        self.contacts.insert(identity, status);
    }

    /// Channel with `remote`, if any.
    pub fn channel(&self, remote: &RemoteDevice) -> Option<&SimChannel> {
        self.channels.get(remote)
    }

    /// Every channel held by the device.
    pub fn channels(&self) -> &BTreeMap<RemoteDevice, SimChannel> {
        &self.channels
    }

    /// Whether a confirmed channel with `remote` exists.
    pub fn has_confirmed_channel(&self, remote: &RemoteDevice) -> bool {
        self.channels.get(remote).is_some_and(|channel| channel.confirmed)
    }

    /// Registered devices of the owned identity.
    pub fn owned_devices(&self) -> &BTreeSet<Uid> {
        &self.owned_devices
    }

    /// Registered contact devices.
    pub fn contact_devices(&self) -> &BTreeSet<RemoteDevice> {
        &self.contact_devices
    }

    /// Details last published by `identity`.
    pub fn remote_details(&self, identity: &CryptoIdentity) -> Option<&IdentityDetails> {
        self.remote_details.get(identity)
    }

    /// Instances currently tracked, with their protocol.
    pub fn tracked_instances(&self) -> BTreeSet<(ProtocolId, Uid)> {
        self.running
            .iter()
            .flat_map(|((protocol, _), ids)| ids.iter().map(|id| (*protocol, *id)))
            .collect()
    }
}

impl StepContext for SimDevice {
    fn owned_identity(&self) -> &CryptoIdentity {
        &self.identity
    }

    fn current_device(&self) -> Uid {
        self.device
    }

    fn solve_challenge(
        &self,
        challenge: &ChannelCreationChallenge<'_>,
        prefix: [u8; CHALLENGE_PREFIX_SIZE],
    ) -> ChallengeResponse {
        challenge.solve(&self.signer, prefix)
    }

    fn is_trusted_contact(&self, identity: &CryptoIdentity) -> bool {
        self.contacts.get(identity).is_some_and(|status| status.trusted)
    }

    fn is_active_contact(&self, identity: &CryptoIdentity) -> bool {
        self.contacts.get(identity).is_some_and(|status| status.active)
    }

    fn published_details(&self) -> IdentityDetails {
        self.details.clone()
    }

    fn channel_exists(&self, remote: &RemoteDevice) -> bool {
        self.channels.contains_key(remote)
    }

    fn ping_signature_seen(&self, response: &ChallengeResponse) -> bool {
        self.seen_pings.contains(response)
    }

    fn running_instances_for(&self, protocol: ProtocolId, remote: &RemoteDevice) -> Vec<Uid> {
        self.running
            .get(&(protocol, *remote))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl DeviceContext for SimDevice {
    fn apply(&mut self, action: &StepAction) {
        match action {
            StepAction::CreateChannel { remote, seed } => {
                debug!(device = ?self.device, remote = ?remote.device, "channel created");
                self.channels.insert(*remote, SimChannel { seed: seed.clone(), confirmed: false });
            },
            StepAction::ConfirmChannel { remote } => match self.channels.get_mut(remote) {
                Some(channel) => channel.confirmed = true,
                None => warn!(device = ?self.device, remote = ?remote.device, "no channel to confirm"),
            },
            StepAction::DeleteChannel { remote } => {
                self.channels.remove(remote);
            },
            StepAction::RecordPingSignature(response) => {
                self.seen_pings.insert(*response);
            },
            StepAction::AddOwnedDevice(device) => {
                self.owned_devices.insert(*device);
            },
            StepAction::AddContactDevice(remote) => {
                self.contact_devices.insert(*remote);
            },
            StepAction::UpdateRemoteDetails { identity, details } => {
                self.remote_details.insert(*identity, details.clone());
            },
            StepAction::TrackInstance { protocol, remote, instance_id } => {
                self.running.entry((*protocol, *remote)).or_default().insert(*instance_id);
            },
            StepAction::Send(_) | StepAction::AbortInstances { .. } => {
                warn!(device = ?self.device, ?action, "manager-level action reached the device");
            },
        }
    }

    fn forget_instance(&mut self, protocol: ProtocolId, instance_id: Uid) {
        self.running.retain(|(tracked, _), ids| {
            if *tracked == protocol {
                ids.remove(&instance_id);
            }
            !ids.is_empty()
        });
    }
}
