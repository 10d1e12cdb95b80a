//! Simulated network of devices.
//!
//! Delivery is a single FIFO queue. Each step pops one packet, hands it to
//! the recipient's manager, then routes whatever the recipient posted:
//!
//! - local messages loop back to the sender
//! - asymmetric messages travel as plain wire bytes
//! - oblivious messages are sealed under the sender's directional channel key
//!   and opened with the recipient's copy of the channel
//!
//! A message that fails with a recoverable error (store outage) is put back
//! at the front of the queue, so the recipient retries it before anything
//! else is delivered.

use std::{collections::VecDeque, time::Duration};

use sealink_core::{
    ChannelInfo, CoreMessage, EngineConfig, Environment, ProtocolError, ProtocolId,
    ProtocolManager, RemoteDevice, SendChannel, StepRejection, Transition, TransportError,
    protocol::IgnoreReason,
    protocols::PeerKind,
    store::{ChaoticStore, MemoryStore, ProtocolStore},
};
use sealink_crypto::{NONCE_SIZE, SealedMessage, open, seal};
use sealink_encoding::{DecodeError, Uid};
use tracing::{debug, trace};

use crate::{
    device::SimDevice,
    error::{HarnessError, PartyId},
    fault::FaultInjector,
    invariants::{ChannelView, DeviceSnapshot, InvariantRegistry, NetworkSnapshot},
    sim_env::SimEnv,
};

/// Simulated time between two deliveries.
const STEP_DURATION: Duration = Duration::from_millis(10);

const PROTOCOLS: [ProtocolId; 2] =
    [ProtocolId::ChannelCreationWithOwnedDevice, ProtocolId::ChannelCreationWithContactDevice];

/// Manager run by every simulated party.
pub type SimManager = ProtocolManager<ChaoticStore<MemoryStore>, Vec<CoreMessage>, SimEnv>;

/// A device together with its protocol manager.
pub struct SimParty {
    /// Device state
    pub device: SimDevice,
    manager: SimManager,
}

impl SimParty {
    fn new(
        device: SimDevice,
        env: SimEnv,
        store: ChaoticStore<MemoryStore>,
    ) -> Result<Self, ProtocolError> {
        let manager = ProtocolManager::new(store, Vec::new(), env, EngineConfig::default())?;
        Ok(Self { device, manager })
    }

    /// The party's manager.
    pub fn manager(&self) -> &SimManager {
        &self.manager
    }

    /// Instances present in the store, bypassing injected failures.
    pub fn stored_instances(&self) -> std::collections::BTreeSet<(ProtocolId, Uid)> {
        let store = self.manager.store().inner();
        PROTOCOLS
            .into_iter()
            .flat_map(|protocol| {
                let ids = store.instances(protocol).unwrap_or_default();
                ids.into_iter().map(move |id| (protocol, id))
            })
            .collect()
    }

    /// Stored state id of an instance, bypassing injected failures.
    pub fn instance_state_id(&self, protocol: ProtocolId, instance_id: Uid) -> Option<u16> {
        let state = self.manager.store().inner().load(protocol, instance_id).ok().flatten();
        state.map(|state| state.state_id)
    }
}

/// How a delivered message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A step ran
    Advanced {
        /// Resulting state id
        state_id: u16,
        /// Whether the instance ended
        is_final: bool,
    },
    /// The resolved step declined the message
    Rejected(StepRejection),
    /// No step applied
    Ignored(IgnoreReason),
}

impl From<&Transition> for Outcome {
    fn from(transition: &Transition) -> Self {
        match transition {
            Transition::Advanced { new_state, is_final, .. } => {
                Self::Advanced { state_id: new_state.state_id, is_final: *is_final }
            },
            Transition::Rejected { reason } => Self::Rejected(reason.clone()),
            Transition::Ignored(reason) => Self::Ignored(*reason),
        }
    }
}

/// One processed message.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Recipient
    pub to: PartyId,
    /// Protocol addressed
    pub protocol: ProtocolId,
    /// Instance addressed
    pub instance_id: Uid,
    /// Message kind id
    pub message_kind: u16,
    /// What happened
    pub outcome: Outcome,
}

/// Why a message never reached a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Routing failed at the sender
    Transport(TransportError),
    /// Sealed message did not open at the recipient
    Undecryptable,
    /// Received bytes are not an envelope
    Malformed(DecodeError),
    /// Removed by a fault injector
    Injected,
}

/// One message that was not delivered.
#[derive(Debug, Clone)]
pub struct Dropped {
    /// Party that sent the message
    pub from: PartyId,
    /// Why
    pub reason: DropReason,
}

#[derive(Debug, Clone)]
enum Body {
    Local(Vec<u8>),
    Asymmetric(Vec<u8>),
    Oblivious(SealedMessage),
}

#[derive(Debug, Clone)]
struct Packet {
    from: PartyId,
    to: PartyId,
    sender: RemoteDevice,
    body: Body,
}

/// Deterministic network of simulated devices.
pub struct SimNetwork {
    env: SimEnv,
    parties: Vec<SimParty>,
    queue: VecDeque<Packet>,
    faults: Vec<FaultInjector>,
    invariants: Option<InvariantRegistry>,
    store_failure_rate: f64,
    deliveries: Vec<Delivery>,
    dropped: Vec<Dropped>,
    retries: usize,
    steps: usize,
}

impl SimNetwork {
    /// Empty network drawing all randomness from `env`.
    pub fn new(env: SimEnv) -> Self {
        Self {
            env,
            parties: Vec::new(),
            queue: VecDeque::new(),
            faults: Vec::new(),
            invariants: None,
            store_failure_rate: 0.0,
            deliveries: Vec::new(),
            dropped: Vec::new(),
            retries: 0,
            steps: 0,
        }
    }

    /// Check `registry` after every delivery.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Fail store operations of parties added later with probability
    /// `rate`.
    #[must_use]
    pub fn with_store_failure_rate(mut self, rate: f64) -> Self {
        self.store_failure_rate = rate;
        self
    }

    /// Tamper with routed messages.
    pub fn add_fault(&mut self, injector: FaultInjector) {
        self.faults.push(injector);
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Add a device and its manager.
    pub fn add_device(&mut self, device: SimDevice) -> Result<PartyId, HarnessError> {
        let party = PartyId(self.parties.len());
        let store = ChaoticStore::with_seed(
            MemoryStore::new(),
            self.store_failure_rate,
            self.env.random_u64(),
        );
        let sim = SimParty::new(device, self.env.clone(), store)
            .map_err(|source| HarnessError::Protocol { party, source })?;
        self.parties.push(sim);
        Ok(party)
    }

    /// Party `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not returned by [`Self::add_device`].
    pub fn party(&self, id: PartyId) -> &SimParty {
        &self.parties[id.0]
    }

    /// Mutable party `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not returned by [`Self::add_device`].
    pub fn party_mut(&mut self, id: PartyId) -> &mut SimParty {
        &mut self.parties[id.0]
    }

    /// Start a channel creation from `from` towards `to`'s device.
    pub fn start_channel_creation<K: PeerKind>(
        &mut self,
        from: PartyId,
        to: PartyId,
    ) -> Result<Uid, HarnessError> {
        let remote = self.party(to).device.as_remote();
        let party = &mut self.parties[from.0];
        let instance_id = party
            .manager
            .start_channel_creation::<K, _>(&party.device, remote)
            .map_err(|source| HarnessError::Protocol { party: from, source })?;
        self.flush(from);
        Ok(instance_id)
    }

    /// Abort an instance running on `party`.
    pub fn abort(
        &mut self,
        party: PartyId,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Transition, HarnessError> {
        let sim = &mut self.parties[party.0];
        let transition = sim
            .manager
            .abort(&mut sim.device, protocol, instance_id)
            .map_err(|source| HarnessError::Protocol { party, source })?;
        self.flush(party);
        Ok(transition)
    }

    /// Messages in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Every processed message, in order.
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Every message that never reached a manager.
    pub fn dropped(&self) -> &[Dropped] {
        &self.dropped
    }

    /// Messages put back after a recoverable failure.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Deliver packets until none are in flight.
    ///
    /// # Errors
    ///
    /// `StepLimit` if messages remain after `max_steps` deliveries, or the
    /// first error of [`Self::step`].
    pub fn run_until_quiet(&mut self, max_steps: usize) -> Result<usize, HarnessError> {
        let start = self.steps;
        while self.step()? {
            if self.steps - start >= max_steps && !self.queue.is_empty() {
                return Err(HarnessError::StepLimit(max_steps));
            }
        }
        Ok(self.steps - start)
    }

    /// Deliver one packet. Returns `false` if nothing was in flight.
    pub fn step(&mut self) -> Result<bool, HarnessError> {
        let Some(packet) = self.queue.pop_front() else {
            return Ok(false);
        };
        self.steps += 1;
        self.env.advance(STEP_DURATION);

        if let Some(message) = self.open(&packet) {
            self.deliver(packet, &message)?;
        }

        if let Some(registry) = &self.invariants {
            registry
                .check_all(&self.snapshot())
                .map_err(|violations| HarnessError::Invariant { step: self.steps, violations })?;
        }
        Ok(true)
    }

    /// Observable state of every device.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let devices = self
            .parties
            .iter()
            .map(|party| DeviceSnapshot {
                remote: party.device.as_remote(),
                channels: party
                    .device
                    .channels()
                    .iter()
                    .map(|(remote, channel)| {
                        let view = ChannelView {
                            seed: *channel.seed.as_bytes(),
                            confirmed: channel.confirmed,
                        };
                        (*remote, view)
                    })
                    .collect(),
                tracked: party.device.tracked_instances(),
                stored: party.stored_instances(),
            })
            .collect();
        NetworkSnapshot { devices }
    }

    fn open(&mut self, packet: &Packet) -> Option<CoreMessage> {
        let recipient = &self.parties[packet.to.0];
        let limits = recipient.manager.config().decode_limits;
        let received = match &packet.body {
            Body::Local(bytes) => Some((bytes.clone(), ChannelInfo::Local)),
            Body::Asymmetric(bytes) => Some((bytes.clone(), ChannelInfo::AsymmetricChannel)),
            Body::Oblivious(sealed) => recipient
                .device
                .channel(&packet.sender)
                .and_then(|channel| {
                    let key = channel
                        .seed
                        .directional_key(&packet.sender.device, &recipient.device.device());
                    open(&key, sealed).ok()
                })
                .map(|bytes| (bytes, ChannelInfo::ObliviousChannel { remote: packet.sender })),
        };
        let Some((bytes, channel)) = received else {
            self.drop_packet(packet.from, DropReason::Undecryptable);
            return None;
        };

        match CoreMessage::from_received_bytes(&bytes, channel, &limits) {
            Ok(message) => Some(message),
            Err(err) => {
                self.drop_packet(packet.from, DropReason::Malformed(err));
                None
            },
        }
    }

    fn deliver(&mut self, packet: Packet, message: &CoreMessage) -> Result<(), HarnessError> {
        let to = packet.to;
        let party = &mut self.parties[to.0];
        match party.manager.receive(&mut party.device, message) {
            Ok(transition) => {
                trace!(%to, kind = message.message_kind, ?transition, "delivered");
                self.deliveries.push(Delivery {
                    to,
                    protocol: message.protocol_id,
                    instance_id: message.instance_id,
                    message_kind: message.message_kind,
                    outcome: Outcome::from(&transition),
                });
                self.flush(to);
                Ok(())
            },
            Err(err) if err.is_recoverable() => {
                debug!(%to, error = %err, "recoverable failure, retrying");
                self.retries += 1;
                self.queue.push_front(packet);
                Ok(())
            },
            Err(source) => Err(HarnessError::Protocol { party: to, source }),
        }
    }

    fn flush(&mut self, from: PartyId) {
        let outgoing = std::mem::take(self.parties[from.0].manager.sink_mut());
        for message in outgoing {
            self.route(from, message);
        }
    }

    fn route(&mut self, from: PartyId, mut message: CoreMessage) {
        if !self.faults.iter_mut().all(|fault| fault.apply(&mut message)) {
            self.drop_packet(from, DropReason::Injected);
            return;
        }

        let sender = self.parties[from.0].device.as_remote();
        let Some(destination) = message.destination().cloned() else {
            self.drop_packet(from, DropReason::Transport(TransportError::NoDestination));
            return;
        };
        let bytes = message.to_wire().to_bytes();

        match destination {
            SendChannel::Local { .. } => {
                self.queue.push_back(Packet { from, to: from, sender, body: Body::Local(bytes) });
            },
            SendChannel::AsymmetricChannel { to_identity, remote_devices } => {
                for device in remote_devices {
                    let remote = RemoteDevice::new(to_identity, device);
                    match self.find(&remote) {
                        Some(to) => self.queue.push_back(Packet {
                            from,
                            to,
                            sender,
                            body: Body::Asymmetric(bytes.clone()),
                        }),
                        None => self.drop_packet(
                            from,
                            DropReason::Transport(TransportError::UnknownDevice(device)),
                        ),
                    }
                }
            },
            SendChannel::ObliviousChannel {
                to_identity,
                remote_devices,
                necessarily_confirmed,
            } => {
                for device in remote_devices {
                    let remote = RemoteDevice::new(to_identity, device);
                    match self.seal_for(from, &remote, necessarily_confirmed, &bytes) {
                        Ok((to, sealed)) => self.queue.push_back(Packet {
                            from,
                            to,
                            sender,
                            body: Body::Oblivious(sealed),
                        }),
                        Err(err) => self.drop_packet(from, DropReason::Transport(err)),
                    }
                }
            },
        }
    }

    fn seal_for(
        &self,
        from: PartyId,
        remote: &RemoteDevice,
        necessarily_confirmed: bool,
        bytes: &[u8],
    ) -> Result<(PartyId, SealedMessage), TransportError> {
        let sender = &self.parties[from.0].device;
        let channel = sender.channel(remote).ok_or(TransportError::NoChannel(remote.device))?;
        if necessarily_confirmed && !channel.confirmed {
            return Err(TransportError::ChannelNotConfirmed(remote.device));
        }
        let to = self.find(remote).ok_or(TransportError::UnknownDevice(remote.device))?;

        let key = channel.seed.directional_key(&sender.device(), &remote.device);
        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce);
        Ok((to, seal(&key, bytes, nonce)))
    }

    fn find(&self, remote: &RemoteDevice) -> Option<PartyId> {
        self.parties.iter().position(|party| &party.device.as_remote() == remote).map(PartyId)
    }

    fn drop_packet(&mut self, from: PartyId, reason: DropReason) {
        debug!(%from, ?reason, "message dropped");
        self.dropped.push(Dropped { from, reason });
    }
}
