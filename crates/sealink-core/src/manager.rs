//! Protocol Manager
//!
//! Owns the collaborators (store, channel sink, environment) and drives one
//! received message at a time through the engine:
//!
//! ```text
//! load state (or initial) → execute → commit batch → apply actions
//! ```
//!
//! A final state is deleted from the store instead of being written back,
//! in the same batch that deletes superseded instances. Actions are applied
//! in the order the step returned them, once the batch is committed.
//! Rejected and ignored messages touch nothing.

use sealink_encoding::Uid;
use tracing::{debug, info, trace, warn};

use crate::{
    config::EngineConfig,
    env::Environment,
    error::ProtocolError,
    identity::RemoteDevice,
    protocol::{
        ChannelInfo, ConcreteProtocol, ConcreteProtocolState, CoreMessage, DeviceContext,
        ProtocolId, ProtocolInstance, StepAction, StepContext, Transition, engine,
        validate_catalog,
    },
    protocols::{
        ChannelCreationWithContactDevice, ChannelCreationWithOwnedDevice, PeerKind,
        channel_creation::initial_message,
    },
    store::{ProtocolStore, StoreBatch},
    transport::ChannelSink,
};

/// Runs protocol instances for one device.
pub struct ProtocolManager<S, T, E> {
    store: S,
    sink: T,
    env: E,
    config: EngineConfig,
}

impl<S: ProtocolStore, T: ChannelSink, E: Environment> ProtocolManager<S, T, E> {
    /// Create a manager. With `config.strict_catalog`, every protocol step
    /// catalog is validated first.
    pub fn new(store: S, sink: T, env: E, config: EngineConfig) -> Result<Self, ProtocolError> {
        if config.strict_catalog {
            validate_catalog::<ChannelCreationWithOwnedDevice>()?;
            validate_catalog::<ChannelCreationWithContactDevice>()?;
        }
        Ok(Self { store, sink, env, config })
    }

    /// Instance store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Outgoing message sink
    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Mutable access to the sink, e.g. to drain collected messages.
    pub fn sink_mut(&mut self) -> &mut T {
        &mut self.sink
    }

    /// Environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a channel creation with `remote` by posting a local `Initial`
    /// message for a fresh instance. Returns the instance id.
    pub fn start_channel_creation<K: PeerKind, C: StepContext>(
        &mut self,
        ctx: &C,
        remote: RemoteDevice,
    ) -> Result<Uid, ProtocolError> {
        let instance_id = self.env.random_uid();
        let message =
            initial_message::<K, E>(*ctx.owned_identity(), instance_id, remote, &self.env);
        self.sink.post(message)?;

        info!(
            protocol = %K::PROTOCOL_ID,
            instance = ?instance_id,
            remote_device = ?remote.device,
            "channel creation started"
        );
        Ok(instance_id)
    }

    /// Parse raw bytes received over `channel` and process them.
    pub fn receive_bytes<C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        raw: &[u8],
        channel: ChannelInfo,
    ) -> Result<Transition, ProtocolError> {
        let message =
            CoreMessage::from_received_bytes(raw, channel, &self.config.decode_limits)
                .map_err(ProtocolError::MalformedEnvelope)?;
        self.receive(ctx, &message)
    }

    /// Process one received message.
    ///
    /// # Errors
    ///
    /// Engine errors (see [`engine::execute`]) and collaborator failures.
    /// On a store failure nothing was changed and the message can be
    /// retried. [`ProtocolError::Undelivered`] means the transition took
    /// effect and carries the messages still to be posted.
    pub fn receive<C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        message: &CoreMessage,
    ) -> Result<Transition, ProtocolError> {
        match message.protocol_id {
            ProtocolId::ChannelCreationWithOwnedDevice => {
                self.receive_for::<ChannelCreationWithOwnedDevice, C>(ctx, message)
            },
            ProtocolId::ChannelCreationWithContactDevice => {
                self.receive_for::<ChannelCreationWithContactDevice, C>(ctx, message)
            },
        }
    }

    /// Force an instance into its cancelled state and drop it.
    pub fn abort<C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Transition, ProtocolError> {
        match protocol {
            ProtocolId::ChannelCreationWithOwnedDevice => {
                self.abort_for::<ChannelCreationWithOwnedDevice, C>(ctx, instance_id)
            },
            ProtocolId::ChannelCreationWithContactDevice => {
                self.abort_for::<ChannelCreationWithContactDevice, C>(ctx, instance_id)
            },
        }
    }

    /// Stored state of an instance, if it is still running.
    pub fn instance_state(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Option<ConcreteProtocolState>, ProtocolError> {
        Ok(self.store.load(protocol, instance_id)?)
    }

    fn receive_for<P: ConcreteProtocol, C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        message: &CoreMessage,
    ) -> Result<Transition, ProtocolError> {
        let instance = self.load::<P, C>(ctx, message.instance_id)?;
        let transition = engine::execute::<P, C, E>(&instance, message, ctx, &self.env)?;
        self.commit::<P, C>(ctx, message.instance_id, &transition)?;
        Ok(transition)
    }

    fn abort_for<P: ConcreteProtocol, C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        instance_id: Uid,
    ) -> Result<Transition, ProtocolError> {
        let instance = self.load::<P, C>(ctx, instance_id)?;
        let transition = engine::abort::<P>(&instance);
        self.commit::<P, C>(ctx, instance_id, &transition)?;
        info!(protocol = %P::ID, instance = ?instance_id, "instance aborted");
        Ok(transition)
    }

    fn load<P: ConcreteProtocol, C: StepContext>(
        &self,
        ctx: &C,
        instance_id: Uid,
    ) -> Result<ProtocolInstance, ProtocolError> {
        match self.store.load(P::ID, instance_id)? {
            Some(state) => Ok(ProtocolInstance {
                instance_id,
                owned_identity: *ctx.owned_identity(),
                protocol_id: P::ID,
                state,
            }),
            None => {
                trace!(protocol = %P::ID, instance = ?instance_id, "new instance");
                Ok(ProtocolInstance::initial::<P>(instance_id, *ctx.owned_identity()))
            },
        }
    }

    /// All store writes of the transition go into one batch. A failed commit
    /// leaves store and device untouched, and the message can be retried.
    /// Device effects and sends follow, in the order the step returned them.
    fn commit<P: ConcreteProtocol, C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        instance_id: Uid,
        transition: &Transition,
    ) -> Result<(), ProtocolError> {
        let Transition::Advanced { new_state, actions, is_final } = transition else {
            return Ok(());
        };

        let superseded = superseded_instances(ctx, actions, (P::ID, instance_id));
        let mut batch = StoreBatch::new();
        for (protocol, superseded_id) in &superseded {
            batch.delete(*protocol, *superseded_id);
        }
        if *is_final {
            batch.delete(P::ID, instance_id);
        } else {
            batch.put(P::ID, instance_id, new_state.clone());
        }
        self.store.commit(&batch)?;

        for (protocol, superseded_id) in superseded {
            ctx.forget_instance(protocol, superseded_id);
        }
        if *is_final {
            ctx.forget_instance(P::ID, instance_id);
            debug!(protocol = %P::ID, instance = ?instance_id, "instance finished");
        }

        self.apply_actions(ctx, actions)
    }

    /// Once the sink refuses a message, later device effects still apply and
    /// later messages are returned with it.
    fn apply_actions<C: DeviceContext>(
        &mut self,
        ctx: &mut C,
        actions: &[StepAction],
    ) -> Result<(), ProtocolError> {
        let mut refused = None;
        let mut pending = Vec::new();
        for action in actions {
            match action {
                StepAction::Send(message) if refused.is_some() => pending.push(message.clone()),
                StepAction::Send(message) => {
                    if let Err(err) = self.sink.post(message.clone()) {
                        warn!(
                            protocol = %message.protocol_id,
                            instance = ?message.instance_id,
                            error = %err,
                            "sink refused message after commit"
                        );
                        refused = Some(err);
                        pending.push(message.clone());
                    }
                },
                StepAction::AbortInstances { .. } => {},
                other => ctx.apply(other),
            }
        }
        match refused {
            Some(source) => Err(ProtocolError::Undelivered { source, pending }),
            None => Ok(()),
        }
    }
}

/// Instances swept by `AbortInstances`, without the instance being advanced.
fn superseded_instances<C: StepContext>(
    ctx: &C,
    actions: &[StepAction],
    current: (ProtocolId, Uid),
) -> Vec<(ProtocolId, Uid)> {
    let mut superseded = Vec::new();
    for action in actions {
        let StepAction::AbortInstances { protocol, remote } = action else {
            continue;
        };
        for instance_id in ctx.running_instances_for(*protocol, remote) {
            let key = (*protocol, instance_id);
            if key == current || superseded.contains(&key) {
                continue;
            }
            debug!(
                protocol = %protocol,
                instance = ?instance_id,
                remote_device = ?remote.device,
                "aborting superseded instance"
            );
            superseded.push(key);
        }
    }
    superseded
}
