//! Step resolution engine.
//!
//! Given the stored state of one instance and one received message, the
//! engine:
//!
//! 1. decodes the state (a failure here is a corrupt store, not a bad peer)
//! 2. maps the message kind id to the protocol's message kind
//! 3. finds the catalog steps whose signature accepts the (state kind,
//!    message kind, reception channel) triple
//! 4. requires exactly one candidate, decodes the message inputs and runs
//!    the step
//!
//! The step runs synchronously and either returns a replacement state plus
//! actions, or rejects the message. A rejection leaves the instance exactly
//! as it was.
//!
//! Zero candidates is the normal "unexpected message in this state" outcome.
//! Two or more candidates means the catalog itself is wrong: it is logged at
//! `error!`, trips a `debug_assert!` and surfaces as
//! [`ProtocolError::AmbiguousStep`].

use std::fmt;

use sealink_encoding::Uid;
use tracing::{debug, error, warn};

use super::{
    ConcreteProtocolMessage, ConcreteProtocolState, KindId, ProtocolId, ProtocolState,
    StepAction, StepContext,
    message::{ChannelInfo, CoreMessage},
};
use crate::{
    env::Environment,
    error::{ProtocolError, StepRejection},
    identity::{CryptoIdentity, RemoteDevice},
};

/// State kind of protocol `P`.
pub type StateKind<P> = <<P as ConcreteProtocol>::State as ProtocolState>::Kind;

/// Message kind of protocol `P`.
pub type MessageKind<P> = <<P as ConcreteProtocol>::Message as ConcreteProtocolMessage>::Kind;

/// Reception channel a step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedChannel {
    /// Posted locally by this device
    Local,
    /// Received over the asymmetric channel
    Asymmetric,
    /// Received over the oblivious channel with the remote the current state
    /// is bound to
    ObliviousFromBoundRemote,
}

impl ExpectedChannel {
    /// Whether a message received over `info` is acceptable, given the
    /// remote the current state is bound to.
    #[must_use]
    pub fn accepts(self, info: &ChannelInfo, bound: Option<&RemoteDevice>) -> bool {
        match (self, info) {
            (Self::Local, ChannelInfo::Local)
            | (Self::Asymmetric, ChannelInfo::AsymmetricChannel) => true,
            (Self::ObliviousFromBoundRemote, ChannelInfo::ObliviousChannel { remote }) => {
                bound == Some(remote)
            },
            _ => false,
        }
    }
}

/// What a step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSignature<S, M> {
    /// Start state kind
    pub state: S,
    /// Message kind
    pub message: M,
    /// Reception channel
    pub channel: ExpectedChannel,
}

/// Successful step result.
#[derive(Debug)]
pub struct StepOutcome<S> {
    /// Replacement state
    pub new_state: S,
    /// Effects to apply once the state is committed
    pub actions: Vec<StepAction>,
}

impl<S> StepOutcome<S> {
    /// Transition without side effects.
    pub fn new(new_state: S) -> Self {
        Self { new_state, actions: Vec::new() }
    }

    /// Transition with side effects.
    pub fn with_actions(new_state: S, actions: Vec<StepAction>) -> Self {
        Self { new_state, actions }
    }
}

/// A concrete protocol: its closed state/message/step enums and its step
/// catalog.
pub trait ConcreteProtocol {
    /// Protocol identifier.
    const ID: ProtocolId;

    /// State enum.
    type State: ProtocolState;

    /// Message enum.
    type Message: ConcreteProtocolMessage;

    /// Step enum.
    type Step: Copy + Eq + fmt::Debug + 'static;

    /// Every step of the protocol.
    const ALL_STEPS: &'static [Self::Step];

    /// Stable step id.
    fn step_id(step: Self::Step) -> u16;

    /// What `step` accepts.
    fn step_signature(step: Self::Step) -> StepSignature<StateKind<Self>, MessageKind<Self>>;

    /// State of a freshly created instance.
    fn initial_state() -> Self::State;

    /// Absorbing state reached on abort.
    fn cancelled_state() -> Self::State;

    /// Remote device `state` is bound to, if any. Oblivious-channel messages
    /// are only accepted from this device.
    fn bound_remote(state: &Self::State) -> Option<RemoteDevice>;

    /// Run `step` on its start state and message.
    ///
    /// # Errors
    ///
    /// `StepRejection` when the message must not cause a transition.
    fn execute_step<C: StepContext, E: Environment>(
        step: Self::Step,
        ctx: &C,
        env: &E,
        instance_id: Uid,
        state: Self::State,
        message: Self::Message,
    ) -> Result<StepOutcome<Self::State>, StepRejection>;
}

/// Snapshot of one running instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInstance {
    /// Instance identifier
    pub instance_id: Uid,
    /// Identity the instance runs for
    pub owned_identity: CryptoIdentity,
    /// Protocol run by the instance
    pub protocol_id: ProtocolId,
    /// Current state
    pub state: ConcreteProtocolState,
}

impl ProtocolInstance {
    /// Fresh instance of `P` in its initial state.
    #[must_use]
    pub fn initial<P: ConcreteProtocol>(instance_id: Uid, owned_identity: CryptoIdentity) -> Self {
        Self {
            instance_id,
            owned_identity,
            protocol_id: P::ID,
            state: P::initial_state().to_concrete(),
        }
    }
}

/// Step resolution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    /// No step accepts the input
    NoCandidate,
    /// Exactly one step accepts the input
    Step(T),
}

/// Why a message was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No step accepts this message in the current state
    NoCandidate,
    /// The protocol has no message with this kind id
    UnknownMessageKind(u16),
}

/// Result of executing one received message.
#[derive(Debug)]
pub enum Transition {
    /// A step ran and produced a replacement state
    Advanced {
        /// Replacement state
        new_state: ConcreteProtocolState,
        /// Effects to apply
        actions: Vec<StepAction>,
        /// Whether `new_state` ends the instance
        is_final: bool,
    },
    /// The resolved step declined the message; the state is unchanged
    Rejected {
        /// Why
        reason: StepRejection,
    },
    /// No step applies; the state is unchanged
    Ignored(IgnoreReason),
}

/// Find the single step of `P` accepting the input.
///
/// # Errors
///
/// `ProtocolError::AmbiguousStep` if several steps accept it. Debug builds
/// panic instead.
pub fn resolve_step<P: ConcreteProtocol>(
    state: StateKind<P>,
    message: MessageKind<P>,
    channel: &ChannelInfo,
    bound: Option<&RemoteDevice>,
) -> Result<Resolution<P::Step>, ProtocolError> {
    let candidates: Vec<P::Step> = P::ALL_STEPS
        .iter()
        .copied()
        .filter(|&step| {
            let signature = P::step_signature(step);
            signature.state == state
                && signature.message == message
                && signature.channel.accepts(channel, bound)
        })
        .collect();

    match candidates.as_slice() {
        [] => Ok(Resolution::NoCandidate),
        [step] => Ok(Resolution::Step(*step)),
        _ => {
            error!(
                protocol = %P::ID,
                state = ?state,
                message = ?message,
                candidates = ?candidates,
                "ambiguous step catalog"
            );
            debug_assert!(
                candidates.len() <= 1,
                "ambiguous step catalog for {}: {candidates:?}",
                P::ID
            );
            Err(ProtocolError::AmbiguousStep {
                protocol: P::ID,
                state: state.id(),
                message: message.id(),
                candidates: candidates.len(),
            })
        },
    }
}

/// Check that no two steps of `P` share a (state, message) pair.
///
/// # Errors
///
/// `ProtocolError::AmbiguousStep` for the first shared pair found.
pub fn validate_catalog<P: ConcreteProtocol>() -> Result<(), ProtocolError> {
    for (index, &step) in P::ALL_STEPS.iter().enumerate() {
        let signature = P::step_signature(step);
        let shared = P::ALL_STEPS[index..]
            .iter()
            .filter(|&&other| {
                let other = P::step_signature(other);
                other.state == signature.state && other.message == signature.message
            })
            .count();
        if shared > 1 {
            return Err(ProtocolError::AmbiguousStep {
                protocol: P::ID,
                state: signature.state.id(),
                message: signature.message.id(),
                candidates: shared,
            });
        }
    }
    Ok(())
}

/// Execute `received` against `instance`.
///
/// # Errors
///
/// - `ProtocolError::WrongProtocol` if the message names another protocol
/// - `ProtocolError::NotReceived` if the message has no reception info
/// - `ProtocolError::CorruptState` if the stored state does not decode
/// - `ProtocolError::AmbiguousStep` for an ill-formed catalog
pub fn execute<P: ConcreteProtocol, C: StepContext, E: Environment>(
    instance: &ProtocolInstance,
    received: &CoreMessage,
    ctx: &C,
    env: &E,
) -> Result<Transition, ProtocolError> {
    if received.protocol_id != P::ID {
        return Err(ProtocolError::WrongProtocol { expected: P::ID, actual: received.protocol_id });
    }
    let Some(channel) = received.reception() else {
        return Err(ProtocolError::NotReceived);
    };

    let state = P::State::from_concrete(&instance.state).map_err(|source| {
        ProtocolError::CorruptState { instance: instance.instance_id, source }
    })?;

    let Some(message_kind) = MessageKind::<P>::from_id(received.message_kind) else {
        debug!(
            protocol = %P::ID,
            instance = ?instance.instance_id,
            kind = received.message_kind,
            "unknown message kind"
        );
        return Ok(Transition::Ignored(IgnoreReason::UnknownMessageKind(received.message_kind)));
    };

    let bound = P::bound_remote(&state);
    let step = match resolve_step::<P>(state.kind(), message_kind, channel, bound.as_ref())? {
        Resolution::Step(step) => step,
        Resolution::NoCandidate => {
            debug!(
                protocol = %P::ID,
                instance = ?instance.instance_id,
                state = ?state.kind(),
                message = ?message_kind,
                "no candidate step"
            );
            return Ok(Transition::Ignored(IgnoreReason::NoCandidate));
        },
    };

    let message = match P::Message::decode(message_kind, &received.encoded_inputs) {
        Ok(message) => message,
        Err(err) => {
            warn!(
                protocol = %P::ID,
                instance = ?instance.instance_id,
                step = ?step,
                error = %err,
                "malformed message inputs"
            );
            return Ok(Transition::Rejected { reason: StepRejection::Malformed(err) });
        },
    };

    debug!(
        protocol = %P::ID,
        instance = ?instance.instance_id,
        step = ?step,
        step_id = P::step_id(step),
        "executing step"
    );

    match P::execute_step(step, ctx, env, instance.instance_id, state, message) {
        Ok(outcome) => {
            let is_final = outcome.new_state.is_final();
            debug!(
                protocol = %P::ID,
                instance = ?instance.instance_id,
                state = ?outcome.new_state.kind(),
                actions = outcome.actions.len(),
                is_final,
                "step committed"
            );
            Ok(Transition::Advanced {
                new_state: outcome.new_state.to_concrete(),
                actions: outcome.actions,
                is_final,
            })
        },
        Err(reason) => {
            warn!(
                protocol = %P::ID,
                instance = ?instance.instance_id,
                step = ?step,
                reason = %reason,
                "step rejected message"
            );
            Ok(Transition::Rejected { reason })
        },
    }
}

/// Force `instance` into the cancelled state, whatever its current state.
#[must_use]
pub fn abort<P: ConcreteProtocol>(instance: &ProtocolInstance) -> Transition {
    debug!(protocol = %P::ID, instance = ?instance.instance_id, "aborting instance");
    let cancelled = P::cancelled_state();
    Transition::Advanced {
        is_final: cancelled.is_final(),
        new_state: cancelled.to_concrete(),
        actions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use sealink_encoding::{Decode, DecodeError, Encode, EncodedValue};

    use super::*;
    use crate::{
        env::test_utils::MockEnv,
        protocol::{
            context::test_utils::FixedContext,
            message::{Routing, SendChannel},
        },
    };

    // A two-step lock: arm locally with a code, fire remotely with the same
    // code.

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum LockStateKind {
        Idle,
        Armed,
        Fired,
        Cancelled,
    }

    impl KindId for LockStateKind {
        const WHAT: &'static str = "state";

        fn id(self) -> u16 {
            self as u16
        }

        fn from_id(id: u16) -> Option<Self> {
            [Self::Idle, Self::Armed, Self::Fired, Self::Cancelled].into_iter().find(|k| k.id() == id)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum LockState {
        Idle,
        Armed { code: i64 },
        Fired,
        Cancelled,
    }

    impl ProtocolState for LockState {
        type Kind = LockStateKind;

        fn kind(&self) -> LockStateKind {
            match self {
                Self::Idle => LockStateKind::Idle,
                Self::Armed { .. } => LockStateKind::Armed,
                Self::Fired => LockStateKind::Fired,
                Self::Cancelled => LockStateKind::Cancelled,
            }
        }

        fn encode_payload(&self) -> EncodedValue {
            match self {
                Self::Armed { code } => (code,).encode(),
                _ => ConcreteProtocolState::sentinel_payload(),
            }
        }

        fn decode(kind: LockStateKind, payload: &EncodedValue) -> Result<Self, DecodeError> {
            Ok(match kind {
                LockStateKind::Idle => Self::Idle,
                LockStateKind::Armed => {
                    let (code,) = payload.decode_tuple()?;
                    Self::Armed { code }
                },
                LockStateKind::Fired => Self::Fired,
                LockStateKind::Cancelled => Self::Cancelled,
            })
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Fired | Self::Cancelled)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum LockMessageKind {
        Arm,
        Fire,
    }

    impl KindId for LockMessageKind {
        const WHAT: &'static str = "message";

        fn id(self) -> u16 {
            self as u16
        }

        fn from_id(id: u16) -> Option<Self> {
            match id {
                0 => Some(Self::Arm),
                1 => Some(Self::Fire),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum LockMessage {
        Arm { code: i64 },
        Fire { code: i64 },
    }

    impl ConcreteProtocolMessage for LockMessage {
        type Kind = LockMessageKind;

        fn kind(&self) -> LockMessageKind {
            match self {
                Self::Arm { .. } => LockMessageKind::Arm,
                Self::Fire { .. } => LockMessageKind::Fire,
            }
        }

        fn encoded_inputs(&self) -> Vec<EncodedValue> {
            match self {
                Self::Arm { code } | Self::Fire { code } => vec![code.encode()],
            }
        }

        fn decode(kind: LockMessageKind, inputs: &[EncodedValue]) -> Result<Self, DecodeError> {
            let [code] = inputs else {
                return Err(DecodeError::ArityMismatch { expected: 1, actual: inputs.len() });
            };
            let code = i64::decode(code)?;
            Ok(match kind {
                LockMessageKind::Arm => Self::Arm { code },
                LockMessageKind::Fire => Self::Fire { code },
            })
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum LockStep {
        Arm,
        Fire,
    }

    struct Lock;

    impl ConcreteProtocol for Lock {
        const ID: ProtocolId = ProtocolId::ChannelCreationWithOwnedDevice;
        const ALL_STEPS: &'static [LockStep] = &[LockStep::Arm, LockStep::Fire];

        type Message = LockMessage;
        type State = LockState;
        type Step = LockStep;

        fn step_id(step: LockStep) -> u16 {
            step as u16
        }

        fn step_signature(step: LockStep) -> StepSignature<LockStateKind, LockMessageKind> {
            match step {
                LockStep::Arm => StepSignature {
                    state: LockStateKind::Idle,
                    message: LockMessageKind::Arm,
                    channel: ExpectedChannel::Local,
                },
                LockStep::Fire => StepSignature {
                    state: LockStateKind::Armed,
                    message: LockMessageKind::Fire,
                    channel: ExpectedChannel::Asymmetric,
                },
            }
        }

        fn initial_state() -> LockState {
            LockState::Idle
        }

        fn cancelled_state() -> LockState {
            LockState::Cancelled
        }

        fn bound_remote(_: &LockState) -> Option<RemoteDevice> {
            None
        }

        fn execute_step<C: StepContext, E: Environment>(
            step: LockStep,
            _ctx: &C,
            _env: &E,
            _instance_id: Uid,
            state: LockState,
            message: LockMessage,
        ) -> Result<StepOutcome<LockState>, StepRejection> {
            match (step, state, message) {
                (LockStep::Arm, LockState::Idle, LockMessage::Arm { code }) => {
                    Ok(StepOutcome::new(LockState::Armed { code }))
                },
                (LockStep::Fire, LockState::Armed { code }, LockMessage::Fire { code: tried }) => {
                    if code == tried {
                        Ok(StepOutcome::new(LockState::Fired))
                    } else {
                        Err(StepRejection::InvalidSignature)
                    }
                },
                _ => Err(StepRejection::Inapplicable { step: Self::step_id(step) }),
            }
        }
    }

    // Same states and messages, but two steps claim (Idle, Arm).
    struct AmbiguousLock;

    impl ConcreteProtocol for AmbiguousLock {
        const ID: ProtocolId = ProtocolId::ChannelCreationWithOwnedDevice;
        const ALL_STEPS: &'static [LockStep] = &[LockStep::Arm, LockStep::Fire];

        type Message = LockMessage;
        type State = LockState;
        type Step = LockStep;

        fn step_id(step: LockStep) -> u16 {
            step as u16
        }

        fn step_signature(_: LockStep) -> StepSignature<LockStateKind, LockMessageKind> {
            StepSignature {
                state: LockStateKind::Idle,
                message: LockMessageKind::Arm,
                channel: ExpectedChannel::Local,
            }
        }

        fn initial_state() -> LockState {
            LockState::Idle
        }

        fn cancelled_state() -> LockState {
            LockState::Cancelled
        }

        fn bound_remote(_: &LockState) -> Option<RemoteDevice> {
            None
        }

        fn execute_step<C: StepContext, E: Environment>(
            step: LockStep,
            ctx: &C,
            env: &E,
            instance_id: Uid,
            state: LockState,
            message: LockMessage,
        ) -> Result<StepOutcome<LockState>, StepRejection> {
            Lock::execute_step(step, ctx, env, instance_id, state, message)
        }
    }

    fn received(message: &LockMessage, channel: ChannelInfo) -> CoreMessage {
        CoreMessage {
            protocol_id: Lock::ID,
            instance_id: Uid::from_bytes([7; 32]),
            message_kind: message.kind().id(),
            encoded_inputs: message.encoded_inputs(),
            routing: Routing::Received(channel),
            timestamp: std::time::UNIX_EPOCH,
        }
    }

    fn instance(state: &LockState) -> ProtocolInstance {
        ProtocolInstance {
            instance_id: Uid::from_bytes([7; 32]),
            owned_identity: *FixedContext::new().owned_identity(),
            protocol_id: Lock::ID,
            state: state.to_concrete(),
        }
    }

    fn run(state: &LockState, message: &LockMessage, channel: ChannelInfo) -> Transition {
        execute::<Lock, _, _>(
            &instance(state),
            &received(message, channel),
            &FixedContext::new(),
            &MockEnv::with_seed(0),
        )
        .expect("engine runs")
    }

    fn advanced_to(transition: Transition) -> LockState {
        let Transition::Advanced { new_state, .. } = transition else {
            panic!("expected advance, got {transition:?}");
        };
        LockState::from_concrete(&new_state).expect("decodable")
    }

    #[test]
    fn valid_catalog_passes() {
        assert_eq!(validate_catalog::<Lock>(), Ok(()));
    }

    #[test]
    fn ambiguous_catalog_detected() {
        assert!(matches!(
            validate_catalog::<AmbiguousLock>(),
            Err(ProtocolError::AmbiguousStep { candidates: 2, .. })
        ));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "ambiguous step catalog"))]
    fn ambiguous_resolution_is_loud() {
        let result = resolve_step::<AmbiguousLock>(
            LockStateKind::Idle,
            LockMessageKind::Arm,
            &ChannelInfo::Local,
            None,
        );
        assert!(matches!(result, Err(ProtocolError::AmbiguousStep { .. })));
    }

    #[test]
    fn steps_advance_in_order() {
        let armed = advanced_to(run(&LockState::Idle, &LockMessage::Arm { code: 5 }, ChannelInfo::Local));
        assert_eq!(armed, LockState::Armed { code: 5 });

        let transition = run(&armed, &LockMessage::Fire { code: 5 }, ChannelInfo::AsymmetricChannel);
        assert!(matches!(transition, Transition::Advanced { is_final: true, .. }));
        assert_eq!(advanced_to(transition), LockState::Fired);
    }

    #[test]
    fn unexpected_message_is_ignored() {
        let transition = run(&LockState::Idle, &LockMessage::Fire { code: 1 }, ChannelInfo::AsymmetricChannel);
        assert!(matches!(transition, Transition::Ignored(IgnoreReason::NoCandidate)));
    }

    #[test]
    fn wrong_channel_is_ignored() {
        let transition = run(&LockState::Idle, &LockMessage::Arm { code: 1 }, ChannelInfo::AsymmetricChannel);
        assert!(matches!(transition, Transition::Ignored(IgnoreReason::NoCandidate)));
    }

    #[test]
    fn rejection_reports_reason() {
        let transition = run(
            &LockState::Armed { code: 5 },
            &LockMessage::Fire { code: 6 },
            ChannelInfo::AsymmetricChannel,
        );
        assert!(matches!(
            transition,
            Transition::Rejected { reason: StepRejection::InvalidSignature }
        ));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let mut message = received(&LockMessage::Arm { code: 1 }, ChannelInfo::Local);
        message.encoded_inputs = vec![true.encode()];
        let transition = execute::<Lock, _, _>(
            &instance(&LockState::Idle),
            &message,
            &FixedContext::new(),
            &MockEnv::with_seed(0),
        )
        .expect("engine runs");
        assert!(matches!(
            transition,
            Transition::Rejected { reason: StepRejection::Malformed(DecodeError::TagMismatch { .. }) }
        ));
    }

    #[test]
    fn unknown_kind_is_ignored() {
        let mut message = received(&LockMessage::Arm { code: 1 }, ChannelInfo::Local);
        message.message_kind = 40;
        let transition = execute::<Lock, _, _>(
            &instance(&LockState::Idle),
            &message,
            &FixedContext::new(),
            &MockEnv::with_seed(0),
        )
        .expect("engine runs");
        assert!(matches!(transition, Transition::Ignored(IgnoreReason::UnknownMessageKind(40))));
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let mut corrupt = instance(&LockState::Idle);
        corrupt.state = ConcreteProtocolState { state_id: 1, payload: "garbage".encode() };
        let result = execute::<Lock, _, _>(
            &corrupt,
            &received(&LockMessage::Fire { code: 1 }, ChannelInfo::AsymmetricChannel),
            &FixedContext::new(),
            &MockEnv::with_seed(0),
        );
        assert!(matches!(result, Err(ProtocolError::CorruptState { .. })));
    }

    #[test]
    fn outgoing_and_foreign_messages_are_errors() {
        let env = MockEnv::with_seed(0);
        let ctx = FixedContext::new();
        let outgoing = CoreMessage::outgoing(
            Lock::ID,
            Uid::from_bytes([7; 32]),
            &LockMessage::Arm { code: 1 },
            SendChannel::Local { owned_identity: *ctx.owned_identity() },
            &env,
        );
        assert!(matches!(
            execute::<Lock, _, _>(&instance(&LockState::Idle), &outgoing, &ctx, &env),
            Err(ProtocolError::NotReceived)
        ));

        let mut foreign = received(&LockMessage::Arm { code: 1 }, ChannelInfo::Local);
        foreign.protocol_id = ProtocolId::ChannelCreationWithContactDevice;
        assert!(matches!(
            execute::<Lock, _, _>(&instance(&LockState::Idle), &foreign, &ctx, &env),
            Err(ProtocolError::WrongProtocol { .. })
        ));
    }

    #[test]
    fn abort_cancels_from_any_state() {
        for state in [LockState::Idle, LockState::Armed { code: 3 }, LockState::Fired] {
            let transition = abort::<Lock>(&instance(&state));
            assert!(matches!(transition, Transition::Advanced { is_final: true, .. }));
            assert_eq!(advanced_to(transition), LockState::Cancelled);
        }
    }
}
