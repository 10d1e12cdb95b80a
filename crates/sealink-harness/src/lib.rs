//! Deterministic simulation harness for sealink protocol testing.
//!
//! Simulated devices, a FIFO network that seals oblivious-channel traffic
//! with the channel keys the devices actually agreed on, and fault
//! injection. One seeded environment drives every random draw, so a seed
//! reproduces a run exactly.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties after every delivery, whatever
//! the interleaving. Use [`InvariantRegistry::standard()`] for the
//! channel-creation invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod device;
pub mod error;
pub mod fault;
pub mod invariants;
pub mod network;
pub mod scenario;
pub mod sim_env;

pub use device::{ContactStatus, SimChannel, SimDevice};
pub use error::{HarnessError, PartyId};
pub use fault::{Fault, FaultInjector};
pub use invariants::{
    ChannelView, ConfirmedChannelAgreement, DeviceSnapshot, Invariant, InvariantRegistry,
    InvariantResult, NetworkSnapshot, NoSelfChannel, TrackedInstancesStored, Violation,
};
pub use network::{Delivery, DropReason, Dropped, Outcome, SimNetwork, SimParty};
pub use scenario::{Scenario, ScenarioKind, ScenarioReport, Setup};
pub use sim_env::SimEnv;
