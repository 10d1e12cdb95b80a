//! Sealink Protocol Core
//!
//! Runs multi-party protocols as explicit state machines. Each protocol is a
//! closed catalog of states, messages and steps; a received message selects
//! exactly one step, which returns the replacement state and the effects to
//! apply.
//!
//! # Architecture
//!
//! ```text
//! bytes ─▶ CoreMessage ─▶ ProtocolManager ─▶ engine::execute ─▶ step
//!                              │                                  │
//!                              ▼                                  ▼
//!                        ProtocolStore                       StepAction*
//!                                                   (sink, device, store)
//! ```
//!
//! # Components
//!
//! - [`protocol`]: engine, envelope and state container
//! - [`protocols`]: concrete protocols (channel creation with owned and
//!   contact devices)
//! - [`manager`]: load, execute, commit, apply
//! - [`store`] / [`transport`]: collaborator traits and test doubles
//! - [`env`]: time and randomness, swappable for simulation

#![forbid(unsafe_code)]

pub mod config;
pub mod env;
pub mod error;
pub mod identity;
pub mod manager;
pub mod protocol;
pub mod protocols;
pub mod store;
pub mod transport;

pub use config::EngineConfig;
pub use env::{EnvRng, Environment, SystemEnv};
pub use error::{ProtocolError, StepRejection, StoreError, TransportError};
pub use identity::{CryptoIdentity, IdentityDetails, RemoteDevice};
pub use manager::ProtocolManager;
pub use protocol::{
    ChannelInfo, CoreMessage, DeviceContext, ProtocolId, SendChannel, StepAction, StepContext,
    Transition,
};
pub use store::{ChaoticStore, MemoryStore, ProtocolStore, StoreBatch};
pub use transport::ChannelSink;
