//! Persistence collaborator for protocol instances.
//!
//! The trait is synchronous: a step never suspends. Every write a transition
//! needs goes into one [`StoreBatch`], and [`ProtocolStore::commit`] applies
//! it as a unit. The store must guarantee at most one concurrent step per
//! instance id.

mod chaotic;
mod memory;

pub use chaotic::ChaoticStore;
pub use memory::MemoryStore;
use sealink_encoding::Uid;

use crate::{
    error::StoreError,
    protocol::{ConcreteProtocolState, ProtocolId},
};

/// Storage of `(protocol, instance id) -> current state`.
///
/// Must be Clone (shared between the manager and inspection code), Send +
/// Sync, and synchronous. Implementations typically share internal state via
/// Arc, so clones access the same underlying storage.
pub trait ProtocolStore: Clone + Send + Sync + 'static {
    /// Current state of an instance. `None` if the instance does not exist.
    fn load(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Option<ConcreteProtocolState>, StoreError>;

    /// Replace the state of an instance, creating it if needed.
    fn store(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
        state: &ConcreteProtocolState,
    ) -> Result<(), StoreError>;

    /// Remove an instance. Removing a missing instance is not an error.
    fn delete(&self, protocol: ProtocolId, instance_id: Uid) -> Result<(), StoreError>;

    /// Ids of the stored instances of `protocol`, in ascending order.
    fn instances(&self, protocol: ProtocolId) -> Result<Vec<Uid>, StoreError>;

    /// Apply every write of `batch`, in order, or none of them.
    fn commit(&self, batch: &StoreBatch) -> Result<(), StoreError>;
}

/// One write of a [`StoreBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Replace or create the state of an instance
    Put {
        /// Protocol of the instance
        protocol: ProtocolId,
        /// Instance
        instance_id: Uid,
        /// New state
        state: ConcreteProtocolState,
    },
    /// Remove an instance, if present
    Delete {
        /// Protocol of the instance
        protocol: ProtocolId,
        /// Instance
        instance_id: Uid,
    },
}

/// Writes committed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    ops: Vec<StoreOp>,
}

impl StoreBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write of `state`.
    pub fn put(&mut self, protocol: ProtocolId, instance_id: Uid, state: ConcreteProtocolState) {
        self.ops.push(StoreOp::Put { protocol, instance_id, state });
    }

    /// Queue a removal.
    pub fn delete(&mut self, protocol: ProtocolId, instance_id: Uid) {
        self.ops.push(StoreOp::Delete { protocol, instance_id });
    }

    /// Queued writes, in order.
    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
