//! Chaotic store wrapper for fault injection testing
//!
//! Randomly fails operations with transient errors so that callers can be
//! checked for "no state change on failure, retry later" behaviour.

use std::sync::{Arc, Mutex};

use sealink_encoding::Uid;

use super::{ProtocolStore, StoreBatch};
use crate::{
    error::StoreError,
    protocol::{ConcreteProtocolState, ProtocolId},
};

/// Store wrapper that fails operations with probability `failure_rate`.
#[derive(Clone)]
pub struct ChaoticStore<S: ProtocolStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
}

/// Linear congruential generator; reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: ProtocolStore> ChaoticStore<S> {
    /// Wrap `inner`, failing with `failure_rate`, reproducibly from `seed`.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );
        Self { inner, failure_rate, rng: Arc::new(Mutex::new(ChaoticRng { state: seed })) }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn roll(&self) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let failed = self.rng.lock().expect("ChaoticRng mutex poisoned").next() < self.failure_rate;
        if failed {
            return Err(StoreError::Unavailable("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: ProtocolStore> ProtocolStore for ChaoticStore<S> {
    fn load(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Option<ConcreteProtocolState>, StoreError> {
        self.roll()?;
        self.inner.load(protocol, instance_id)
    }

    fn store(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
        state: &ConcreteProtocolState,
    ) -> Result<(), StoreError> {
        self.roll()?;
        self.inner.store(protocol, instance_id, state)
    }

    fn delete(&self, protocol: ProtocolId, instance_id: Uid) -> Result<(), StoreError> {
        self.roll()?;
        self.inner.delete(protocol, instance_id)
    }

    fn instances(&self, protocol: ProtocolId) -> Result<Vec<Uid>, StoreError> {
        self.roll()?;
        self.inner.instances(protocol)
    }

    fn commit(&self, batch: &StoreBatch) -> Result<(), StoreError> {
        self.roll()?;
        self.inner.commit(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const OWNED: ProtocolId = ProtocolId::ChannelCreationWithOwnedDevice;

    #[test]
    fn zero_rate_never_fails() {
        let chaotic = ChaoticStore::with_seed(MemoryStore::new(), 0.0, 1);
        for i in 0..100u8 {
            let state = ConcreteProtocolState {
                state_id: 0,
                payload: ConcreteProtocolState::sentinel_payload(),
            };
            chaotic.store(OWNED, Uid::from_bytes([i; 32]), &state).expect("no failures at 0%");
        }
        assert_eq!(chaotic.inner().len(), 100);
    }

    #[test]
    fn full_rate_always_fails_transiently() {
        let chaotic = ChaoticStore::with_seed(MemoryStore::new(), 1.0, 1);
        let err = chaotic.load(OWNED, Uid::default()).expect_err("always fails");
        assert!(err.is_transient());
        assert!(chaotic.instances(OWNED).is_err());
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let inner = MemoryStore::new();
        let kept = Uid::from_bytes([1; 32]);
        let state =
            ConcreteProtocolState { state_id: 2, payload: ConcreteProtocolState::sentinel_payload() };
        inner.store(OWNED, kept, &state).expect("store");

        let mut batch = StoreBatch::new();
        batch.delete(OWNED, kept);
        batch.put(OWNED, Uid::from_bytes([2; 32]), state.clone());

        let chaotic = ChaoticStore::with_seed(inner, 1.0, 5);
        assert!(chaotic.commit(&batch).expect_err("always fails").is_transient());
        assert_eq!(chaotic.inner().load(OWNED, kept), Ok(Some(state)));
        assert_eq!(chaotic.inner().len(), 1);
    }
}
