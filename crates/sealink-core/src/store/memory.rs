use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use sealink_encoding::{Decode, EncodedValue, Encode, Uid};

use super::{ProtocolStore, StoreBatch, StoreOp};
use crate::{
    error::StoreError,
    protocol::{ConcreteProtocolState, ProtocolId},
};

/// In-memory store for tests and simulation.
///
/// States are kept in their encoded form, so every load goes through the
/// same decode path a persistent backend would. Uses `lock().expect()`,
/// which panics if the mutex is poisoned; acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<BTreeMap<(ProtocolId, Uid), Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances across all protocols.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").len()
    }

    /// Whether no instance is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the raw stored bytes of an instance.
    #[allow(clippy::expect_used)]
    pub fn put_raw(&self, protocol: ProtocolId, instance_id: Uid, raw: Vec<u8>) {
        self.inner.lock().expect("Mutex poisoned").insert((protocol, instance_id), raw);
    }
}

impl ProtocolStore for MemoryStore {
    fn load(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
    ) -> Result<Option<ConcreteProtocolState>, StoreError> {
        #[allow(clippy::expect_used)]
        let inner = self.inner.lock().expect("Mutex poisoned");
        let Some(raw) = inner.get(&(protocol, instance_id)) else {
            return Ok(None);
        };
        EncodedValue::from_bytes(raw)
            .and_then(|value| ConcreteProtocolState::decode(&value))
            .map(Some)
            .map_err(|err| StoreError::Corrupted(format!("{protocol} {instance_id:?}: {err}")))
    }

    fn store(
        &self,
        protocol: ProtocolId,
        instance_id: Uid,
        state: &ConcreteProtocolState,
    ) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.insert((protocol, instance_id), state.encode().to_bytes());
        Ok(())
    }

    fn delete(&self, protocol: ProtocolId, instance_id: Uid) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.remove(&(protocol, instance_id));
        Ok(())
    }

    fn instances(&self, protocol: ProtocolId) -> Result<Vec<Uid>, StoreError> {
        #[allow(clippy::expect_used)]
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.keys().filter(|(p, _)| *p == protocol).map(|(_, id)| *id).collect())
    }

    fn commit(&self, batch: &StoreBatch) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        for op in batch.ops() {
            match op {
                StoreOp::Put { protocol, instance_id, state } => {
                    inner.insert((*protocol, *instance_id), state.encode().to_bytes());
                },
                StoreOp::Delete { protocol, instance_id } => {
                    inner.remove(&(*protocol, *instance_id));
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNED: ProtocolId = ProtocolId::ChannelCreationWithOwnedDevice;

    fn state(id: u16) -> ConcreteProtocolState {
        ConcreteProtocolState { state_id: id, payload: ConcreteProtocolState::sentinel_payload() }
    }

    #[test]
    fn store_load_delete() {
        let store = MemoryStore::new();
        let instance = Uid::from_bytes([1; 32]);

        assert_eq!(store.load(OWNED, instance), Ok(None));
        store.store(OWNED, instance, &state(2)).expect("store");
        assert_eq!(store.load(OWNED, instance), Ok(Some(state(2))));

        store.store(OWNED, instance, &state(3)).expect("overwrite");
        assert_eq!(store.load(OWNED, instance), Ok(Some(state(3))));

        store.delete(OWNED, instance).expect("delete");
        store.delete(OWNED, instance).expect("delete is idempotent");
        assert!(store.is_empty());
    }

    #[test]
    fn instances_are_scoped_by_protocol() {
        let store = MemoryStore::new();
        store.store(OWNED, Uid::from_bytes([2; 32]), &state(0)).expect("store");
        store.store(OWNED, Uid::from_bytes([1; 32]), &state(0)).expect("store");
        store
            .store(ProtocolId::ChannelCreationWithContactDevice, Uid::from_bytes([3; 32]), &state(0))
            .expect("store");

        assert_eq!(
            store.instances(OWNED),
            Ok(vec![Uid::from_bytes([1; 32]), Uid::from_bytes([2; 32])])
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn batch_applies_in_order() {
        let store = MemoryStore::new();
        let kept = Uid::from_bytes([5; 32]);
        let dropped = Uid::from_bytes([6; 32]);
        store.store(OWNED, dropped, &state(1)).expect("store");

        let mut batch = StoreBatch::new();
        batch.put(OWNED, kept, state(2));
        batch.delete(OWNED, dropped);
        batch.put(OWNED, kept, state(4));
        store.commit(&batch).expect("commit");

        assert_eq!(store.load(OWNED, kept), Ok(Some(state(4))));
        assert_eq!(store.load(OWNED, dropped), Ok(None));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn corrupted_bytes_surface_as_error() {
        let store = MemoryStore::new();
        let instance = Uid::from_bytes([4; 32]);
        store.put_raw(OWNED, instance, vec![0x03, 0, 0, 0, 9]);
        assert!(matches!(store.load(OWNED, instance), Err(StoreError::Corrupted(_))));
    }
}
