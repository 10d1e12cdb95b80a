//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must hold after every delivered message,
//! whatever the interleaving. The network extracts a [`NetworkSnapshot`] and
//! runs the registered [`Invariant`] checks against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&network.snapshot())?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{ConfirmedChannelAgreement, NoSelfChannel, TrackedInstancesStored};
pub use snapshot::{ChannelView, DeviceSnapshot, NetworkSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check, named after the invariant that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Invariant name
    pub invariant: &'static str,
    /// What was observed
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of the whole network.
pub trait Invariant: Send + Sync {
    /// Stable name, used in reports.
    fn name(&self) -> &'static str;

    /// Check `state`, reporting the first counterexample found.
    fn check(&self, state: &NetworkSnapshot) -> InvariantResult;
}

/// Set of invariants run together after each delivery.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`NoSelfChannel`], [`ConfirmedChannelAgreement`] and
    /// [`TrackedInstancesStored`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(NoSelfChannel);
        registry.add(ConfirmedChannelAgreement);
        registry.add(TrackedInstancesStored);
        registry
    }

    /// Register `invariant`.
    pub fn add(&mut self, invariant: impl Invariant + 'static) {
        self.checks.push(Box::new(invariant));
    }

    /// Run every check. All violations are collected, not just the first.
    pub fn check_all(&self, state: &NetworkSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no check is registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use sealink_core::RemoteDevice;
    use sealink_crypto::SigningKeyPair;
    use sealink_encoding::Uid;

    use super::*;

    fn lonely_device(with_self_channel: bool) -> NetworkSnapshot {
        let remote = RemoteDevice::new(
            SigningKeyPair::from_seed(&[1; 32]).verification_key(),
            Uid::from_bytes([2; 32]),
        );
        let mut channels = BTreeMap::new();
        if with_self_channel {
            channels.insert(remote, ChannelView { seed: [3; 32], confirmed: false });
        }
        NetworkSnapshot {
            devices: vec![DeviceSnapshot {
                remote,
                channels,
                tracked: BTreeSet::new(),
                stored: BTreeSet::new(),
            }],
        }
    }

    #[test]
    fn empty_registry_accepts_anything() {
        let registry = InvariantRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.check_all(&lonely_device(true)).is_ok());
    }

    #[test]
    fn standard_registry_reports_self_channel() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 3);
        assert!(registry.check_all(&lonely_device(false)).is_ok());

        let violations = registry.check_all(&lonely_device(true)).expect_err("self channel");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "no_self_channel");
    }
}
