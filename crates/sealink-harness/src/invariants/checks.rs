//! Channel-creation invariants.

use super::{Invariant, InvariantResult, NetworkSnapshot, Violation};

/// No device holds a channel with itself.
pub struct NoSelfChannel;

impl Invariant for NoSelfChannel {
    fn name(&self) -> &'static str {
        "no_self_channel"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        for device in &state.devices {
            if device.channels.contains_key(&device.remote) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("device {} holds a channel with itself", device.remote.device.short()),
                });
            }
        }
        Ok(())
    }
}

/// A confirmed channel is mirrored by the peer with the same seed.
///
/// Confirmation only happens after the peer acknowledged over the channel,
/// so the peer must hold it. Diverging seeds mean the two sides combined
/// different keys.
pub struct ConfirmedChannelAgreement;

impl Invariant for ConfirmedChannelAgreement {
    fn name(&self) -> &'static str {
        "confirmed_channel_agreement"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        for device in &state.devices {
            for (remote, view) in device.channels.iter().filter(|(_, view)| view.confirmed) {
                // Peers outside the simulation cannot be checked.
                let Some(peer) = state.device(remote) else {
                    continue;
                };
                match peer.channels.get(&device.remote) {
                    None => {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "{} confirmed a channel with {}, which holds none",
                                device.remote.device.short(),
                                remote.device.short()
                            ),
                        });
                    },
                    Some(mirror) if mirror.seed != view.seed => {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "{} and {} hold different seeds",
                                device.remote.device.short(),
                                remote.device.short()
                            ),
                        });
                    },
                    Some(_) => {},
                }
            }
        }
        Ok(())
    }
}

/// Every instance a device tracks as running is present in its store.
pub struct TrackedInstancesStored;

impl Invariant for TrackedInstancesStored {
    fn name(&self) -> &'static str {
        "tracked_instances_stored"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        for device in &state.devices {
            if let Some((protocol, instance)) = device.tracked.difference(&device.stored).next() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "device {} tracks {protocol} instance {} with no stored state",
                        device.remote.device.short(),
                        instance.short()
                    ),
                });
            }
        }
        Ok(())
    }
}
