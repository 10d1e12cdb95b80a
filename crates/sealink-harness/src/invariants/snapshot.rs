//! Observable state snapshots for invariant checking.

use std::collections::{BTreeMap, BTreeSet};

use sealink_core::{ProtocolId, RemoteDevice};
use sealink_encoding::Uid;

/// Observable state of every simulated device.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    /// Per-device snapshots, in party order.
    pub devices: Vec<DeviceSnapshot>,
}

impl NetworkSnapshot {
    /// Snapshot of the device `remote`, if it is part of the network.
    pub fn device(&self, remote: &RemoteDevice) -> Option<&DeviceSnapshot> {
        self.devices.iter().find(|device| &device.remote == remote)
    }
}

/// A channel as seen from one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelView {
    /// Raw channel seed
    pub seed: [u8; 32],
    /// Whether this side confirmed the channel
    pub confirmed: bool,
}

/// Observable state of one device.
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    /// The device itself
    pub remote: RemoteDevice,
    /// Channels held, by peer
    pub channels: BTreeMap<RemoteDevice, ChannelView>,
    /// Instances the device tracks as running
    pub tracked: BTreeSet<(ProtocolId, Uid)>,
    /// Instances present in the device's store
    pub stored: BTreeSet<(ProtocolId, Uid)>,
}
