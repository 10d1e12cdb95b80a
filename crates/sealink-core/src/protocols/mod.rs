//! Concrete protocols.

pub mod channel_creation;

pub use channel_creation::{
    ChannelCreation, ChannelCreationWithContactDevice, ChannelCreationWithOwnedDevice,
    ContactDevice, OwnedDevice, PeerKind,
};
