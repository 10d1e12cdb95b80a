//! Fuzz target for protocol envelope decoding
//!
//! Feeds arbitrary bytes through the same path a device uses for received
//! traffic, then through every protocol's message decoder.
//!
//! # Invariants
//!
//! - Decoding never panics, whatever the channel
//! - An accepted envelope survives a re-encode unchanged

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealink_core::{
    ChannelInfo, CoreMessage, RemoteDevice, protocols::channel_creation::ChannelCreationMessage,
};
use sealink_crypto::SigningKeyPair;
use sealink_encoding::{DecodeLimits, Uid};

#[derive(Debug, Arbitrary)]
enum FuzzChannel {
    Local,
    Asymmetric,
    Oblivious,
}

#[derive(Debug, Arbitrary)]
struct Input {
    channel: FuzzChannel,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let channel = match input.channel {
        FuzzChannel::Local => ChannelInfo::Local,
        FuzzChannel::Asymmetric => ChannelInfo::AsymmetricChannel,
        FuzzChannel::Oblivious => ChannelInfo::ObliviousChannel {
            remote: RemoteDevice::new(
                SigningKeyPair::from_seed(&[7; 32]).verification_key(),
                Uid::from_bytes([9; 32]),
            ),
        },
    };

    let limits = DecodeLimits::default();
    let Ok(message) = CoreMessage::from_received_bytes(&input.bytes, channel.clone(), &limits) else {
        return;
    };

    let again = CoreMessage::received(&message.to_wire(), channel)
        .expect("re-encoded envelope must decode");
    assert_eq!(again, message);

    let _ = message.decode_message::<ChannelCreationMessage>();
});
