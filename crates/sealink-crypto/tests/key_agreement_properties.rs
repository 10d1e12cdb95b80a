//! Property-based tests for the double-KEM key agreement
//!
//! Two parties each generate an ephemeral pair, exchange one encapsulation
//! in each direction, and combine the two keys into a channel seed.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sealink_crypto::{
    ChannelSeed, KemCiphertext, KemKeyPair, NONCE_SIZE, decapsulate, encapsulate, open, seal,
};
use sealink_encoding::Uid;

#[test]
fn prop_both_sides_derive_same_seed() {
    proptest!(|(seed_a: u64, seed_b: u64, payload in prop::collection::vec(any::<u8>(), 0..256))| {
        let mut rng_a = ChaCha20Rng::seed_from_u64(seed_a);
        let mut rng_b = ChaCha20Rng::seed_from_u64(seed_b.wrapping_add(1) ^ seed_a.rotate_left(7));

        let alice = KemKeyPair::generate(&mut rng_a);
        let bob = KemKeyPair::generate(&mut rng_b);

        // bob encapsulates k1 to alice, alice encapsulates k2 to bob
        let (c1, k1_bob) = encapsulate(&alice.public, &mut rng_b).expect("valid key");
        let k1_alice = decapsulate(&c1, &alice.private).expect("valid c1");
        let (c2, k2_alice) = encapsulate(&bob.public, &mut rng_a).expect("valid key");
        let k2_bob = decapsulate(&c2, &bob.private).expect("valid c2");

        let alice_seed = ChannelSeed::from_keys(&[&k1_alice, &k2_alice]);
        let bob_seed = ChannelSeed::from_keys(&[&k1_bob, &k2_bob]);

        // PROPERTY: both sides hold identical channel material
        prop_assert_eq!(&alice_seed, &bob_seed);

        // PROPERTY: a message sealed by one side opens on the other
        let (alice_device, bob_device) = (Uid::from_bytes([1; 32]), Uid::from_bytes([2; 32]));
        let sealed = seal(
            &alice_seed.directional_key(&alice_device, &bob_device),
            &payload,
            [7; NONCE_SIZE],
        );
        let opened = open(&bob_seed.directional_key(&alice_device, &bob_device), &sealed);
        prop_assert_eq!(opened, Ok(payload));
    });
}

#[test]
fn prop_corrupted_ciphertext_never_yields_sent_key() {
    proptest!(|(seed: u64, index in 0usize..32, flip in 1u8..=255)| {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let recipient = KemKeyPair::generate(&mut rng);
        let (ciphertext, sent) = encapsulate(&recipient.public, &mut rng).expect("valid key");

        let mut raw = ciphertext.as_bytes().to_vec();
        raw[index] ^= flip;

        // PROPERTY: tampering either fails or produces an unrelated key
        if let Ok(received) = decapsulate(&KemCiphertext::from_bytes(raw), &recipient.private) {
            prop_assert_ne!(received, sent);
        }
    });
}
