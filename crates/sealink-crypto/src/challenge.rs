//! Channel-creation ping challenge.
//!
//! A ping proves that the sender controls the identity it claims and that it
//! is talking about this particular pair of devices. The signed bytes are
//!
//! ```text
//! PING_LABEL || prefix || first_device || second_device || first_identity || second_identity
//! ```
//!
//! where "first" is the recipient of the ping and "second" its sender. The
//! recipient rebuilds the challenge from its own point of view to check it.
//!
//! The random prefix makes every response distinct, so a receiver can keep a
//! record of responses it has seen and refuse replays without also refusing
//! a second, fresh answer to the same challenge.

use sealink_encoding::Uid;

use crate::{
    error::CryptoError,
    signature::{SignatureBytes, SigningKeyPair, VerificationKey},
};

/// Domain separation label for channel-creation pings
const PING_LABEL: &[u8] = b"sealinkChannelCreationPingV1";

/// Size of the random prefix of a challenge response
pub const CHALLENGE_PREFIX_SIZE: usize = 16;

/// Answer to a [`ChannelCreationChallenge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeResponse {
    /// Random prefix chosen by the signer
    pub prefix: [u8; CHALLENGE_PREFIX_SIZE],
    /// Signature over the prefixed challenge
    pub signature: SignatureBytes,
}

/// The statement signed by a channel-creation ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCreationChallenge<'a> {
    /// Device receiving the ping
    pub first_device: Uid,
    /// Device sending the ping
    pub second_device: Uid,
    /// Identity receiving the ping
    pub first_identity: &'a VerificationKey,
    /// Identity sending the ping
    pub second_identity: &'a VerificationKey,
}

impl ChannelCreationChallenge<'_> {
    /// Bytes covered by the signature for a given prefix.
    #[must_use]
    pub fn to_signed_bytes(&self, prefix: &[u8; CHALLENGE_PREFIX_SIZE]) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(PING_LABEL.len() + CHALLENGE_PREFIX_SIZE + 2 * Uid::LEN + 2 * 32);
        out.extend_from_slice(PING_LABEL);
        out.extend_from_slice(prefix);
        out.extend_from_slice(self.first_device.as_bytes());
        out.extend_from_slice(self.second_device.as_bytes());
        out.extend_from_slice(self.first_identity.as_bytes());
        out.extend_from_slice(self.second_identity.as_bytes());
        out
    }

    /// Sign the challenge as `second_identity`, using a caller-chosen random
    /// prefix.
    #[must_use]
    pub fn solve(
        &self,
        signer: &SigningKeyPair,
        prefix: [u8; CHALLENGE_PREFIX_SIZE],
    ) -> ChallengeResponse {
        ChallengeResponse { prefix, signature: signer.sign(&self.to_signed_bytes(&prefix)) }
    }

    /// Check a response by `second_identity` to the challenge.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidSignature` if the response does not cover exactly
    /// this challenge under `second_identity`.
    pub fn check(&self, response: &ChallengeResponse) -> Result<(), CryptoError> {
        self.second_identity.verify(&self.to_signed_bytes(&response.prefix), &response.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(byte: u8) -> Uid {
        Uid::from_bytes([byte; 32])
    }

    #[test]
    fn recipient_view_verifies() {
        let alice = SigningKeyPair::from_seed(&[1; 32]);
        let bob = SigningKeyPair::from_seed(&[2; 32]);
        let (alice_id, bob_id) = (alice.verification_key(), bob.verification_key());

        // bob pings alice
        let sent = ChannelCreationChallenge {
            first_device: uid(0xa1),
            second_device: uid(0xb1),
            first_identity: &alice_id,
            second_identity: &bob_id,
        };
        let signature = sent.solve(&bob, [9; CHALLENGE_PREFIX_SIZE]);

        // alice rebuilds it from her side
        let received = ChannelCreationChallenge {
            first_device: uid(0xa1),
            second_device: uid(0xb1),
            first_identity: &alice_id,
            second_identity: &bob_id,
        };
        assert_eq!(received.check(&signature), Ok(()));
    }

    #[test]
    fn swapped_devices_rejected() {
        let alice = SigningKeyPair::from_seed(&[1; 32]);
        let bob = SigningKeyPair::from_seed(&[2; 32]);
        let (alice_id, bob_id) = (alice.verification_key(), bob.verification_key());

        let sent = ChannelCreationChallenge {
            first_device: uid(0xa1),
            second_device: uid(0xb1),
            first_identity: &alice_id,
            second_identity: &bob_id,
        };
        let signature = sent.solve(&bob, [9; CHALLENGE_PREFIX_SIZE]);

        let swapped = ChannelCreationChallenge { first_device: uid(0xb1), second_device: uid(0xa1), ..sent };
        assert_eq!(swapped.check(&signature), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn wrong_signer_rejected() {
        let alice = SigningKeyPair::from_seed(&[1; 32]);
        let bob = SigningKeyPair::from_seed(&[2; 32]);
        let (alice_id, bob_id) = (alice.verification_key(), bob.verification_key());

        let challenge = ChannelCreationChallenge {
            first_device: uid(1),
            second_device: uid(2),
            first_identity: &alice_id,
            second_identity: &bob_id,
        };
        let response = challenge.solve(&alice, [0; CHALLENGE_PREFIX_SIZE]);
        assert_eq!(challenge.check(&response), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn prefix_distinguishes_responses() {
        let alice = SigningKeyPair::from_seed(&[1; 32]);
        let bob = SigningKeyPair::from_seed(&[2; 32]);
        let (alice_id, bob_id) = (alice.verification_key(), bob.verification_key());
        let challenge = ChannelCreationChallenge {
            first_device: uid(1),
            second_device: uid(2),
            first_identity: &alice_id,
            second_identity: &bob_id,
        };

        let first = challenge.solve(&bob, [1; CHALLENGE_PREFIX_SIZE]);
        let second = challenge.solve(&bob, [2; CHALLENGE_PREFIX_SIZE]);
        assert_ne!(first, second);
        assert_eq!(challenge.check(&second), Ok(()));

        let spliced = ChallengeResponse { prefix: first.prefix, signature: second.signature };
        assert_eq!(challenge.check(&spliced), Err(CryptoError::InvalidSignature));
    }
}
