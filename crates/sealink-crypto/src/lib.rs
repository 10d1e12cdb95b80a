//! Sealink Cryptographic Primitives
//!
//! Building blocks for channel creation. Pure functions; callers provide the
//! randomness so simulations stay deterministic.
//!
//! # Channel Key Lifecycle
//!
//! ```text
//! ephemeral KEM pair (per handshake side)
//!        │
//!        ▼
//! encapsulate / decapsulate → k1, k2
//!        │
//!        ▼
//! HKDF(k1 || k2) → Channel Seed
//!        │
//!        ▼
//! HKDF(seed, sender || recipient) → directional key → AEAD
//! ```
//!
//! # Security
//!
//! - Two independent encapsulations: leaking one exchange does not expose
//!   the channel
//! - Ephemeral private keys live only in protocol state and are zeroized on
//!   drop
//! - Pings are signed over both device ids and both identities under a
//!   dedicated label, so a signature cannot be replayed for another pair

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod challenge;
pub mod channel;
pub mod error;
pub mod kem;
pub mod keys;
pub mod seed;
pub mod signature;

pub use challenge::{CHALLENGE_PREFIX_SIZE, ChallengeResponse, ChannelCreationChallenge};
pub use channel::{NONCE_SIZE, SealedMessage, open, seal};
pub use error::CryptoError;
pub use kem::{KemCiphertext, KemKeyPair, KemPrivateKey, KemPublicKey, SymmetricKey, decapsulate, encapsulate};
pub use seed::ChannelSeed;
pub use signature::{SignatureBytes, SigningKeyPair, VerificationKey};
