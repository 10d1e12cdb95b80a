//! Time and randomness, supplied by the caller.
//!
//! Protocol steps never read the system clock or OS entropy directly. A
//! device passes [`SystemEnv`]; simulations pass a seeded environment so
//! that a run can be replayed exactly.

use std::time::SystemTime;

use rand::{CryptoRng, RngCore};
use sealink_encoding::Uid;

/// Source of time and randomness for protocol steps.
///
/// Outside of tests `random_bytes` must draw from a cryptographically secure
/// generator: ephemeral keys, nonces and challenge prefixes come from it.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time, used to timestamp outgoing messages.
    fn now(&self) -> SystemTime;

    /// Fill `buffer` with random bytes. Seeded implementations yield the
    /// same stream for the same seed.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`, big-endian from eight random bytes.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a fresh identifier (protocol instances, devices).
    fn random_uid(&self) -> Uid {
        Uid::random(&mut EnvRng(self))
    }
}

/// Adapter exposing an [`Environment`] as a `rand` RNG.
///
/// Crypto primitives take an RNG; this routes them to the environment so
/// key generation follows the simulation seed.
pub struct EnvRng<'a, E: Environment>(pub &'a E);

impl<E: Environment> RngCore for EnvRng<'_, E> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.0.random_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        self.0.random_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.random_bytes(dest);
        Ok(())
    }
}

// Environments are required to supply cryptographically secure bytes.
impl<E: Environment> CryptoRng for EnvRng<'_, E> {}

/// Production environment backed by the OS clock and entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // INVARIANT: OS entropy is available on supported platforms. If
        // getrandom fails the system is misconfigured and continuing would
        // produce predictable keys.
        #[allow(clippy::expect_used)]
        getrandom::fill(buffer).expect("OS entropy source unavailable");
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    //! Seeded environment for unit tests.

    use std::{
        sync::{Arc, Mutex},
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    /// Deterministic environment with a fixed clock.
    #[derive(Clone)]
    pub(crate) struct MockEnv {
        rng: Arc<Mutex<ChaCha20Rng>>,
        now: SystemTime,
    }

    impl MockEnv {
        pub(crate) fn with_seed(seed: u64) -> Self {
            Self {
                rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
                now: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            }
        }
    }

    impl Environment for MockEnv {
        fn now(&self) -> SystemTime {
            self.now
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().expect("rng mutex poisoned").fill_bytes(buffer);
        }
    }
}
