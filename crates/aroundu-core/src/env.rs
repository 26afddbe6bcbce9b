//! Environment abstraction for deterministic testing.
//!
//! Decouples the state machines from system resources (time, randomness).
//! Production uses the wall clock and OS entropy; simulation uses a virtual
//! clock and a seeded RNG so that reconnection jitter and timer expiry replay
//! exactly.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time, randomness, and async sleeping.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Given the same seed, `random_bytes()` produces the same sequence
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation uses a
    /// virtual instant that only moves when the harness advances it.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this. State machines take time as a parameter.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniformly distributed `f64` in `[0, 1)`.
    ///
    /// Used for backoff jitter.
    fn random_unit(&self) -> f64 {
        const MANTISSA_BITS: u32 = 53;
        (self.random_u64() >> (64 - MANTISSA_BITS)) as f64 / (1u64 << MANTISSA_BITS) as f64
    }
}

/// Deterministic environment for unit tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    };

    use super::Environment;

    /// Environment with a manually advanced clock and a counter-based RNG.
    ///
    /// Clones share the clock, so a test can keep a handle and advance time
    /// while the state machine owns another clone.
    #[derive(Clone, Debug)]
    pub struct MockEnv {
        origin: Instant,
        elapsed_ms: Arc<AtomicU64>,
        rng_state: Arc<AtomicU64>,
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockEnv {
        /// Create an environment at virtual time zero.
        #[allow(clippy::disallowed_methods)]
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                elapsed_ms: Arc::new(AtomicU64::new(0)),
                rng_state: Arc::new(AtomicU64::new(0x5eed)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, duration: Duration) {
            self.elapsed_ms.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
        }

        /// Time elapsed since creation.
        pub fn elapsed(&self) -> Duration {
            Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            // splitmix64
            for chunk in buffer.chunks_mut(8) {
                let mut z = self
                    .rng_state
                    .fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::SeqCst)
                    .wrapping_add(0x9e37_79b9_7f4a_7c15);
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
                z ^= z >> 31;
                let bytes = z.to_be_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }
}
