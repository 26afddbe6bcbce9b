//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` uses the monotonic clock, tokio sleeping and the thread-local
//! RNG. Randomness only feeds reconnection jitter, so it does not need to be
//! reproducible or cryptographic.

use std::time::Duration;

use aroundu_core::Environment;
use rand::RngCore;

/// Production environment using system time and the thread-local RNG.
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
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::rng().fill_bytes(buffer);
    }
}
