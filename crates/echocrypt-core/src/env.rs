//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system resources
//! (wall-clock time, randomness, async sleeping). Store and session code take
//! an environment instead of reaching for globals, which keeps identifier
//! generation, timestamps, and nonces reproducible under a seeded test
//! environment while the production [`SystemEnv`] uses the OS clock and
//! entropy pool.
//!
//! # Invariants
//!
//! - Monotonicity: `now_millis()` must never go backwards within a single
//!   execution context
//! - RNG quality: `random_bytes()` uses cryptographically secure entropy in
//!   production (nonces and room keys are drawn from it)

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now_millis()` never decreases
/// 2. RNG quality: `random_bytes()` is backed by a CSPRNG in production (it
///    feeds AEAD nonces and room keys)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current wall-clock time in milliseconds since the Unix
    /// epoch.
    ///
    /// Used for server-assigned message timestamps. Ordering guarantees come
    /// from append order, not from this clock; ties are expected and fine.
    fn now_millis(&self) -> i64;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be
    /// used by driver code (pollers), not protocol logic.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST use OS entropy (`getrandom`), not a
    /// userspace PRNG: this method is the sole source of AEAD nonces and
    /// room key material.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u128`.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }

    /// Generates a random identifier.
    ///
    /// Identifiers are opaque; routing them through the environment keeps
    /// them deterministic in tests.
    fn random_id(&self) -> Uuid {
        Uuid::from_u128(self.random_u128())
    }
}

/// Production environment using system time and cryptographic RNG.
///
/// - `SystemTime` for wall-clock timestamps
/// - `tokio::time::sleep()` for async sleeping
/// - `getrandom` for cryptographic randomness
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // NOTE: This should never fail on supported platforms; if it
            // does it's a critical error. Fill with zeros as a fallback
            // (not secure, but prevents panic).
            tracing::error!("getrandom failed: {}", e);
            buffer.fill(0);
        });
    }
}
