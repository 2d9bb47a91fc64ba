//! Deterministic environment for crate-internal tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use echocrypt_core::Environment;

/// Counter-seeded environment: reproducible, but successive calls to
/// `random_bytes` still produce distinct output.
#[derive(Clone, Default)]
pub(crate) struct TestEnv {
    counter: Arc<AtomicU64>,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Environment for TestEnv {
    fn now_millis(&self) -> i64 {
        1_700_000_000_000
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let seed = self.counter.fetch_add(1, Ordering::Relaxed);
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = (seed as u8).wrapping_mul(31).wrapping_add(i as u8).wrapping_mul(17);
        }
    }
}
