//! Monotonic time source for the engine's sweeps, injectable for tests.

use std::time::{Duration, Instant};

/// Monotonic clock abstraction; the engine and supervisor never call
/// `Instant::now()` directly so eviction timing can be tested directly.
pub trait Clock: Send {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock advanced by hand.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl ManualClock {
    /// Start at an arbitrary origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Advance by `duration`; all clones observe the jump.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.offset.fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let millis = self.offset.load(std::sync::atomic::Ordering::SeqCst);
        self.origin + Duration::from_millis(millis)
    }
}
