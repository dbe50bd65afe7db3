//! Monotonic time source, injectable for deterministic tests.

use std::time::{Duration, Instant};

/// Monotonic clock abstraction.
///
/// Production code uses [`SystemClock`]; tests drive [`ManualClock`] so
/// duty-cycle and watchdog logic can be verified without wall-clock sleeps.
pub trait Clock: Send {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Block for `duration` as this clock experiences it.
    fn sleep(&self, duration: Duration);
}

/// Real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
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

    /// Advance the clock by `duration`.
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

    /// Sleeping on a manual clock just advances it; tests run at full speed.
    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - t0, Duration::from_secs(5));
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let t0 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now() > t0);
    }
}
