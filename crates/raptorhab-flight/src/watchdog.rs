//! Software watchdog.
//!
//! The supervisor pets it from the main loop; a background checker flips an
//! expiry flag if petting stops. The flag is advisory — the supervisor polls
//! it and enters the error state itself, so expiry is observed at a safe
//! point rather than asynchronously tearing anything down.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

fn lock_last_pet(last_pet: &Mutex<Instant>) -> std::sync::MutexGuard<'_, Instant> {
    // A poisoned pet mutex only means a panicking thread held it mid-store;
    // the Instant inside is still meaningful.
    match last_pet.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Software watchdog with a background checker thread.
#[derive(Debug)]
pub struct Watchdog {
    last_pet: Arc<Mutex<Instant>>,
    expired: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    checker: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl Watchdog {
    /// Start the checker with the given timeout.
    #[must_use]
    pub fn start(timeout: Duration) -> Self {
        let last_pet = Arc::new(Mutex::new(Instant::now()));
        let expired = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let checker = {
            let last_pet = Arc::clone(&last_pet);
            let expired = Arc::clone(&expired);
            let stop = Arc::clone(&stop);
            let poll = (timeout / 10).max(Duration::from_millis(50));
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let starved = lock_last_pet(&last_pet).elapsed() > timeout;
                    if starved && !expired.swap(true, Ordering::SeqCst) {
                        tracing::error!(?timeout, "watchdog timeout, main loop appears hung");
                    }
                    std::thread::sleep(poll);
                }
            })
        };

        Self { last_pet, expired, stop, checker: Some(checker), timeout }
    }

    /// Reset the timeout window.
    pub fn pet(&self) {
        *lock_last_pet(&self.last_pet) = Instant::now();
    }

    /// Whether the timeout has fired since the last pet.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop the checker thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.checker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_quiet_while_petted() {
        let watchdog = Watchdog::start(Duration::from_millis(300));
        for _ in 0..5 {
            watchdog.pet();
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(!watchdog.is_expired());
    }

    #[test]
    fn expires_when_starved() {
        let watchdog = Watchdog::start(Duration::from_millis(100));
        std::thread::sleep(Duration::from_millis(400));
        assert!(watchdog.is_expired());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut watchdog = Watchdog::start(Duration::from_secs(60));
        watchdog.stop();
        watchdog.stop();
    }
}
