//! Flight supervisor: the state machine that owns every collaborator.
//!
//! ```text
//! Initializing ──→ TxActive ⇄ TxPaused
//!        │             │
//!        └──────→ Error ┘        (grace wait, optional host reboot)
//!
//! SIGINT/SIGTERM ──→ Shutdown    (GPS, camera, radio, watchdog — in order)
//! ```
//!
//! The duty cycle alternates `tx_period_sec` of pumping the scheduler as
//! fast as the radio accepts frames with `tx_pause_sec` of radio standby
//! (zero pause means always active). Radio errors count consecutively;
//! `max_errors` in a row is fatal. All timing goes through the injected
//! [`Clock`] so the whole machine runs deterministically under test.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use thiserror::Error;

use crate::{
    camera::Camera,
    clock::{Clock, SystemClock},
    config::FlightConfig,
    gps::GpsSource,
    radio::FlightRadio,
    scheduler::PacketScheduler,
    telemetry::{SystemHealth, TelemetryCollector},
    watchdog::Watchdog,
};

/// Pet the watchdog every this many transmitted packets.
const WATCHDOG_PET_INTERVAL: u64 = 100;

/// Sleep slice while paused, short enough to stay responsive to shutdown.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

/// Grace period before acting on a fatal error.
const ERROR_GRACE: Duration = Duration::from_secs(5);

/// Supervisor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Bringing up collaborators.
    Initializing,
    /// Pumping the scheduler into the radio.
    TxActive,
    /// Radio in standby for the duty-cycle pause.
    TxPaused,
    /// Unrecoverable; terminal unless the host reboots.
    Error,
    /// Clean stop requested.
    Shutdown,
}

/// Fatal supervisor failures (everything recoverable is logged and counted
/// instead).
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A collaborator failed to initialize.
    #[error("initialization failed: {0}")]
    Init(String),

    /// The error budget was exhausted or the watchdog fired.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// The airborne payload's main controller.
pub struct FlightSupervisor<C: Clock = SystemClock> {
    config: FlightConfig,
    radio: Box<dyn FlightRadio>,
    gps: Box<dyn GpsSource>,
    camera: Box<dyn Camera>,
    scheduler: PacketScheduler,
    collector: TelemetryCollector,
    watchdog: Option<Watchdog>,
    clock: C,
    shutdown: Arc<AtomicBool>,

    state: State,
    health: SystemHealth,
    error_streak: u32,
    last_error: Option<String>,
    packets_sent: u64,
    images_captured: u64,
}

impl FlightSupervisor<SystemClock> {
    /// Build a supervisor on the system clock.
    #[must_use]
    pub fn new(
        config: FlightConfig,
        radio: Box<dyn FlightRadio>,
        gps: Box<dyn GpsSource>,
        camera: Box<dyn Camera>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self::with_clock(config, radio, gps, camera, shutdown, SystemClock)
    }
}

impl<C: Clock> FlightSupervisor<C> {
    /// Build a supervisor on an explicit clock (tests inject
    /// [`crate::clock::ManualClock`] here).
    #[must_use]
    pub fn with_clock(
        config: FlightConfig,
        radio: Box<dyn FlightRadio>,
        gps: Box<dyn GpsSource>,
        camera: Box<dyn Camera>,
        shutdown: Arc<AtomicBool>,
        clock: C,
    ) -> Self {
        let scheduler = PacketScheduler::new(&config);
        Self {
            config,
            radio,
            gps,
            camera,
            scheduler,
            collector: TelemetryCollector::new(),
            watchdog: None,
            clock,
            shutdown,
            state: State::Initializing,
            health: SystemHealth::default(),
            error_streak: 0,
            last_error: None,
            packets_sent: 0,
            images_captured: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Frames handed to the radio so far.
    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Captures that made it into the image queue.
    #[must_use]
    pub fn images_captured(&self) -> u64 {
        self.images_captured
    }

    /// Publish externally measured health readings (battery monitor thread,
    /// thermal zone reader); the radio temperature is filled in here.
    pub fn update_health(&mut self, health: SystemHealth) {
        self.health = health;
    }

    /// Run to completion: initialize, loop the duty cycle, clean up.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::Init`] if a collaborator fails to come up
    /// - [`SupervisorError::Fatal`] after `max_errors` consecutive radio
    ///   errors or a watchdog timeout
    pub fn run(&mut self) -> Result<(), SupervisorError> {
        tracing::info!(
            callsign = %self.config.callsign,
            frequency_mhz = self.config.frequency_mhz,
            tx_period_sec = self.config.tx_period_sec,
            tx_pause_sec = self.config.tx_pause_sec,
            codec = %self.config.fountain_codec,
            "flight payload starting"
        );

        self.initialize()?;
        let outcome = self.main_loop();
        self.cleanup();
        outcome
    }

    fn initialize(&mut self) -> Result<(), SupervisorError> {
        self.radio.init().map_err(|e| {
            self.state = State::Error;
            SupervisorError::Init(e.to_string())
        })?;

        if self.config.watchdog_enabled {
            self.watchdog = Some(Watchdog::start(Duration::from_secs(u64::from(
                self.config.watchdog_timeout_sec,
            ))));
        }

        self.set_state(State::TxActive);
        Ok(())
    }

    fn main_loop(&mut self) -> Result<(), SupervisorError> {
        let tx_period = Duration::from_secs(u64::from(self.config.tx_period_sec));
        let tx_pause = Duration::from_secs(u64::from(self.config.tx_pause_sec));
        let capture_interval = Duration::from_secs(u64::from(self.config.capture_interval_sec));
        let cycle_len = tx_period + tx_pause;

        let started = self.clock.now();
        self.trigger_capture();
        let mut last_capture = started;

        while !self.shutdown.load(Ordering::SeqCst) {
            if self.watchdog.as_ref().is_some_and(Watchdog::is_expired) {
                self.last_error = Some("watchdog timeout".to_string());
                return Err(self.enter_error());
            }

            let now = self.clock.now();
            if now.duration_since(last_capture) >= capture_interval {
                self.trigger_capture();
                last_capture = now;
            }

            let in_active_phase = tx_pause.is_zero() || {
                let offset = now.duration_since(started).as_millis() % cycle_len.as_millis();
                offset < tx_period.as_millis()
            };

            if in_active_phase {
                if self.state != State::TxActive {
                    self.set_state(State::TxActive);
                }
                self.pump_packet();
                if self.error_streak >= self.config.max_errors {
                    return Err(self.enter_error());
                }
            } else {
                if self.state != State::TxPaused {
                    self.set_state(State::TxPaused);
                    self.radio.set_standby();
                }
                self.pet_watchdog();
                self.clock.sleep(PAUSE_SLICE);
            }
        }

        self.set_state(State::Shutdown);
        Ok(())
    }

    /// One scheduler pump: refresh telemetry inputs, build a frame, transmit.
    fn pump_packet(&mut self) {
        self.update_telemetry();
        let snapshot = self.collector.snapshot();

        let packet = match self.scheduler.next_packet(&snapshot) {
            Ok(packet) => packet,
            Err(error) => {
                // Oversize payload from a codec is a bug, but one bad frame
                // must not take the flight down
                self.error_streak += 1;
                self.last_error = Some(error.to_string());
                tracing::error!(%error, "scheduler failed to build a frame");
                return;
            }
        };

        match self.radio.transmit(&packet.frame) {
            Ok(()) => {
                self.packets_sent += 1;
                self.error_streak = 0;
                if self.packets_sent % WATCHDOG_PET_INTERVAL == 0 {
                    self.pet_watchdog();
                }
            }
            Err(error) => {
                self.error_streak += 1;
                self.last_error = Some(error.to_string());
                tracing::warn!(
                    %error,
                    streak = self.error_streak,
                    max = self.config.max_errors,
                    "transmit failed"
                );
            }
        }
    }

    fn update_telemetry(&mut self) {
        self.collector.update_gps(self.gps.snapshot());
        let mut health = self.health;
        health.radio_temp = self.radio.temperature();
        self.collector.update_health(health);
        let (image_id, progress) = self.scheduler.image_progress();
        self.collector.update_image_status(image_id, progress);
    }

    fn trigger_capture(&mut self) {
        let fix = self.gps.snapshot();
        match self.camera.capture(fix.latitude, fix.longitude, fix.altitude) {
            Ok(image) => {
                self.images_captured += 1;
                self.scheduler.queue_image(image);
            }
            Err(error) => {
                // Degrade gracefully: no fresh image, telemetry continues
                tracing::error!(%error, "capture failed");
            }
        }
    }

    fn pet_watchdog(&self) {
        if let Some(watchdog) = &self.watchdog {
            watchdog.pet();
        }
    }

    fn set_state(&mut self, new_state: State) {
        if self.state != new_state {
            tracing::info!(from = ?self.state, to = ?new_state, "state change");
            self.state = new_state;
        }
    }

    fn enter_error(&mut self) -> SupervisorError {
        self.set_state(State::Error);
        let message = self.last_error.clone().unwrap_or_else(|| "unknown".to_string());
        tracing::error!(
            error_streak = self.error_streak,
            last_error = %message,
            "entering error state"
        );

        // Grace period so the log line has a chance to reach storage, still
        // responsive to shutdown
        let deadline = self.clock.now() + ERROR_GRACE;
        while self.clock.now() < deadline && !self.shutdown.load(Ordering::SeqCst) {
            self.clock.sleep(PAUSE_SLICE);
        }

        if self.config.reboot_on_fatal_error {
            tracing::error!("requesting host reboot");
            match std::process::Command::new("sudo").arg("reboot").status() {
                Ok(status) => tracing::error!(%status, "reboot command returned"),
                Err(error) => tracing::error!(%error, "reboot command failed"),
            }
        }

        SupervisorError::Fatal(message)
    }

    fn cleanup(&mut self) {
        tracing::info!(
            packets = self.packets_sent,
            images = self.images_captured,
            "shutting down collaborators"
        );
        self.gps.stop();
        self.camera.close();
        self.radio.close();
        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
    }
}
