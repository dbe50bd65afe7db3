//! Ground supervisor: the receiver loop and its periodic housekeeping.
//!
//! One thread does everything: poll the radio, dispatch the frame, and once
//! a second run the engine sweep and the no-signal indicator. Errors are
//! logged and the loop keeps going — a ground station never reboots itself,
//! the operator is right there.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    clock::Clock,
    dispatcher::PacketDispatcher,
    radio::{GroundRadio, RadioError},
};

/// Poll interval when the radio has nothing for us.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Housekeeping tick period.
const TICK: Duration = Duration::from_secs(1);

/// Status summary log period.
const STATUS_LOG: Duration = Duration::from_secs(10);

/// Fatal ground-side failures (only initialization can be one).
#[derive(Error, Debug)]
pub enum GroundError {
    /// The radio never came up.
    #[error(transparent)]
    Radio(#[from] RadioError),
}

/// Link indicator driven by frame arrival times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    /// No valid frame yet this session.
    WaitingForFirst,
    /// Frames arriving.
    Receiving,
    /// Nothing valid for longer than the configured window.
    NoSignal,
}

/// Owns the radio, the dispatcher, and the housekeeping cadence.
pub struct GroundSupervisor<C: Clock> {
    radio: Box<dyn GroundRadio>,
    dispatcher: PacketDispatcher<C>,
    clock: C,
    shutdown: Arc<AtomicBool>,
    no_signal_after: Duration,

    last_valid: Option<Instant>,
    signal: SignalState,
}

impl<C: Clock> GroundSupervisor<C> {
    /// Wire the supervisor together.
    #[must_use]
    pub fn new(
        radio: Box<dyn GroundRadio>,
        dispatcher: PacketDispatcher<C>,
        clock: C,
        shutdown: Arc<AtomicBool>,
        no_signal_after: Duration,
    ) -> Self {
        Self {
            radio,
            dispatcher,
            clock,
            shutdown,
            no_signal_after,
            last_valid: None,
            signal: SignalState::WaitingForFirst,
        }
    }

    /// Current link indicator.
    #[must_use]
    pub fn signal(&self) -> SignalState {
        self.signal
    }

    /// The dispatcher, for tests and status displays.
    #[must_use]
    pub fn dispatcher(&self) -> &PacketDispatcher<C> {
        &self.dispatcher
    }

    /// Run the receiver loop until shutdown.
    ///
    /// # Errors
    ///
    /// [`GroundError::Radio`] if the radio fails to initialize; everything
    /// after that is logged, never fatal.
    pub fn run(&mut self) -> Result<(), GroundError> {
        self.radio.init()?;
        self.radio.receive_continuous();
        tracing::info!("receiver loop started");

        let mut last_tick = self.clock.now();
        let mut last_status = self.clock.now();

        while !self.shutdown.load(Ordering::SeqCst) {
            let (frame, rssi) = self.radio.check_for_packet();
            match frame {
                Some(data) => {
                    if self.dispatcher.handle_frame(&data, rssi) {
                        self.last_valid = Some(self.clock.now());
                        if self.signal != SignalState::Receiving {
                            tracing::info!("signal acquired");
                            self.signal = SignalState::Receiving;
                        }
                    }
                }
                None => std::thread::sleep(IDLE_POLL),
            }

            let now = self.clock.now();
            if now.duration_since(last_tick) >= TICK {
                last_tick = now;
                self.tick(now);
            }
            if now.duration_since(last_status) >= STATUS_LOG {
                last_status = now;
                self.log_status();
            }
        }

        tracing::info!("receiver loop stopping");
        self.radio.close();
        Ok(())
    }

    /// One housekeeping pass: engine sweep plus the no-signal indicator.
    /// Public so tests can drive it without the radio loop.
    pub fn tick(&mut self, now: Instant) {
        self.dispatcher.engine_mut().sweep();

        let silent = match self.last_valid {
            Some(last) => now.duration_since(last) > self.no_signal_after,
            None => false,
        };
        if silent && self.signal == SignalState::Receiving {
            tracing::warn!(
                window_sec = self.no_signal_after.as_secs(),
                "no valid frames, signal lost"
            );
            self.signal = SignalState::NoSignal;
        }
    }

    fn log_status(&self) {
        let stats = self.dispatcher.stats();
        let engine = self.dispatcher.engine().stats();
        tracing::info!(
            valid = stats.valid,
            invalid = stats.invalid,
            telemetry = stats.telemetry,
            image_data = stats.image_data,
            images_done = engine.images_completed,
            images_failed = engine.images_failed,
            pending = self.dispatcher.engine().pending_count(),
            rssi = stats.last_rssi,
            signal = ?self.signal,
            "rx status"
        );
    }
}

#[cfg(test)]
mod tests {
    use raptorhab_proto::{PacketFlags, PacketType, build_packet, payloads::TelemetryPayload};

    use super::*;
    use crate::{
        clock::ManualClock,
        engine::{EngineConfig, ReconstructionEngine},
        telemetry::LogSink,
    };

    /// Radio scripted with a fixed set of frames, then silence.
    struct ScriptedRadio {
        frames: Vec<Vec<u8>>,
        shutdown: Arc<AtomicBool>,
        clock: ManualClock,
    }

    impl GroundRadio for ScriptedRadio {
        fn init(&mut self) -> Result<(), RadioError> {
            Ok(())
        }

        fn receive_continuous(&mut self) {}

        fn check_for_packet(&mut self) -> (Option<Vec<u8>>, i16) {
            self.clock.advance(Duration::from_millis(1100));
            match self.frames.pop() {
                Some(frame) => (Some(frame), -80),
                None => {
                    // 40 simulated seconds of silence, then stop the test
                    self.clock.advance(Duration::from_secs(40));
                    self.shutdown.store(true, Ordering::SeqCst);
                    (None, -120)
                }
            }
        }

        fn set_standby(&mut self) {}

        fn close(&mut self) {}
    }

    #[test]
    fn signal_indicator_tracks_frame_arrivals() {
        let clock = ManualClock::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let frame = build_packet(
            PacketType::Telemetry,
            0,
            &TelemetryPayload::default().encode(),
            PacketFlags::NONE,
        )
        .unwrap();

        let radio = ScriptedRadio {
            frames: vec![frame.clone(), frame],
            shutdown: Arc::clone(&shutdown),
            clock: clock.clone(),
        };
        let engine = ReconstructionEngine::with_clock(EngineConfig::default(), clock.clone());
        let dispatcher = PacketDispatcher::new(engine, Box::new(LogSink), 200);

        let mut supervisor = GroundSupervisor::new(
            Box::new(radio),
            dispatcher,
            clock,
            shutdown,
            Duration::from_secs(30),
        );

        supervisor.run().unwrap();

        // Two frames were received, then the 40 s of silence tripped the
        // indicator on the final tick
        assert_eq!(supervisor.dispatcher().stats().valid, 2);
        assert_eq!(supervisor.signal(), SignalState::NoSignal);
    }
}
