//! Transmit-side radio contract and the simulation stub.
//!
//! The real driver owns physical-layer framing below the sync word
//! (preamble, whitening, FEC); this layer only hands it complete frames. TX
//! is blocking for the frame's air time, which is the payload's main
//! suspension point.

use thiserror::Error;

/// Radio failures surfaced to the supervisor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// Driver could not be initialized.
    #[error("radio init failed: {0}")]
    Init(String),

    /// A transmission did not complete.
    #[error("transmit failed: {0}")]
    Transmit(String),
}

/// Transmit-side radio driver contract.
pub trait FlightRadio: Send {
    /// Bring the radio up. Called once from `Initializing`.
    fn init(&mut self) -> Result<(), RadioError>;

    /// Transmit one frame, blocking for its air time.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    /// Enter low-power standby (duty-cycle pause).
    fn set_standby(&mut self);

    /// PA temperature in °C, advisory; 0.0 when unknown.
    fn temperature(&self) -> f64;

    /// Release the hardware. Called once at shutdown.
    fn close(&mut self);
}

/// Radio stub for `--simulate`: counts frames and discards them.
#[derive(Debug, Default)]
pub struct SimulatedRadio {
    frames_sent: u64,
    standby: bool,
}

impl SimulatedRadio {
    /// New idle stub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames accepted so far.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Whether the stub is currently in standby.
    #[must_use]
    pub fn is_standby(&self) -> bool {
        self.standby
    }
}

impl FlightRadio for SimulatedRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        tracing::info!("simulated radio up");
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        self.standby = false;
        self.frames_sent += 1;
        tracing::trace!(len = frame.len(), total = self.frames_sent, "simulated tx");
        // Approximate the air time of a 255-byte frame at ~100 kbps
        std::thread::sleep(std::time::Duration::from_micros(500));
        Ok(())
    }

    fn set_standby(&mut self) {
        self.standby = true;
        tracing::debug!("simulated radio standby");
    }

    fn temperature(&self) -> f64 {
        26.5
    }

    fn close(&mut self) {
        tracing::info!(frames = self.frames_sent, "simulated radio closed");
    }
}
