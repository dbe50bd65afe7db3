//! RaptorHAB airborne payload.
//!
//! A transmit-only flight computer: GPS and camera collaborators feed a
//! single-threaded packet scheduler that statistically multiplexes telemetry,
//! image metadata, and fountain-coded image data onto one frame stream. A
//! supervisor state machine drives the duty cycle
//! (`Initializing → TxActive ⇄ TxPaused`, terminal `Error`/`Shutdown`),
//! pets a software watchdog, and owns the radio.
//!
//! Nothing here listens: the downlink is one-way by design, and reliability
//! comes entirely from the fountain code's redundancy.

pub mod camera;
pub mod clock;
pub mod config;
pub mod gps;
pub mod radio;
pub mod scheduler;
pub mod supervisor;
pub mod telemetry;
pub mod watchdog;

pub use config::{ConfigError, FlightConfig};
pub use scheduler::{PacketPriority, PacketScheduler, SchedulerError};
pub use supervisor::{FlightSupervisor, State};
