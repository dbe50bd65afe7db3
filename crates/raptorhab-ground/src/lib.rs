//! RaptorHAB ground station.
//!
//! Receive-only counterpart of the flight payload: a receiver loop polls the
//! radio, a dispatcher validates and demultiplexes frames, a per-image
//! reconstruction engine feeds fountain decoders and gates every completed
//! image on its CRC-32, and a session store persists the flight.
//!
//! The dispatcher and engine are single-threaded by design — the engine's
//! map is only ever touched from the receiver loop, so reconstruction needs
//! no locks. Everything time-dependent (inactivity sweeps, the no-signal
//! indicator) goes through an injected clock and is tested without sleeping.

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod radio;
pub mod storage;
pub mod supervisor;
pub mod telemetry;

pub use config::{ConfigError, GroundConfig};
pub use dispatcher::{DispatcherStats, PacketDispatcher};
pub use engine::{EngineConfig, EngineStats, ImageStatus, ReconstructionEngine};
pub use supervisor::GroundSupervisor;
