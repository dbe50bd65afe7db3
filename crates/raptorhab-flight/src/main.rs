//! RaptorHAB flight payload binary.
//!
//! # Usage
//!
//! ```bash
//! # Full simulation, no hardware required
//! raptorhab-flight --simulate
//!
//! # Hardware flight with overrides
//! RAPTORHAB_CALLSIGN=KD9XYZ raptorhab-flight --frequency 868.5 --tx-pause 0
//! ```
//!
//! Exit code 0 on clean shutdown, non-zero on unrecoverable error.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use clap::Parser;
use raptorhab_flight::{
    FlightConfig, FlightSupervisor,
    camera::SimulatedCamera,
    gps::SimulatedGps,
    radio::SimulatedRadio,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RaptorHAB airborne payload (transmit-only)
#[derive(Parser, Debug)]
#[command(name = "raptorhab-flight")]
#[command(about = "RaptorHAB airborne payload (transmit-only)")]
#[command(version)]
struct Args {
    /// Simulate every collaborator (radio, GPS, camera)
    #[arg(long)]
    simulate: bool,

    /// Override the configured callsign
    #[arg(long)]
    callsign: Option<String>,

    /// Override the radio frequency (MHz)
    #[arg(long)]
    frequency: Option<f64>,

    /// Override TX power (dBm, 0-22)
    #[arg(long)]
    power: Option<u8>,

    /// Override the pause between TX bursts (seconds, 0 = continuous)
    #[arg(long)]
    tx_pause: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = match FlightConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "configuration rejected");
            return std::process::ExitCode::from(2);
        }
    };

    if args.simulate {
        config.simulate_gps = true;
        config.simulate_camera = true;
        config.simulate_radio = true;
    }
    if let Some(callsign) = args.callsign {
        config.callsign = callsign;
    }
    if let Some(frequency) = args.frequency {
        config.frequency_mhz = frequency;
    }
    if let Some(power) = args.power {
        config.tx_power_dbm = power.min(22);
    }
    if let Some(tx_pause) = args.tx_pause {
        config.tx_pause_sec = tx_pause;
    }

    if !(config.simulate_radio && config.simulate_gps && config.simulate_camera) {
        // Hardware drivers (SX1262 SPI, NMEA serial, libcamera) bind here in a
        // real deployment; this repository ships the contracts and simulators.
        tracing::error!(
            "hardware collaborators are not linked into this build; run with --simulate"
        );
        return std::process::ExitCode::from(2);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(error) = ctrlc::set_handler(move || {
            tracing::info!("shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        }) {
            tracing::error!(%error, "failed to install signal handler");
            return std::process::ExitCode::from(2);
        }
    }

    let mut supervisor = FlightSupervisor::new(
        config,
        Box::new(SimulatedRadio::new()),
        Box::new(SimulatedGps::new(47.3769, 8.5417)),
        Box::new(SimulatedCamera::default()),
        shutdown,
    );

    match supervisor.run() {
        Ok(()) => {
            tracing::info!("clean shutdown");
            std::process::ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, "unrecoverable error");
            std::process::ExitCode::FAILURE
        }
    }
}
