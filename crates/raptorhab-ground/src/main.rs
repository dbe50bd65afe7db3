//! RaptorHAB ground station binary.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic downlink, no hardware required
//! raptorhab-ground --simulate
//!
//! # Real receiver with a session directory
//! raptorhab-ground --data-dir /srv/hab --frequency 868.5
//! ```
//!
//! Exit code 0 on clean shutdown, non-zero on unrecoverable error.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use clap::Parser;
use raptorhab_ground::{
    EngineConfig, GroundConfig, GroundSupervisor, PacketDispatcher, ReconstructionEngine,
    clock::SystemClock,
    radio::SimulatedRadio,
    storage::{FsSessionStore, SessionStore},
    telemetry::{CsvSink, FanoutSink, LogSink, TelemetrySink},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RaptorHAB ground station (receive-only)
#[derive(Parser, Debug)]
#[command(name = "raptorhab-ground")]
#[command(about = "RaptorHAB ground station (receive-only)")]
#[command(version)]
struct Args {
    /// Simulate the radio (synthetic flight, no hardware)
    #[arg(long)]
    simulate: bool,

    /// Override the configured callsign
    #[arg(long)]
    callsign: Option<String>,

    /// Override the radio frequency (MHz)
    #[arg(long)]
    frequency: Option<f64>,

    /// Override the session storage directory
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = match GroundConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "configuration rejected");
            return std::process::ExitCode::from(2);
        }
    };
    if args.simulate {
        config.simulate_radio = true;
    }
    if let Some(callsign) = args.callsign {
        config.callsign = callsign;
    }
    if let Some(frequency) = args.frequency {
        config.frequency_mhz = frequency;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    if !config.simulate_radio {
        // The SX1262 SPI driver binds here in a real deployment; this
        // repository ships the contract and the simulator.
        tracing::error!("hardware radio is not linked into this build; run with --simulate");
        return std::process::ExitCode::from(2);
    }

    let store = match FsSessionStore::create(&config.data_dir) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!(%error, dir = %config.data_dir.display(), "cannot open session");
            return std::process::ExitCode::from(2);
        }
    };
    tracing::info!(
        session = store.session_id(),
        callsign = %config.callsign,
        frequency_mhz = config.frequency_mhz,
        codec = %config.fountain_codec,
        "ground station starting"
    );

    let telemetry_sink: Box<dyn TelemetrySink> = match CsvSink::create(&store.telemetry_csv_path())
    {
        Ok(csv) => Box::new(FanoutSink::new(vec![Box::new(LogSink), Box::new(csv)])),
        Err(error) => {
            tracing::warn!(%error, "telemetry csv unavailable, logging only");
            Box::new(LogSink)
        }
    };

    let engine_config = EngineConfig {
        codec: config.fountain_codec,
        max_pending: config.max_pending_images,
        inactivity_timeout: Duration::from_secs(u64::from(config.image_timeout_sec)),
    };
    let mut engine = ReconstructionEngine::new(engine_config);
    let packet_log_path = store.packet_log_path();
    let mut store = store;
    engine.on_complete(Box::new(move |image_id, data, meta| {
        if let Err(error) = store.store_image(image_id, data, meta) {
            tracing::error!(image_id, %error, "failed to store image");
        }
    }));

    let mut dispatcher =
        PacketDispatcher::new(engine, telemetry_sink, config.fountain_symbol_size);
    if config.log_raw_packets
        && let Err(error) = dispatcher.enable_packet_log(&packet_log_path)
    {
        tracing::warn!(%error, "packet log unavailable");
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

    let mut supervisor = GroundSupervisor::new(
        Box::new(SimulatedRadio::new(config.fountain_symbol_size)),
        dispatcher,
        SystemClock,
        shutdown,
        Duration::from_secs(u64::from(config.no_signal_after_sec)),
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
