//! Flight configuration from environment variables.
//!
//! Every knob has a `RAPTORHAB_`-prefixed environment variable and a sane
//! default; the binary layers CLI overrides on top. Validation happens once
//! at startup — a bad value names its key and the process exits before any
//! hardware is touched.

use raptorhab_fountain::FountainCodec;
use thiserror::Error;

/// Configuration errors, always naming the offending variable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value failed to parse as its expected type.
    #[error("{key}: cannot parse {value:?} as {expected}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Raw value found
        value: String,
        /// Type or format expected
        expected: &'static str,
    },

    /// Value parsed but is outside its permitted range.
    #[error("{key}: {value} outside permitted range {range}")]
    OutOfRange {
        /// Environment variable name
        key: &'static str,
        /// Parsed value
        value: i64,
        /// Human-readable permitted range
        range: &'static str,
    },
}

/// Airborne payload configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightConfig {
    /// Station callsign, stamped into logs.
    pub callsign: String,
    /// Radio center frequency in MHz.
    pub frequency_mhz: f64,
    /// TX power in dBm (0-22 for the SX1262 PA).
    pub tx_power_dbm: u8,
    /// Duration of each TX burst in seconds (≥ 1).
    pub tx_period_sec: u32,
    /// Pause between bursts in seconds (0 = transmit continuously).
    pub tx_pause_sec: u32,
    /// Every Nth packet is telemetry.
    pub telemetry_interval_packets: u32,
    /// Every Nth packet is image metadata (when an image is active).
    pub image_meta_interval_packets: u32,
    /// Seconds between camera captures (5-3600).
    pub capture_interval_sec: u32,
    /// Fountain symbol size in bytes.
    pub fountain_symbol_size: usize,
    /// Extra symbols beyond K, as a percentage.
    pub fountain_overhead_percent: u32,
    /// Which fountain code this deployment runs.
    pub fountain_codec: FountainCodec,
    /// Capture-archive cap handed to the camera collaborator.
    pub max_stored_images: u32,
    /// Pending-image queue capacity; captures drop when full.
    pub image_queue_capacity: usize,
    /// Consecutive errors before the supervisor gives up.
    pub max_errors: u32,
    /// Software watchdog on/off.
    pub watchdog_enabled: bool,
    /// Watchdog timeout in seconds.
    pub watchdog_timeout_sec: u32,
    /// Reboot the host after a fatal error.
    pub reboot_on_fatal_error: bool,
    /// Replace the GPS with a simulated ascent.
    pub simulate_gps: bool,
    /// Replace the camera with a synthetic image source.
    pub simulate_camera: bool,
    /// Replace the radio with a logging stub.
    pub simulate_radio: bool,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            callsign: "RPHAB1".to_string(),
            frequency_mhz: 915.0,
            tx_power_dbm: 22,
            tx_period_sec: 3,
            tx_pause_sec: 10,
            telemetry_interval_packets: 10,
            image_meta_interval_packets: 100,
            capture_interval_sec: 120,
            fountain_symbol_size: 200,
            fountain_overhead_percent: 25,
            fountain_codec: FountainCodec::Lt,
            max_stored_images: 100,
            image_queue_capacity: 5,
            max_errors: 10,
            watchdog_enabled: true,
            watchdog_timeout_sec: 60,
            reboot_on_fatal_error: false,
            simulate_gps: false,
            simulate_camera: false,
            simulate_radio: false,
        }
    }
}

impl FlightConfig {
    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] naming the first variable that fails to parse or
    /// validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests inject maps here instead of
    /// mutating process-global environment).
    ///
    /// # Errors
    ///
    /// [`ConfigError`] naming the first variable that fails to parse or
    /// validate.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("RAPTORHAB_CALLSIGN") {
            config.callsign = value;
        }
        if let Some(value) = lookup("RAPTORHAB_FREQUENCY") {
            config.frequency_mhz = parse(value, "RAPTORHAB_FREQUENCY", "float MHz")?;
        }
        if let Some(value) = lookup("RAPTORHAB_TX_POWER") {
            config.tx_power_dbm =
                parse_ranged(value, "RAPTORHAB_TX_POWER", 0, 22, "0-22 dBm")? as u8;
        }
        if let Some(value) = lookup("RAPTORHAB_TX_PERIOD") {
            config.tx_period_sec =
                parse_ranged(value, "RAPTORHAB_TX_PERIOD", 1, 86_400, ">= 1 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_TX_PAUSE") {
            config.tx_pause_sec =
                parse_ranged(value, "RAPTORHAB_TX_PAUSE", 0, 86_400, ">= 0 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_TELEMETRY_INTERVAL") {
            config.telemetry_interval_packets =
                parse_ranged(value, "RAPTORHAB_TELEMETRY_INTERVAL", 1, 10_000, ">= 1")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_IMAGE_META_INTERVAL") {
            config.image_meta_interval_packets =
                parse_ranged(value, "RAPTORHAB_IMAGE_META_INTERVAL", 1, 100_000, ">= 1")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_CAPTURE_INTERVAL") {
            config.capture_interval_sec =
                parse_ranged(value, "RAPTORHAB_CAPTURE_INTERVAL", 5, 3_600, "5-3600 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_SYMBOL_SIZE") {
            config.fountain_symbol_size =
                parse_ranged(value, "RAPTORHAB_SYMBOL_SIZE", 1, 237, "1-237 bytes")? as usize;
        }
        if let Some(value) = lookup("RAPTORHAB_OVERHEAD_PERCENT") {
            config.fountain_overhead_percent =
                parse_ranged(value, "RAPTORHAB_OVERHEAD_PERCENT", 0, 1_000, "0-1000 %")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_FOUNTAIN_CODEC") {
            config.fountain_codec = value.parse().map_err(|_| ConfigError::Invalid {
                key: "RAPTORHAB_FOUNTAIN_CODEC",
                value,
                expected: "lt or raptorq",
            })?;
        }
        if let Some(value) = lookup("RAPTORHAB_MAX_STORED_IMAGES") {
            config.max_stored_images =
                parse_ranged(value, "RAPTORHAB_MAX_STORED_IMAGES", 1, 100_000, ">= 1")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_IMAGE_QUEUE_CAPACITY") {
            config.image_queue_capacity =
                parse_ranged(value, "RAPTORHAB_IMAGE_QUEUE_CAPACITY", 1, 100, "1-100")? as usize;
        }
        if let Some(value) = lookup("RAPTORHAB_MAX_ERRORS") {
            config.max_errors =
                parse_ranged(value, "RAPTORHAB_MAX_ERRORS", 1, 10_000, ">= 1")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_WATCHDOG_ENABLED") {
            config.watchdog_enabled = parse_bool(&value, "RAPTORHAB_WATCHDOG_ENABLED")?;
        }
        if let Some(value) = lookup("RAPTORHAB_WATCHDOG_TIMEOUT") {
            config.watchdog_timeout_sec =
                parse_ranged(value, "RAPTORHAB_WATCHDOG_TIMEOUT", 5, 3_600, "5-3600 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_REBOOT_ON_FATAL") {
            config.reboot_on_fatal_error = parse_bool(&value, "RAPTORHAB_REBOOT_ON_FATAL")?;
        }
        if let Some(value) = lookup("RAPTORHAB_SIMULATE_GPS") {
            config.simulate_gps = parse_bool(&value, "RAPTORHAB_SIMULATE_GPS")?;
        }
        if let Some(value) = lookup("RAPTORHAB_SIMULATE_CAMERA") {
            config.simulate_camera = parse_bool(&value, "RAPTORHAB_SIMULATE_CAMERA")?;
        }
        if let Some(value) = lookup("RAPTORHAB_SIMULATE_RADIO") {
            config.simulate_radio = parse_bool(&value, "RAPTORHAB_SIMULATE_RADIO")?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(
    value: String,
    key: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { key, value, expected })
}

fn parse_ranged(
    value: String,
    key: &'static str,
    min: i64,
    max: i64,
    range: &'static str,
) -> Result<i64, ConfigError> {
    let parsed: i64 = parse(value, key, "integer")?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ConfigError::OutOfRange { key, value: parsed, range })
    }
}

fn parse_bool(value: &str, key: &'static str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: value.to_string(), expected: "boolean" }),
    }
}
