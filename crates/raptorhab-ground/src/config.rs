//! Ground station configuration from environment variables.

use std::path::PathBuf;

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

/// Ground station configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundConfig {
    /// Station callsign, stamped into logs and session records.
    pub callsign: String,
    /// Radio center frequency in MHz; must match the flight side.
    pub frequency_mhz: f64,
    /// Fountain symbol size in bytes; must match the flight side.
    pub fountain_symbol_size: usize,
    /// Which fountain code this deployment runs; must match the flight side.
    pub fountain_codec: FountainCodec,
    /// Concurrent image reconstructions before the oldest is evicted.
    pub max_pending_images: usize,
    /// Seconds of inactivity before a reconstruction is abandoned.
    pub image_timeout_sec: u32,
    /// Seconds without a valid frame before the no-signal indicator trips.
    pub no_signal_after_sec: u32,
    /// Append every raw frame (hex) to the session packet log.
    pub log_raw_packets: bool,
    /// Root directory for session storage.
    pub data_dir: PathBuf,
    /// Replace the radio with a synthetic flight.
    pub simulate_radio: bool,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            callsign: "RPHAB-GS".to_string(),
            frequency_mhz: 915.0,
            fountain_symbol_size: 200,
            fountain_codec: FountainCodec::Lt,
            max_pending_images: 10,
            image_timeout_sec: 300,
            no_signal_after_sec: 30,
            log_raw_packets: false,
            data_dir: PathBuf::from("./raptorhab-data"),
            simulate_radio: false,
        }
    }
}

impl GroundConfig {
    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] naming the first variable that fails to parse or
    /// validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests inject maps here).
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
            config.frequency_mhz = value.parse().map_err(|_| ConfigError::Invalid {
                key: "RAPTORHAB_FREQUENCY",
                value,
                expected: "float MHz",
            })?;
        }
        if let Some(value) = lookup("RAPTORHAB_SYMBOL_SIZE") {
            config.fountain_symbol_size =
                parse_ranged(value, "RAPTORHAB_SYMBOL_SIZE", 1, 237, "1-237 bytes")? as usize;
        }
        if let Some(value) = lookup("RAPTORHAB_FOUNTAIN_CODEC") {
            config.fountain_codec = value.parse().map_err(|_| ConfigError::Invalid {
                key: "RAPTORHAB_FOUNTAIN_CODEC",
                value,
                expected: "lt or raptorq",
            })?;
        }
        if let Some(value) = lookup("RAPTORHAB_MAX_PENDING_IMAGES") {
            config.max_pending_images =
                parse_ranged(value, "RAPTORHAB_MAX_PENDING_IMAGES", 1, 1_000, "1-1000")? as usize;
        }
        if let Some(value) = lookup("RAPTORHAB_IMAGE_TIMEOUT") {
            config.image_timeout_sec =
                parse_ranged(value, "RAPTORHAB_IMAGE_TIMEOUT", 10, 86_400, "10-86400 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_NO_SIGNAL_AFTER") {
            config.no_signal_after_sec =
                parse_ranged(value, "RAPTORHAB_NO_SIGNAL_AFTER", 1, 3_600, "1-3600 s")? as u32;
        }
        if let Some(value) = lookup("RAPTORHAB_LOG_RAW_PACKETS") {
            config.log_raw_packets = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "RAPTORHAB_LOG_RAW_PACKETS",
                        value,
                        expected: "boolean",
                    });
                }
            };
        }
        if let Some(value) = lookup("RAPTORHAB_DATA_DIR") {
            config.data_dir = PathBuf::from(value);
        }

        Ok(config)
    }
}

fn parse_ranged(
    value: String,
    key: &'static str,
    min: i64,
    max: i64,
    range: &'static str,
) -> Result<i64, ConfigError> {
    let parsed: i64 = value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value, expected: "integer" })?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ConfigError::OutOfRange { key, value: parsed, range })
    }
}
