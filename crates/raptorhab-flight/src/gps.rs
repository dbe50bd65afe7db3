//! GPS collaborator contract and a simulated ascent profile.
//!
//! The real module owns its serial port and NMEA parsing (out of scope
//! here); what the payload consumes is a snapshot per telemetry emission.
//! Snapshots are published behind a mutex by whatever thread the source
//! runs.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use raptorhab_proto::FixType;

/// One GPS solution snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GpsFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Ground speed in m/s.
    pub speed: f64,
    /// Heading in degrees.
    pub heading: f64,
    /// Satellites used.
    pub satellites: u8,
    /// Fix quality.
    pub fix_type: FixType,
    /// GPS time as Unix seconds.
    pub unix_time: u32,
    /// True once the receiver has any usable solution.
    pub valid: bool,
    /// When this snapshot was produced.
    pub updated: Instant,
}

impl GpsFix {
    /// A "no fix yet" snapshot: all-zero position, which consumers must not
    /// plot.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            speed: 0.0,
            heading: 0.0,
            satellites: 0,
            fix_type: FixType::None,
            unix_time: 0,
            valid: false,
            updated: Instant::now(),
        }
    }
}

/// GPS collaborator contract: a snapshot on demand.
pub trait GpsSource: Send {
    /// Latest solution snapshot.
    fn snapshot(&self) -> GpsFix;

    /// Stop any background reader thread.
    fn stop(&mut self) {}
}

/// Simulated balloon ascent for `--simulate`: ~5 m/s up to 30 km, then
/// descent, drifting gently east.
#[derive(Debug)]
pub struct SimulatedGps {
    state: Arc<Mutex<GpsFix>>,
    started: Instant,
}

impl SimulatedGps {
    /// Start a simulated flight at the given launch site.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let mut fix = GpsFix::invalid();
        fix.latitude = latitude;
        fix.longitude = longitude;
        fix.satellites = 9;
        fix.fix_type = FixType::Fix3d;
        fix.valid = true;
        Self { state: Arc::new(Mutex::new(fix)), started: Instant::now() }
    }

    fn advance(&self, fix: &mut GpsFix) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let ascent_time = 30_000.0 / 5.0;
        fix.altitude = if elapsed < ascent_time {
            elapsed * 5.0
        } else {
            (30_000.0 - (elapsed - ascent_time) * 7.0).max(0.0)
        };
        fix.longitude += 0.000_001;
        fix.speed = 5.0;
        fix.heading = 90.0;
        fix.updated = Instant::now();
        fix.unix_time = fix.unix_time.wrapping_add(1);
    }
}

impl GpsSource for SimulatedGps {
    fn snapshot(&self) -> GpsFix {
        match self.state.lock() {
            Ok(mut fix) => {
                self.advance(&mut fix);
                *fix
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
