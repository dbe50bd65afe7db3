//! Telemetry collector: merges GPS, system health, and image progress into
//! the 36-byte wire snapshot.

use raptorhab_proto::payloads::TelemetryPayload;

use crate::gps::GpsFix;

/// System health readings gathered outside the GPS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHealth {
    /// Battery voltage in millivolts.
    pub battery_mv: u16,
    /// CPU temperature in °C.
    pub cpu_temp: f64,
    /// Radio PA temperature in °C.
    pub radio_temp: f64,
}

/// Accumulates the latest readings and assembles telemetry payloads.
///
/// A collaborator fault leaves its last reading in place (or zeros on a
/// fresh collector), so telemetry degrades gracefully instead of failing.
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    gps: Option<GpsFix>,
    health: SystemHealth,
    image_id: u16,
    image_progress: u8,
}

impl TelemetryCollector {
    /// Fresh collector with all-zero readings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest GPS snapshot. Invalid fixes are kept out so the
    /// payload reports `(0, 0)` until the first real solution.
    pub fn update_gps(&mut self, fix: GpsFix) {
        if fix.valid {
            self.gps = Some(fix);
        }
    }

    /// Record system health readings.
    pub fn update_health(&mut self, health: SystemHealth) {
        self.health = health;
    }

    /// Record which image is transmitting and how far along it is.
    pub fn update_image_status(&mut self, image_id: u16, progress: u8) {
        self.image_id = image_id;
        self.image_progress = progress.min(100);
    }

    /// Assemble the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TelemetryPayload {
        let mut payload = TelemetryPayload {
            battery_mv: self.health.battery_mv,
            cpu_temp: self.health.cpu_temp,
            radio_temp: self.health.radio_temp,
            image_id: self.image_id,
            image_progress: self.image_progress,
            // TX-only payload: there is no received signal to report
            rssi: 0,
            ..TelemetryPayload::default()
        };

        if let Some(fix) = &self.gps {
            payload.latitude = fix.latitude;
            payload.longitude = fix.longitude;
            payload.altitude = fix.altitude;
            payload.speed = fix.speed;
            payload.heading = fix.heading;
            payload.satellites = fix.satellites;
            payload.fix_type = fix.fix_type;
            payload.gps_time = fix.unix_time;
        }

        payload
    }
}
