//! Telemetry payload: the 36-byte fixed-point snapshot sent every few frames.

use crate::{
    errors::{ProtocolError, Result},
    packet_type::FixType,
};

/// Serialized size of [`TelemetryPayload`].
pub const TELEMETRY_PAYLOAD_SIZE: usize = 36;

/// GPS and system telemetry.
///
/// Wire layout (big-endian, 36 bytes):
///
/// ```text
/// lat:i32 ×1e7°  lon:i32 ×1e7°  alt:u32 ×1e3m  speed:u16 ×100m/s
/// heading:u16 ×100°  sats:u8  fix:u8  gps_time:u32  batt_mv:u16
/// cpu_temp:i16 ×100°C  radio_temp:i16 ×100°C  image_id:u16
/// image_progress:u8  rssi:i8  reserved:4B
/// ```
///
/// Encoding saturates every field to its representable range: negative
/// altitude clamps to zero, temperatures saturate at ±327.67 °C, and so on.
/// `(lat, lon) = (0, 0)` means "no fix yet" and must not be plotted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryPayload {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters (negative values encode as 0).
    pub altitude: f64,
    /// Ground speed in m/s.
    pub speed: f64,
    /// Heading in degrees.
    pub heading: f64,
    /// Satellites used in the solution.
    pub satellites: u8,
    /// GPS fix quality (advisory).
    pub fix_type: FixType,
    /// GPS time as Unix seconds.
    pub gps_time: u32,
    /// Battery voltage in millivolts.
    pub battery_mv: u16,
    /// CPU temperature in °C.
    pub cpu_temp: f64,
    /// Radio temperature in °C.
    pub radio_temp: f64,
    /// Image currently being transmitted (0 if none).
    pub image_id: u16,
    /// Transmission progress of that image, 0-100.
    pub image_progress: u8,
    /// Last observed RSSI in dBm (0 on a TX-only payload).
    pub rssi: i8,
    /// Reserved, transmitted as-is.
    pub reserved: [u8; 4],
}

impl TelemetryPayload {
    /// Encode to the fixed 36-byte wire layout, saturating out-of-range
    /// values.
    #[must_use]
    pub fn encode(&self) -> [u8; TELEMETRY_PAYLOAD_SIZE] {
        let mut buf = [0u8; TELEMETRY_PAYLOAD_SIZE];
        // Float-to-int `as` casts saturate at the integer bounds and truncate
        // toward zero, which is exactly the clamping the wire format wants.
        buf[0..4].copy_from_slice(&((self.latitude * 1e7) as i32).to_be_bytes());
        buf[4..8].copy_from_slice(&((self.longitude * 1e7) as i32).to_be_bytes());
        buf[8..12].copy_from_slice(&((self.altitude * 1000.0) as u32).to_be_bytes());
        buf[12..14].copy_from_slice(&((self.speed * 100.0) as u16).to_be_bytes());
        buf[14..16].copy_from_slice(&((self.heading * 100.0) as u16).to_be_bytes());
        buf[16] = self.satellites;
        buf[17] = self.fix_type.to_u8();
        buf[18..22].copy_from_slice(&self.gps_time.to_be_bytes());
        buf[22..24].copy_from_slice(&self.battery_mv.to_be_bytes());
        buf[24..26].copy_from_slice(&((self.cpu_temp * 100.0) as i16).to_be_bytes());
        buf[26..28].copy_from_slice(&((self.radio_temp * 100.0) as i16).to_be_bytes());
        buf[28..30].copy_from_slice(&self.image_id.to_be_bytes());
        buf[30] = self.image_progress;
        buf[31] = self.rssi as u8;
        buf[32..36].copy_from_slice(&self.reserved);
        buf
    }

    /// Decode from at least 36 bytes; trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadTooShort`] for buffers under 36 bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < TELEMETRY_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                what: "telemetry",
                expected: TELEMETRY_PAYLOAD_SIZE,
                actual: data.len(),
            });
        }

        let mut reserved = [0u8; 4];
        reserved.copy_from_slice(&data[32..36]);

        Ok(Self {
            latitude: f64::from(i32::from_be_bytes(be4(data, 0))) / 1e7,
            longitude: f64::from(i32::from_be_bytes(be4(data, 4))) / 1e7,
            altitude: f64::from(u32::from_be_bytes(be4(data, 8))) / 1000.0,
            speed: f64::from(u16::from_be_bytes(be2(data, 12))) / 100.0,
            heading: f64::from(u16::from_be_bytes(be2(data, 14))) / 100.0,
            satellites: data[16],
            fix_type: FixType::from_u8(data[17]),
            gps_time: u32::from_be_bytes(be4(data, 18)),
            battery_mv: u16::from_be_bytes(be2(data, 22)),
            cpu_temp: f64::from(i16::from_be_bytes(be2(data, 24))) / 100.0,
            radio_temp: f64::from(i16::from_be_bytes(be2(data, 26))) / 100.0,
            image_id: u16::from_be_bytes(be2(data, 28)),
            image_progress: data[30],
            rssi: data[31] as i8,
            reserved,
        })
    }
}

fn be4(data: &[u8], offset: usize) -> [u8; 4] {
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}

fn be2(data: &[u8], offset: usize) -> [u8; 2] {
    [data[offset], data[offset + 1]]
}
