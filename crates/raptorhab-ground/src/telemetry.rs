//! Telemetry consumers.
//!
//! The dispatcher pushes every valid telemetry payload into one
//! [`TelemetrySink`]; what happens next (logging, persistence, alerting,
//! upstream forwarding) is the sink's business and nothing is returned.

use std::io::Write;
use std::path::Path;

use raptorhab_proto::payloads::TelemetryPayload;

/// Consumer of decoded telemetry frames.
pub trait TelemetrySink: Send {
    /// Handle one telemetry payload with its link metadata.
    fn process_packet(&mut self, telemetry: &TelemetryPayload, rssi: i16, sequence: u16);
}

/// Sink that narrates the flight into the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn process_packet(&mut self, telemetry: &TelemetryPayload, rssi: i16, sequence: u16) {
        tracing::info!(
            seq = sequence,
            lat = telemetry.latitude,
            lon = telemetry.longitude,
            alt_m = telemetry.altitude,
            sats = telemetry.satellites,
            batt_mv = telemetry.battery_mv,
            rssi,
            "telemetry"
        );
    }
}

/// Sink appending one CSV row per telemetry frame.
#[derive(Debug)]
pub struct CsvSink {
    writer: std::io::BufWriter<std::fs::File>,
}

impl CsvSink {
    /// Create (or append to) the CSV at `path`, writing the header for a
    /// fresh file.
    ///
    /// # Errors
    ///
    /// Propagates file-creation failures.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let fresh = !path.exists();
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = std::io::BufWriter::new(file);
        if fresh {
            writeln!(
                writer,
                "seq,rssi,latitude,longitude,altitude_m,speed_ms,heading_deg,satellites,\
                 fix_type,gps_time,battery_mv,cpu_temp_c,radio_temp_c,image_id,image_progress"
            )?;
        }
        Ok(Self { writer })
    }

    fn write_row(
        &mut self,
        telemetry: &TelemetryPayload,
        rssi: i16,
        sequence: u16,
    ) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{:.7},{:.7},{:.3},{:.2},{:.2},{},{},{},{},{:.2},{:.2},{},{}",
            sequence,
            rssi,
            telemetry.latitude,
            telemetry.longitude,
            telemetry.altitude,
            telemetry.speed,
            telemetry.heading,
            telemetry.satellites,
            telemetry.fix_type.to_u8(),
            telemetry.gps_time,
            telemetry.battery_mv,
            telemetry.cpu_temp,
            telemetry.radio_temp,
            telemetry.image_id,
            telemetry.image_progress,
        )?;
        self.writer.flush()
    }
}

impl TelemetrySink for CsvSink {
    fn process_packet(&mut self, telemetry: &TelemetryPayload, rssi: i16, sequence: u16) {
        if let Err(error) = self.write_row(telemetry, rssi, sequence) {
            tracing::warn!(%error, "telemetry csv write failed");
        }
    }
}

/// Fan out one payload to several sinks.
pub struct FanoutSink {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl FanoutSink {
    /// Combine `sinks` into one.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for FanoutSink {
    fn process_packet(&mut self, telemetry: &TelemetryPayload, rssi: i16, sequence: u16) {
        for sink in &mut self.sinks {
            sink.process_packet(telemetry, rssi, sequence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        let telemetry = TelemetryPayload {
            latitude: 47.123_456_7,
            longitude: 8.5,
            altitude: 1_000.5,
            satellites: 8,
            battery_mv: 4000,
            ..TelemetryPayload::default()
        };
        sink.process_packet(&telemetry, -75, 3);
        sink.process_packet(&telemetry, -76, 4);
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("seq,rssi,latitude"));
        assert!(lines[1].starts_with("3,-75,47.1234567,"));
        assert!(lines[2].starts_with("4,-76,"));
    }

    #[test]
    fn csv_sink_appends_without_duplicate_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");

        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.process_packet(&TelemetryPayload::default(), -70, 1);
        }
        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.process_packet(&TelemetryPayload::default(), -71, 2);
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().filter(|l| l.starts_with("seq,")).count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }
}
