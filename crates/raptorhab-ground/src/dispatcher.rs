//! Packet dispatcher: validate, demultiplex, count.
//!
//! Single consumer of the engine — callers must serialize access (in
//! practice the receiver loop is the only caller). Parse failures are
//! silent beyond a counter; a balloon link drops frames constantly and
//! logging each one would bury everything else.

use std::io::Write;
use std::path::Path;

use raptorhab_proto::{
    PacketType, ParsedPacket, parse_packet,
    payloads::{ImageDataPayload, ImageMetaPayload, TelemetryPayload, TextMessagePayload},
};

use crate::{clock::Clock, engine::ReconstructionEngine, telemetry::TelemetrySink};

/// Per-type and validity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Candidate frames handed in by the radio.
    pub received: u64,
    /// Frames that parsed and passed CRC.
    pub valid: u64,
    /// Frames rejected at parse (sync, CRC, length, type).
    pub invalid: u64,
    /// Valid telemetry frames.
    pub telemetry: u64,
    /// Valid image-metadata frames.
    pub image_meta: u64,
    /// Valid image-data frames.
    pub image_data: u64,
    /// Valid text frames.
    pub text: u64,
    /// Valid frames of types the ground station ignores.
    pub ignored: u64,
    /// RSSI of the most recent candidate frame (dBm).
    pub last_rssi: i16,
}

/// Optional append-only log of every raw candidate frame.
struct PacketLog {
    file: std::fs::File,
}

impl PacketLog {
    fn open(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    fn append(&mut self, data: &[u8], rssi: i16) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("{timestamp},{rssi},{},{}\n", data.len(), hex::encode(data));
        if let Err(error) = self.file.write_all(line.as_bytes()) {
            tracing::warn!(%error, "packet log write failed");
        }
    }
}

/// Validates candidate frames and routes them to the telemetry sink, the
/// reconstruction engine, or the text callback.
pub struct PacketDispatcher<C: Clock> {
    engine: ReconstructionEngine<C>,
    telemetry_sink: Box<dyn TelemetrySink>,
    text_callback: Option<Box<dyn FnMut(&str) + Send>>,
    symbol_size: usize,
    stats: DispatcherStats,
    packet_log: Option<PacketLog>,
}

impl<C: Clock> PacketDispatcher<C> {
    /// Wire the dispatcher to its consumers.
    #[must_use]
    pub fn new(
        engine: ReconstructionEngine<C>,
        telemetry_sink: Box<dyn TelemetrySink>,
        symbol_size: usize,
    ) -> Self {
        Self {
            engine,
            telemetry_sink,
            text_callback: None,
            symbol_size,
            stats: DispatcherStats::default(),
            packet_log: None,
        }
    }

    /// Install a callback for operator text messages.
    pub fn on_text_message(&mut self, callback: Box<dyn FnMut(&str) + Send>) {
        self.text_callback = Some(callback);
    }

    /// Append every raw candidate frame (hex, with RSSI and timestamp) to
    /// `path`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying file-open failure.
    pub fn enable_packet_log(&mut self, path: &Path) -> std::io::Result<()> {
        self.packet_log = Some(PacketLog::open(path)?);
        Ok(())
    }

    /// Counters snapshot.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    /// The reconstruction engine, for the supervisor's periodic sweep and
    /// status displays.
    pub fn engine_mut(&mut self) -> &mut ReconstructionEngine<C> {
        &mut self.engine
    }

    /// Read-only engine access.
    #[must_use]
    pub fn engine(&self) -> &ReconstructionEngine<C> {
        &self.engine
    }

    /// Process one candidate frame from the radio. Returns `true` if the
    /// frame was valid.
    pub fn handle_frame(&mut self, data: &[u8], rssi: i16) -> bool {
        self.stats.received += 1;
        self.stats.last_rssi = rssi;

        if let Some(log) = &mut self.packet_log {
            log.append(data, rssi);
        }

        let packet = match parse_packet(data, Some(self.symbol_size)) {
            Ok(packet) => packet,
            Err(error) => {
                self.stats.invalid += 1;
                tracing::trace!(%error, len = data.len(), "frame rejected");
                return false;
            }
        };

        self.stats.valid += 1;
        tracing::debug!(
            packet_type = ?packet.packet_type,
            seq = packet.sequence,
            len = packet.payload.len(),
            rssi,
            "rx frame"
        );
        self.route(&packet, rssi);
        true
    }

    fn route(&mut self, packet: &ParsedPacket, rssi: i16) {
        match packet.packet_type {
            PacketType::Telemetry => match TelemetryPayload::decode(&packet.payload) {
                Ok(telemetry) => {
                    self.stats.telemetry += 1;
                    self.telemetry_sink.process_packet(&telemetry, rssi, packet.sequence);
                }
                Err(error) => {
                    self.stats.invalid += 1;
                    tracing::warn!(%error, "telemetry payload rejected");
                }
            },
            PacketType::ImageMeta => match ImageMetaPayload::decode(&packet.payload) {
                Ok(meta) => {
                    self.stats.image_meta += 1;
                    self.engine.add_metadata(&meta);
                }
                Err(error) => {
                    self.stats.invalid += 1;
                    tracing::warn!(%error, "image metadata rejected");
                }
            },
            PacketType::ImageData => match ImageDataPayload::decode(&packet.payload) {
                Ok(data) => {
                    self.stats.image_data += 1;
                    self.engine.add_symbol(data.image_id, data.symbol_id, &data.symbol_data);
                }
                Err(error) => {
                    self.stats.invalid += 1;
                    tracing::warn!(%error, "image data rejected");
                }
            },
            PacketType::TextMsg => {
                self.stats.text += 1;
                let message = TextMessagePayload::decode(&packet.payload);
                tracing::info!(message = %message.message, "text message");
                if let Some(callback) = &mut self.text_callback {
                    callback(&message.message);
                }
            }
            // CMD_ACK and the reserved command range carry no ground-side
            // semantics; count and move on
            _ => {
                self.stats.ignored += 1;
            }
        }
    }
}
