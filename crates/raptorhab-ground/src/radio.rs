//! Receive-side radio contract and a synthetic downlink for `--simulate`.

use raptorhab_fountain::{FountainCodec, FountainEncoder};
use raptorhab_proto::{
    PacketFlags, PacketType, build_packet, crc,
    payloads::{ImageDataPayload, ImageMetaPayload, TelemetryPayload},
};
use thiserror::Error;

/// Radio failures surfaced to the supervisor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// Driver could not be initialized.
    #[error("radio init failed: {0}")]
    Init(String),
}

/// Receive-side radio driver contract.
///
/// The driver handles everything below the sync word; each successful RX is
/// a candidate frame with no physical-layer addressing assumed.
pub trait GroundRadio: Send {
    /// Bring the radio up.
    fn init(&mut self) -> Result<(), RadioError>;

    /// Enter continuous receive mode.
    fn receive_continuous(&mut self);

    /// Poll for a received frame. Returns the raw (possibly padded) buffer
    /// and the RSSI of the reception, or `None` when nothing arrived.
    fn check_for_packet(&mut self) -> (Option<Vec<u8>>, i16);

    /// Enter low-power standby.
    fn set_standby(&mut self);

    /// Release the hardware.
    fn close(&mut self);
}

/// Synthetic downlink: a fake flight transmitting telemetry and LT-coded
/// images, for exercising the whole ground pipeline with no hardware.
pub struct SimulatedRadio {
    sequence: u16,
    packet_counter: u64,
    telemetry: TelemetryPayload,
    image: Option<(ImageMetaPayload, FountainEncoder, usize)>,
    next_image_id: u16,
    symbol_size: usize,
}

impl SimulatedRadio {
    /// New synthetic flight.
    #[must_use]
    pub fn new(symbol_size: usize) -> Self {
        Self {
            sequence: 0,
            packet_counter: 0,
            telemetry: TelemetryPayload {
                latitude: 47.3769,
                longitude: 8.5417,
                satellites: 9,
                fix_type: raptorhab_proto::FixType::Fix3d,
                battery_mv: 4100,
                ..TelemetryPayload::default()
            },
            image: None,
            next_image_id: 1,
            symbol_size,
        }
    }

    fn start_image(&mut self) -> Option<(ImageMetaPayload, FountainEncoder, usize)> {
        let image_id = self.next_image_id;
        self.next_image_id = self.next_image_id.wrapping_add(1);

        let data: Vec<u8> = (0..16_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        let encoder = FountainEncoder::new(FountainCodec::Lt, &data, self.symbol_size, 0).ok()?;
        let budget = encoder.recommended_count(25);
        let meta = ImageMetaPayload {
            image_id,
            total_size: data.len() as u32,
            symbol_size: self.symbol_size as u16,
            num_source_symbols: encoder.num_source_symbols() as u16,
            checksum: crc::crc32(&data),
            width: 1280,
            height: 960,
            timestamp: u32::from(image_id),
        };
        Some((meta, encoder, budget))
    }

    fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.packet_counter += 1;
        self.telemetry.altitude += 0.15;
        self.telemetry.gps_time = self.telemetry.gps_time.wrapping_add(1);

        let (packet_type, payload): (PacketType, Vec<u8>) = if self.packet_counter % 10 == 0 {
            (PacketType::Telemetry, self.telemetry.encode().to_vec())
        } else {
            if self.image.is_none() {
                self.image = self.start_image();
                if let Some((meta, _, _)) = &self.image {
                    let bytes = meta.encode().to_vec();
                    return self.build(PacketType::ImageMeta, &bytes);
                }
            }

            match &mut self.image {
                Some((meta, _, _)) if self.packet_counter % 100 == 0 => {
                    (PacketType::ImageMeta, meta.encode().to_vec())
                }
                Some((meta, encoder, budget)) => {
                    let (symbol_id, symbol_data) = encoder.generate_symbol();
                    let payload = ImageDataPayload {
                        image_id: meta.image_id,
                        symbol_id,
                        symbol_data: symbol_data.into(),
                    }
                    .encode();
                    if usize::try_from(encoder.symbols_generated()).unwrap_or(usize::MAX)
                        >= *budget
                    {
                        self.image = None;
                    }
                    (PacketType::ImageData, payload)
                }
                None => (PacketType::Telemetry, self.telemetry.encode().to_vec()),
            }
        };
        self.build(packet_type, &payload)
    }

    fn build(&mut self, packet_type: PacketType, payload: &[u8]) -> Option<Vec<u8>> {
        let frame = build_packet(packet_type, self.sequence, payload, PacketFlags::NONE).ok()?;
        self.sequence = self.sequence.wrapping_add(1);
        // Pad to the driver's fixed RX buffer, like the real hardware does
        let mut buffer = frame;
        buffer.resize(255, 0);
        Some(buffer)
    }
}

impl GroundRadio for SimulatedRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        tracing::info!("simulated downlink up");
        Ok(())
    }

    fn receive_continuous(&mut self) {}

    fn check_for_packet(&mut self) -> (Option<Vec<u8>>, i16) {
        // Pace the synthetic flight at roughly 200 frames/sec
        std::thread::sleep(std::time::Duration::from_millis(5));
        let rssi = -70 - ((self.packet_counter % 23) as i16);
        (self.next_frame(), rssi)
    }

    fn set_standby(&mut self) {}

    fn close(&mut self) {
        tracing::info!(frames = self.packet_counter, "simulated downlink closed");
    }
}
