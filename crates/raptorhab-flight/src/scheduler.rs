//! Packet scheduler: interleaves telemetry, image metadata, and fountain
//! symbols onto one frame stream.
//!
//! Selection order for each emitted frame:
//!
//! 1. Any queued out-of-band packet (text, ack), highest priority first.
//! 2. Every `telemetry_interval`th packet: telemetry.
//! 3. Every `image_meta_interval`th packet: metadata for the active image.
//! 4. Otherwise one fountain symbol from the active image.
//! 5. An exhausted image slot promotes the queue head — its metadata goes
//!    out first so the ground sees META before any DATA of a new image.
//! 6. With nothing else to say: telemetry.
//!
//! Images are strictly FIFO and never pre-empted. The scheduler owns the
//! sequence counter and is intrinsically single-threaded; keeping it that
//! way is what makes `seq` monotonic without a lock.

use std::collections::{BinaryHeap, VecDeque};

use raptorhab_fountain::{FountainCodec, FountainEncoder};
use raptorhab_proto::{
    PacketFlags, PacketType, ProtocolError, build_packet, crc,
    payloads::{CommandAckPayload, ImageDataPayload, ImageMetaPayload, TelemetryPayload,
        TextMessagePayload},
};
use thiserror::Error;

use crate::{camera::CapturedImage, config::FlightConfig};

/// Scheduler failures. Frame building only fails on oversize payloads,
/// which indicates a bug rather than a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Frame assembly failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Priority for out-of-band packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PacketPriority {
    /// Background chatter.
    Low,
    /// Default.
    Normal,
    /// Jumps ahead of normal traffic.
    High,
    /// Emitted before anything else.
    Urgent,
}

/// One frame ready for the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// What kind of frame this is (for stats and logging).
    pub packet_type: PacketType,
    /// Complete frame bytes, CRC included.
    pub frame: Vec<u8>,
}

/// Out-of-band packet waiting in the priority queue.
#[derive(Debug, PartialEq, Eq)]
struct QueuedPacket {
    packet_type: PacketType,
    payload: Vec<u8>,
    flags: PacketFlags,
    priority: PacketPriority,
    enqueued: u64,
}

impl Ord for QueuedPacket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: higher priority first, then FIFO within a priority
        self.priority.cmp(&other.priority).then(other.enqueued.cmp(&self.enqueued))
    }
}

impl PartialOrd for QueuedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The image currently on the air, owning its encoder.
struct ActiveImage {
    image_id: u16,
    total_size: u32,
    width: u16,
    height: u16,
    timestamp: u32,
    checksum: u32,
    encoder: FountainEncoder,
    symbols_sent: usize,
    total_symbols: usize,
}

impl ActiveImage {
    fn start(
        image: &CapturedImage,
        codec: FountainCodec,
        symbol_size: usize,
        overhead_percent: u32,
    ) -> Result<Self, raptorhab_fountain::FountainError> {
        let encoder = FountainEncoder::new(codec, &image.data, symbol_size, 0)?;
        let total_symbols = encoder.recommended_count(overhead_percent);
        Ok(Self {
            image_id: image.image_id,
            total_size: image.data.len() as u32,
            width: image.width,
            height: image.height,
            timestamp: image.timestamp,
            checksum: crc::crc32(&image.data),
            encoder,
            symbols_sent: 0,
            total_symbols,
        })
    }

    fn metadata(&self, symbol_size: usize) -> ImageMetaPayload {
        ImageMetaPayload {
            image_id: self.image_id,
            total_size: self.total_size,
            symbol_size: symbol_size as u16,
            num_source_symbols: self.encoder.num_source_symbols() as u16,
            checksum: self.checksum,
            width: self.width,
            height: self.height,
            timestamp: self.timestamp,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.symbols_sent >= self.total_symbols
    }

    fn progress_percent(&self) -> u8 {
        if self.total_symbols == 0 {
            return 0;
        }
        ((self.symbols_sent * 100 / self.total_symbols).min(100)) as u8
    }
}

/// Packet scheduler for the flight payload.
pub struct PacketScheduler {
    telemetry_interval: u64,
    image_meta_interval: u64,
    symbol_size: usize,
    overhead_percent: u32,
    codec: FountainCodec,
    queue_capacity: usize,

    sequence: u16,
    packet_counter: u64,
    enqueue_counter: u64,
    active: Option<ActiveImage>,
    image_queue: VecDeque<CapturedImage>,
    priority_queue: BinaryHeap<QueuedPacket>,
    images_dropped: u64,
}

impl PacketScheduler {
    /// Build a scheduler from the flight configuration.
    #[must_use]
    pub fn new(config: &FlightConfig) -> Self {
        Self {
            telemetry_interval: u64::from(config.telemetry_interval_packets.max(1)),
            image_meta_interval: u64::from(config.image_meta_interval_packets.max(1)),
            symbol_size: config.fountain_symbol_size,
            overhead_percent: config.fountain_overhead_percent,
            codec: config.fountain_codec,
            queue_capacity: config.image_queue_capacity,
            sequence: 0,
            packet_counter: 0,
            enqueue_counter: 0,
            active: None,
            image_queue: VecDeque::new(),
            priority_queue: BinaryHeap::new(),
            images_dropped: 0,
        }
    }

    /// Queue a captured image for transmission. Returns `false` (dropping
    /// the image with a log entry) when the bounded queue is full — capture
    /// must never block on a slow link.
    pub fn queue_image(&mut self, image: CapturedImage) -> bool {
        if self.image_queue.len() >= self.queue_capacity {
            self.images_dropped += 1;
            tracing::warn!(
                image_id = image.image_id,
                queued = self.image_queue.len(),
                "image queue full, dropping capture"
            );
            return false;
        }
        tracing::info!(image_id = image.image_id, bytes = image.data.len(), "image queued");
        self.image_queue.push_back(image);
        true
    }

    /// Queue an out-of-band text message.
    pub fn queue_text_message(&mut self, message: &str, priority: PacketPriority) {
        let payload = TextMessagePayload { message: message.to_string() }.encode();
        self.queue_out_of_band(PacketType::TextMsg, payload, PacketFlags::NONE, priority);
    }

    /// Queue a command acknowledgment (reserved path; the core loop never
    /// generates one).
    pub fn queue_command_ack(&mut self, ack: &CommandAckPayload) {
        self.queue_out_of_band(
            PacketType::CmdAck,
            ack.encode(),
            PacketFlags::NONE,
            PacketPriority::High,
        );
    }

    fn queue_out_of_band(
        &mut self,
        packet_type: PacketType,
        payload: Vec<u8>,
        flags: PacketFlags,
        priority: PacketPriority,
    ) {
        self.enqueue_counter += 1;
        self.priority_queue.push(QueuedPacket {
            packet_type,
            payload,
            flags,
            priority,
            enqueued: self.enqueue_counter,
        });
    }

    /// Produce exactly one frame, advancing the sequence counter.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Protocol`] only if a payload codec produced an
    /// oversize payload, which would be a bug in this crate.
    pub fn next_packet(
        &mut self,
        telemetry: &TelemetryPayload,
    ) -> Result<OutboundPacket, SchedulerError> {
        if let Some(queued) = self.priority_queue.pop() {
            return self.build(queued.packet_type, &queued.payload, queued.flags);
        }

        self.packet_counter += 1;

        if self.packet_counter % self.telemetry_interval == 0 {
            return self.build_telemetry(telemetry);
        }

        if self.packet_counter % self.image_meta_interval == 0
            && let Some(active) = &self.active
        {
            let meta = active.metadata(self.symbol_size);
            return self.build(PacketType::ImageMeta, &meta.encode(), PacketFlags::NONE);
        }

        if let Some(active) = &mut self.active {
            if active.is_exhausted() {
                tracing::info!(
                    image_id = active.image_id,
                    symbols = active.symbols_sent,
                    "image transmission complete"
                );
                self.active = None;
            } else {
                let (symbol_id, symbol_data) = active.encoder.generate_symbol();
                active.symbols_sent += 1;
                let payload = ImageDataPayload {
                    image_id: active.image_id,
                    symbol_id,
                    symbol_data: symbol_data.into(),
                }
                .encode();
                return self.build(PacketType::ImageData, &payload, PacketFlags::NONE);
            }
        }

        // Slot is free: promote the next queued image, metadata first
        while let Some(image) = self.image_queue.pop_front() {
            match ActiveImage::start(&image, self.codec, self.symbol_size, self.overhead_percent)
            {
                Ok(active) => {
                    tracing::info!(
                        image_id = active.image_id,
                        symbols = active.total_symbols,
                        "starting image transmission"
                    );
                    let meta = active.metadata(self.symbol_size);
                    self.active = Some(active);
                    return self.build(PacketType::ImageMeta, &meta.encode(), PacketFlags::NONE);
                }
                Err(error) => {
                    self.images_dropped += 1;
                    tracing::error!(
                        image_id = image.image_id,
                        %error,
                        "encoder construction failed, dropping image"
                    );
                }
            }
        }

        self.build_telemetry(telemetry)
    }

    fn build_telemetry(
        &mut self,
        telemetry: &TelemetryPayload,
    ) -> Result<OutboundPacket, SchedulerError> {
        self.build(PacketType::Telemetry, &telemetry.encode(), PacketFlags::NONE)
    }

    fn build(
        &mut self,
        packet_type: PacketType,
        payload: &[u8],
        flags: PacketFlags,
    ) -> Result<OutboundPacket, SchedulerError> {
        let frame = build_packet(packet_type, self.sequence, payload, flags)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(OutboundPacket { packet_type, frame })
    }

    /// `(image_id, progress_percent)` of the active image, `(0, 0)` when
    /// idle — exactly what telemetry reports.
    #[must_use]
    pub fn image_progress(&self) -> (u16, u8) {
        self.active
            .as_ref()
            .map_or((0, 0), |active| (active.image_id, active.progress_percent()))
    }

    /// Images waiting behind the active one.
    #[must_use]
    pub fn pending_images(&self) -> usize {
        self.image_queue.len()
    }

    /// Whether an image is currently on the air.
    #[must_use]
    pub fn has_active_image(&self) -> bool {
        self.active.is_some()
    }

    /// Captures dropped to the bounded queue or encoder failures.
    #[must_use]
    pub fn images_dropped(&self) -> u64 {
        self.images_dropped
    }

    /// Current sequence counter (next frame's number).
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FlightConfig {
        FlightConfig { fountain_overhead_percent: 0, ..FlightConfig::default() }
    }

    fn image(id: u16, bytes: usize) -> CapturedImage {
        CapturedImage {
            image_id: id,
            data: (0..bytes).map(|i| (i % 255) as u8).collect(),
            width: 640,
            height: 480,
            timestamp: 1_700_000_000 + u32::from(id),
        }
    }

    fn telemetry() -> TelemetryPayload {
        TelemetryPayload::default()
    }

    #[test]
    fn idle_scheduler_emits_telemetry() {
        let mut scheduler = PacketScheduler::new(&test_config());
        for _ in 0..20 {
            let packet = scheduler.next_packet(&telemetry()).unwrap();
            assert_eq!(packet.packet_type, PacketType::Telemetry);
        }
    }

    #[test]
    fn sequence_advances_and_wraps() {
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.sequence = 0xFFFE;
        scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(scheduler.sequence(), 0xFFFF);
        scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(scheduler.sequence(), 0);
    }

    #[test]
    fn meta_precedes_data_for_new_image() {
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.queue_image(image(1, 1000));

        let first = scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(first.packet_type, PacketType::ImageMeta);
        let second = scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(second.packet_type, PacketType::ImageData);
    }

    #[test]
    fn images_are_fifo_and_exhaust_in_order() {
        // overhead 0: a 1000-byte image is exactly 5 symbols
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.queue_image(image(1, 1000));
        scheduler.queue_image(image(2, 1000));

        let mut meta_ids = Vec::new();
        for _ in 0..40 {
            let packet = scheduler.next_packet(&telemetry()).unwrap();
            if packet.packet_type == PacketType::ImageMeta {
                let parsed = raptorhab_proto::parse_packet(&packet.frame, Some(200)).unwrap();
                let meta = ImageMetaPayload::decode(&parsed.payload).unwrap();
                meta_ids.push(meta.image_id);
            }
        }
        assert_eq!(meta_ids, vec![1, 2]);
        assert!(!scheduler.has_active_image());
    }

    #[test]
    fn bounded_queue_drops_excess_captures() {
        let config = FlightConfig { image_queue_capacity: 2, ..test_config() };
        let mut scheduler = PacketScheduler::new(&config);
        assert!(scheduler.queue_image(image(1, 500)));
        assert!(scheduler.queue_image(image(2, 500)));
        assert!(!scheduler.queue_image(image(3, 500)));
        assert_eq!(scheduler.pending_images(), 2);
        assert_eq!(scheduler.images_dropped(), 1);
    }

    #[test]
    fn encoder_failure_drops_image_and_continues() {
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.queue_image(image(1, 0)); // empty blob: encoder refuses
        scheduler.queue_image(image(2, 600));

        let first = scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(first.packet_type, PacketType::ImageMeta);
        let parsed = raptorhab_proto::parse_packet(&first.frame, Some(200)).unwrap();
        let meta = ImageMetaPayload::decode(&parsed.payload).unwrap();
        assert_eq!(meta.image_id, 2);
        assert_eq!(scheduler.images_dropped(), 1);
    }

    #[test]
    fn priority_queue_preempts_everything() {
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.queue_text_message("low", PacketPriority::Low);
        scheduler.queue_text_message("urgent", PacketPriority::Urgent);
        scheduler.queue_text_message("normal", PacketPriority::Normal);

        let order: Vec<String> = (0..3)
            .map(|_| {
                let packet = scheduler.next_packet(&telemetry()).unwrap();
                assert_eq!(packet.packet_type, PacketType::TextMsg);
                let parsed = raptorhab_proto::parse_packet(&packet.frame, None).unwrap();
                TextMessagePayload::decode(&parsed.payload).message
            })
            .collect();
        assert_eq!(order, vec!["urgent", "normal", "low"]);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut scheduler = PacketScheduler::new(&test_config());
        scheduler.queue_text_message("first", PacketPriority::Normal);
        scheduler.queue_text_message("second", PacketPriority::Normal);

        for expected in ["first", "second"] {
            let packet = scheduler.next_packet(&telemetry()).unwrap();
            let parsed = raptorhab_proto::parse_packet(&packet.frame, None).unwrap();
            assert_eq!(TextMessagePayload::decode(&parsed.payload).message, expected);
        }
    }

    #[test]
    fn telemetry_cadence_holds_while_image_active() {
        let mut scheduler = PacketScheduler::new(&FlightConfig::default());
        scheduler.queue_image(image(1, 100_000)); // big enough to outlast the run
        scheduler.next_packet(&telemetry()).unwrap(); // promotion meta, counter = 1

        for counter in 2..=201u64 {
            let packet = scheduler.next_packet(&telemetry()).unwrap();
            let expect_telemetry = counter % 10 == 0;
            assert_eq!(
                packet.packet_type == PacketType::Telemetry,
                expect_telemetry,
                "counter {counter}"
            );
        }
    }

    #[test]
    fn progress_reports_active_image() {
        let mut scheduler = PacketScheduler::new(&test_config());
        assert_eq!(scheduler.image_progress(), (0, 0));

        scheduler.queue_image(image(7, 1000)); // 5 symbols at overhead 0
        scheduler.next_packet(&telemetry()).unwrap(); // meta
        assert_eq!(scheduler.image_progress(), (7, 0));

        scheduler.next_packet(&telemetry()).unwrap(); // one symbol
        assert_eq!(scheduler.image_progress(), (7, 20));
    }

    #[test]
    fn ack_payload_round_trips_through_queue() {
        let mut scheduler = PacketScheduler::new(&test_config());
        let ack = CommandAckPayload {
            acked_type: 0x82,
            acked_seq: 31,
            status: 0,
            data: bytes::Bytes::new(),
        };
        scheduler.queue_command_ack(&ack);

        let packet = scheduler.next_packet(&telemetry()).unwrap();
        assert_eq!(packet.packet_type, PacketType::CmdAck);
        let parsed = raptorhab_proto::parse_packet(&packet.frame, None).unwrap();
        assert_eq!(CommandAckPayload::decode(&parsed.payload).unwrap(), ack);
    }
}
