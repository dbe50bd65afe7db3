//! Cadence properties of the packet scheduler over long synthetic runs.

use raptorhab_flight::{FlightConfig, PacketScheduler};
use raptorhab_flight::camera::CapturedImage;
use raptorhab_proto::{PacketType, payloads::TelemetryPayload};

fn image(id: u16, bytes: usize) -> CapturedImage {
    CapturedImage {
        image_id: id,
        data: (0..bytes).map(|i| (i % 253) as u8).collect(),
        width: 1280,
        height: 960,
        timestamp: 1_700_000_000,
    }
}

#[test]
fn telemetry_count_over_ten_thousand_packets() {
    // With an image active for the whole run: exactly 1 000 of 10 000
    // packets are telemetry, and any cadence metadata lands on a multiple
    // of 100.
    let config = FlightConfig::default();
    let mut scheduler = PacketScheduler::new(&config);

    // 1.5 MB at symbol size 200 -> K = 7500, budget 9375 symbols at 25%
    // overhead: outlasts the run
    scheduler.queue_image(image(1, 1_500_000));
    let telemetry = TelemetryPayload::default();

    // Promotion consumes counter position 1 and emits the initial metadata
    let first = scheduler.next_packet(&telemetry).unwrap();
    assert_eq!(first.packet_type, PacketType::ImageMeta);

    let mut telemetry_count = 0u32;
    let mut meta_positions = Vec::new();
    for counter in 2..=10_001u64 {
        let packet = scheduler.next_packet(&telemetry).unwrap();
        match packet.packet_type {
            PacketType::Telemetry => {
                telemetry_count += 1;
                assert_eq!(counter % 10, 0, "telemetry off cadence at {counter}");
            }
            PacketType::ImageMeta => meta_positions.push(counter),
            PacketType::ImageData => {}
            other => panic!("unexpected packet type {other:?} at {counter}"),
        }
    }

    assert_eq!(telemetry_count, 1_000);
    assert!(scheduler.has_active_image(), "image exhausted mid-run");
    assert!(
        meta_positions.iter().all(|position| position % 100 == 0),
        "metadata off cadence: {meta_positions:?}"
    );
}

#[test]
fn cadence_metadata_lands_on_its_interval() {
    // Intervals chosen so the metadata slot is not shadowed by telemetry
    let config = FlightConfig {
        telemetry_interval_packets: 7,
        image_meta_interval_packets: 10,
        ..FlightConfig::default()
    };
    let mut scheduler = PacketScheduler::new(&config);
    scheduler.queue_image(image(3, 200_000));
    let telemetry = TelemetryPayload::default();

    scheduler.next_packet(&telemetry).unwrap(); // promotion metadata

    for counter in 2..=700u64 {
        let packet = scheduler.next_packet(&telemetry).unwrap();
        match packet.packet_type {
            PacketType::Telemetry => assert_eq!(counter % 7, 0, "at {counter}"),
            PacketType::ImageMeta => {
                assert_eq!(counter % 10, 0, "at {counter}");
                assert_ne!(counter % 7, 0, "telemetry slot should win at {counter}");
            }
            _ => {}
        }
    }
}

#[test]
fn seq_numbers_are_gapless_across_types() {
    let config = FlightConfig::default();
    let mut scheduler = PacketScheduler::new(&config);
    scheduler.queue_image(image(2, 10_000));
    let telemetry = TelemetryPayload::default();

    for expected_seq in 0u16..500 {
        let packet = scheduler.next_packet(&telemetry).unwrap();
        let parsed = raptorhab_proto::parse_packet(&packet.frame, Some(200)).unwrap();
        assert_eq!(parsed.sequence, expected_seq);
    }
}
