//! Property-based tests for the frame codec.
//!
//! These verify the wire-format invariants for ALL valid inputs, not just
//! hand-picked examples: round-trip identity, single-bit-flip rejection,
//! sync-word rejection, and telemetry fixed-point fidelity.

use proptest::prelude::*;
use raptorhab_proto::{
    FixType, PacketFlags, PacketType, ProtocolError, build_packet, parse_packet,
    payloads::TelemetryPayload,
};

/// Air→ground types with a payload shape the parser can delimit, paired with
/// a payload generator that satisfies that type's length rules.
fn arbitrary_typed_payload() -> impl Strategy<Value = (PacketType, Vec<u8>)> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 36..=36)
            .prop_map(|p| (PacketType::Telemetry, p)),
        prop::collection::vec(any::<u8>(), 22..=22)
            .prop_map(|p| (PacketType::ImageMeta, p)),
        prop::collection::vec(any::<u8>(), 6..=243)
            .prop_map(|p| (PacketType::ImageData, p)),
        prop::collection::vec(any::<u8>(), 0..=243).prop_map(|p| (PacketType::TextMsg, p)),
        prop::collection::vec(any::<u8>(), 4..=243).prop_map(|p| (PacketType::CmdAck, p)),
    ]
}

fn arbitrary_flags() -> impl Strategy<Value = PacketFlags> {
    (0u8..16).prop_map(PacketFlags::from_byte)
}

#[test]
fn prop_round_trip_framing() {
    proptest!(|(
        (packet_type, payload) in arbitrary_typed_payload(),
        sequence in any::<u16>(),
        flags in arbitrary_flags(),
    )| {
        let packet = build_packet(packet_type, sequence, &payload, flags)
            .expect("payload within budget");
        let parsed = parse_packet(&packet, None).expect("built frame must parse");

        prop_assert_eq!(parsed.packet_type, packet_type);
        prop_assert_eq!(parsed.sequence, sequence);
        prop_assert_eq!(parsed.flags, flags);
        prop_assert_eq!(&parsed.payload[..], &payload[..]);
    });
}

#[test]
fn prop_single_bit_flip_rejected() {
    proptest!(|(
        (packet_type, payload) in arbitrary_typed_payload(),
        sequence in any::<u16>(),
        bit in any::<proptest::sample::Index>(),
    )| {
        let mut packet = build_packet(packet_type, sequence, &payload, PacketFlags::NONE)
            .expect("payload within budget");
        let bit_index = bit.index(packet.len() * 8);
        packet[bit_index / 8] ^= 1 << (bit_index % 8);

        prop_assert!(parse_packet(&packet, None).is_err());
    });
}

#[test]
fn prop_payload_corruption_is_bad_crc() {
    // Flips confined to the payload region leave sync and header intact, so
    // the reject reason must be the CRC specifically.
    proptest!(|(
        payload in prop::collection::vec(any::<u8>(), 1..=243),
        byte in any::<proptest::sample::Index>(),
        bit in 0u8..8,
    )| {
        let mut packet = build_packet(PacketType::TextMsg, 0, &payload, PacketFlags::NONE)
            .expect("payload within budget");
        let offset = 8 + byte.index(payload.len());
        packet[offset] ^= 1 << bit;

        let is_bad_crc = matches!(parse_packet(&packet, None), Err(ProtocolError::BadCrc { .. }));
        prop_assert!(is_bad_crc);
    });
}

#[test]
fn prop_bad_sync_rejected_without_inspection() {
    proptest!(|(
        sync in any::<[u8; 4]>(),
        body in prop::collection::vec(any::<u8>(), 8..64),
    )| {
        prop_assume!(sync != *b"RAPT");
        let mut frame = sync.to_vec();
        frame.extend_from_slice(&body);

        let is_bad_sync = matches!(parse_packet(&frame, None), Err(ProtocolError::BadSync { .. }));
        prop_assert!(is_bad_sync);
    });
}

#[test]
fn prop_telemetry_fixed_point_fidelity() {
    proptest!(|(
        latitude in -90.0f64..90.0,
        longitude in -180.0f64..180.0,
        altitude in 0.0f64..60_000.0,
        speed in 0.0f64..400.0,
        heading in 0.0f64..360.0,
        cpu_temp in -100.0f64..150.0,
        satellites in any::<u8>(),
        gps_time in any::<u32>(),
        battery_mv in any::<u16>(),
    )| {
        let payload = TelemetryPayload {
            latitude,
            longitude,
            altitude,
            speed,
            heading,
            satellites,
            fix_type: FixType::Fix3d,
            gps_time,
            battery_mv,
            cpu_temp,
            ..TelemetryPayload::default()
        };
        let decoded = TelemetryPayload::decode(&payload.encode()).expect("36 bytes");

        // One LSB of each fixed-point representation
        prop_assert!((decoded.latitude - latitude).abs() <= 1e-7);
        prop_assert!((decoded.longitude - longitude).abs() <= 1e-7);
        prop_assert!((decoded.altitude - altitude).abs() <= 0.001);
        prop_assert!((decoded.speed - speed).abs() <= 0.01);
        prop_assert!((decoded.heading - heading).abs() <= 0.01);
        prop_assert!((decoded.cpu_temp - cpu_temp).abs() <= 0.01);
        prop_assert_eq!(decoded.satellites, satellites);
        prop_assert_eq!(decoded.gps_time, gps_time);
        prop_assert_eq!(decoded.battery_mv, battery_mv);
    });
}

#[test]
fn prop_telemetry_saturates_and_still_parses() {
    proptest!(|(
        latitude in prop_oneof![Just(-4000.0f64), Just(4000.0f64), -4000.0f64..4000.0],
        altitude in -1e9f64..1e9,
        cpu_temp in -1e6f64..1e6,
    )| {
        let payload = TelemetryPayload {
            latitude,
            altitude,
            cpu_temp,
            ..TelemetryPayload::default()
        };
        // Encoding must clamp, never wrap, and the frame must parse
        let frame = build_packet(PacketType::Telemetry, 0, &payload.encode(), PacketFlags::NONE)
            .expect("fixed-size payload");
        let parsed = parse_packet(&frame, None).expect("clamped telemetry must parse");
        let decoded = TelemetryPayload::decode(&parsed.payload).expect("36 bytes");

        prop_assert!(decoded.latitude <= 214.748_364_7 + 1e-7);
        prop_assert!(decoded.latitude >= -214.748_364_8 - 1e-7);
        prop_assert!(decoded.altitude >= 0.0);
        prop_assert!(decoded.cpu_temp <= 327.67 + 1e-9);
        prop_assert!(decoded.cpu_temp >= -327.68 - 1e-9);
    });
}
