//! Frame build/parse: sync word, header, payload, CRC-32.
//!
//! The parser is deliberately tolerant of trailing padding. Packet-radio
//! drivers (the SX1262 included) hand back fixed-size RX buffers, so the
//! true frame boundary has to be recovered from the packet type: the type
//! byte implies an expected payload length, and the CRC is verified at that
//! position. If that check fails on a longer buffer, the CRC over the whole
//! buffer is tried once before the frame is rejected — that second position
//! is the only valid one for types whose payload is genuinely variable.

use bytes::Bytes;

use crate::{
    crc::{crc32, crc32_bytes},
    errors::{ProtocolError, Result},
    header::PacketHeader,
    packet_type::{PacketFlags, PacketType},
    payloads::{IMAGE_META_PAYLOAD_SIZE, TELEMETRY_PAYLOAD_SIZE},
};

/// Frame opener, `"RAPT"`.
pub const SYNC_WORD: [u8; 4] = *b"RAPT";

/// Bytes before the payload: sync word plus packet header.
pub const HEADER_SIZE: usize = 4 + PacketHeader::SIZE;

/// Trailing CRC-32 size.
pub const CRC_SIZE: usize = 4;

/// Hard upper bound on a frame, chosen to fit one radio transmission.
pub const MAX_PACKET_SIZE: usize = 255;

/// Largest payload that fits the frame budget (243 bytes).
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE - CRC_SIZE;

/// Minimum parseable frame: header plus CRC, empty payload.
const MIN_FRAME_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// A validated frame, CRC already checked and stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    /// Packet type code point.
    pub packet_type: PacketType,
    /// Sequence number from the header.
    pub sequence: u16,
    /// Header flags (carried, not interpreted).
    pub flags: PacketFlags,
    /// Payload bytes between header and CRC.
    pub payload: Bytes,
}

/// Build a complete frame: `sync ∥ header ∥ payload ∥ crc32`.
///
/// # Errors
///
/// [`ProtocolError::PayloadTooLarge`] if `payload` exceeds
/// [`MAX_PAYLOAD_SIZE`]. Callers treat that as a bug, not channel noise: every
/// payload codec in this crate stays within the budget by construction.
pub fn build_packet(
    packet_type: PacketType,
    sequence: u16,
    payload: &[u8],
    flags: PacketFlags,
) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let header = PacketHeader { packet_type, sequence, flags };
    let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    packet.extend_from_slice(&SYNC_WORD);
    packet.extend_from_slice(&header.to_bytes());
    packet.extend_from_slice(payload);
    let crc = crc32_bytes(&packet);
    packet.extend_from_slice(&crc);
    Ok(packet)
}

/// Expected payload length for `packet_type`, given the bytes remaining in
/// the RX buffer after header and CRC are accounted for.
///
/// `image_symbol_size` is the session's fountain symbol size; without it an
/// `IMAGE_DATA` frame can only be delimited by the buffer itself.
fn expected_payload_len(
    packet_type: PacketType,
    residual: usize,
    image_symbol_size: Option<usize>,
) -> usize {
    match packet_type {
        PacketType::Telemetry => TELEMETRY_PAYLOAD_SIZE,
        PacketType::ImageMeta => IMAGE_META_PAYLOAD_SIZE,
        PacketType::ImageData => {
            image_symbol_size.map_or(residual, |symbol_size| 2 + 4 + symbol_size)
        }
        PacketType::CmdAck => 4,
        // Text and the reserved command range are variable-length
        _ => residual,
    }
}

/// Parse and validate a candidate frame, tolerating trailing padding.
///
/// # Errors
///
/// - [`ProtocolError::ShortFrame`] if the buffer cannot hold header + CRC, or
///   is shorter than the type's expected length
/// - [`ProtocolError::BadSync`] if the first four bytes are not `"RAPT"`
/// - [`ProtocolError::UnknownType`] for unassigned type code points
/// - [`ProtocolError::BadCrc`] if no valid CRC position is found
pub fn parse_packet(data: &[u8], image_symbol_size: Option<usize>) -> Result<ParsedPacket> {
    if data.len() < MIN_FRAME_SIZE {
        return Err(ProtocolError::ShortFrame { expected: MIN_FRAME_SIZE, actual: data.len() });
    }

    let (sync, rest) = data.split_at(4);
    if sync != SYNC_WORD.as_slice() {
        // Infallible: split_at(4) yields exactly 4 bytes.
        let mut found = [0u8; 4];
        found.copy_from_slice(sync);
        return Err(ProtocolError::BadSync { found });
    }

    let header = PacketHeader::from_bytes(rest)?;

    let residual = data.len() - MIN_FRAME_SIZE;
    let expected = expected_payload_len(header.packet_type, residual, image_symbol_size);
    let expected_total = HEADER_SIZE + expected + CRC_SIZE;

    if data.len() < expected_total {
        return Err(ProtocolError::ShortFrame { expected: expected_total, actual: data.len() });
    }

    let candidate = &data[..expected_total];
    let computed = crc32(&candidate[..expected_total - CRC_SIZE]);
    let received = read_crc(candidate);

    let payload_len = if computed == received {
        expected
    } else if data.len() > expected_total && verify_full(data) {
        // Variable-length payload filled the whole buffer
        residual
    } else {
        tracing::debug!(
            packet_type = ?header.packet_type,
            received,
            computed,
            "frame failed crc check"
        );
        return Err(ProtocolError::BadCrc { received, computed });
    };

    Ok(ParsedPacket {
        packet_type: header.packet_type,
        sequence: header.sequence,
        flags: header.flags,
        payload: Bytes::copy_from_slice(&data[HEADER_SIZE..HEADER_SIZE + payload_len]),
    })
}

fn read_crc(frame: &[u8]) -> u32 {
    let tail = &frame[frame.len() - CRC_SIZE..];
    u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]])
}

fn verify_full(data: &[u8]) -> bool {
    crc32(&data[..data.len() - CRC_SIZE]) == read_crc(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_text() {
        let packet =
            build_packet(PacketType::TextMsg, 7, b"hello from 30km", PacketFlags::NONE).unwrap();
        let parsed = parse_packet(&packet, None).unwrap();
        assert_eq!(parsed.packet_type, PacketType::TextMsg);
        assert_eq!(parsed.sequence, 7);
        assert_eq!(parsed.flags, PacketFlags::NONE);
        assert_eq!(&parsed.payload[..], b"hello from 30km");
    }

    #[test]
    fn round_trip_with_flags() {
        let packet = build_packet(
            PacketType::TextMsg,
            0xFFFF,
            b"x",
            PacketFlags::URGENT | PacketFlags::LAST_PACKET,
        )
        .unwrap();
        let parsed = parse_packet(&packet, None).unwrap();
        assert_eq!(parsed.sequence, 0xFFFF);
        assert!(parsed.flags.contains(PacketFlags::URGENT));
        assert!(parsed.flags.contains(PacketFlags::LAST_PACKET));
    }

    #[test]
    fn oversize_payload_rejected_at_build() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            build_packet(PacketType::TextMsg, 0, &payload, PacketFlags::NONE),
            Err(ProtocolError::PayloadTooLarge { size: 244, max: 243 })
        ));
    }

    #[test]
    fn max_payload_accepted() {
        let payload = vec![0xAB; MAX_PAYLOAD_SIZE];
        let packet = build_packet(PacketType::ImageData, 1, &payload, PacketFlags::NONE).unwrap();
        assert_eq!(packet.len(), MAX_PACKET_SIZE);
        let parsed = parse_packet(&packet, None).unwrap();
        assert_eq!(parsed.payload.len(), MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn tolerates_radio_padding() {
        // Telemetry frame inside a 255-byte driver buffer
        let payload = [0x11u8; TELEMETRY_PAYLOAD_SIZE];
        let mut buffer = build_packet(PacketType::Telemetry, 3, &payload, PacketFlags::NONE)
            .unwrap();
        buffer.resize(255, 0x00);

        let parsed = parse_packet(&buffer, None).unwrap();
        assert_eq!(parsed.packet_type, PacketType::Telemetry);
        assert_eq!(parsed.payload.len(), TELEMETRY_PAYLOAD_SIZE);
    }

    #[test]
    fn image_data_delimited_by_symbol_size() {
        let mut payload = vec![0u8; 2 + 4];
        payload.extend_from_slice(&[0x5A; 200]);
        let mut buffer =
            build_packet(PacketType::ImageData, 9, &payload, PacketFlags::NONE).unwrap();
        buffer.resize(255, 0xFF);

        let parsed = parse_packet(&buffer, Some(200)).unwrap();
        assert_eq!(parsed.payload.len(), 206);
    }

    #[test]
    fn bad_sync_rejected() {
        let mut packet = build_packet(PacketType::TextMsg, 0, b"y", PacketFlags::NONE).unwrap();
        packet[0] = b'X';
        assert!(matches!(parse_packet(&packet, None), Err(ProtocolError::BadSync { .. })));
    }

    #[test]
    fn corrupted_payload_rejected() {
        let mut packet =
            build_packet(PacketType::TextMsg, 0, b"payload", PacketFlags::NONE).unwrap();
        let idx = packet.len() - CRC_SIZE - 1;
        packet[idx] ^= 0x80;
        assert!(matches!(parse_packet(&packet, None), Err(ProtocolError::BadCrc { .. })));
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(matches!(
            parse_packet(b"RAPT\x00\x00", None),
            Err(ProtocolError::ShortFrame { .. })
        ));
    }

    #[test]
    fn unknown_type_rejected() {
        let mut packet = build_packet(PacketType::TextMsg, 0, b"z", PacketFlags::NONE).unwrap();
        packet[4] = 0x55;
        assert!(matches!(parse_packet(&packet, None), Err(ProtocolError::UnknownType(0x55))));
    }

    #[test]
    fn extended_cmd_ack_found_via_full_buffer_crc() {
        // CMD_ACK expects 4 bytes minimum but may carry response data; the
        // full-buffer CRC position recovers the longer form.
        let payload = [0x10, 0x00, 0x01, 0x00, 0xAA, 0xBB, 0xCC];
        let packet = build_packet(PacketType::CmdAck, 2, &payload, PacketFlags::NONE).unwrap();
        let parsed = parse_packet(&packet, None).unwrap();
        assert_eq!(parsed.payload.len(), 7);
    }
}
