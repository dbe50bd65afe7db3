//! The four header bytes that follow the sync word.

use crate::{
    errors::{ProtocolError, Result},
    packet_type::{PacketFlags, PacketType},
};

/// Frame header: type, sequence number, flags.
///
/// The sequence number is a per-payload monotonic counter wrapping mod 2¹⁶.
/// It identifies loss runs on the ground but carries no ordering obligation —
/// the protocol has no reordering buffer and no ARQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet type code point.
    pub packet_type: PacketType,
    /// Sequence number, wraps mod 2¹⁶.
    pub sequence: u16,
    /// Flags bitfield (carried, not interpreted).
    pub flags: PacketFlags,
}

impl PacketHeader {
    /// Serialized size in bytes (excluding the sync word).
    pub const SIZE: usize = 4;

    /// Serialize to the wire layout `[type][seq_hi][seq_lo][flags]`.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let seq = self.sequence.to_be_bytes();
        [self.packet_type.to_u8(), seq[0], seq[1], self.flags.bits()]
    }

    /// Parse from the bytes immediately after the sync word.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::ShortFrame`] if fewer than 4 bytes are available
    /// - [`ProtocolError::UnknownType`] for unassigned type code points
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let &[ty, seq_hi, seq_lo, flags, ..] = bytes else {
            return Err(ProtocolError::ShortFrame { expected: Self::SIZE, actual: bytes.len() });
        };
        let packet_type = PacketType::from_u8(ty).ok_or(ProtocolError::UnknownType(ty))?;
        Ok(Self {
            packet_type,
            sequence: u16::from_be_bytes([seq_hi, seq_lo]),
            flags: PacketFlags::from_byte(flags),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let header = PacketHeader {
            packet_type: PacketType::ImageData,
            sequence: 0xBEEF,
            flags: PacketFlags::URGENT,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x02, 0xBE, 0xEF, 0x01]);
        assert_eq!(PacketHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn sequence_is_big_endian() {
        let header = PacketHeader {
            packet_type: PacketType::Telemetry,
            sequence: 1,
            flags: PacketFlags::NONE,
        };
        assert_eq!(header.to_bytes(), [0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn short_buffer() {
        assert!(matches!(
            PacketHeader::from_bytes(&[0x00, 0x01]),
            Err(ProtocolError::ShortFrame { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn unknown_type() {
        assert!(matches!(
            PacketHeader::from_bytes(&[0x42, 0x00, 0x00, 0x00]),
            Err(ProtocolError::UnknownType(0x42))
        ));
    }
}
