//! Packet type code points, header flags, and GPS fix levels.

/// On-air packet type.
///
/// Air→ground types are the only ones the flight payload transmits. The
/// command range (`0x80..=0x83`) and `CmdAck` are reserved: the code points
/// are recognized so a receiver can count and skip them, but the flight main
/// loop never listens and no dispatch semantics are defined for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// GPS + system telemetry, fixed 36-byte payload.
    Telemetry = 0x00,
    /// Image metadata announcing a fountain-coded image, fixed 22 bytes.
    ImageMeta = 0x01,
    /// One fountain symbol of an image.
    ImageData = 0x02,
    /// Free-form UTF-8 text, up to the payload budget.
    TextMsg = 0x03,
    /// Command acknowledgment (reserved, ≥ 4 bytes).
    CmdAck = 0x10,
    /// Ground→air ping (reserved).
    CmdPing = 0x80,
    /// Ground→air parameter set (reserved).
    CmdSetParam = 0x81,
    /// Ground→air capture trigger (reserved).
    CmdCapture = 0x82,
    /// Ground→air reboot request (reserved).
    CmdReboot = 0x83,
}

impl PacketType {
    /// Decode a type byte. Returns `None` for unassigned code points.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Telemetry),
            0x01 => Some(Self::ImageMeta),
            0x02 => Some(Self::ImageData),
            0x03 => Some(Self::TextMsg),
            0x10 => Some(Self::CmdAck),
            0x80 => Some(Self::CmdPing),
            0x81 => Some(Self::CmdSetParam),
            0x82 => Some(Self::CmdCapture),
            0x83 => Some(Self::CmdReboot),
            _ => None,
        }
    }

    /// Wire value of this type.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// True for the reserved ground→air command range.
    #[must_use]
    pub fn is_command(self) -> bool {
        self.to_u8() >= 0x80
    }
}

/// Header flags bitfield.
///
/// Carried verbatim in every frame; the core protocol does not interpret any
/// bit. `RETRANSMIT` exists for command retries outside the core path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags(u8);

impl PacketFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// Sender considers this frame urgent.
    pub const URGENT: Self = Self(0x01);
    /// Frame is a retransmission.
    pub const RETRANSMIT: Self = Self(0x02);
    /// Last frame of a logical burst.
    pub const LAST_PACKET: Self = Self(0x04);
    /// Payload is compressed.
    pub const COMPRESSED: Self = Self(0x08);

    /// Reconstruct from a raw header byte. Unknown bits are preserved.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw header byte.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PacketFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// GPS fix quality carried in telemetry.
///
/// Advisory only: consumers must treat `(lat, lon) = (0, 0)` as "no fix yet"
/// regardless of the reported fix type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FixType {
    /// No position solution.
    #[default]
    None = 0,
    /// 2D solution (altitude unreliable).
    Fix2d = 1,
    /// Full 3D solution.
    Fix3d = 2,
}

impl FixType {
    /// Decode leniently: unassigned values degrade to [`FixType::None`]
    /// rather than failing the whole telemetry frame.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Fix2d,
            2 => Self::Fix3d,
            _ => Self::None,
        }
    }

    /// Wire value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_round_trip() {
        for ty in [
            PacketType::Telemetry,
            PacketType::ImageMeta,
            PacketType::ImageData,
            PacketType::TextMsg,
            PacketType::CmdAck,
            PacketType::CmdPing,
            PacketType::CmdSetParam,
            PacketType::CmdCapture,
            PacketType::CmdReboot,
        ] {
            assert_eq!(PacketType::from_u8(ty.to_u8()), Some(ty));
        }
    }

    #[test]
    fn unassigned_code_points_rejected() {
        assert_eq!(PacketType::from_u8(0x04), None);
        assert_eq!(PacketType::from_u8(0x7F), None);
        assert_eq!(PacketType::from_u8(0xFF), None);
    }

    #[test]
    fn command_range() {
        assert!(PacketType::CmdPing.is_command());
        assert!(PacketType::CmdReboot.is_command());
        assert!(!PacketType::Telemetry.is_command());
        assert!(!PacketType::CmdAck.is_command());
    }

    #[test]
    fn flags_combine() {
        let flags = PacketFlags::URGENT | PacketFlags::LAST_PACKET;
        assert!(flags.contains(PacketFlags::URGENT));
        assert!(flags.contains(PacketFlags::LAST_PACKET));
        assert!(!flags.contains(PacketFlags::COMPRESSED));
        assert_eq!(flags.bits(), 0x05);
    }

    #[test]
    fn fix_type_lenient() {
        assert_eq!(FixType::from_u8(0), FixType::None);
        assert_eq!(FixType::from_u8(1), FixType::Fix2d);
        assert_eq!(FixType::from_u8(2), FixType::Fix3d);
        assert_eq!(FixType::from_u8(99), FixType::None);
    }
}
