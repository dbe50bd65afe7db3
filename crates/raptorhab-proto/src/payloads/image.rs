//! Image metadata and image data payloads.

use bytes::Bytes;

use crate::errors::{ProtocolError, Result};

/// Serialized size of [`ImageMetaPayload`].
pub const IMAGE_META_PAYLOAD_SIZE: usize = 22;

/// Metadata announcing one fountain-coded image.
///
/// Emitted periodically during an image's transmission so a late-joining
/// ground station can still install a decoder. For a given `image_id` every
/// field is immutable once first emitted; receivers reject conflicting
/// metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetaPayload {
    /// Image identifier, monotonically increasing per flight.
    pub image_id: u16,
    /// Original blob size in bytes.
    pub total_size: u32,
    /// Fountain symbol size in bytes (session-wide, typically 200).
    pub symbol_size: u16,
    /// Number of source symbols `K`.
    pub num_source_symbols: u16,
    /// CRC-32 of the original image blob.
    pub checksum: u32,
    /// Pixel width.
    pub width: u16,
    /// Pixel height.
    pub height: u16,
    /// Capture time as Unix seconds.
    pub timestamp: u32,
}

impl ImageMetaPayload {
    /// Encode to the fixed 22-byte wire layout.
    #[must_use]
    pub fn encode(&self) -> [u8; IMAGE_META_PAYLOAD_SIZE] {
        let mut buf = [0u8; IMAGE_META_PAYLOAD_SIZE];
        buf[0..2].copy_from_slice(&self.image_id.to_be_bytes());
        buf[2..6].copy_from_slice(&self.total_size.to_be_bytes());
        buf[6..8].copy_from_slice(&self.symbol_size.to_be_bytes());
        buf[8..10].copy_from_slice(&self.num_source_symbols.to_be_bytes());
        buf[10..14].copy_from_slice(&self.checksum.to_be_bytes());
        buf[14..16].copy_from_slice(&self.width.to_be_bytes());
        buf[16..18].copy_from_slice(&self.height.to_be_bytes());
        buf[18..22].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Decode from at least 22 bytes; trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadTooShort`] for buffers under 22 bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < IMAGE_META_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                what: "image metadata",
                expected: IMAGE_META_PAYLOAD_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            image_id: u16::from_be_bytes([data[0], data[1]]),
            total_size: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
            symbol_size: u16::from_be_bytes([data[6], data[7]]),
            num_source_symbols: u16::from_be_bytes([data[8], data[9]]),
            checksum: u32::from_be_bytes([data[10], data[11], data[12], data[13]]),
            width: u16::from_be_bytes([data[14], data[15]]),
            height: u16::from_be_bytes([data[16], data[17]]),
            timestamp: u32::from_be_bytes([data[18], data[19], data[20], data[21]]),
        })
    }
}

/// One fountain symbol of an image.
///
/// In LT mode `symbol_data` is exactly the session symbol size. In RaptorQ
/// mode it is the codec-native packet, whose first four bytes carry the ESI;
/// the wire `symbol_id` and that ESI are identical by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDataPayload {
    /// Image this symbol belongs to.
    pub image_id: u16,
    /// Encoded-symbol identifier.
    pub symbol_id: u32,
    /// Symbol bytes (LT symbol or RaptorQ packet).
    pub symbol_data: Bytes,
}

impl ImageDataPayload {
    /// Bytes before the symbol data: `image_id` + `symbol_id`.
    pub const PREFIX_SIZE: usize = 6;

    /// Encode as `image_id ∥ symbol_id ∥ symbol_data`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::PREFIX_SIZE + self.symbol_data.len());
        buf.extend_from_slice(&self.image_id.to_be_bytes());
        buf.extend_from_slice(&self.symbol_id.to_be_bytes());
        buf.extend_from_slice(&self.symbol_data);
        buf
    }

    /// Decode; everything after the 6-byte prefix is the symbol.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadTooShort`] for buffers under 6 bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::PREFIX_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                what: "image data",
                expected: Self::PREFIX_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            image_id: u16::from_be_bytes([data[0], data[1]]),
            symbol_id: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
            symbol_data: Bytes::copy_from_slice(&data[Self::PREFIX_SIZE..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_round_trip() {
        let meta = ImageMetaPayload {
            image_id: 42,
            total_size: 10_000,
            symbol_size: 200,
            num_source_symbols: 50,
            checksum: 0xDEAD_BEEF,
            width: 1280,
            height: 960,
            timestamp: 1_700_000_123,
        };
        let decoded = ImageMetaPayload::decode(&meta.encode()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn meta_layout_is_big_endian() {
        let meta = ImageMetaPayload {
            image_id: 0x0102,
            total_size: 0x0304_0506,
            symbol_size: 0x0708,
            num_source_symbols: 0x090A,
            checksum: 0x0B0C_0D0E,
            width: 0x0F10,
            height: 0x1112,
            timestamp: 0x1314_1516,
        };
        assert_eq!(
            meta.encode(),
            [
                0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
                0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16
            ]
        );
    }

    #[test]
    fn meta_short_rejected() {
        assert!(ImageMetaPayload::decode(&[0u8; 21]).is_err());
    }

    #[test]
    fn data_round_trip() {
        let payload = ImageDataPayload {
            image_id: 7,
            symbol_id: 123_456,
            symbol_data: Bytes::from_static(&[0xAB; 200]),
        };
        let decoded = ImageDataPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn data_empty_symbol_allowed() {
        // Prefix only: degenerate but parseable
        let decoded = ImageDataPayload::decode(&[0, 1, 0, 0, 0, 2]).unwrap();
        assert_eq!(decoded.image_id, 1);
        assert_eq!(decoded.symbol_id, 2);
        assert!(decoded.symbol_data.is_empty());
    }

    #[test]
    fn data_short_rejected() {
        assert!(ImageDataPayload::decode(&[0, 1, 0, 0, 0]).is_err());
    }
}
