//! Error types for frame and payload codecs.
//!
//! Parse failures carry enough context to log a useful reject line without
//! keeping the offending bytes around. Receivers drop bad frames silently
//! (counting them); only `PayloadTooLarge` at build time indicates a caller
//! bug rather than channel noise.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while building or parsing frames and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer too short to hold the structure being parsed.
    #[error("short frame: need {expected} bytes, got {actual}")]
    ShortFrame {
        /// Minimum byte count required
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// First four bytes are not the `"RAPT"` sync word.
    #[error("bad sync word: {found:02x?}")]
    BadSync {
        /// The four bytes found where the sync word should be
        found: [u8; 4],
    },

    /// CRC-32 at the end of the frame does not match the computed value.
    #[error("bad crc: received {received:#010x}, computed {computed:#010x}")]
    BadCrc {
        /// CRC carried by the frame
        received: u32,
        /// CRC computed over the frame contents
        computed: u32,
    },

    /// Type byte is not a known packet type code point.
    #[error("unknown packet type {0:#04x}")]
    UnknownType(u8),

    /// Payload exceeds the 243-byte frame budget at build time.
    #[error("payload too large: {size} bytes > {max} max")]
    PayloadTooLarge {
        /// Offending payload length
        size: usize,
        /// Protocol maximum
        max: usize,
    },

    /// A typed payload was shorter than its fixed wire size.
    #[error("{what} payload too short: need {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Payload kind being decoded
        what: &'static str,
        /// Fixed wire size of that payload
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },
}
