//! Free-form text messages and the reserved command acknowledgment.

use bytes::Bytes;

use crate::{
    errors::{ProtocolError, Result},
    frame::MAX_PAYLOAD_SIZE,
};

/// Operator text message, UTF-8, at most one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMessagePayload {
    /// Message text.
    pub message: String,
}

impl TextMessagePayload {
    /// Encode as UTF-8, truncating on a character boundary to fit the
    /// 243-byte payload budget.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let bytes = self.message.as_bytes();
        if bytes.len() <= MAX_PAYLOAD_SIZE {
            return bytes.to_vec();
        }
        let mut end = MAX_PAYLOAD_SIZE;
        while end > 0 && !self.message.is_char_boundary(end) {
            end -= 1;
        }
        bytes[..end].to_vec()
    }

    /// Decode, replacing invalid UTF-8 sequences rather than failing.
    #[must_use]
    pub fn decode(data: &[u8]) -> Self {
        Self { message: String::from_utf8_lossy(data).into_owned() }
    }
}

/// Command acknowledgment (reserved).
///
/// The code point and codec exist so out-of-band frames can be queued, but
/// the core flight loop is TX-only and never produces one in response to
/// anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAckPayload {
    /// Type byte of the command being acknowledged.
    pub acked_type: u8,
    /// Sequence number of the command being acknowledged.
    pub acked_seq: u16,
    /// 0 = success, non-zero = error code.
    pub status: u8,
    /// Optional response data.
    pub data: Bytes,
}

impl CommandAckPayload {
    /// Fixed bytes before the optional response data.
    pub const PREFIX_SIZE: usize = 4;

    /// Encode as `acked_type ∥ acked_seq ∥ status ∥ data`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::PREFIX_SIZE + self.data.len());
        buf.push(self.acked_type);
        buf.extend_from_slice(&self.acked_seq.to_be_bytes());
        buf.push(self.status);
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode; bytes past the 4-byte prefix are response data.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadTooShort`] for buffers under 4 bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::PREFIX_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                what: "command ack",
                expected: Self::PREFIX_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            acked_type: data[0],
            acked_seq: u16::from_be_bytes([data[1], data[2]]),
            status: data[3],
            data: Bytes::copy_from_slice(&data[Self::PREFIX_SIZE..]),
        })
    }
}
