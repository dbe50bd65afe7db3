//! On-air packet protocol for the RaptorHAB telemetry and imagery link.
//!
//! Every frame on the half-duplex radio channel has the same shape:
//!
//! ```text
//! [sync "RAPT": 4] [type: 1] [seq: 2 BE] [flags: 1] [payload: 0-243] [crc32: 4 BE]
//! ```
//!
//! All multi-byte integers are big-endian. The CRC-32 (IEEE 802.3 polynomial)
//! covers everything before it, sync word included. Total frame length never
//! exceeds 255 bytes so a frame always fits one physical-layer transmission.
//!
//! This crate is pure state: it builds and parses frames and the typed
//! payloads that ride in them. It performs no I/O and holds no session state
//! beyond what the caller passes in (the parser needs the session's fountain
//! symbol size to delimit `IMAGE_DATA` frames inside padded radio buffers).

pub mod crc;
mod errors;
mod frame;
mod header;
mod packet_type;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::{
    CRC_SIZE, HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, ParsedPacket, SYNC_WORD,
    build_packet, parse_packet,
};
pub use header::PacketHeader;
pub use packet_type::{FixType, PacketFlags, PacketType};
