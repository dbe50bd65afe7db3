//! Typed payload codecs, one per packet type.
//!
//! Each payload serializes to a fixed big-endian layout (telemetry, image
//! metadata) or a length-delimited one (image data, text, command ack).
//! Encoding clamps out-of-range inputs instead of failing: a pathological
//! sensor read must never produce a frame that fails its own parse.

mod image;
mod telemetry;
mod text;

pub use image::{IMAGE_META_PAYLOAD_SIZE, ImageDataPayload, ImageMetaPayload};
pub use telemetry::{TELEMETRY_PAYLOAD_SIZE, TelemetryPayload};
pub use text::{CommandAckPayload, TextMessagePayload};
