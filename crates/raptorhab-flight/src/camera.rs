//! Camera collaborator contract and a synthetic image source.
//!
//! Real capture and WebP encoding live in their own module out of scope
//! here. The scheduler only needs the contract: a capture yields an
//! in-memory blob with a unique, monotonically increasing `image_id` —
//! ids are never reused within one flight, which is what lets the ground
//! station key reconstructions on them.

use thiserror::Error;

/// Camera failures. The supervisor logs and continues; a dead camera only
/// means no fresh images.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Capture failed.
    #[error("capture failed: {0}")]
    Capture(String),
}

/// One captured image ready for transmission.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Unique id, monotonically increasing per flight.
    pub image_id: u16,
    /// Encoded image bytes (WebP in the real module).
    pub data: Vec<u8>,
    /// Pixel width.
    pub width: u16,
    /// Pixel height.
    pub height: u16,
    /// Capture time as Unix seconds.
    pub timestamp: u32,
}

/// Camera collaborator contract.
pub trait Camera: Send {
    /// Capture one image, geotagged with the current position.
    ///
    /// # Errors
    ///
    /// [`CameraError::Capture`] when the hardware fails; the caller logs and
    /// continues.
    fn capture(&mut self, latitude: f64, longitude: f64, altitude: f64)
    -> Result<CapturedImage, CameraError>;

    /// Release the hardware.
    fn close(&mut self) {}
}

/// Synthetic image source for `--simulate`: deterministic pseudo-random
/// blobs of plausible WebP size.
#[derive(Debug)]
pub struct SimulatedCamera {
    next_image_id: u16,
    image_bytes: usize,
}

impl SimulatedCamera {
    /// Produce blobs of roughly `image_bytes` each.
    #[must_use]
    pub fn new(image_bytes: usize) -> Self {
        Self { next_image_id: 1, image_bytes }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(20_000)
    }
}

impl Camera for SimulatedCamera {
    fn capture(
        &mut self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
    ) -> Result<CapturedImage, CameraError> {
        let image_id = self.next_image_id;
        self.next_image_id = self.next_image_id.wrapping_add(1);

        // Seed the pattern with position so consecutive frames differ
        let seed = (latitude.to_bits() ^ longitude.to_bits().rotate_left(17))
            .wrapping_add(altitude as u64)
            .wrapping_add(u64::from(image_id));
        let mut state = seed | 1;
        let data = (0..self.image_bytes)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                (state >> 33) as u8
            })
            .collect();

        tracing::info!(image_id, bytes = self.image_bytes, "simulated capture");
        Ok(CapturedImage {
            image_id,
            data,
            width: 1280,
            height: 960,
            timestamp: image_id.into(),
        })
    }
}
