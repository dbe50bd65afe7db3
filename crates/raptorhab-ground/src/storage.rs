//! Session store: the collaborator that persists one ground-station run.
//!
//! A session is one process lifetime, identified by a `YYYYMMDD_HHMMSS`
//! stamp taken at startup. Completed images land under
//! `<data_dir>/<session>/images/`; the telemetry CSV lives beside them.
//! This is deliberately a shim — flat files, no database — the wire
//! protocol neither knows nor cares how the flight is archived.

use std::path::{Path, PathBuf};

use raptorhab_proto::payloads::ImageMetaPayload;
use thiserror::Error;

/// Storage failures. The supervisor logs them and keeps receiving; losing
/// one image to a full disk must not stop the flight.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists completed images for one session.
pub trait SessionStore: Send {
    /// Session identifier all artifacts are tagged with.
    fn session_id(&self) -> &str;

    /// Persist one verified image.
    ///
    /// # Errors
    ///
    /// [`StorageError`] on write failure; the caller logs and continues.
    fn store_image(
        &mut self,
        image_id: u16,
        data: &[u8],
        meta: &ImageMetaPayload,
    ) -> Result<(), StorageError>;

    /// Images stored so far.
    fn image_count(&self) -> usize;
}

/// Flat-file session store.
#[derive(Debug)]
pub struct FsSessionStore {
    session_id: String,
    images_dir: PathBuf,
    stored: usize,
}

impl FsSessionStore {
    /// Create the session directory tree under `data_dir`.
    ///
    /// # Errors
    ///
    /// [`StorageError`] if the directories cannot be created.
    pub fn create(data_dir: &Path) -> Result<Self, StorageError> {
        let session_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::create_with_id(data_dir, session_id)
    }

    /// Create with an explicit session id (tests pin this).
    ///
    /// # Errors
    ///
    /// [`StorageError`] if the directories cannot be created.
    pub fn create_with_id(data_dir: &Path, session_id: String) -> Result<Self, StorageError> {
        let images_dir = data_dir.join(&session_id).join("images");
        std::fs::create_dir_all(&images_dir)?;
        tracing::info!(session = %session_id, dir = %images_dir.display(), "session opened");
        Ok(Self { session_id, images_dir, stored: 0 })
    }

    /// Directory completed images are written to.
    #[must_use]
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Path for the session's telemetry CSV.
    #[must_use]
    pub fn telemetry_csv_path(&self) -> PathBuf {
        self.images_dir
            .parent()
            .map_or_else(|| PathBuf::from("telemetry.csv"), |p| p.join("telemetry.csv"))
    }

    /// Path for the session's raw packet log.
    #[must_use]
    pub fn packet_log_path(&self) -> PathBuf {
        self.images_dir
            .parent()
            .map_or_else(|| PathBuf::from("packets.log"), |p| p.join("packets.log"))
    }
}

impl SessionStore for FsSessionStore {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn store_image(
        &mut self,
        image_id: u16,
        data: &[u8],
        meta: &ImageMetaPayload,
    ) -> Result<(), StorageError> {
        let name = format!("img_{image_id:05}_{}x{}.webp", meta.width, meta.height);
        let path = self.images_dir.join(name);
        std::fs::write(&path, data)?;
        self.stored += 1;
        tracing::info!(image_id, bytes = data.len(), path = %path.display(), "image stored");
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.stored
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    images: Vec<(u16, Vec<u8>)>,
}

impl MemorySessionStore {
    /// Empty store with a fixed session id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored images in arrival order.
    #[must_use]
    pub fn images(&self) -> &[(u16, Vec<u8>)] {
        &self.images
    }
}

impl SessionStore for MemorySessionStore {
    fn session_id(&self) -> &str {
        "test_session"
    }

    fn store_image(
        &mut self,
        image_id: u16,
        data: &[u8],
        _meta: &ImageMetaPayload,
    ) -> Result<(), StorageError> {
        self.images.push((image_id, data.to_vec()));
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ImageMetaPayload {
        ImageMetaPayload {
            image_id: 3,
            total_size: 4,
            symbol_size: 200,
            num_source_symbols: 1,
            checksum: 0,
            width: 640,
            height: 480,
            timestamp: 0,
        }
    }

    #[test]
    fn fs_store_writes_under_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut store =
            FsSessionStore::create_with_id(dir.path(), "20260801_120000".to_string()).unwrap();

        store.store_image(3, b"webp", &meta()).unwrap();
        assert_eq!(store.image_count(), 1);

        let expected =
            dir.path().join("20260801_120000").join("images").join("img_00003_640x480.webp");
        assert_eq!(std::fs::read(expected).unwrap(), b"webp");
    }

    #[test]
    fn session_id_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::create(dir.path()).unwrap();
        let id = store.session_id();
        assert_eq!(id.len(), 15, "session id {id:?}");
        assert_eq!(id.as_bytes()[8], b'_');
    }

    #[test]
    fn sibling_paths_live_beside_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::create_with_id(dir.path(), "s".to_string()).unwrap();
        assert_eq!(store.telemetry_csv_path(), dir.path().join("s").join("telemetry.csv"));
        assert_eq!(store.packet_log_path(), dir.path().join("s").join("packets.log"));
    }
}
