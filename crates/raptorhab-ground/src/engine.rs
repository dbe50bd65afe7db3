//! Per-image reconstruction engine.
//!
//! For every `image_id` seen on the air the engine keeps one
//! `Reconstruction`: optional metadata, an optional fountain decoder (only
//! once metadata is known), and a buffer of symbols that arrived early.
//! Symbols may arrive before metadata — the engine buffers them and replays
//! the whole buffer when metadata finally lands.
//!
//! An image is *complete* only after the decoder's output matches the
//! metadata checksum; a decoded-but-mismatched blob is classified `failed`
//! and never surfaces. Bounded memory comes from two sides: `max_pending`
//! concurrent reconstructions (oldest evicted as `timeout`) and a periodic
//! [`ReconstructionEngine::sweep`] that abandons anything idle past the
//! inactivity timeout.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use raptorhab_fountain::{FountainCodec, FountainDecoder};
use raptorhab_proto::{crc, payloads::ImageMetaPayload};

use crate::clock::{Clock, SystemClock};

/// Completed images remembered for duplicate suppression.
const MAX_COMPLETED_REMEMBERED: usize = 100;

/// Terminal classification of a reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// Still accumulating symbols.
    Receiving,
    /// Decoded and checksum-verified.
    Complete,
    /// Decoded but failed verification, or unrecoverably malformed.
    Failed,
    /// Abandoned for inactivity or evicted for capacity.
    Timeout,
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Symbols presented to the engine.
    pub symbols_received: u64,
    /// Symbols dropped as duplicates of an already-seen `(image, symbol)`.
    pub symbols_duplicate: u64,
    /// Images completed and verified.
    pub images_completed: u64,
    /// Images that decoded but failed verification or were malformed.
    pub images_failed: u64,
    /// Images abandoned for inactivity or capacity.
    pub images_timed_out: u64,
}

/// Progress of one in-flight reconstruction, for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProgress {
    /// Image identifier.
    pub image_id: u16,
    /// Distinct symbols seen so far.
    pub symbols_received: usize,
    /// Source symbols needed (`K`), 0 until metadata arrives.
    pub symbols_needed: usize,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Deployment-wide fountain codec.
    pub codec: FountainCodec,
    /// Concurrent reconstructions before the oldest is evicted.
    pub max_pending: usize,
    /// Inactivity before [`ReconstructionEngine::sweep`] abandons an image.
    pub inactivity_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            codec: FountainCodec::Lt,
            max_pending: 10,
            inactivity_timeout: Duration::from_secs(300),
        }
    }
}

/// Callback invoked exactly once per successfully reconstructed image.
pub type CompletionCallback = Box<dyn FnMut(u16, &[u8], &ImageMetaPayload) + Send>;

struct Reconstruction {
    meta: Option<ImageMetaPayload>,
    decoder: Option<FountainDecoder>,
    /// Symbols held until metadata installs a decoder.
    buffered: HashMap<u32, Vec<u8>>,
    /// Every symbol id ever seen for this image.
    seen: HashSet<u32>,
    first_received: Instant,
    last_received: Instant,
}

impl Reconstruction {
    fn new(now: Instant) -> Self {
        Self {
            meta: None,
            decoder: None,
            buffered: HashMap::new(),
            seen: HashSet::new(),
            first_received: now,
            last_received: now,
        }
    }
}

/// The ground station's per-image state machine collection.
pub struct ReconstructionEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    images: HashMap<u16, Reconstruction>,
    /// Completed ids with their seen-symbol sets, for duplicate suppression.
    completed: HashMap<u16, HashSet<u32>>,
    completed_order: VecDeque<u16>,
    on_complete: Option<CompletionCallback>,
    stats: EngineStats,
    clock: C,
}

impl ReconstructionEngine<SystemClock> {
    /// Engine on the system clock.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ReconstructionEngine<C> {
    /// Engine on an explicit clock (tests drive eviction timing directly).
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        Self {
            config,
            images: HashMap::new(),
            completed: HashMap::new(),
            completed_order: VecDeque::new(),
            on_complete: None,
            stats: EngineStats::default(),
            clock,
        }
    }

    /// Install the completion callback.
    pub fn on_complete(&mut self, callback: CompletionCallback) {
        self.on_complete = Some(callback);
    }

    /// Counters snapshot.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// In-flight reconstruction count.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.images.len()
    }

    /// Progress of every in-flight reconstruction.
    #[must_use]
    pub fn progress(&self) -> Vec<ImageProgress> {
        self.images
            .iter()
            .map(|(&image_id, rec)| ImageProgress {
                image_id,
                symbols_received: rec.seen.len(),
                symbols_needed: rec
                    .meta
                    .map_or(0, |meta| usize::from(meta.num_source_symbols)),
            })
            .collect()
    }

    /// Ingest an `IMAGE_META` payload.
    pub fn add_metadata(&mut self, meta: &ImageMetaPayload) {
        let image_id = meta.image_id;

        if self.completed.contains_key(&image_id) {
            tracing::debug!(image_id, "metadata for already-completed image");
            return;
        }

        if meta.num_source_symbols == 0 || meta.symbol_size == 0 {
            tracing::warn!(
                image_id,
                k = meta.num_source_symbols,
                symbol_size = meta.symbol_size,
                "malformed metadata rejected"
            );
            return;
        }

        if self.images.contains_key(&image_id) {
            self.update_existing_metadata(meta);
            return;
        }

        self.make_room_for(image_id);
        let now = self.clock.now();
        let mut rec = Reconstruction::new(now);
        match self.install_decoder(&mut rec, meta) {
            Ok(()) => {
                tracing::info!(
                    image_id,
                    total_size = meta.total_size,
                    k = meta.num_source_symbols,
                    "started receiving image"
                );
                self.images.insert(image_id, rec);
            }
            Err(status) => self.count_terminal(status),
        }
    }

    fn update_existing_metadata(&mut self, meta: &ImageMetaPayload) {
        let image_id = meta.image_id;
        let Some(rec) = self.images.get_mut(&image_id) else {
            return;
        };
        rec.last_received = self.clock.now();

        if let Some(existing) = &rec.meta {
            // Fields are immutable once first announced; conflicting
            // metadata means a corrupt or forged stream
            if existing != meta {
                tracing::warn!(image_id, "conflicting metadata dropped");
            }
            return;
        }

        // Symbols arrived first: install the decoder late and replay
        tracing::info!(
            image_id,
            buffered = rec.buffered.len(),
            "late metadata, replaying buffered symbols"
        );
        let Some(mut rec) = self.images.remove(&image_id) else {
            return;
        };
        match self.install_decoder(&mut rec, meta) {
            Ok(()) => {
                let complete = rec
                    .decoder
                    .as_mut()
                    .is_some_and(|decoder| {
                        let mut done = decoder.is_complete();
                        for (symbol_id, data) in rec.buffered.drain() {
                            if decoder.add_symbol(symbol_id, &data) {
                                done = true;
                            }
                        }
                        done
                    });
                self.images.insert(image_id, rec);
                if complete {
                    self.finish(image_id);
                }
            }
            Err(status) => {
                self.count_terminal(status);
            }
        }
    }

    /// Validate metadata against buffered symbols and attach the decoder.
    fn install_decoder(
        &self,
        rec: &mut Reconstruction,
        meta: &ImageMetaPayload,
    ) -> Result<(), ImageStatus> {
        // In LT mode every symbol is exactly symbol_size bytes; a buffered
        // symbol of any other length means the stream is not what the
        // metadata describes
        if self.config.codec == FountainCodec::Lt
            && rec
                .buffered
                .values()
                .any(|data| data.len() != usize::from(meta.symbol_size))
        {
            tracing::warn!(
                image_id = meta.image_id,
                symbol_size = meta.symbol_size,
                "buffered symbols disagree with metadata symbol size"
            );
            return Err(ImageStatus::Failed);
        }

        match FountainDecoder::new(
            self.config.codec,
            usize::from(meta.num_source_symbols),
            usize::from(meta.symbol_size),
            meta.total_size as usize,
        ) {
            Ok(decoder) => {
                rec.decoder = Some(decoder);
                rec.meta = Some(*meta);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(image_id = meta.image_id, %error, "decoder construction failed");
                Err(ImageStatus::Failed)
            }
        }
    }

    /// Ingest one `IMAGE_DATA` symbol.
    pub fn add_symbol(&mut self, image_id: u16, symbol_id: u32, symbol_data: &[u8]) {
        self.stats.symbols_received += 1;

        if let Some(seen) = self.completed.get_mut(&image_id) {
            // Late traffic for a finished image: count repeats, stay quiet
            if !seen.insert(symbol_id) {
                self.stats.symbols_duplicate += 1;
            }
            return;
        }

        if !self.images.contains_key(&image_id) {
            tracing::debug!(image_id, "symbol for unannounced image, buffering");
            self.make_room_for(image_id);
            let now = self.clock.now();
            self.images.insert(image_id, Reconstruction::new(now));
        }

        let Some(rec) = self.images.get_mut(&image_id) else {
            return;
        };
        rec.last_received = self.clock.now();

        if !rec.seen.insert(symbol_id) {
            self.stats.symbols_duplicate += 1;
            return;
        }

        let complete = if let Some(decoder) = &mut rec.decoder {
            decoder.add_symbol(symbol_id, symbol_data)
        } else {
            rec.buffered.insert(symbol_id, symbol_data.to_vec());
            false
        };

        if complete {
            self.finish(image_id);
        }
    }

    /// Abandon reconstructions idle past the inactivity timeout. Called
    /// periodically by the supervisor tick.
    pub fn sweep(&mut self) {
        let now = self.clock.now();
        let timeout = self.config.inactivity_timeout;
        let expired: Vec<u16> = self
            .images
            .iter()
            .filter(|(_, rec)| now.duration_since(rec.last_received) > timeout)
            .map(|(&id, _)| id)
            .collect();

        for image_id in expired {
            tracing::warn!(image_id, "reconstruction timed out");
            self.images.remove(&image_id);
            self.count_terminal(ImageStatus::Timeout);
        }
    }

    /// Evict the oldest reconstruction if a new image would exceed capacity.
    fn make_room_for(&mut self, incoming: u16) {
        if self.images.len() < self.config.max_pending {
            return;
        }
        let oldest = self
            .images
            .iter()
            .min_by_key(|(_, rec)| rec.first_received)
            .map(|(&id, _)| id);
        if let Some(image_id) = oldest {
            tracing::warn!(evicted = image_id, incoming, "at capacity, evicting oldest image");
            self.images.remove(&image_id);
            self.count_terminal(ImageStatus::Timeout);
        }
    }

    /// Completion path: verify the checksum, then surface or fail.
    fn finish(&mut self, image_id: u16) {
        let Some(rec) = self.images.remove(&image_id) else {
            return;
        };
        let (Some(meta), Some(decoder)) = (rec.meta, rec.decoder.as_ref()) else {
            self.count_terminal(ImageStatus::Failed);
            return;
        };
        let Some(data) = decoder.decoded_data() else {
            tracing::error!(image_id, "decoder reported completion but yielded no data");
            self.count_terminal(ImageStatus::Failed);
            return;
        };

        let computed = crc::crc32(&data);
        if computed != meta.checksum {
            tracing::error!(
                image_id,
                expected = meta.checksum,
                computed,
                "image checksum mismatch"
            );
            self.count_terminal(ImageStatus::Failed);
            return;
        }

        tracing::info!(
            image_id,
            bytes = data.len(),
            symbols = rec.seen.len(),
            "image complete"
        );
        self.stats.images_completed += 1;
        self.remember_completed(image_id, rec.seen);

        if let Some(callback) = &mut self.on_complete {
            callback(image_id, &data, &meta);
        }
    }

    fn remember_completed(&mut self, image_id: u16, seen: HashSet<u32>) {
        self.completed.insert(image_id, seen);
        self.completed_order.push_back(image_id);
        while self.completed_order.len() > MAX_COMPLETED_REMEMBERED {
            if let Some(oldest) = self.completed_order.pop_front() {
                self.completed.remove(&oldest);
            }
        }
    }

    fn count_terminal(&mut self, status: ImageStatus) {
        match status {
            ImageStatus::Failed => self.stats.images_failed += 1,
            ImageStatus::Timeout => self.stats.images_timed_out += 1,
            ImageStatus::Receiving | ImageStatus::Complete => {}
        }
    }
}
