//! RaptorQ (RFC 6330) back-end, delegating to the `raptorq` crate.
//!
//! Symbols here are codec-native packets: a 4-byte payload id (source block
//! number + encoding symbol id) followed by the symbol bytes. The wire-layer
//! `symbol_id` is defined to be the big-endian u32 of those first four bytes,
//! so the two can never disagree. With a single source block the SBN is zero
//! and the id reads directly as the ESI.

use std::collections::HashSet;

use raptorq::{Decoder, Encoder, EncodingPacket, ObjectTransmissionInformation};

use crate::errors::{FountainError, Result};

/// Payload id prefix every RaptorQ packet starts with.
const PACKET_ID_SIZE: usize = 4;

fn wire_symbol_id(packet: &[u8]) -> u32 {
    u32::from_be_bytes([packet[0], packet[1], packet[2], packet[3]])
}

/// RaptorQ encoder: pre-generates source plus a repair budget, growing the
/// repair tail on demand.
pub struct RaptorQEncoder {
    encoder: Encoder,
    packets: Vec<Vec<u8>>,
    k: usize,
    repair_count: u32,
    next: usize,
}

impl std::fmt::Debug for RaptorQEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaptorQEncoder")
            .field("k", &self.k)
            .field("packets", &self.packets.len())
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl RaptorQEncoder {
    /// Build an encoder over `data` with the session symbol size.
    ///
    /// The initial repair budget is `max(K/2, 20)` packets beyond the source
    /// set, matching the expected loss profile of the link; the tail grows by
    /// `K` whenever it runs out.
    ///
    /// # Errors
    ///
    /// - [`FountainError::EmptyData`] for an empty blob
    /// - [`FountainError::ZeroSymbolSize`] / [`FountainError::SymbolSizeTooLarge`]
    ///   for symbol sizes the packet format cannot carry
    /// - [`FountainError::TooManySourceSymbols`] if `K` exceeds the 16-bit
    ///   metadata field
    pub fn new(data: &[u8], symbol_size: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(FountainError::EmptyData);
        }
        if symbol_size == 0 {
            return Err(FountainError::ZeroSymbolSize);
        }
        let Ok(mtu) = u16::try_from(symbol_size) else {
            return Err(FountainError::SymbolSizeTooLarge {
                size: symbol_size,
                max: usize::from(u16::MAX),
            });
        };

        let k = data.len().div_ceil(symbol_size);
        if k > usize::from(u16::MAX) {
            return Err(FountainError::TooManySourceSymbols {
                required: k,
                max: usize::from(u16::MAX),
            });
        }

        let encoder = Encoder::with_defaults(data, mtu);
        let repair_count = (k / 2).max(20) as u32;
        let packets: Vec<Vec<u8>> = encoder
            .get_encoded_packets(repair_count)
            .iter()
            .map(EncodingPacket::serialize)
            .collect();

        tracing::debug!(
            bytes = data.len(),
            k,
            pregenerated = packets.len(),
            "raptorq encoder ready"
        );

        Ok(Self { encoder, packets, k, repair_count, next: 0 })
    }

    /// Number of source symbols `K` as announced in image metadata.
    #[must_use]
    pub fn num_source_symbols(&self) -> usize {
        self.k
    }

    /// Symbols handed out so far.
    #[must_use]
    pub fn symbols_generated(&self) -> u32 {
        self.next as u32
    }

    /// Next codec packet. The returned id is the packet's own payload id, so
    /// it always equals the ESI the decoder will see.
    pub fn generate_symbol(&mut self) -> (u32, Vec<u8>) {
        if self.next >= self.packets.len() {
            self.repair_count += self.k as u32;
            let regenerated = self.encoder.get_encoded_packets(self.repair_count);
            for packet in &regenerated[self.packets.len()..] {
                self.packets.push(packet.serialize());
            }
            tracing::debug!(total = self.packets.len(), "raptorq repair tail extended");
        }

        let packet = self.packets[self.next].clone();
        self.next += 1;
        (wire_symbol_id(&packet), packet)
    }

    /// `⌈K · (1 + overhead_percent/100)⌉`, same contract as the LT encoder.
    #[must_use]
    pub fn recommended_count(&self, overhead_percent: u32) -> usize {
        (self.k * (100 + overhead_percent as usize)).div_ceil(100)
    }
}

/// RaptorQ decoder wrapper.
///
/// Tracks distinct wire symbol ids only for progress reporting; the
/// underlying codec consumes raw packets and reports completion by returning
/// the blob.
pub struct RaptorQDecoder {
    decoder: Decoder,
    k: usize,
    total_size: usize,
    received: HashSet<u32>,
    decoded: Option<Vec<u8>>,
}

impl std::fmt::Debug for RaptorQDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaptorQDecoder")
            .field("k", &self.k)
            .field("received", &self.received.len())
            .field("complete", &self.decoded.is_some())
            .finish_non_exhaustive()
    }
}

impl RaptorQDecoder {
    /// Build a decoder from the metadata triple `(K, symbol_size,
    /// total_size)` — the same parameters the encoder was constructed with.
    ///
    /// # Errors
    ///
    /// Same validation as [`RaptorQEncoder::new`].
    pub fn new(num_source_symbols: usize, symbol_size: usize, total_size: usize) -> Result<Self> {
        if num_source_symbols == 0 {
            return Err(FountainError::ZeroSourceSymbols);
        }
        if symbol_size == 0 {
            return Err(FountainError::ZeroSymbolSize);
        }
        let Ok(mtu) = u16::try_from(symbol_size) else {
            return Err(FountainError::SymbolSizeTooLarge {
                size: symbol_size,
                max: usize::from(u16::MAX),
            });
        };

        let config = ObjectTransmissionInformation::with_defaults(total_size as u64, mtu);
        Ok(Self {
            decoder: Decoder::new(config),
            k: num_source_symbols,
            total_size,
            received: HashSet::new(),
            decoded: None,
        })
    }

    /// Ingest one codec packet. Duplicates and runts are no-ops. Returns
    /// `true` once the blob is solved.
    pub fn add_symbol(&mut self, symbol_id: u32, symbol_data: &[u8]) -> bool {
        if self.decoded.is_some() {
            return true;
        }
        if symbol_data.len() < PACKET_ID_SIZE {
            tracing::warn!(symbol_id, len = symbol_data.len(), "runt raptorq packet dropped");
            return false;
        }
        if !self.received.insert(symbol_id) {
            return false;
        }

        let header_id = wire_symbol_id(symbol_data);
        if header_id != symbol_id {
            // Stream corruption the CRC somehow missed; the packet header wins
            tracing::warn!(symbol_id, header_id, "wire symbol id disagrees with packet id");
        }

        let packet = EncodingPacket::deserialize(symbol_data);
        if let Some(blob) = self.decoder.decode(packet) {
            tracing::debug!(symbols = self.received.len(), "raptorq decode complete");
            self.decoded = Some(blob);
        }
        self.decoded.is_some()
    }

    /// True once the blob is solved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.decoded.is_some()
    }

    /// Distinct symbols ingested so far.
    #[must_use]
    pub fn symbols_received(&self) -> usize {
        self.received.len()
    }

    /// Source symbols recovered, estimated for progress reporting.
    #[must_use]
    pub fn symbols_decoded(&self) -> usize {
        if self.decoded.is_some() { self.k } else { self.received.len().min(self.k) }
    }

    /// The solved blob, truncated to `total_size`. `None` until complete.
    #[must_use]
    pub fn decoded_data(&self) -> Option<Vec<u8>> {
        self.decoded.as_ref().map(|blob| {
            let mut out = blob.clone();
            out.truncate(self.total_size);
            out
        })
    }
}
