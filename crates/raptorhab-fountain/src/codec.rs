//! Codec selection and the tagged encoder/decoder variants.
//!
//! LT and RaptorQ share the wire shape but are mutually incompatible on-air;
//! a deployment agrees on one codec in configuration on both sides. The
//! variants here are what the scheduler and the reconstruction engine hold —
//! neither ever names a concrete back-end.

use crate::{
    errors::{FountainError, Result},
    lt::{LtDecoder, LtEncoder},
    rq::{RaptorQDecoder, RaptorQEncoder},
};

/// Which fountain code a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FountainCodec {
    /// Luby Transform with Robust Soliton degrees.
    #[default]
    Lt,
    /// RaptorQ per RFC 6330.
    RaptorQ,
}

impl std::str::FromStr for FountainCodec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lt" => Ok(Self::Lt),
            "raptorq" => Ok(Self::RaptorQ),
            other => Err(format!("unknown fountain codec {other:?} (expected lt or raptorq)")),
        }
    }
}

impl std::fmt::Display for FountainCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lt => f.write_str("lt"),
            Self::RaptorQ => f.write_str("raptorq"),
        }
    }
}

/// Encoder over one image blob, back-end chosen at construction.
#[derive(Debug)]
pub enum FountainEncoder {
    /// LT back-end.
    Lt(LtEncoder),
    /// RaptorQ back-end.
    RaptorQ(RaptorQEncoder),
}

impl FountainEncoder {
    /// Construct the configured back-end over `data`.
    ///
    /// `base_seed` only affects the LT transform; flight payloads pass 0 so
    /// symbol derivation survives restarts.
    ///
    /// # Errors
    ///
    /// Propagates the back-end's construction validation (empty data, bad
    /// symbol size, too many source symbols).
    pub fn new(
        codec: FountainCodec,
        data: &[u8],
        symbol_size: usize,
        base_seed: u64,
    ) -> Result<Self> {
        match codec {
            FountainCodec::Lt => Ok(Self::Lt(LtEncoder::new(data, symbol_size, base_seed)?)),
            FountainCodec::RaptorQ => Ok(Self::RaptorQ(RaptorQEncoder::new(data, symbol_size)?)),
        }
    }

    /// Generate the next `(symbol_id, bytes)` pair. Infallible; ids never
    /// repeat for one encoder.
    pub fn generate_symbol(&mut self) -> (u32, Vec<u8>) {
        match self {
            Self::Lt(enc) => enc.generate_symbol(),
            Self::RaptorQ(enc) => enc.generate_symbol(),
        }
    }

    /// Number of source symbols `K` for image metadata.
    #[must_use]
    pub fn num_source_symbols(&self) -> usize {
        match self {
            Self::Lt(enc) => enc.num_source_symbols(),
            Self::RaptorQ(enc) => enc.num_source_symbols(),
        }
    }

    /// Symbols handed out so far.
    #[must_use]
    pub fn symbols_generated(&self) -> u32 {
        match self {
            Self::Lt(enc) => enc.symbols_generated(),
            Self::RaptorQ(enc) => enc.symbols_generated(),
        }
    }

    /// `⌈K · (1 + overhead_percent/100)⌉` symbols before a sender should
    /// move on.
    #[must_use]
    pub fn recommended_count(&self, overhead_percent: u32) -> usize {
        match self {
            Self::Lt(enc) => enc.recommended_count(overhead_percent),
            Self::RaptorQ(enc) => enc.recommended_count(overhead_percent),
        }
    }
}

/// Decoder for one image, back-end chosen from deployment configuration and
/// parameterized by the image's metadata.
#[derive(Debug)]
pub enum FountainDecoder {
    /// LT back-end.
    Lt {
        /// Belief-propagation decoder.
        decoder: LtDecoder,
        /// Original blob size for final truncation.
        total_size: usize,
    },
    /// RaptorQ back-end.
    RaptorQ(RaptorQDecoder),
}

impl FountainDecoder {
    /// Construct the configured back-end from the metadata triple.
    ///
    /// # Errors
    ///
    /// [`FountainError::ZeroSourceSymbols`] / [`FountainError::ZeroSymbolSize`]
    /// on malformed metadata, plus RaptorQ's symbol-size validation.
    pub fn new(
        codec: FountainCodec,
        num_source_symbols: usize,
        symbol_size: usize,
        total_size: usize,
    ) -> Result<Self> {
        if symbol_size == 0 {
            return Err(FountainError::ZeroSymbolSize);
        }
        match codec {
            FountainCodec::Lt => Ok(Self::Lt {
                decoder: LtDecoder::new(num_source_symbols, 0)?,
                total_size,
            }),
            FountainCodec::RaptorQ => Ok(Self::RaptorQ(RaptorQDecoder::new(
                num_source_symbols,
                symbol_size,
                total_size,
            )?)),
        }
    }

    /// Ingest one symbol; duplicates are no-ops. Returns `true` once the
    /// blob is recoverable.
    pub fn add_symbol(&mut self, symbol_id: u32, symbol_data: &[u8]) -> bool {
        match self {
            Self::Lt { decoder, .. } => decoder.add_symbol(symbol_id, symbol_data),
            Self::RaptorQ(decoder) => decoder.add_symbol(symbol_id, symbol_data),
        }
    }

    /// True once the blob is recoverable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Lt { decoder, .. } => decoder.is_complete(),
            Self::RaptorQ(decoder) => decoder.is_complete(),
        }
    }

    /// Distinct symbols ingested.
    #[must_use]
    pub fn symbols_received(&self) -> usize {
        match self {
            Self::Lt { decoder, .. } => decoder.symbols_received(),
            Self::RaptorQ(decoder) => decoder.symbols_received(),
        }
    }

    /// Source symbols recovered so far (progress reporting).
    #[must_use]
    pub fn symbols_decoded(&self) -> usize {
        match self {
            Self::Lt { decoder, .. } => decoder.symbols_decoded(),
            Self::RaptorQ(decoder) => decoder.symbols_decoded(),
        }
    }

    /// The reconstructed blob trimmed to the metadata's `total_size`.
    /// `None` until complete.
    #[must_use]
    pub fn decoded_data(&self) -> Option<Vec<u8>> {
        match self {
            Self::Lt { decoder, total_size } => decoder.decoded_data(*total_size),
            Self::RaptorQ(decoder) => decoder.decoded_data(),
        }
    }
}
