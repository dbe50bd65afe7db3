//! Luby Transform encoder and belief-propagation decoder.
//!
//! The neighbor set of every encoded symbol is a pure function of
//! `(base_seed, symbol_id, k)`: a ChaCha8 stream seeded with
//! `base_seed + symbol_id` drives one Robust Soliton degree draw followed by
//! a without-replacement index sample. Encoder and decoder call the same
//! function, so the wire never carries neighbor lists and a decoder can join
//! mid-stream knowing only `k`. The flight side uses `base_seed = 0`, which
//! keeps the transform identical across process restarts.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    errors::{FountainError, Result},
    soliton::RobustSoliton,
};

/// Largest source-symbol count the 16-bit `num_source_symbols` field can
/// announce.
const MAX_SOURCE_SYMBOLS: usize = u16::MAX as usize;

/// Derive the source-symbol neighbor set for one encoded symbol.
///
/// This is the single point of truth for the LT transform; both halves of
/// the link call it with identical arguments and must never diverge.
#[must_use]
pub fn symbol_neighbors(
    distribution: &RobustSoliton,
    base_seed: u64,
    symbol_id: u32,
    k: usize,
) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(u64::from(symbol_id)));
    let degree = distribution.sample(&mut rng).min(k);
    rand::seq::index::sample(&mut rng, k, degree).into_vec()
}

fn xor_in_place(acc: &mut [u8], other: &[u8]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a ^= b;
    }
}

/// LT encoder: one per queued image, generating symbols lazily.
#[derive(Debug)]
pub struct LtEncoder {
    source_symbols: Vec<Vec<u8>>,
    symbol_size: usize,
    base_seed: u64,
    distribution: RobustSoliton,
    next_symbol_id: u32,
}

impl LtEncoder {
    /// Split `data` into `K = ⌈len/symbol_size⌉` zero-padded source symbols.
    ///
    /// # Errors
    ///
    /// - [`FountainError::EmptyData`] for an empty blob
    /// - [`FountainError::ZeroSymbolSize`] for `symbol_size == 0`
    /// - [`FountainError::TooManySourceSymbols`] if `K` exceeds the 16-bit
    ///   metadata field
    pub fn new(data: &[u8], symbol_size: usize, base_seed: u64) -> Result<Self> {
        if data.is_empty() {
            return Err(FountainError::EmptyData);
        }
        if symbol_size == 0 {
            return Err(FountainError::ZeroSymbolSize);
        }

        let k = data.len().div_ceil(symbol_size);
        if k > MAX_SOURCE_SYMBOLS {
            return Err(FountainError::TooManySourceSymbols {
                required: k,
                max: MAX_SOURCE_SYMBOLS,
            });
        }

        let source_symbols = (0..k)
            .map(|i| {
                let start = i * symbol_size;
                let end = (start + symbol_size).min(data.len());
                let mut symbol = data[start..end].to_vec();
                symbol.resize(symbol_size, 0);
                symbol
            })
            .collect();

        tracing::debug!(
            bytes = data.len(),
            k,
            symbol_size,
            base_seed,
            "lt encoder ready"
        );

        Ok(Self {
            source_symbols,
            symbol_size,
            base_seed,
            distribution: RobustSoliton::new(k),
            next_symbol_id: 0,
        })
    }

    /// Number of source symbols `K`.
    #[must_use]
    pub fn num_source_symbols(&self) -> usize {
        self.source_symbols.len()
    }

    /// Symbols handed out so far.
    #[must_use]
    pub fn symbols_generated(&self) -> u32 {
        self.next_symbol_id
    }

    /// Generate the next encoded symbol. Ids are contiguous from 0 and never
    /// repeat for one encoder; the stream itself never terminates.
    pub fn generate_symbol(&mut self) -> (u32, Vec<u8>) {
        let symbol_id = self.next_symbol_id;
        self.next_symbol_id = self.next_symbol_id.wrapping_add(1);

        let neighbors = symbol_neighbors(
            &self.distribution,
            self.base_seed,
            symbol_id,
            self.source_symbols.len(),
        );
        let mut symbol = vec![0u8; self.symbol_size];
        for idx in neighbors {
            xor_in_place(&mut symbol, &self.source_symbols[idx]);
        }
        (symbol_id, symbol)
    }

    /// `⌈K · (1 + overhead_percent/100)⌉` — how many symbols a sender should
    /// emit before moving on. The encoder itself never stops producing.
    #[must_use]
    pub fn recommended_count(&self, overhead_percent: u32) -> usize {
        let k = self.source_symbols.len();
        (k * (100 + overhead_percent as usize)).div_ceil(100)
    }
}

/// One received encoded symbol that still references undecoded sources.
#[derive(Debug)]
struct PendingSymbol {
    data: Vec<u8>,
    remaining: HashSet<usize>,
}

/// LT belief-propagation decoder.
///
/// Symbols reduce on arrival: already-decoded neighbors are XORed out
/// immediately. A symbol collapsing to a single unknown source decodes that
/// source and propagates through every stored symbol that referenced it,
/// driven by an explicit worklist so a pathological dependency graph cannot
/// grow the call stack.
#[derive(Debug)]
pub struct LtDecoder {
    k: usize,
    base_seed: u64,
    distribution: RobustSoliton,
    decoded: HashMap<usize, Vec<u8>>,
    pending: HashMap<u32, PendingSymbol>,
    seen: HashSet<u32>,
}

impl LtDecoder {
    /// Build a decoder for `k` source symbols.
    ///
    /// # Errors
    ///
    /// [`FountainError::ZeroSourceSymbols`] if `k == 0`.
    pub fn new(k: usize, base_seed: u64) -> Result<Self> {
        if k == 0 {
            return Err(FountainError::ZeroSourceSymbols);
        }
        Ok(Self {
            k,
            base_seed,
            distribution: RobustSoliton::new(k),
            decoded: HashMap::new(),
            pending: HashMap::new(),
            seen: HashSet::new(),
        })
    }

    /// Ingest one encoded symbol. Duplicates are no-ops. Returns `true` once
    /// all `k` source symbols are recovered.
    pub fn add_symbol(&mut self, symbol_id: u32, symbol_data: &[u8]) -> bool {
        if self.is_complete() || !self.seen.insert(symbol_id) {
            return self.is_complete();
        }

        let neighbors = symbol_neighbors(&self.distribution, self.base_seed, symbol_id, self.k);

        let mut data = symbol_data.to_vec();
        let mut remaining = HashSet::with_capacity(neighbors.len());
        for src in neighbors {
            if let Some(known) = self.decoded.get(&src) {
                xor_in_place(&mut data, known);
            } else {
                remaining.insert(src);
            }
        }

        match remaining.len() {
            // Every neighbor already decoded: pure redundancy
            0 => {}
            1 => {
                if let Some(&src) = remaining.iter().next() {
                    self.resolve(src, data);
                }
            }
            _ => {
                self.pending.insert(symbol_id, PendingSymbol { data, remaining });
            }
        }

        self.is_complete()
    }

    /// Record a newly decoded source symbol and propagate via a worklist.
    fn resolve(&mut self, src: usize, data: Vec<u8>) {
        let mut worklist = vec![(src, data)];

        while let Some((src, data)) = worklist.pop() {
            if self.decoded.contains_key(&src) {
                continue;
            }
            self.decoded.insert(src, data.clone());

            let mut collapsed = Vec::new();
            for (&id, symbol) in &mut self.pending {
                if symbol.remaining.remove(&src) {
                    xor_in_place(&mut symbol.data, &data);
                    if symbol.remaining.len() <= 1 {
                        collapsed.push(id);
                    }
                }
            }

            for id in collapsed {
                if let Some(symbol) = self.pending.remove(&id) {
                    if let Some(&next) = symbol.remaining.iter().next() {
                        worklist.push((next, symbol.data));
                    }
                }
            }
        }
    }

    /// True once every source symbol is recovered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.decoded.len() >= self.k
    }

    /// Decoded source symbols so far (for progress reporting).
    #[must_use]
    pub fn symbols_decoded(&self) -> usize {
        self.decoded.len()
    }

    /// Distinct encoded symbols ingested so far.
    #[must_use]
    pub fn symbols_received(&self) -> usize {
        self.seen.len()
    }

    /// The reassembled blob, truncated to `total_size`. `None` until
    /// complete.
    #[must_use]
    pub fn decoded_data(&self, total_size: usize) -> Option<Vec<u8>> {
        if !self.is_complete() {
            return None;
        }
        let mut out = Vec::with_capacity(total_size);
        for i in 0..self.k {
            out.extend_from_slice(self.decoded.get(&i)?);
        }
        out.truncate(total_size);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_blob(len: usize, seed: u64) -> Vec<u8> {
        // Cheap deterministic pseudo-random bytes
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn construction_validates_input() {
        assert!(matches!(LtEncoder::new(&[], 200, 0), Err(FountainError::EmptyData)));
        assert!(matches!(LtEncoder::new(&[1, 2, 3], 0, 0), Err(FountainError::ZeroSymbolSize)));
        assert!(matches!(LtDecoder::new(0, 0), Err(FountainError::ZeroSourceSymbols)));
    }

    #[test]
    fn source_symbol_count_and_padding() {
        let encoder = LtEncoder::new(&[0xAA; 1001], 200, 0).unwrap();
        assert_eq!(encoder.num_source_symbols(), 6);
        assert_eq!(encoder.recommended_count(25), 8); // ceil(6 * 1.25)
    }

    #[test]
    fn recommended_count_rounds_up() {
        let encoder = LtEncoder::new(&[1u8; 10 * 200], 200, 0).unwrap();
        assert_eq!(encoder.num_source_symbols(), 10);
        assert_eq!(encoder.recommended_count(25), 13); // ceil(12.5)
        assert_eq!(encoder.recommended_count(0), 10);
    }

    #[test]
    fn encoder_is_deterministic_across_instances() {
        let blob = test_blob(10_000, 42);
        let mut a = LtEncoder::new(&blob, 200, 0).unwrap();
        let mut b = LtEncoder::new(&blob, 200, 0).unwrap();
        for _ in 0..100 {
            assert_eq!(a.generate_symbol(), b.generate_symbol());
        }
    }

    #[test]
    fn different_seed_changes_symbols() {
        let blob = test_blob(2_000, 1);
        let mut a = LtEncoder::new(&blob, 200, 0).unwrap();
        let mut b = LtEncoder::new(&blob, 200, 77).unwrap();
        let differs = (0..20).any(|_| a.generate_symbol().1 != b.generate_symbol().1);
        assert!(differs);
    }

    #[test]
    fn symbol_ids_are_contiguous() {
        let mut encoder = LtEncoder::new(&[1u8; 500], 100, 0).unwrap();
        for expected in 0u32..10 {
            let (id, _) = encoder.generate_symbol();
            assert_eq!(id, expected);
        }
        assert_eq!(encoder.symbols_generated(), 10);
    }

    #[test]
    fn sequential_symbols_decode_blob() {
        // 10 kB blob, K = 50, symbols fed in id order
        let blob = test_blob(10_000, 7);
        let mut encoder = LtEncoder::new(&blob, 200, 0).unwrap();
        let k = encoder.num_source_symbols();
        assert_eq!(k, 50);

        let mut decoder = LtDecoder::new(k, 0).unwrap();
        let mut complete = false;
        for _ in 0..10 * k {
            let (id, data) = encoder.generate_symbol();
            if decoder.add_symbol(id, &data) {
                complete = true;
                break;
            }
        }
        assert!(complete, "decoder incomplete after 10x overhead");
        assert_eq!(decoder.decoded_data(blob.len()).unwrap(), blob);
    }

    #[test]
    fn lossy_channel_decodes_with_overhead() {
        // Drop two of every three symbols; the survivors still decode
        let blob = test_blob(10_000, 9);
        let mut encoder = LtEncoder::new(&blob, 200, 0).unwrap();
        let k = encoder.num_source_symbols();

        let mut decoder = LtDecoder::new(k, 0).unwrap();
        let mut complete = false;
        for i in 0..30 * k {
            let (id, data) = encoder.generate_symbol();
            if i % 3 != 0 {
                continue;
            }
            if decoder.add_symbol(id, &data) {
                complete = true;
                break;
            }
        }
        assert!(complete, "decoder incomplete on lossy channel");
        assert_eq!(decoder.decoded_data(blob.len()).unwrap(), blob);
    }

    #[test]
    fn duplicate_symbols_are_noops() {
        let blob = test_blob(2_000, 3);
        let mut encoder = LtEncoder::new(&blob, 200, 0).unwrap();
        let k = encoder.num_source_symbols();
        let symbols: Vec<_> = (0..3 * k).map(|_| encoder.generate_symbol()).collect();

        let mut decoder = LtDecoder::new(k, 0).unwrap();
        for (id, data) in &symbols {
            decoder.add_symbol(*id, data);
            decoder.add_symbol(*id, data);
        }
        assert_eq!(decoder.symbols_received(), 3 * k);
        assert!(decoder.is_complete());
        assert_eq!(decoder.decoded_data(blob.len()).unwrap(), blob);
    }

    #[test]
    fn out_of_order_ids_decode() {
        let blob = test_blob(4_000, 5);
        let mut encoder = LtEncoder::new(&blob, 200, 0).unwrap();
        let k = encoder.num_source_symbols();
        let mut symbols: Vec<_> = (0..5 * k).map(|_| encoder.generate_symbol()).collect();
        symbols.reverse();

        let mut decoder = LtDecoder::new(k, 0).unwrap();
        for (id, data) in &symbols {
            if decoder.add_symbol(*id, data) {
                break;
            }
        }
        assert!(decoder.is_complete());
        assert_eq!(decoder.decoded_data(blob.len()).unwrap(), blob);
    }

    #[test]
    fn single_source_symbol_blob() {
        let blob = b"tiny".to_vec();
        let mut encoder = LtEncoder::new(&blob, 200, 0).unwrap();
        assert_eq!(encoder.num_source_symbols(), 1);

        let mut decoder = LtDecoder::new(1, 0).unwrap();
        let (id, data) = encoder.generate_symbol();
        assert!(decoder.add_symbol(id, &data));
        assert_eq!(decoder.decoded_data(blob.len()).unwrap(), blob);
    }

    #[test]
    fn truncation_strips_padding() {
        let blob = test_blob(950, 11); // pads to 1000
        let mut encoder = LtEncoder::new(&blob, 100, 0).unwrap();
        let k = encoder.num_source_symbols();

        let mut decoder = LtDecoder::new(k, 0).unwrap();
        for _ in 0..10 * k {
            let (id, data) = encoder.generate_symbol();
            if decoder.add_symbol(id, &data) {
                break;
            }
        }
        let decoded = decoder.decoded_data(blob.len()).unwrap();
        assert_eq!(decoded.len(), 950);
        assert_eq!(decoded, blob);
    }

    #[test]
    fn neighbor_derivation_matches_between_sides() {
        let dist = RobustSoliton::new(50);
        for id in 0..500u32 {
            let enc = symbol_neighbors(&dist, 0, id, 50);
            let dec = symbol_neighbors(&dist, 0, id, 50);
            assert_eq!(enc, dec);
        }
    }
}
