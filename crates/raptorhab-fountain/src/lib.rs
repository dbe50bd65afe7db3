//! Fountain coding for the RaptorHAB image link.
//!
//! An image blob becomes an unbounded lazy stream of `(symbol_id, bytes)`
//! pairs; any sufficiently large subset of distinct symbols reconstructs the
//! blob. Nothing is acknowledged and nothing is retransmitted — the stream
//! itself is the redundancy.
//!
//! Two interchangeable back-ends sit behind the [`FountainEncoder`] /
//! [`FountainDecoder`] variants:
//!
//! - **LT** (Luby Transform): each symbol is the XOR of a pseudo-random
//!   subset of source symbols, with subset degree drawn from the Robust
//!   Soliton distribution. The subset is derived deterministically from the
//!   symbol id alone, so the wire carries no neighbor lists. Decoding is
//!   belief propagation. Typical overhead 5-25%.
//! - **RaptorQ** (RFC 6330, via the `raptorq` crate): symbols are
//!   codec-native packets whose first four bytes carry the ESI. Overhead is
//!   near zero at the cost of a heavier solve.
//!
//! A deployment picks one codec in configuration; the two are mutually
//! incompatible on-air and the wire format does not distinguish them.

mod codec;
mod errors;
mod lt;
mod rq;
mod soliton;

pub use codec::{FountainCodec, FountainDecoder, FountainEncoder};
pub use errors::{FountainError, Result};
pub use lt::{LtDecoder, LtEncoder, symbol_neighbors};
pub use rq::{RaptorQDecoder, RaptorQEncoder};
pub use soliton::RobustSoliton;
