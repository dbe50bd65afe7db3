//! Error types for fountain encoder/decoder construction.
//!
//! Symbol generation and ingestion are infallible once a codec is
//! constructed; everything that can go wrong is checked up front.

use thiserror::Error;

/// Result alias for fountain operations.
pub type Result<T> = std::result::Result<T, FountainError>;

/// Errors raised when constructing a fountain encoder or decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FountainError {
    /// The input blob is empty; there is nothing to encode.
    #[error("cannot encode empty data")]
    EmptyData,

    /// A symbol size of zero is meaningless.
    #[error("symbol size must be non-zero")]
    ZeroSymbolSize,

    /// A decoder cannot be built for zero source symbols.
    #[error("source symbol count must be non-zero")]
    ZeroSourceSymbols,

    /// The blob needs more source symbols than the metadata field can carry.
    #[error("data requires {required} source symbols, wire limit is {max}")]
    TooManySourceSymbols {
        /// Source symbols the blob would need
        required: usize,
        /// Largest count representable in `IMAGE_META`
        max: usize,
    },

    /// Symbol size exceeds what the codec packet format can address.
    #[error("symbol size {size} exceeds codec limit {max}")]
    SymbolSizeTooLarge {
        /// Requested symbol size
        size: usize,
        /// Codec limit
        max: usize,
    },
}
