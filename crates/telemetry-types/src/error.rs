//! Error types for decoding wire data in telemetry-types.

use thiserror::Error;

/// Errors that can occur when decoding a serialized history response.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Generic invalid input.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The payload did not end with the token delimiter.
    #[error("Missing trailing delimiter")]
    MissingTrailingDelimiter,

    /// A token could not be parsed as a number.
    #[error("Invalid token {token:?} at position {index}")]
    InvalidToken {
        /// Zero-based token position.
        index: usize,
        /// The offending token text.
        token: String,
    },

    /// The token count is not a multiple of the stream count.
    #[error("{tokens} tokens cannot be split evenly into {streams} streams")]
    Misaligned {
        /// Number of decoded tokens.
        tokens: usize,
        /// Number of streams the caller expected.
        streams: usize,
    },
}

/// Result type alias using telemetry-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
