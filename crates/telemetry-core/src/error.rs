//! Error types for telemetry-core.
//!
//! The core performs pure in-memory work, so its errors fall into two groups
//! and none of them is worth retrying:
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`Error::ZeroCapacity`] | constructors | Ring sized to zero, fix configuration |
//! | [`Error::NoStreams`] | [`HistoryStore::new`](crate::HistoryStore::new) | Nothing to record |
//! | [`Error::InvalidStreamName`] | [`HistoryStore::new`](crate::HistoryStore::new) | Empty or reserved name |
//! | [`Error::DuplicateStream`] | [`HistoryStore::new`](crate::HistoryStore::new) | Two streams share a name |
//! | [`Error::StreamCountMismatch`] | [`HistoryStore::snapshot`](crate::HistoryStore::snapshot) | Row has the wrong width, buffer untouched |
//! | [`Error::UnknownStream`] | derivations | Input index outside the row |
//! | [`Error::InvalidSource`] | [`SimulatedSource::new`](crate::SimulatedSource::new) | Non-finite baseline or amplitude |
//! | [`Error::Source`] | [`SensorSource`](crate::SensorSource) | A sensor read failed; the caller decides whether to poll again |
//!
//! Non-finite samples are not an error. They are accepted as-is and flow
//! into the statistics until the window rotates past them.

use thiserror::Error;

/// Errors that can occur in the tracking and history core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A ring buffer was sized to zero.
    #[error("Invalid capacity: {what} must be at least 1")]
    ZeroCapacity {
        /// Which capacity was zero.
        what: &'static str,
    },

    /// A history store was created without value streams.
    #[error("History requires at least one stream")]
    NoStreams,

    /// A stream name is empty or reserved.
    #[error("Invalid stream name '{0}'")]
    InvalidStreamName(String),

    /// Two streams share a name (case-insensitive).
    #[error("Duplicate stream name '{0}'")]
    DuplicateStream(String),

    /// A snapshot row does not have one value per stream.
    #[error("Snapshot has {actual} values, expected {expected}")]
    StreamCountMismatch {
        /// Number of value streams in the store.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A derivation referenced a stream outside the snapshot row.
    #[error("Unknown stream index {index} (row has {width} values)")]
    UnknownStream {
        /// Referenced index.
        index: usize,
        /// Width of the row that was supplied.
        width: usize,
    },

    /// A sensor source was configured with unusable parameters.
    #[error("Invalid source '{name}': {reason}")]
    InvalidSource {
        /// Source name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A sensor source failed to produce a sample.
    #[error("Sensor read failed: {0}")]
    Source(String),
}

/// Result type alias using telemetry-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::ZeroCapacity { what: "window" }.to_string(),
            "Invalid capacity: window must be at least 1"
        );
        assert_eq!(
            Error::StreamCountMismatch {
                expected: 3,
                actual: 2
            }
            .to_string(),
            "Snapshot has 2 values, expected 3"
        );
        assert_eq!(
            Error::DuplicateStream("temp".to_string()).to_string(),
            "Duplicate stream name 'temp'"
        );
    }

    #[test]
    fn test_error_debug() {
        let err = Error::Source("i2c timeout".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Source"));
        assert!(debug_str.contains("i2c timeout"));
    }
}
