//! Platform-agnostic types for the telemetry agent.
//!
//! This crate provides the types shared by the agent (telemetry-core,
//! telemetry-service) and by anything that consumes its history feed, such as
//! a dashboard client or a test harness.
//!
//! # Features
//!
//! - Rolling statistics and ring fill-state types
//! - Snapshot field selection and temperature units
//! - The flat, stream-major text encoding of history ([`wire`])
//! - Error types for decoding that encoding
//!
//! # Example
//!
//! ```
//! use telemetry_types::wire;
//!
//! // Two value streams plus the time stream = three streams on the wire
//! let columns = wire::decode_streams("10,20,100,200,1,2,", 3).unwrap();
//! assert_eq!(columns[1], vec![100.0, 200.0]);
//! ```

pub mod error;
pub mod types;
pub mod wire;

pub use error::{ParseError, ParseResult};
pub use types::{FillState, SnapshotField, Statistics, TemperatureUnit};

/// Name reserved for the timestamp stream.
///
/// The time stream is always the last stream on the wire; no value stream
/// may use this name.
pub const TIME_STREAM: &str = "time";

/// Canonical form of a stream name for comparisons: trimmed and lowercased.
///
/// Every lookup, duplicate check and reserved-name check goes through this,
/// so two names are the same stream exactly when their keys are equal.
///
/// ```
/// use telemetry_types::stream_key;
///
/// assert_eq!(stream_key(" Temperature "), "temperature");
/// assert_eq!(stream_key("ÉCLAIRAGE"), stream_key("éclairage"));
/// ```
#[must_use]
pub fn stream_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether `name` refers to the reserved time stream.
#[must_use]
pub fn is_reserved_stream_name(name: &str) -> bool {
    stream_key(name) == TIME_STREAM
}
