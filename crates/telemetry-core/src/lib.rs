//! Core measurement library for the telemetry agent.
//!
//! This crate turns raw sensor samples into the data the agent publishes:
//! per-stream rolling statistics and a time-correlated history that can be
//! rendered into one flat text payload.
//!
//! # Features
//!
//! - **Rolling statistics**: [`StreamTracker`] keeps a sliding window and
//!   exposes current, min, max and average after every sample
//! - **History**: [`HistoryStore`] records synchronized rows across named
//!   streams in a fixed-capacity ring
//! - **Serialization**: stream-major, comma-delimited text, oldest first
//! - **Shared access**: [`SharedHistory`] serializes writers and readers so a
//!   reader never sees a partially written row
//! - **Derived streams**: dew point from temperature and humidity
//! - **Sources**: the [`SensorSource`] trait plus simulated and scripted
//!   implementations
//!
//! # Quick Start
//!
//! ```
//! use telemetry_core::{HistoryStore, StreamTracker};
//!
//! let mut temperature = StreamTracker::new(4).unwrap();
//! let mut humidity = StreamTracker::new(4).unwrap();
//! let mut history = HistoryStore::new(["temperature", "humidity"], 60).unwrap();
//!
//! temperature.track(21.5);
//! humidity.track(40.0);
//!
//! history
//!     .snapshot(&[temperature.current(), humidity.current()], 1)
//!     .unwrap();
//!
//! assert_eq!(history.serialize(), "21.5,40,1,");
//! ```

pub mod derived;
pub mod error;
pub mod history;
pub mod shared;
pub mod simulated;
pub mod source;
pub mod tracker;

// Re-export the shared types so consumers need only one dependency
pub use telemetry_types::types;
pub use telemetry_types::wire;
pub use telemetry_types::{
    FillState, ParseError, SnapshotField, Statistics, TIME_STREAM, TemperatureUnit,
    is_reserved_stream_name, stream_key,
};

pub use derived::{Derivation, dew_point};
pub use error::{Error, Result};
pub use history::{HistoryColumns, HistoryStore, HistorySummary, StreamColumn};
pub use shared::SharedHistory;
pub use simulated::{ScriptedSource, SimulatedSource};
pub use source::SensorSource;
pub use tracker::StreamTracker;
