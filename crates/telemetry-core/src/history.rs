//! Fixed-capacity, time-correlated history of several streams.
//!
//! [`HistoryStore`] keeps one row per snapshot: a value for every named
//! stream plus a timestamp. All streams live in a single stream-major buffer
//! behind one write index, so slot `i` of every stream and of the time stream
//! always belongs to the same snapshot. Once the ring is full, each snapshot
//! overwrites the oldest row.
//!
//! # Wire format
//!
//! [`HistoryStore::serialize`] renders the whole history with
//! [`telemetry_types::wire`]: every value of stream 0 oldest-first, then
//! stream 1, ..., then the time stream, each token followed by a comma.
//!
//! ```
//! use telemetry_core::HistoryStore;
//!
//! let mut history = HistoryStore::new(["a", "b"], 2).unwrap();
//! history.snapshot(&[10.0, 100.0], 1).unwrap();
//! history.snapshot(&[20.0, 200.0], 2).unwrap();
//! assert_eq!(history.serialize(), "10,20,100,200,1,2,");
//! ```

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use telemetry_types::{FillState, is_reserved_stream_name, stream_key, wire};

use crate::error::{Error, Result};

/// Typical encoded token length, used to pre-size the serialize buffer.
const TYPICAL_TOKEN_LEN: usize = 8;

/// Ring buffer of synchronized rows across named streams.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    names: Box<[String]>,
    /// Stream-major: stream `s` occupies `values[s * capacity..(s + 1) * capacity]`.
    values: Box<[f32]>,
    timestamps: Box<[u64]>,
    capacity: usize,
    write_index: usize,
    filled: bool,
    decimals: usize,
}

impl HistoryStore {
    /// Create a store for the given value streams with room for `capacity` rows.
    ///
    /// Stream names must be non-empty, unique (case-insensitive) and must not
    /// be the reserved time stream name. The time stream is added implicitly.
    pub fn new<I, S>(names: I, capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if capacity == 0 {
            return Err(Error::ZeroCapacity { what: "history" });
        }
        if names.is_empty() {
            return Err(Error::NoStreams);
        }

        let mut seen = HashSet::new();
        for name in &names {
            let key = stream_key(name);
            if key.is_empty() || is_reserved_stream_name(name) {
                return Err(Error::InvalidStreamName(name.clone()));
            }
            if !seen.insert(key) {
                return Err(Error::DuplicateStream(name.clone()));
            }
        }

        let stream_count = names.len();
        Ok(Self {
            names: names.into_boxed_slice(),
            values: vec![0.0; stream_count * capacity].into_boxed_slice(),
            timestamps: vec![0; capacity].into_boxed_slice(),
            capacity,
            write_index: 0,
            filled: false,
            decimals: wire::DEFAULT_DECIMALS,
        })
    }

    /// Set the number of fractional digits written by [`serialize`](Self::serialize).
    ///
    /// Values above [`wire::MAX_DECIMALS`] are clamped.
    #[must_use]
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals.min(wire::MAX_DECIMALS);
        self
    }

    /// Append one row: a value per stream, in stream order, plus its timestamp.
    ///
    /// Returns [`Error::StreamCountMismatch`] without touching the buffer if
    /// `values` does not hold exactly one value per stream.
    pub fn snapshot(&mut self, values: &[f32], timestamp: u64) -> Result<()> {
        if values.len() != self.names.len() {
            return Err(Error::StreamCountMismatch {
                expected: self.names.len(),
                actual: values.len(),
            });
        }

        let slot = self.write_index;
        for (stream, value) in values.iter().enumerate() {
            self.values[stream * self.capacity + slot] = *value;
        }
        self.timestamps[slot] = timestamp;

        self.write_index += 1;
        if self.write_index >= self.capacity {
            self.write_index = 0;
            if !self.filled {
                debug!(
                    capacity = self.capacity,
                    "History ring wrapped, oldest rows will now be overwritten"
                );
            }
            self.filled = true;
        }

        Ok(())
    }

    /// Render the full history as one flat, stream-major token sequence.
    ///
    /// Read-only: calling it twice without a snapshot in between yields
    /// identical output.
    pub fn serialize(&self) -> String {
        let rows = self.len();
        let mut out = String::with_capacity(rows * self.wire_stream_count() * TYPICAL_TOKEN_LEN);

        for stream in 0..self.names.len() {
            let column = self.column_slots(stream);
            for slot in self.chronological_slots() {
                wire::push_value(&mut out, column[slot], self.decimals);
            }
        }
        for slot in self.chronological_slots() {
            wire::push_timestamp(&mut out, self.timestamps[slot]);
        }

        out
    }

    /// Copy the history out as one vector per stream, oldest row first.
    pub fn columns(&self) -> HistoryColumns {
        let streams = (0..self.names.len())
            .map(|stream| {
                let column = self.column_slots(stream);
                StreamColumn {
                    name: self.names[stream].clone(),
                    values: self.chronological_slots().map(|slot| column[slot]).collect(),
                }
            })
            .collect();

        HistoryColumns {
            streams,
            time: self
                .chronological_slots()
                .map(|slot| self.timestamps[slot])
                .collect(),
        }
    }

    /// Names of the value streams, in wire order.
    pub fn stream_names(&self) -> &[String] {
        &self.names
    }

    /// Number of value streams (time stream excluded).
    pub fn stream_count(&self) -> usize {
        self.names.len()
    }

    /// Number of streams on the wire, time stream included.
    ///
    /// This is the count a consumer needs to de-interleave
    /// [`serialize`](Self::serialize) output.
    pub fn wire_stream_count(&self) -> usize {
        self.names.len() + 1
    }

    /// Maximum number of rows kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows currently held.
    pub fn len(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.write_index
        }
    }

    /// Whether no snapshot has been taken yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ring has wrapped at least once.
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Current fill state of the ring.
    pub fn state(&self) -> FillState {
        FillState::from_ring(self.write_index, self.filled)
    }

    /// Fractional digits used on the wire.
    pub fn decimals(&self) -> usize {
        self.decimals
    }

    /// Timestamp of the newest row, if any.
    pub fn latest_timestamp(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        let newest = (self.write_index + self.capacity - 1) % self.capacity;
        Some(self.timestamps[newest])
    }

    /// Summary of the store's shape and fill level.
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            streams: self.names.to_vec(),
            wire_streams: self.wire_stream_count(),
            capacity: self.capacity,
            len: self.len(),
            state: self.state(),
            latest_timestamp: self.latest_timestamp(),
        }
    }

    fn column_slots(&self, stream: usize) -> &[f32] {
        &self.values[stream * self.capacity..(stream + 1) * self.capacity]
    }

    /// Slot indices from oldest to newest row.
    fn chronological_slots(&self) -> impl Iterator<Item = usize> {
        let len = self.len();
        let start = if self.filled { self.write_index } else { 0 };
        let capacity = self.capacity;
        (0..len).map(move |i| (start + i) % capacity)
    }
}

/// One stream of a [`HistoryColumns`] copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamColumn {
    /// Stream name.
    pub name: String,
    /// Values, oldest first.
    pub values: Vec<f32>,
}

/// Column-oriented copy of a [`HistoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryColumns {
    /// Value streams in wire order.
    pub streams: Vec<StreamColumn>,
    /// Timestamps, oldest first.
    pub time: Vec<u64>,
}

/// Shape and fill level of a [`HistoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Value stream names in wire order.
    pub streams: Vec<String>,
    /// Streams on the wire, time stream included.
    pub wire_streams: usize,
    /// Maximum rows kept.
    pub capacity: usize,
    /// Rows currently held.
    pub len: usize,
    /// Ring fill state.
    pub state: FillState,
    /// Timestamp of the newest row.
    pub latest_timestamp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_streams(capacity: usize) -> HistoryStore {
        HistoryStore::new(["temperature", "humidity"], capacity).unwrap()
    }

    // --- Construction tests ---

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert_eq!(
            HistoryStore::new(["a"], 0).unwrap_err(),
            Error::ZeroCapacity { what: "history" }
        );
    }

    #[test]
    fn test_new_rejects_no_streams() {
        let names: [&str; 0] = [];
        assert_eq!(HistoryStore::new(names, 4).unwrap_err(), Error::NoStreams);
    }

    #[test]
    fn test_new_rejects_reserved_and_empty_names() {
        assert!(matches!(
            HistoryStore::new(["a", "Time"], 4),
            Err(Error::InvalidStreamName(_))
        ));
        assert!(matches!(
            HistoryStore::new(["a", "  "], 4),
            Err(Error::InvalidStreamName(_))
        ));
    }

    #[test]
    fn test_new_rejects_padded_duplicates_and_reserved_names() {
        assert_eq!(
            HistoryStore::new(["a", "a "], 4).unwrap_err(),
            Error::DuplicateStream("a ".to_string())
        );
        assert!(matches!(
            HistoryStore::new(["a", " time"], 4),
            Err(Error::InvalidStreamName(_))
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_names_case_insensitive() {
        assert_eq!(
            HistoryStore::new(["Light", "light"], 4).unwrap_err(),
            Error::DuplicateStream("light".to_string())
        );
    }

    #[test]
    fn test_new_store_is_empty() {
        let history = two_streams(3);
        assert_eq!(history.stream_count(), 2);
        assert_eq!(history.wire_stream_count(), 3);
        assert_eq!(history.capacity(), 3);
        assert!(history.is_empty());
        assert_eq!(history.state(), FillState::Empty);
        assert_eq!(history.latest_timestamp(), None);
        assert_eq!(history.serialize(), "");
    }

    // --- Snapshot tests ---

    #[test]
    fn test_snapshot_rejects_wrong_width_and_leaves_buffer_untouched() {
        let mut history = two_streams(3);
        history.snapshot(&[1.0, 2.0], 10).unwrap();
        let before = history.serialize();

        assert_eq!(
            history.snapshot(&[1.0], 11).unwrap_err(),
            Error::StreamCountMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            history.snapshot(&[1.0, 2.0, 3.0], 11).unwrap_err(),
            Error::StreamCountMismatch {
                expected: 2,
                actual: 3
            }
        );

        assert_eq!(history.len(), 1);
        assert_eq!(history.serialize(), before);
        assert_eq!(history.latest_timestamp(), Some(10));
    }

    #[test]
    fn test_state_transitions() {
        let mut history = two_streams(2);
        assert_eq!(history.state(), FillState::Empty);
        history.snapshot(&[0.0, 0.0], 1).unwrap();
        assert_eq!(history.state(), FillState::Filling);
        history.snapshot(&[0.0, 0.0], 2).unwrap();
        assert_eq!(history.state(), FillState::Full);
        history.snapshot(&[0.0, 0.0], 3).unwrap();
        assert_eq!(history.state(), FillState::Full);
        assert_eq!(history.len(), 2);
    }

    // --- Serialize tests ---

    #[test]
    fn test_serialize_dashboard_scenario() {
        let mut history = HistoryStore::new(["s0", "s1"], 2).unwrap();
        history.snapshot(&[10.0, 100.0], 1).unwrap();
        history.snapshot(&[20.0, 200.0], 2).unwrap();
        assert_eq!(history.serialize(), "10,20,100,200,1,2,");
    }

    #[test]
    fn test_serialize_partial_fill_uses_valid_prefix() {
        let mut history = two_streams(5);
        history.snapshot(&[1.5, 40.0], 100).unwrap();
        history.snapshot(&[2.5, 41.0], 160).unwrap();
        assert_eq!(history.serialize(), "1.5,2.5,40,41,100,160,");
    }

    #[test]
    fn test_serialize_after_wrap_is_oldest_first() {
        let mut history = two_streams(3);
        for t in 1..=5u64 {
            history.snapshot(&[t as f32, t as f32 * 10.0], t).unwrap();
        }
        assert_eq!(history.serialize(), "3,4,5,30,40,50,3,4,5,");
        assert_eq!(history.latest_timestamp(), Some(5));
    }

    #[test]
    fn test_serialize_is_idempotent() {
        let mut history = two_streams(4);
        for t in 0..6u64 {
            history.snapshot(&[t as f32 * 0.1, 50.0 - t as f32], t).unwrap();
        }
        assert_eq!(history.serialize(), history.serialize());
    }

    #[test]
    fn test_serialize_respects_decimals() {
        let mut history = HistoryStore::new(["v"], 2).unwrap().with_decimals(1);
        history.snapshot(&[1.26], 1).unwrap();
        assert_eq!(history.serialize(), "1.3,1,");

        let clamped = HistoryStore::new(["v"], 2).unwrap().with_decimals(40);
        assert_eq!(clamped.decimals(), wire::MAX_DECIMALS);
    }

    #[test]
    fn test_serialize_non_finite_as_null() {
        let mut history = two_streams(2);
        history.snapshot(&[f32::NAN, 1.0], 7).unwrap();
        assert_eq!(history.serialize(), "null,1,7,");
    }

    #[test]
    fn test_serialize_round_trip_through_wire_decoder() {
        let mut history = HistoryStore::new(["a", "b", "c"], 4).unwrap();
        for t in 0..7u64 {
            let row = [t as f32, t as f32 + 0.5, -(t as f32)];
            history.snapshot(&row, 1000 + t).unwrap();
        }

        let columns =
            wire::decode_streams(&history.serialize(), history.wire_stream_count()).unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0], vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(columns[1], vec![3.5, 4.5, 5.5, 6.5]);
        assert_eq!(columns[2], vec![-3.0, -4.0, -5.0, -6.0]);
        assert_eq!(columns[3], vec![1003.0, 1004.0, 1005.0, 1006.0]);
    }

    // --- Columns and summary tests ---

    #[test]
    fn test_columns_match_serialize_order() {
        let mut history = two_streams(2);
        history.snapshot(&[1.0, 2.0], 1).unwrap();
        history.snapshot(&[3.0, 4.0], 2).unwrap();
        history.snapshot(&[5.0, 6.0], 3).unwrap();

        let columns = history.columns();
        assert_eq!(columns.streams[0].name, "temperature");
        assert_eq!(columns.streams[0].values, vec![3.0, 5.0]);
        assert_eq!(columns.streams[1].values, vec![4.0, 6.0]);
        assert_eq!(columns.time, vec![2, 3]);
    }

    #[test]
    fn test_summary_serialization() {
        let mut history = two_streams(2);
        history.snapshot(&[1.0, 2.0], 42).unwrap();

        let json = serde_json::to_value(history.summary()).unwrap();
        assert_eq!(json["wire_streams"], 3);
        assert_eq!(json["len"], 1);
        assert_eq!(json["state"], "filling");
        assert_eq!(json["latest_timestamp"], 42);
    }
}
