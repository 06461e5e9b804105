//! Sliding-window statistics for a single sensor stream.
//!
//! A [`StreamTracker`] owns a fixed-size sample ring. Every call to
//! [`StreamTracker::track`] overwrites the oldest slot and recomputes
//! min/max/average over the valid part of the ring, so the reported
//! statistics always describe exactly the last `min(n, capacity)` samples.
//!
//! # Example
//!
//! ```
//! use telemetry_core::StreamTracker;
//!
//! let mut tracker = StreamTracker::new(3).unwrap();
//! for v in [1.0, 2.0, 3.0] {
//!     tracker.track(v);
//! }
//! assert_eq!(tracker.min(), 1.0);
//! assert_eq!(tracker.average(), 2.0);
//!
//! tracker.track(4.0); // evicts 1.0
//! assert_eq!(tracker.min(), 2.0);
//! assert_eq!(tracker.max(), 4.0);
//! ```

use telemetry_types::{FillState, Statistics};

use crate::error::{Error, Result};

/// Rolling current/min/max/average over the last `capacity` samples.
///
/// Input is not validated: a non-finite sample is stored like any other and
/// shows up in the statistics until it is evicted. Keeping input finite is
/// the caller's job.
#[derive(Debug, Clone)]
pub struct StreamTracker {
    samples: Box<[f32]>,
    cursor: usize,
    full: bool,
    current: f32,
    min: f32,
    max: f32,
    average: f32,
}

impl StreamTracker {
    /// Create a tracker holding up to `capacity` samples.
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity { what: "window" });
        }
        Ok(Self {
            samples: vec![0.0; capacity].into_boxed_slice(),
            cursor: 0,
            full: false,
            current: 0.0,
            min: 0.0,
            max: 0.0,
            average: 0.0,
        })
    }

    /// Record a sample and recompute the window statistics.
    pub fn track(&mut self, value: f32) {
        self.current = value;

        self.samples[self.cursor] = value;
        self.cursor += 1;
        if self.cursor >= self.samples.len() {
            self.cursor = 0;
            self.full = true;
        }

        // Window order does not matter for min/max/sum, so scan the slots directly
        let valid = &self.samples[..self.len()];
        let Some((&first, rest)) = valid.split_first() else {
            return;
        };

        let mut min = first;
        let mut max = first;
        let mut sum = f64::from(first);
        for &v in rest {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
            sum += f64::from(v);
        }

        self.min = min;
        self.max = max;
        self.average = (sum / valid.len() as f64) as f32;
    }

    /// Maximum number of samples in the window.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples currently in the window.
    pub fn len(&self) -> usize {
        if self.full {
            self.samples.len()
        } else {
            self.cursor
        }
    }

    /// Whether no sample has been tracked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the window has wrapped at least once.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Current fill state of the window.
    pub fn state(&self) -> FillState {
        FillState::from_ring(self.cursor, self.full)
    }

    /// Most recently tracked sample.
    ///
    /// Meaningless before the first [`track`](Self::track); prefer
    /// [`stats`](Self::stats) when the tracker may be empty.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Smallest sample in the window.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Largest sample in the window.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Mean of the window, accumulated in double precision.
    pub fn average(&self) -> f32 {
        self.average
    }

    /// All statistics at once, or `None` if nothing has been tracked.
    pub fn stats(&self) -> Option<Statistics> {
        if self.is_empty() {
            return None;
        }
        Some(Statistics {
            current: self.current,
            min: self.min,
            max: self.max,
            average: self.average,
        })
    }

    /// Samples in the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = f32> + '_ {
        let len = self.len();
        let start = if self.full { self.cursor } else { 0 };
        let capacity = self.samples.len();
        (0..len).map(move |i| self.samples[(start + i) % capacity])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(capacity: usize, values: &[f32]) -> StreamTracker {
        let mut tracker = StreamTracker::new(capacity).unwrap();
        for v in values {
            tracker.track(*v);
        }
        tracker
    }

    // --- Construction tests ---

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            StreamTracker::new(0).unwrap_err(),
            Error::ZeroCapacity { what: "window" }
        );
    }

    #[test]
    fn test_new_tracker_is_empty() {
        let tracker = StreamTracker::new(5).unwrap();
        assert_eq!(tracker.capacity(), 5);
        assert_eq!(tracker.len(), 0);
        assert!(tracker.is_empty());
        assert!(!tracker.is_full());
        assert_eq!(tracker.state(), FillState::Empty);
        assert!(tracker.stats().is_none());
        assert_eq!(tracker.window().count(), 0);
    }

    // --- Window statistics tests ---

    #[test]
    fn test_single_sample_window() {
        let tracker = tracker_with(10, &[7.25]);
        assert_eq!(tracker.stats(), Some(Statistics::single(7.25)));
        assert_eq!(tracker.state(), FillState::Filling);
    }

    #[test]
    fn test_three_sample_scenario() {
        let mut tracker = tracker_with(3, &[1.0, 2.0, 3.0]);
        assert_eq!(tracker.min(), 1.0);
        assert_eq!(tracker.max(), 3.0);
        assert_eq!(tracker.average(), 2.0);
        assert!(tracker.is_full());

        tracker.track(4.0);
        assert_eq!(tracker.current(), 4.0);
        assert_eq!(tracker.min(), 2.0);
        assert_eq!(tracker.max(), 4.0);
        assert!((tracker.average() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_window_ignores_unwritten_slots() {
        // Unwritten slots hold 0.0 and must not pull min down
        let tracker = tracker_with(8, &[5.0, 6.0]);
        assert_eq!(tracker.min(), 5.0);
        assert_eq!(tracker.max(), 6.0);
        assert_eq!(tracker.average(), 5.5);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_capacity_one_always_reports_last_sample() {
        let mut tracker = StreamTracker::new(1).unwrap();
        tracker.track(3.0);
        assert!(tracker.is_full());
        tracker.track(-1.5);
        assert_eq!(tracker.stats(), Some(Statistics::single(-1.5)));
    }

    #[test]
    fn test_identical_values_have_zero_spread() {
        let tracker = tracker_with(4, &[2.5, 2.5, 2.5, 2.5, 2.5]);
        let stats = tracker.stats().unwrap();
        assert_eq!(stats.spread(), 0.0);
        assert_eq!(stats.average, 2.5);
    }

    #[test]
    fn test_window_is_chronological_after_wrap() {
        let tracker = tracker_with(3, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(tracker.window().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_full_state_is_sticky() {
        let mut tracker = tracker_with(2, &[1.0, 2.0]);
        assert_eq!(tracker.state(), FillState::Full);
        for v in 0..10 {
            tracker.track(v as f32);
            assert_eq!(tracker.state(), FillState::Full);
            assert_eq!(tracker.len(), 2);
        }
    }

    #[test]
    fn test_large_window_average_is_stable() {
        let mut tracker = StreamTracker::new(10_000).unwrap();
        for i in 0..10_000 {
            tracker.track(100_000.0 + (i % 2) as f32 * 0.5);
        }
        assert!((tracker.average() - 100_000.25).abs() < 0.01);
    }

    #[test]
    fn test_non_finite_sample_persists_until_evicted() {
        let mut tracker = tracker_with(2, &[1.0, f32::INFINITY]);
        assert_eq!(tracker.max(), f32::INFINITY);
        assert!(tracker.average().is_infinite());

        tracker.track(2.0);
        assert_eq!(tracker.max(), f32::INFINITY);

        tracker.track(3.0);
        assert_eq!(tracker.max(), 3.0);
        assert_eq!(tracker.average(), 2.5);
    }
}
