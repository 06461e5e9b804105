//! In-process sensor sources for running without hardware and for tests.
//!
//! - [`SimulatedSource`] wanders randomly around a baseline, with optional
//!   failure injection and latency.
//! - [`ScriptedSource`] replays a fixed sequence of samples.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::{Error, Result};
use crate::source::SensorSource;

/// Fraction of the amplitude a simulated value may move per read.
const STEP_FRACTION: f32 = 0.1;

/// A sensor that performs a bounded random walk around a baseline.
///
/// # Example
///
/// ```
/// use telemetry_core::{SensorSource, SimulatedSource};
///
/// #[tokio::main]
/// async fn main() {
///     let source = SimulatedSource::new("temperature", 21.0, 0.5).unwrap();
///     let value = source.read().await.unwrap();
///     assert!((20.5..=21.5).contains(&value));
/// }
/// ```
pub struct SimulatedSource {
    name: String,
    baseline: f32,
    amplitude: f32,
    value: Mutex<f32>,
    read_count: AtomicU32,
    should_fail: AtomicBool,
    /// Number of reads still to fail before succeeding again.
    remaining_failures: AtomicU32,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
}

impl std::fmt::Debug for SimulatedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedSource")
            .field("name", &self.name)
            .field("baseline", &self.baseline)
            .field("amplitude", &self.amplitude)
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl SimulatedSource {
    /// Create a source that stays within `baseline ± amplitude`.
    ///
    /// Returns [`Error::InvalidSource`] if either parameter is not finite, or
    /// if the bounds overflow `f32`.
    pub fn new(name: &str, baseline: f32, amplitude: f32) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSource {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if !baseline.is_finite() {
            return Err(invalid("baseline must be finite"));
        }
        if !amplitude.is_finite() {
            return Err(invalid("amplitude must be finite"));
        }
        let amplitude = amplitude.abs();
        if !(baseline - amplitude).is_finite() || !(baseline + amplitude).is_finite() {
            return Err(invalid("baseline ± amplitude must stay finite"));
        }

        Ok(Self {
            name: name.to_string(),
            baseline,
            amplitude,
            value: Mutex::new(baseline),
            read_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            remaining_failures: AtomicU32::new(0),
            read_latency_ms: AtomicU64::new(0),
        })
    }

    /// Make every read fail until cleared.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` reads, then recover.
    pub fn fail_next(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Delay every read by `latency`.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of read attempts so far, failed ones included.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    fn take_failure(&self) -> bool {
        if self.should_fail.load(Ordering::Relaxed) {
            return true;
        }
        self.remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    fn next_value(&self) -> f32 {
        let step = self.amplitude * STEP_FRACTION;
        let delta = rand::rng().random_range(-step..=step);

        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = (*value + delta).clamp(self.baseline - self.amplitude, self.baseline + self.amplitude);
        *value
    }
}

#[async_trait]
impl SensorSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<f32> {
        self.read_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.take_failure() {
            return Err(Error::Source(format!("{}: simulated failure", self.name)));
        }

        Ok(self.next_value())
    }
}

/// A sensor that replays a fixed sequence of samples, cycling at the end.
#[derive(Debug)]
pub struct ScriptedSource {
    name: String,
    values: Vec<f32>,
    position: AtomicUsize,
}

impl ScriptedSource {
    /// Create a source replaying `values`.
    ///
    /// An empty script makes every read fail.
    pub fn new(name: &str, values: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            values,
            position: AtomicUsize::new(0),
        }
    }

    /// Number of samples handed out so far.
    pub fn reads(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SensorSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<f32> {
        if self.values.is_empty() {
            return Err(Error::Source(format!("{}: empty script", self.name)));
        }
        let n = self.position.fetch_add(1, Ordering::Relaxed);
        Ok(self.values[n % self.values.len()])
    }
}
