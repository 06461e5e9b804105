//! Application state shared across handlers and collector tasks.
//!
//! # Lock Ordering
//!
//! When more than one lock is needed, acquire in this order:
//! 1. `trackers`
//! 2. `history`
//! 3. `collector.stream_stats`
//!
//! The snapshot path copies tracker values into a row and releases the
//! trackers lock before it takes the history lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

use telemetry_core::{
    Derivation, Error, HistoryStore, SharedHistory, SnapshotField, StreamTracker, stream_key,
};

use crate::config::{ClockSource, Config, SourceConfig};

/// Shared application state.
pub struct AppState {
    /// Configuration, fixed for the lifetime of the process.
    pub config: Config,
    /// Sliding-window trackers of the sampled streams.
    pub trackers: Mutex<Trackers>,
    /// Snapshot history of every stream.
    pub history: SharedHistory,
    /// Collector control state.
    pub collector: CollectorState,
    plan: SnapshotPlan,
    clock: Clock,
}

impl AppState {
    /// Create application state from a validated configuration.
    pub fn new(config: Config) -> telemetry_core::Result<Arc<Self>> {
        let trackers = Trackers::from_config(&config)?;
        let plan = SnapshotPlan::from_config(&config)?;
        let history = HistoryStore::new(config.stream_names(), config.history.capacity)?
            .with_decimals(config.history.decimals);

        let collector = CollectorState::new();
        collector.init_stream_stats(&trackers);

        Ok(Arc::new(Self {
            clock: Clock::new(config.history.clock),
            trackers: Mutex::new(trackers),
            history: SharedHistory::new(history),
            collector,
            plan,
            config,
        }))
    }

    /// Build the next history row from the trackers.
    ///
    /// Returns `None` while any sampled stream has no sample yet.
    pub async fn snapshot_row(&self) -> telemetry_core::Result<Option<Vec<f32>>> {
        let trackers = self.trackers.lock().await;
        self.plan.build_row(&trackers)
    }

    /// Current timestamp from the configured clock.
    pub fn timestamp(&self) -> u64 {
        self.clock.now()
    }

    /// Which clock stamps history rows.
    pub fn clock_source(&self) -> ClockSource {
        self.clock.source
    }
}

/// A sampled stream and its tracker.
#[derive(Debug)]
pub struct TrackedStream {
    /// Stream name.
    pub name: String,
    /// Display unit.
    pub unit: Option<String>,
    /// Tracker value written at each snapshot.
    pub snapshot_field: SnapshotField,
    /// Milliseconds between samples.
    pub sample_interval_ms: u64,
    /// Sliding window of recent samples.
    pub tracker: StreamTracker,
}

/// Trackers of all sampled streams, in configuration order.
#[derive(Debug)]
pub struct Trackers {
    streams: Vec<TrackedStream>,
}

impl Trackers {
    /// Create one tracker per sampled stream.
    pub fn from_config(config: &Config) -> telemetry_core::Result<Self> {
        let streams = config
            .streams
            .iter()
            .filter(|s| s.source.is_sampled())
            .map(|s| {
                Ok(TrackedStream {
                    name: s.name.clone(),
                    unit: s.unit.clone(),
                    snapshot_field: s.snapshot_field,
                    sample_interval_ms: s.sample_interval_ms,
                    tracker: StreamTracker::new(s.window)?,
                })
            })
            .collect::<telemetry_core::Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    /// Feed one sample to tracker `index`.
    pub fn track(&mut self, index: usize, value: f32) -> telemetry_core::Result<()> {
        let width = self.streams.len();
        let stream = self
            .streams
            .get_mut(index)
            .ok_or(Error::UnknownStream { index, width })?;
        stream.tracker.track(value);
        Ok(())
    }

    /// Number of sampled streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether there are no sampled streams.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Tracker by index.
    pub fn get(&self, index: usize) -> Option<&TrackedStream> {
        self.streams.get(index)
    }

    /// Tracker by name, matched by [`stream_key`].
    pub fn find(&self, name: &str) -> Option<&TrackedStream> {
        let key = stream_key(name);
        self.streams.iter().find(|s| stream_key(&s.name) == key)
    }

    /// All trackers in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedStream> {
        self.streams.iter()
    }
}

/// Where one history column gets its value at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RowSource {
    /// A field of tracker `tracker`.
    Sampled { tracker: usize, field: SnapshotField },
    /// Computed from other columns of the same row.
    Derived(Derivation),
}

/// Recipe for assembling a history row, one entry per value stream.
#[derive(Debug, Clone)]
struct SnapshotPlan {
    sources: Vec<RowSource>,
}

impl SnapshotPlan {
    fn from_config(config: &Config) -> telemetry_core::Result<Self> {
        let mut sources = Vec::with_capacity(config.streams.len());
        let mut next_tracker = 0;

        for stream in &config.streams {
            let source = match &stream.source {
                SourceConfig::Simulated { .. } => {
                    let tracker = next_tracker;
                    next_tracker += 1;
                    RowSource::Sampled {
                        tracker,
                        field: stream.snapshot_field,
                    }
                }
                SourceConfig::DewPoint {
                    temperature,
                    humidity,
                    unit,
                } => RowSource::Derived(Derivation::DewPoint {
                    temperature: column_of(config, temperature)?,
                    humidity: column_of(config, humidity)?,
                    unit: *unit,
                }),
            };
            sources.push(source);
        }

        Ok(Self { sources })
    }

    /// Sampled columns are filled first so derivations see this row's values.
    fn build_row(&self, trackers: &Trackers) -> telemetry_core::Result<Option<Vec<f32>>> {
        let mut row = vec![f32::NAN; self.sources.len()];

        for (slot, source) in self.sources.iter().enumerate() {
            if let RowSource::Sampled { tracker, field } = *source {
                let Some(stats) = trackers.get(tracker).and_then(|t| t.tracker.stats()) else {
                    return Ok(None);
                };
                row[slot] = stats.field(field);
            }
        }

        for (slot, source) in self.sources.iter().enumerate() {
            if let RowSource::Derived(derivation) = source {
                row[slot] = derivation.evaluate(&row)?;
            }
        }

        Ok(Some(row))
    }
}

fn column_of(config: &Config, name: &str) -> telemetry_core::Result<usize> {
    config
        .stream_index(name)
        .ok_or_else(|| Error::InvalidStreamName(name.to_string()))
}

/// Timestamp source for snapshots.
#[derive(Debug)]
struct Clock {
    source: ClockSource,
    started: Instant,
}

impl Clock {
    fn new(source: ClockSource) -> Self {
        Self {
            source,
            started: Instant::now(),
        }
    }

    fn now(&self) -> u64 {
        match self.source {
            ClockSource::Uptime => self.started.elapsed().as_secs(),
            ClockSource::Unix => OffsetDateTime::now_utc().unix_timestamp().max(0) as u64,
        }
    }
}

/// State for tracking and controlling the collector.
pub struct CollectorState {
    /// Whether the collector is currently running.
    running: AtomicBool,
    /// When the collector was started (Unix timestamp).
    started_at: AtomicU64,
    /// Channel to signal collector tasks to stop.
    stop_tx: watch::Sender<bool>,
    /// Receiver for stop signal (cloned by collector tasks).
    stop_rx: watch::Receiver<bool>,
    /// Handles of running collector tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Snapshots written to the history.
    snapshots_taken: AtomicU64,
    /// Snapshot ticks skipped because a stream had no sample yet.
    snapshots_skipped: AtomicU64,
    /// Per-stream sampling stats, indexed like [`Trackers`].
    pub stream_stats: RwLock<Vec<StreamCollectionStats>>,
}

impl CollectorState {
    /// Create a new collector state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicU64::new(0),
            stop_tx,
            stop_rx,
            tasks: Mutex::new(Vec::new()),
            snapshots_taken: AtomicU64::new(0),
            snapshots_skipped: AtomicU64::new(0),
            stream_stats: RwLock::new(Vec::new()),
        }
    }

    fn init_stream_stats(&self, trackers: &Trackers) {
        let stats = trackers
            .iter()
            .map(|t| StreamCollectionStats::new(&t.name, t.sample_interval_ms))
            .collect();
        // Fresh lock, nobody else holds it yet
        if let Ok(mut guard) = self.stream_stats.try_write() {
            *guard = stats;
        }
    }

    /// Check if the collector is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Atomically move from stopped to running.
    ///
    /// Returns `false` without touching anything if the collector was already
    /// running, so at most one caller ever spawns collector tasks.
    pub fn try_start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        self.started_at.store(now, Ordering::SeqCst);
        true
    }

    /// Number of registered collector tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Get the collector start time.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        let ts = self.started_at.load(Ordering::SeqCst);
        if ts == 0 {
            None
        } else {
            OffsetDateTime::from_unix_timestamp(ts as i64).ok()
        }
    }

    /// Seconds since the collector was started, if it is running.
    pub fn uptime_seconds(&self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.started_at()
            .map(|s| (OffsetDateTime::now_utc() - s).whole_seconds().max(0) as u64)
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal all collector tasks to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Reset the stop signal (for restarting).
    pub fn reset_stop(&self) {
        let _ = self.stop_tx.send(false);
    }

    /// Register a spawned collector task.
    pub async fn add_task(&self, handle: JoinHandle<()>) {
        self.tasks.lock().await.push(handle);
    }

    /// Wait for all registered tasks to finish.
    ///
    /// Tasks still running after `timeout` are aborted. Returns `true` if
    /// every task exited on its own.
    pub async fn wait_for_tasks(&self, timeout: Duration) -> bool {
        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        if handles.is_empty() {
            return true;
        }

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    "{} collector task(s) did not stop within {:?}, aborting",
                    aborts.len(),
                    timeout
                );
                for abort in aborts {
                    abort.abort();
                }
                false
            }
        }
    }

    /// Count a written snapshot.
    pub fn record_snapshot(&self) {
        self.snapshots_taken.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a skipped snapshot tick.
    pub fn record_skipped_snapshot(&self) {
        self.snapshots_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots written so far.
    pub fn snapshots_taken(&self) -> u64 {
        self.snapshots_taken.load(Ordering::Relaxed)
    }

    /// Snapshot ticks skipped so far.
    pub fn snapshots_skipped(&self) -> u64 {
        self.snapshots_skipped.load(Ordering::Relaxed)
    }

    /// Record a successful sample of stream `index`.
    pub async fn record_success(&self, index: usize) {
        let mut stats = self.stream_stats.write().await;
        if let Some(s) = stats.get_mut(index) {
            s.success_count += 1;
            s.last_sample_at = Some(OffsetDateTime::now_utc());
        }
    }

    /// Record a failed sample of stream `index`.
    pub async fn record_failure(&self, index: usize, error: String) {
        let mut stats = self.stream_stats.write().await;
        if let Some(s) = stats.get_mut(index) {
            s.failure_count += 1;
            s.last_error_at = Some(OffsetDateTime::now_utc());
            s.last_error = Some(error);
        }
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampling statistics for a single stream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamCollectionStats {
    /// Stream name.
    pub stream: String,
    /// Milliseconds between samples.
    pub sample_interval_ms: u64,
    /// Time of last successful sample.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_sample_at: Option<OffsetDateTime>,
    /// Time of last failed sample.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_error_at: Option<OffsetDateTime>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Total successful samples.
    pub success_count: u64,
    /// Total failed samples.
    pub failure_count: u64,
}

impl StreamCollectionStats {
    fn new(stream: &str, sample_interval_ms: u64) -> Self {
        Self {
            stream: stream.to_string(),
            sample_interval_ms,
            last_sample_at: None,
            last_error_at: None,
            last_error: None,
            success_count: 0,
            failure_count: 0,
        }
    }
}
