//! Background sampler and snapshot scheduler.
//!
//! One task per sampled stream reads its source at the stream's cadence and
//! feeds the tracker. A separate task snapshots every stream into the
//! history once per snapshot interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, interval, interval_at};
use tracing::{debug, error, info, warn};

use telemetry_core::{SensorSource, SimulatedSource};

use crate::config::{SourceConfig, StreamConfig};
use crate::state::AppState;

/// How long [`Collector::stop`] waits for tasks before aborting them.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive failures logged individually before going quiet.
const LOUD_FAILURES: u32 = 3;

/// Background collector that samples sources and records snapshots.
pub struct Collector {
    state: Arc<AppState>,
    sources: Vec<Arc<dyn SensorSource>>,
}

impl Collector {
    /// Create a collector with sources built from the configuration.
    pub fn new(state: Arc<AppState>) -> Result<Self, CollectorError> {
        let mut sources = Vec::new();
        for stream in &state.config.streams {
            if let Some(source) = build_source(stream)? {
                sources.push(source);
            }
        }
        Ok(Self { state, sources })
    }

    /// Create a collector with explicit sources, one per sampled stream.
    pub fn with_sources(
        state: Arc<AppState>,
        sources: Vec<Arc<dyn SensorSource>>,
    ) -> Result<Self, CollectorError> {
        let expected = state
            .config
            .streams
            .iter()
            .filter(|s| s.source.is_sampled())
            .count();
        if sources.len() != expected {
            return Err(CollectorError::SourceCount {
                expected,
                actual: sources.len(),
            });
        }
        Ok(Self { state, sources })
    }

    /// Start sampling and snapshotting.
    ///
    /// Spawns one task per source plus the snapshot task and returns
    /// immediately. Returns `false` and spawns nothing if the collector is
    /// already running.
    pub async fn start(&self) -> bool {
        if !self.state.collector.try_start() {
            warn!("Collector is already running");
            return false;
        }

        self.state.collector.reset_stop();

        let sampled = self
            .state
            .config
            .streams
            .iter()
            .filter(|s| s.source.is_sampled());

        info!(
            "Starting collector for {} sampled stream(s), snapshot every {}s",
            self.sources.len(),
            self.state.config.history.snapshot_interval
        );

        for (index, (stream, source)) in sampled.zip(&self.sources).enumerate() {
            let state = Arc::clone(&self.state);
            let source = Arc::clone(source);
            let period = Duration::from_millis(stream.sample_interval_ms);
            let stop_rx = self.state.collector.subscribe_stop();
            let handle = tokio::spawn(async move {
                sample_stream(state, index, source, period, stop_rx).await;
            });
            self.state.collector.add_task(handle).await;
        }

        let state = Arc::clone(&self.state);
        let stop_rx = self.state.collector.subscribe_stop();
        let handle = tokio::spawn(async move {
            run_snapshots(state, stop_rx).await;
        });
        self.state.collector.add_task(handle).await;
        true
    }

    /// Signal all tasks to stop and wait for them.
    ///
    /// Returns `true` if every task exited before the timeout.
    pub async fn stop(&self) -> bool {
        stop(&self.state).await
    }
}

/// Signal the collector tasks of `state` to stop and wait for them.
pub async fn stop(state: &AppState) -> bool {
    state.collector.signal_stop();
    let clean = state.collector.wait_for_tasks(STOP_TIMEOUT).await;
    info!("Collector stopped");
    clean
}

/// Build the source for a sampled stream; derived streams have none.
pub fn build_source(
    config: &StreamConfig,
) -> Result<Option<Arc<dyn SensorSource>>, CollectorError> {
    match &config.source {
        SourceConfig::Simulated {
            baseline,
            amplitude,
        } => {
            let source = SimulatedSource::new(&config.name, *baseline, *amplitude)
                .map_err(CollectorError::Source)?;
            Ok(Some(Arc::new(source)))
        }
        SourceConfig::DewPoint { .. } => Ok(None),
    }
}

/// Sample one source until stopped.
async fn sample_stream(
    state: Arc<AppState>,
    index: usize,
    source: Arc<dyn SensorSource>,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!(
        "Starting sampler for {} (interval: {}ms)",
        source.name(),
        period.as_millis()
    );

    let mut timer = interval(period);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match sample_once(&state, index, source.as_ref()).await {
                    Ok(value) => {
                        if consecutive_failures > LOUD_FAILURES {
                            info!(
                                "{} recovered after {} failed attempts",
                                source.name(),
                                consecutive_failures
                            );
                        }
                        consecutive_failures = 0;
                        debug!("Sampled {}: {}", source.name(), value);
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        if consecutive_failures <= LOUD_FAILURES {
                            warn!(
                                "Failed to sample {}: {} (attempt {})",
                                source.name(),
                                e,
                                consecutive_failures
                            );
                        } else if consecutive_failures == LOUD_FAILURES + 1 {
                            error!(
                                "Failed to sample {} after {} attempts, will continue trying silently",
                                source.name(),
                                consecutive_failures
                            );
                        }
                        state.collector.record_failure(index, e.to_string()).await;
                    }
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Sampler for {} stopped", source.name());
}

/// Read one sample and feed it to tracker `index`.
async fn sample_once(
    state: &AppState,
    index: usize,
    source: &dyn SensorSource,
) -> Result<f32, CollectorError> {
    let value = source.read().await.map_err(CollectorError::Sample)?;

    state
        .trackers
        .lock()
        .await
        .track(index, value)
        .map_err(CollectorError::Sample)?;

    state.collector.record_success(index).await;
    Ok(value)
}

/// Snapshot every stream once per interval until stopped.
async fn run_snapshots(state: Arc<AppState>, mut stop_rx: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.config.history.snapshot_interval);
    // First snapshot one full interval after start
    let mut timer = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if let Err(e) = take_snapshot(&state).await {
                    error!("Snapshot failed: {}", e);
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Snapshot task stopped");
}

/// Record one history row from the current tracker values.
///
/// Returns the row's timestamp, or `None` if the tick was skipped because a
/// sampled stream has no sample yet.
pub async fn take_snapshot(state: &AppState) -> Result<Option<u64>, CollectorError> {
    let Some(row) = state
        .snapshot_row()
        .await
        .map_err(CollectorError::Snapshot)?
    else {
        state.collector.record_skipped_snapshot();
        debug!("Skipping snapshot: not every stream has a sample yet");
        return Ok(None);
    };

    let timestamp = state.timestamp();
    state
        .history
        .snapshot(&row, timestamp)
        .await
        .map_err(CollectorError::Snapshot)?;
    state.collector.record_snapshot();

    debug!("Recorded snapshot at {}", timestamp);
    Ok(Some(timestamp))
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CollectorError {
    #[error("Expected {expected} source(s), got {actual}")]
    SourceCount { expected: usize, actual: usize },
    #[error("Failed to build source: {0}")]
    Source(telemetry_core::Error),
    #[error("Failed to sample: {0}")]
    Sample(telemetry_core::Error),
    #[error("Failed to snapshot: {0}")]
    Snapshot(telemetry_core::Error),
}
