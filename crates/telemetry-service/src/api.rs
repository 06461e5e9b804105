//! HTTP endpoints for the telemetry agent.
//!
//! # Lock Acquisition
//!
//! Handlers that touch more than one lock take them in the order documented
//! in [`crate::state`]: trackers, then history, then collector stats. The
//! history lock is held for the whole of each serialize, so `/data` never
//! returns a half-written row.
//!
//! # Error Handling
//!
//! Endpoints return structured JSON errors via [`AppError`].
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use telemetry_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use telemetry_core::{
    FillState, HistorySummary, SnapshotField, Statistics, TIME_STREAM, stream_key,
};

use crate::collector::{self, Collector};
use crate::config::{ClockSource, SourceConfig};
use crate::prometheus;
use crate::state::{AppState, StreamCollectionStats};

/// Content type of the `/data` payload.
const DATA_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // History feed
        .route("/data", get(get_data))
        // Health and status
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        // Prometheus metrics
        .route("/metrics", get(prometheus_metrics))
        // Collector control
        .route("/api/collector/start", post(collector_start))
        .route("/api/collector/stop", post(collector_stop))
        // Stream and history views
        .route("/api/streams", get(list_streams))
        .route("/api/streams/{name}", get(get_stream))
        .route("/api/history", get(get_history))
}

/// Serialized history: every stream oldest-first, then the time stream.
async fn get_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.history.serialize().await;
    ([(header::CONTENT_TYPE, DATA_CONTENT_TYPE)], body)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

// ==========================================================================
// Prometheus Metrics
// ==========================================================================

/// Prometheus metrics endpoint, see [`prometheus`] for the metric list.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    if !state.config.prometheus.enabled {
        return Err(AppError::NotFound(
            "Prometheus metrics endpoint is disabled".to_string(),
        ));
    }

    let output = prometheus::render(&state).await;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::CONTENT_TYPE)],
        output,
    ))
}

// ==========================================================================
// Service Status and Collector Control
// ==========================================================================

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service version.
    pub version: &'static str,
    /// Current timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Collector status.
    pub collector: CollectorStatus,
    /// Clock that stamps history rows, read now.
    pub clock: ClockStatus,
    /// History shape and fill level.
    pub history: HistorySummary,
    /// Per-stream sampling statistics.
    pub streams: Vec<StreamCollectionStats>,
}

/// Current reading of the history clock.
///
/// A dashboard maps a time-stream token `t` to wall time as
/// `request_time - (now - t)` seconds.
#[derive(Debug, Serialize)]
pub struct ClockStatus {
    /// `uptime` or `unix`.
    pub source: ClockSource,
    /// Clock value at the time of the request, in the units of the time stream.
    pub now: u64,
}

/// Collector status.
#[derive(Debug, Serialize)]
pub struct CollectorStatus {
    /// Whether the collector is running.
    pub running: bool,
    /// When the collector was started (if running).
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// How long the collector has been running (in seconds).
    pub uptime_seconds: Option<u64>,
    /// Snapshots written so far.
    pub snapshots_taken: u64,
    /// Snapshot ticks skipped so far.
    pub snapshots_skipped: u64,
}

/// Get service status including collector state and stream stats.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let history = state.history.summary().await;
    let streams = state.collector.stream_stats.read().await.clone();

    let running = state.collector.is_running();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        collector: CollectorStatus {
            running,
            started_at: state.collector.started_at().filter(|_| running),
            uptime_seconds: state.collector.uptime_seconds(),
            snapshots_taken: state.collector.snapshots_taken(),
            snapshots_skipped: state.collector.snapshots_skipped(),
        },
        clock: ClockStatus {
            source: state.clock_source(),
            now: state.timestamp(),
        },
        history,
        streams,
    })
}

/// Response for collector control actions.
#[derive(Debug, Serialize)]
pub struct CollectorActionResponse {
    pub success: bool,
    pub message: String,
    pub running: bool,
}

/// Start the collector with sources from the configuration.
async fn collector_start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CollectorActionResponse>, AppError> {
    let collector =
        Collector::new(Arc::clone(&state)).map_err(|e| AppError::Internal(e.to_string()))?;

    if !collector.start().await {
        return Ok(Json(CollectorActionResponse {
            success: false,
            message: "Collector is already running".to_string(),
            running: true,
        }));
    }

    Ok(Json(CollectorActionResponse {
        success: true,
        message: "Collector started".to_string(),
        running: true,
    }))
}

/// Stop the collector.
async fn collector_stop(State(state): State<Arc<AppState>>) -> Json<CollectorActionResponse> {
    if !state.collector.is_running() {
        return Json(CollectorActionResponse {
            success: false,
            message: "Collector is not running".to_string(),
            running: false,
        });
    }

    let message = if collector::stop(&state).await {
        "Collector stopped"
    } else {
        "Collector stopped (some tasks timed out and were aborted)"
    };

    Json(CollectorActionResponse {
        success: true,
        message: message.to_string(),
        running: false,
    })
}

// ==========================================================================
// Streams
// ==========================================================================

/// One configured stream and its current window.
#[derive(Debug, Serialize)]
pub struct StreamResponse {
    /// Stream name.
    pub name: String,
    /// Display unit.
    pub unit: Option<String>,
    /// Source kind (`simulated` or `dew_point`).
    pub source: &'static str,
    /// Tracker value written at each snapshot; `None` for derived streams.
    pub snapshot_field: Option<SnapshotField>,
    /// Window capacity; `None` for derived streams.
    pub window: Option<usize>,
    /// Samples currently in the window.
    pub samples: usize,
    /// Window fill state; `None` for derived streams.
    pub state: Option<FillState>,
    /// Rolling statistics; `None` until the first sample.
    pub stats: Option<Statistics>,
}

async fn stream_views(state: &AppState) -> Vec<StreamResponse> {
    let trackers = state.trackers.lock().await;

    state
        .config
        .streams
        .iter()
        .map(|stream| {
            let tracked = stream
                .source
                .is_sampled()
                .then(|| trackers.find(&stream.name))
                .flatten();
            StreamResponse {
                name: stream.name.clone(),
                unit: stream.unit.clone(),
                source: match stream.source {
                    SourceConfig::Simulated { .. } => "simulated",
                    SourceConfig::DewPoint { .. } => "dew_point",
                },
                snapshot_field: tracked.map(|t| t.snapshot_field),
                window: tracked.map(|t| t.tracker.capacity()),
                samples: tracked.map_or(0, |t| t.tracker.len()),
                state: tracked.map(|t| t.tracker.state()),
                stats: tracked.and_then(|t| t.tracker.stats()),
            }
        })
        .collect()
}

/// List every configured stream in wire order.
async fn list_streams(State(state): State<Arc<AppState>>) -> Json<Vec<StreamResponse>> {
    Json(stream_views(&state).await)
}

/// Get one stream by name, matched by [`stream_key`].
async fn get_stream(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<StreamResponse>, AppError> {
    let key = stream_key(&name);
    stream_views(&state)
        .await
        .into_iter()
        .find(|s| stream_key(&s.name) == key)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Stream not found: {}", name)))
}

// ==========================================================================
// History
// ==========================================================================

/// Query parameters for `/api/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Only return the newest `last` rows.
    pub last: Option<usize>,
}

/// History as JSON columns keyed by stream name.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Time slots available.
    pub capacity: usize,
    /// Rows returned.
    pub len: usize,
    /// Ring fill state.
    pub state: FillState,
    /// One array per stream plus `time`, oldest first.
    pub columns: serde_json::Map<String, serde_json::Value>,
}

/// Get the history column-wise.
///
/// Built from a single locked read, so every column has the same length and
/// row `i` of each column belongs to the same snapshot.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    if query.last == Some(0) {
        return Err(AppError::BadRequest(
            "last must be at least 1".to_string(),
        ));
    }

    let (columns, summary) = state.history.read(|h| (h.columns(), h.summary())).await;

    let skip = query
        .last
        .map_or(0, |last| columns.time.len().saturating_sub(last));

    let mut map = serde_json::Map::new();
    for stream in columns.streams {
        map.insert(stream.name, serde_json::Value::from(&stream.values[skip..]));
    }
    let time = &columns.time[skip..];
    map.insert(TIME_STREAM.to_string(), serde_json::Value::from(time));

    Ok(Json(HistoryResponse {
        capacity: summary.capacity,
        len: time.len(),
        state: summary.state,
        columns: map,
    }))
}

// ==========================================================================
// Errors
// ==========================================================================

/// API errors.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
