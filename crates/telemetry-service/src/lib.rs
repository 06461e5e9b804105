//! Background sampler and HTTP history feed for the telemetry agent.
//!
//! This crate provides a service that:
//! - Samples each configured stream on its own schedule
//! - Keeps per-stream rolling statistics over a sliding window
//! - Snapshots every stream into a fixed-capacity history at a fixed interval
//! - Serves the whole history as one comma-delimited text payload
//!
//! # HTTP Endpoints
//!
//! - `GET /data` - Serialized history (`text/plain`), stream-major, time last
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Collector state, history fill, per-stream counters
//! - `GET /api/streams` - Rolling statistics of every stream
//! - `GET /api/streams/{name}` - Rolling statistics of one stream
//! - `GET /api/history` - History as JSON columns (`?last=N` for the newest rows)
//! - `GET /metrics` - Prometheus exposition (when enabled)
//! - `POST /api/collector/start`, `POST /api/collector/stop` - Collector control
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/telemetry/agent.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [history]
//! capacity = 1440
//! snapshot_interval = 60
//!
//! [[streams]]
//! name = "temperature"
//! window = 60
//! source = { kind = "simulated", baseline = 21.0, amplitude = 0.5 }
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod prometheus;
pub mod state;

pub use collector::{Collector, CollectorError};
pub use config::{
    ClockSource, Config, ConfigError, HistoryConfig, PrometheusConfig, ServerConfig,
    SourceConfig, StreamConfig, ValidationError,
};
pub use state::{AppState, CollectorState, StreamCollectionStats, TrackedStream, Trackers};
