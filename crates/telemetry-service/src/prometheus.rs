//! Prometheus text exposition.
//!
//! # Metrics Exported
//!
//! ## Streams (per sampled stream)
//! - `telemetry_stream_current` - Last sample
//! - `telemetry_stream_min` / `telemetry_stream_max` - Window extremes
//! - `telemetry_stream_average` - Window mean
//! - `telemetry_stream_window_samples` - Samples currently in the window
//! - `telemetry_stream_sample_success_total` - Successful samples
//! - `telemetry_stream_sample_failure_total` - Failed samples
//!
//! ## History
//! - `telemetry_history_capacity` - Time slots available
//! - `telemetry_history_slots_used` - Time slots holding a snapshot
//! - `telemetry_snapshots_total` - Snapshots written
//! - `telemetry_snapshots_skipped_total` - Snapshot ticks skipped
//!
//! ## Collector
//! - `telemetry_collector_running` - Whether the collector is running (1 or 0)
//! - `telemetry_collector_uptime_seconds` - Collector uptime in seconds

use std::fmt::Write;

use telemetry_core::Statistics;
use time::OffsetDateTime;

use crate::state::AppState;

/// Content type for Prometheus metrics.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render all metrics for `state`.
///
/// Acquires the trackers lock, then the history lock, then the stats lock,
/// never more than one at a time.
pub async fn render(state: &AppState) -> String {
    let streams: Vec<(String, usize, Option<Statistics>)> = {
        let trackers = state.trackers.lock().await;
        trackers
            .iter()
            .map(|t| (t.name.clone(), t.tracker.len(), t.tracker.stats()))
            .collect()
    };
    let history = state.history.summary().await;
    let stream_stats = state.collector.stream_stats.read().await.clone();

    let mut output = String::with_capacity(4096);

    output.push_str("# Telemetry agent metrics\n");
    let _ = writeln!(
        output,
        "# Generated at {}\n",
        OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    );

    gauge(
        &mut output,
        "telemetry_collector_running",
        "Whether the collector is running (1=running, 0=stopped)",
        [(None, if state.collector.is_running() { 1.0 } else { 0.0 })],
    );
    if let Some(uptime) = state.collector.uptime_seconds() {
        gauge(
            &mut output,
            "telemetry_collector_uptime_seconds",
            "How long the collector has been running",
            [(None, uptime as f64)],
        );
    }

    let with_stats: Vec<_> = streams
        .iter()
        .filter_map(|(name, _, stats)| stats.map(|s| (name.as_str(), s)))
        .collect();
    if !with_stats.is_empty() {
        let fields: [(&str, &str, fn(&Statistics) -> f32); 4] = [
            ("telemetry_stream_current", "Last sample", |s| s.current),
            ("telemetry_stream_min", "Minimum over the window", |s| s.min),
            ("telemetry_stream_max", "Maximum over the window", |s| s.max),
            ("telemetry_stream_average", "Mean over the window", |s| s.average),
        ];
        for (metric, help, field) in fields {
            gauge(
                &mut output,
                metric,
                help,
                with_stats
                    .iter()
                    .map(|(name, s)| (Some(*name), f64::from(field(s)))),
            );
        }
    }

    if !streams.is_empty() {
        gauge(
            &mut output,
            "telemetry_stream_window_samples",
            "Samples currently held in the sliding window",
            streams
                .iter()
                .map(|(name, len, _)| (Some(name.as_str()), *len as f64)),
        );
    }

    if !stream_stats.is_empty() {
        counter(
            &mut output,
            "telemetry_stream_sample_success_total",
            "Total successful samples",
            stream_stats
                .iter()
                .map(|s| (s.stream.as_str(), s.success_count)),
        );
        counter(
            &mut output,
            "telemetry_stream_sample_failure_total",
            "Total failed samples",
            stream_stats
                .iter()
                .map(|s| (s.stream.as_str(), s.failure_count)),
        );
    }

    gauge(
        &mut output,
        "telemetry_history_capacity",
        "Time slots available in the history",
        [(None, history.capacity as f64)],
    );
    gauge(
        &mut output,
        "telemetry_history_slots_used",
        "Time slots holding a snapshot",
        [(None, history.len as f64)],
    );
    let _ = writeln!(
        output,
        "# HELP telemetry_snapshots_total Snapshots written to the history\n\
         # TYPE telemetry_snapshots_total counter\n\
         telemetry_snapshots_total {}\n",
        state.collector.snapshots_taken()
    );
    let _ = writeln!(
        output,
        "# HELP telemetry_snapshots_skipped_total Snapshot ticks skipped before every stream had a sample\n\
         # TYPE telemetry_snapshots_skipped_total counter\n\
         telemetry_snapshots_skipped_total {}\n",
        state.collector.snapshots_skipped()
    );

    output
}

fn gauge<'a>(
    output: &mut String,
    name: &str,
    help: &str,
    samples: impl IntoIterator<Item = (Option<&'a str>, f64)>,
) {
    let _ = writeln!(output, "# HELP {} {}", name, help);
    let _ = writeln!(output, "# TYPE {} gauge", name);
    for (stream, value) in samples {
        match stream {
            Some(stream) => {
                let _ = writeln!(
                    output,
                    "{}{{stream=\"{}\"}} {}",
                    name,
                    escape_label_value(stream),
                    format_value(value)
                );
            }
            None => {
                let _ = writeln!(output, "{} {}", name, format_value(value));
            }
        }
    }
    output.push('\n');
}

fn counter<'a>(
    output: &mut String,
    name: &str,
    help: &str,
    samples: impl IntoIterator<Item = (&'a str, u64)>,
) {
    let _ = writeln!(output, "# HELP {} {}", name, help);
    let _ = writeln!(output, "# TYPE {} counter", name);
    for (stream, value) in samples {
        let _ = writeln!(
            output,
            "{}{{stream=\"{}\"}} {}",
            name,
            escape_label_value(stream),
            value
        );
    }
    output.push('\n');
}

/// Prometheus spells non-finite values `NaN`, `+Inf` and `-Inf`.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let inf = if value > 0.0 { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else {
        value.to_string()
    }
}

/// Escape special characters in Prometheus label values.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
