//! End-to-end tests for the sample → tracker → history → wire pipeline.

use telemetry_core::{
    Derivation, Error, HistoryStore, ScriptedSource, SensorSource, SharedHistory, SnapshotField,
    StreamTracker, TemperatureUnit, dew_point, wire,
};

#[tokio::test]
async fn test_sources_through_trackers_into_history() {
    let temperature = ScriptedSource::new("temperature", vec![20.0, 22.0, 24.0]);
    let humidity = ScriptedSource::new("humidity", vec![50.0, 60.0]);

    let mut t_tracker = StreamTracker::new(3).unwrap();
    let mut h_tracker = StreamTracker::new(3).unwrap();
    let history = SharedHistory::new(
        HistoryStore::new(["temperature", "humidity", "dew_point"], 4).unwrap(),
    );
    let dew = Derivation::DewPoint {
        temperature: 0,
        humidity: 1,
        unit: TemperatureUnit::Celsius,
    };

    for tick in 1..=3u64 {
        t_tracker.track(temperature.read().await.unwrap());
        h_tracker.track(humidity.read().await.unwrap());

        let mut row = vec![
            t_tracker.stats().unwrap().field(SnapshotField::Average),
            h_tracker.stats().unwrap().field(SnapshotField::Current),
        ];
        row.push(dew.evaluate(&row).unwrap());
        history.snapshot(&row, tick * 10).await.unwrap();
    }

    let payload = history.serialize().await;
    let columns = wire::decode_streams(&payload, 4).unwrap();

    assert_eq!(columns[0], vec![20.0, 21.0, 22.0]);
    assert_eq!(columns[1], vec![50.0, 60.0, 50.0]);
    assert_eq!(columns[3], vec![10.0, 20.0, 30.0]);

    let expected_dp = dew_point(22.0, 50.0, TemperatureUnit::Celsius) as f64;
    assert!((columns[2][2] - expected_dp).abs() < 0.01);
}

#[tokio::test]
async fn test_history_wraps_and_keeps_rows_aligned() {
    let history = SharedHistory::new(HistoryStore::new(["a", "b"], 3).unwrap());
    for t in 1..=7u64 {
        history
            .snapshot(&[t as f32, t as f32 * 100.0], t)
            .await
            .unwrap();
    }

    assert_eq!(history.serialize().await, "5,6,7,500,600,700,5,6,7,");

    let columns = history.columns().await;
    assert_eq!(columns.time, vec![5, 6, 7]);
    assert_eq!(columns.streams[1].name, "b");
    assert_eq!(columns.streams[1].values, vec![500.0, 600.0, 700.0]);
}

#[tokio::test]
async fn test_mismatched_row_leaves_history_untouched() {
    let history = SharedHistory::new(HistoryStore::new(["a", "b"], 2).unwrap());
    history.snapshot(&[1.0, 2.0], 1).await.unwrap();
    let before = history.serialize().await;

    let err = history.snapshot(&[1.0, 2.0, 3.0], 2).await.unwrap_err();
    assert_eq!(
        err,
        Error::StreamCountMismatch {
            expected: 2,
            actual: 3
        }
    );
    assert_eq!(history.serialize().await, before);
}

#[test]
fn test_empty_history_serializes_to_empty_string() {
    let history = HistoryStore::new(["a"], 5).unwrap();
    assert_eq!(history.serialize(), "");
    assert!(wire::decode_streams("", 2).unwrap().iter().all(Vec::is_empty));
}
