//! Agent configuration.
//!
//! Configuration is read once at startup and stays fixed for the lifetime of
//! the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use telemetry_types::{
    SnapshotField, TIME_STREAM, TemperatureUnit, is_reserved_stream_name, stream_key, wire,
};

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// History settings.
    pub history: HistoryConfig,
    /// Prometheus exposition settings.
    pub prometheus: PrometheusConfig,
    /// Streams to record, in wire order.
    pub streams: Vec<StreamConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            history: HistoryConfig::default(),
            prometheus: PrometheusConfig::default(),
            streams: default_streams(),
        }
    }
}

/// Simulated temperature and humidity plus their dew point.
fn default_streams() -> Vec<StreamConfig> {
    vec![
        StreamConfig::simulated("temperature", 21.0, 0.5).with_unit("°C"),
        StreamConfig::simulated("humidity", 45.0, 2.0).with_unit("%"),
        StreamConfig {
            name: "dew_point".to_string(),
            unit: Some("°C".to_string()),
            window: default_window(),
            sample_interval_ms: default_sample_interval_ms(),
            snapshot_field: SnapshotField::default(),
            source: SourceConfig::DewPoint {
                temperature: "temperature".to_string(),
                humidity: "humidity".to_string(),
                unit: TemperatureUnit::Celsius,
            },
        },
    ]
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every error found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - History capacity, snapshot interval and decimals are within bounds
    /// - At least one stream is configured
    /// - Stream names are non-empty, unique (case-insensitive) and not `time`
    /// - Sampled streams have a window and a sane sample interval
    /// - Dew point streams reference existing sampled streams
    ///
    /// # Example
    ///
    /// ```
    /// use telemetry_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.history.validate());

        if self.streams.is_empty() {
            errors.push(ValidationError {
                field: "streams".to_string(),
                message: "at least one stream must be configured".to_string(),
            });
        }

        // Stream key -> whether the stream is sampled
        let mut known: HashMap<String, bool> = HashMap::new();
        for (i, stream) in self.streams.iter().enumerate() {
            let prefix = format!("streams[{}]", i);
            errors.extend(stream.validate(&prefix));

            let key = stream_key(&stream.name);
            if key.is_empty() {
                continue;
            }
            if known.contains_key(&key) {
                errors.push(ValidationError {
                    field: format!("{}.name", prefix),
                    message: format!("duplicate stream name '{}'", stream.name),
                });
            } else {
                known.insert(key, stream.source.is_sampled());
            }
        }

        for (i, stream) in self.streams.iter().enumerate() {
            for (key, reference) in stream.source.references() {
                let field = format!("streams[{}].source.{}", i, key);
                match known.get(&stream_key(reference)) {
                    Some(true) => {}
                    Some(false) => errors.push(ValidationError {
                        field,
                        message: format!("stream '{}' is derived and cannot be an input", reference),
                    }),
                    None => errors.push(ValidationError {
                        field,
                        message: format!("unknown stream '{}'", reference),
                    }),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Names of all streams in wire order.
    pub fn stream_names(&self) -> Vec<String> {
        self.streams.iter().map(|s| s.name.clone()).collect()
    }

    /// Position of a stream in wire order, matched by [`stream_key`].
    pub fn stream_index(&self, name: &str) -> Option<usize> {
        let key = stream_key(name);
        self.streams.iter().position(|s| stream_key(&s.name) == key)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            });
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            }),
            Err(_) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!("invalid port '{}': must be a number 1-65535", port),
            }),
            Ok(_) => {}
        }

        errors
    }
}

/// Where snapshot timestamps come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// Seconds since the agent started.
    #[default]
    Uptime,
    /// Seconds since the Unix epoch.
    Unix,
}

/// History configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of time slots kept.
    pub capacity: usize,
    /// Seconds between snapshots.
    pub snapshot_interval: u64,
    /// Timestamp source.
    pub clock: ClockSource,
    /// Fractional digits written per value on the wire.
    pub decimals: usize,
}

/// Maximum history capacity in slots.
pub const MAX_HISTORY_CAPACITY: usize = 1_000_000;
/// Minimum snapshot interval in seconds.
pub const MIN_SNAPSHOT_INTERVAL: u64 = 1;
/// Maximum snapshot interval in seconds (1 day).
pub const MAX_SNAPSHOT_INTERVAL: u64 = 86_400;

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            // One day at one snapshot per minute
            capacity: 1440,
            snapshot_interval: 60,
            clock: ClockSource::default(),
            decimals: wire::DEFAULT_DECIMALS,
        }
    }
}

impl HistoryConfig {
    /// Validate history configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.capacity == 0 {
            errors.push(ValidationError {
                field: "history.capacity".to_string(),
                message: "capacity must be at least 1".to_string(),
            });
        } else if self.capacity > MAX_HISTORY_CAPACITY {
            errors.push(ValidationError {
                field: "history.capacity".to_string(),
                message: format!(
                    "capacity {} is too large (maximum {})",
                    self.capacity, MAX_HISTORY_CAPACITY
                ),
            });
        }

        if self.snapshot_interval < MIN_SNAPSHOT_INTERVAL {
            errors.push(ValidationError {
                field: "history.snapshot_interval".to_string(),
                message: format!(
                    "snapshot interval {} is too short (minimum {} second)",
                    self.snapshot_interval, MIN_SNAPSHOT_INTERVAL
                ),
            });
        } else if self.snapshot_interval > MAX_SNAPSHOT_INTERVAL {
            errors.push(ValidationError {
                field: "history.snapshot_interval".to_string(),
                message: format!(
                    "snapshot interval {} is too long (maximum {} seconds / 1 day)",
                    self.snapshot_interval, MAX_SNAPSHOT_INTERVAL
                ),
            });
        }

        if self.decimals > wire::MAX_DECIMALS {
            errors.push(ValidationError {
                field: "history.decimals".to_string(),
                message: format!(
                    "decimals {} is too large (maximum {})",
                    self.decimals,
                    wire::MAX_DECIMALS
                ),
            });
        }

        errors
    }
}

/// Prometheus exposition configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Serve `/metrics`.
    pub enabled: bool,
}

/// Configuration for one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name, used on the API and in metrics labels.
    pub name: String,
    /// Display unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Samples kept in the sliding window.
    #[serde(default = "default_window")]
    pub window: usize,
    /// Milliseconds between samples.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Tracker value written into the history at each snapshot.
    #[serde(default)]
    pub snapshot_field: SnapshotField,
    /// Where values come from.
    pub source: SourceConfig,
}

/// Maximum sliding window size in samples.
pub const MAX_WINDOW: usize = 1_000_000;
/// Minimum sample interval in milliseconds.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 50;
/// Maximum sample interval in milliseconds (1 hour).
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 3_600_000;

fn default_window() -> usize {
    60
}

fn default_sample_interval_ms() -> u64 {
    1000
}

impl StreamConfig {
    /// A sampled stream backed by a simulated source.
    pub fn simulated(name: &str, baseline: f32, amplitude: f32) -> Self {
        Self {
            name: name.to_string(),
            unit: None,
            window: default_window(),
            sample_interval_ms: default_sample_interval_ms(),
            snapshot_field: SnapshotField::default(),
            source: SourceConfig::Simulated {
                baseline,
                amplitude,
            },
        }
    }

    /// Set the display unit.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Validate stream configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.name", prefix),
                message: "stream name cannot be empty".to_string(),
            });
        } else if is_reserved_stream_name(&self.name) {
            errors.push(ValidationError {
                field: format!("{}.name", prefix),
                message: format!("'{}' is reserved for the timestamp stream", TIME_STREAM),
            });
        }

        if let SourceConfig::Simulated {
            baseline,
            amplitude,
        } = self.source
        {
            for (key, value) in [("baseline", baseline), ("amplitude", amplitude)] {
                if !value.is_finite() {
                    errors.push(ValidationError {
                        field: format!("{}.source.{}", prefix, key),
                        message: format!("{} must be a finite number, got {}", key, value),
                    });
                }
            }
            if baseline.is_finite()
                && amplitude.is_finite()
                && !(baseline.abs() + amplitude.abs()).is_finite()
            {
                errors.push(ValidationError {
                    field: format!("{}.source.amplitude", prefix),
                    message: "baseline ± amplitude is out of range".to_string(),
                });
            }
        }

        if !self.source.is_sampled() {
            return errors;
        }

        if self.window == 0 {
            errors.push(ValidationError {
                field: format!("{}.window", prefix),
                message: "window must hold at least 1 sample".to_string(),
            });
        } else if self.window > MAX_WINDOW {
            errors.push(ValidationError {
                field: format!("{}.window", prefix),
                message: format!(
                    "window {} is too large (maximum {} samples)",
                    self.window, MAX_WINDOW
                ),
            });
        }

        if self.sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            errors.push(ValidationError {
                field: format!("{}.sample_interval_ms", prefix),
                message: format!(
                    "sample interval {} is too short (minimum {} ms)",
                    self.sample_interval_ms, MIN_SAMPLE_INTERVAL_MS
                ),
            });
        } else if self.sample_interval_ms > MAX_SAMPLE_INTERVAL_MS {
            errors.push(ValidationError {
                field: format!("{}.sample_interval_ms", prefix),
                message: format!(
                    "sample interval {} is too long (maximum {} ms / 1 hour)",
                    self.sample_interval_ms, MAX_SAMPLE_INTERVAL_MS
                ),
            });
        }

        errors
    }
}

/// Source of a stream's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Bounded random walk around `baseline`.
    Simulated {
        baseline: f32,
        #[serde(default)]
        amplitude: f32,
    },
    /// Dew point computed from two sampled streams at snapshot time.
    DewPoint {
        temperature: String,
        humidity: String,
        #[serde(default)]
        unit: TemperatureUnit,
    },
}

impl SourceConfig {
    /// Whether the stream is sampled on its own schedule.
    pub fn is_sampled(&self) -> bool {
        matches!(self, SourceConfig::Simulated { .. })
    }

    /// Other streams this source reads, keyed by config field.
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        match self {
            SourceConfig::Simulated { .. } => Vec::new(),
            SourceConfig::DewPoint {
                temperature,
                humidity,
                ..
            } => vec![("temperature", temperature.as_str()), ("humidity", humidity.as_str())],
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `streams[0].name`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetry")
        .join("agent.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_errors(config: &Config) -> Vec<ValidationError> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.history.capacity, 1440);
        assert_eq!(config.history.snapshot_interval, 60);
        assert_eq!(config.history.clock, ClockSource::Uptime);
        assert_eq!(config.history.decimals, 2);
        assert!(!config.prometheus.enabled);
        assert_eq!(
            config.stream_names(),
            vec!["temperature", "humidity", "dew_point"]
        );
    }

    #[test]
    fn test_stream_config_defaults() {
        let toml = r#"
            name = "pressure"
            source = { kind = "simulated", baseline = 1013.25 }
        "#;
        let stream: StreamConfig = toml::from_str(toml).unwrap();
        assert_eq!(stream.window, 60);
        assert_eq!(stream.sample_interval_ms, 1000);
        assert_eq!(stream.snapshot_field, SnapshotField::Current);
        assert_eq!(stream.unit, None);
        assert_eq!(
            stream.source,
            SourceConfig::Simulated {
                baseline: 1013.25,
                amplitude: 0.0
            }
        );
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:9000"

            [history]
            capacity = 96
            snapshot_interval = 900
            clock = "unix"
            decimals = 1

            [prometheus]
            enabled = true

            [[streams]]
            name = "temperature"
            unit = "°F"
            window = 30
            sample_interval_ms = 2000
            snapshot_field = "average"
            source = { kind = "simulated", baseline = 70.0, amplitude = 1.0 }

            [[streams]]
            name = "humidity"
            source = { kind = "simulated", baseline = 40.0, amplitude = 3.0 }

            [[streams]]
            name = "dew_point"
            source = { kind = "dew_point", temperature = "temperature", humidity = "humidity", unit = "fahrenheit" }
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.history.capacity, 96);
        assert_eq!(config.history.clock, ClockSource::Unix);
        assert_eq!(config.history.decimals, 1);
        assert!(config.prometheus.enabled);
        assert_eq!(config.streams.len(), 3);
        assert_eq!(config.streams[0].snapshot_field, SnapshotField::Average);
        assert_eq!(config.streams[0].unit.as_deref(), Some("°F"));
        assert_eq!(
            config.streams[2].source,
            SourceConfig::DewPoint {
                temperature: "temperature".to_string(),
                humidity: "humidity".to_string(),
                unit: TemperatureUnit::Fahrenheit,
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[server]\nbind = \"127.0.0.1:1234\"\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:1234");
        assert_eq!(config.history.capacity, 1440);
        assert_eq!(config.streams.len(), 3);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("agent.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.history.capacity = 10;
        config.streams.truncate(1);

        config.save(&config_path).unwrap();
        let loaded = Config::load_validated(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.history.capacity, 10);
        assert_eq!(loaded.stream_names(), vec!["temperature"]);
        assert_eq!(loaded.streams[0].source, config.streams[0].source);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/agent.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_config_load_unknown_source_kind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("agent.toml");
        std::fs::write(
            &config_path,
            "[[streams]]\nname = \"x\"\nsource = { kind = \"thermocouple\" }\n",
        )
        .unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("telemetry/agent.toml"));
    }

    #[test]
    fn test_stream_index_case_insensitive() {
        let config = Config::default();
        assert_eq!(config.stream_index("Humidity"), Some(1));
        assert_eq!(config.stream_index("pressure"), None);
    }

    // --- Validation tests ---

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let valid = ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
        };
        assert!(valid.validate().is_empty());

        let valid_ipv6 = ServerConfig {
            bind: "[::1]:8080".to_string(),
        };
        assert!(valid_ipv6.validate().is_empty());

        let empty = ServerConfig {
            bind: "".to_string(),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let no_port = ServerConfig {
            bind: "127.0.0.1".to_string(),
        };
        let errors = no_port.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        let port_zero = ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        };
        let errors = port_zero.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be 0"));

        let bad_port = ServerConfig {
            bind: "127.0.0.1:abc".to_string(),
        };
        let errors = bad_port.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_history_validation() {
        let zero = HistoryConfig {
            capacity: 0,
            ..HistoryConfig::default()
        };
        let errors = zero.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "history.capacity");

        let huge = HistoryConfig {
            capacity: MAX_HISTORY_CAPACITY + 1,
            ..HistoryConfig::default()
        };
        assert!(huge.validate()[0].message.contains("too large"));

        let no_interval = HistoryConfig {
            snapshot_interval: 0,
            ..HistoryConfig::default()
        };
        assert!(no_interval.validate()[0].message.contains("too short"));

        let long_interval = HistoryConfig {
            snapshot_interval: MAX_SNAPSHOT_INTERVAL + 1,
            ..HistoryConfig::default()
        };
        assert!(long_interval.validate()[0].message.contains("too long"));

        let precise = HistoryConfig {
            decimals: 7,
            ..HistoryConfig::default()
        };
        assert_eq!(precise.validate()[0].field, "history.decimals");
    }

    #[test]
    fn test_stream_validation() {
        let valid = StreamConfig::simulated("co2", 420.0, 30.0);
        assert!(valid.validate("streams[0]").is_empty());

        let mut empty_name = valid.clone();
        empty_name.name = "  ".to_string();
        assert!(empty_name.validate("streams[0]")[0].message.contains("cannot be empty"));

        let mut reserved = valid.clone();
        reserved.name = "Time".to_string();
        assert!(reserved.validate("streams[0]")[0].message.contains("reserved"));

        let mut no_window = valid.clone();
        no_window.window = 0;
        assert_eq!(no_window.validate("streams[0]")[0].field, "streams[0].window");

        let mut fast = valid.clone();
        fast.sample_interval_ms = 10;
        assert!(fast.validate("streams[0]")[0].message.contains("too short"));

        let mut slow = valid;
        slow.sample_interval_ms = MAX_SAMPLE_INTERVAL_MS + 1;
        assert!(slow.validate("streams[0]")[0].message.contains("too long"));
    }

    #[test]
    fn test_window_upper_bound() {
        let mut stream = StreamConfig::simulated("co2", 420.0, 30.0);
        stream.window = MAX_WINDOW;
        assert!(stream.validate("streams[0]").is_empty());

        stream.window = 1_000_000_000_000;
        let errors = stream.validate("streams[0]");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "streams[0].window");
        assert!(errors[0].message.contains("too large"));
    }

    #[test]
    fn test_non_finite_simulated_source_rejected() {
        let toml = r#"
            [[streams]]
            name = "a"
            source = { kind = "simulated", baseline = 1.0, amplitude = inf }

            [[streams]]
            name = "b"
            source = { kind = "simulated", baseline = nan }
        "#;
        let config: Config = toml::from_str(toml).unwrap();

        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "streams[0].source.amplitude");
        assert!(errors[0].message.contains("finite"));
        assert_eq!(errors[1].field, "streams[1].source.baseline");
    }

    #[test]
    fn test_simulated_source_range_overflow_rejected() {
        let stream = StreamConfig::simulated("a", f32::MAX, f32::MAX);
        let errors = stream.validate("streams[0]");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("out of range"));
    }

    #[test]
    fn test_derived_stream_ignores_sampling_fields() {
        let mut config = Config::default();
        config.streams[2].window = 0;
        config.streams[2].sample_interval_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_streams() {
        let config = Config {
            streams: Vec::new(),
            ..Config::default()
        };
        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "streams");
    }

    #[test]
    fn test_duplicate_stream_names_case_insensitive() {
        let config = Config {
            streams: vec![
                StreamConfig::simulated("Temperature", 20.0, 1.0),
                StreamConfig::simulated("temperature", 20.0, 1.0),
            ],
            ..Config::default()
        };
        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "streams[1].name");
        assert!(errors[0].message.contains("duplicate"));
    }

    #[test]
    fn test_padded_names_are_normalised() {
        let config = Config {
            streams: vec![
                StreamConfig::simulated("a", 20.0, 1.0),
                StreamConfig::simulated("a ", 20.0, 1.0),
                StreamConfig::simulated(" time", 20.0, 1.0),
            ],
            ..Config::default()
        };
        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "streams[1].name");
        assert!(errors[0].message.contains("duplicate"));
        assert_eq!(errors[1].field, "streams[2].name");
        assert!(errors[1].message.contains("reserved"));
    }

    #[test]
    fn test_non_ascii_reference_matches_lookup() {
        let mut config = Config::default();
        config.streams[0].name = "Température".to_string();
        config.streams[2].source = SourceConfig::DewPoint {
            temperature: "TEMPÉRATURE ".to_string(),
            humidity: "humidity".to_string(),
            unit: TemperatureUnit::Celsius,
        };

        assert!(config.validate().is_ok());
        assert_eq!(config.stream_index("TEMPÉRATURE "), Some(0));
    }

    #[test]
    fn test_dew_point_reference_validation() {
        let mut config = Config::default();
        config.streams[2].source = SourceConfig::DewPoint {
            temperature: "temp".to_string(),
            humidity: "dew_point".to_string(),
            unit: TemperatureUnit::Celsius,
        };

        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "streams[2].source.temperature");
        assert!(errors[0].message.contains("unknown stream"));
        assert_eq!(errors[1].field, "streams[2].source.humidity");
        assert!(errors[1].message.contains("derived"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = Config {
            server: ServerConfig {
                bind: "localhost:0".to_string(),
            },
            history: HistoryConfig {
                capacity: 0,
                ..HistoryConfig::default()
            },
            ..Config::default()
        };
        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError {
            field: "server.bind".to_string(),
            message: "invalid port".to_string(),
        };
        assert_eq!(format!("{}", error), "server.bind: invalid port");
    }

    #[test]
    fn test_config_validation_error_display() {
        let error = ConfigError::Validation(vec![
            ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            },
            ValidationError {
                field: "streams[0].name".to_string(),
                message: "stream name cannot be empty".to_string(),
            },
        ]);
        let display = format!("{}", error);
        assert!(display.contains("server.bind"));
        assert!(display.contains("streams[0].name"));
    }
}
