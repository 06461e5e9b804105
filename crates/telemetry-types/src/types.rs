//! Core types for sensor stream data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Rolling statistics for one sensor stream.
///
/// Produced by a sliding-window tracker once it holds at least one sample.
/// There is no "empty" value: an empty tracker yields no `Statistics` at all.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    /// Most recently tracked sample.
    pub current: f32,
    /// Smallest sample in the window.
    pub min: f32,
    /// Largest sample in the window.
    pub max: f32,
    /// Arithmetic mean of the window.
    pub average: f32,
}

impl Statistics {
    /// Statistics for a window holding a single sample.
    ///
    /// ```
    /// use telemetry_types::Statistics;
    ///
    /// let stats = Statistics::single(4.5);
    /// assert_eq!(stats.min, 4.5);
    /// assert_eq!(stats.max, 4.5);
    /// assert_eq!(stats.average, 4.5);
    /// ```
    #[must_use]
    pub fn single(value: f32) -> Self {
        Self {
            current: value,
            min: value,
            max: value,
            average: value,
        }
    }

    /// Select one field of the statistics.
    ///
    /// ```
    /// use telemetry_types::{SnapshotField, Statistics};
    ///
    /// let stats = Statistics { current: 3.0, min: 1.0, max: 5.0, average: 2.5 };
    /// assert_eq!(stats.field(SnapshotField::Current), 3.0);
    /// assert_eq!(stats.field(SnapshotField::Average), 2.5);
    /// ```
    #[must_use]
    pub fn field(&self, field: SnapshotField) -> f32 {
        match field {
            SnapshotField::Current => self.current,
            SnapshotField::Average => self.average,
            SnapshotField::Min => self.min,
            SnapshotField::Max => self.max,
        }
    }

    /// Distance between the largest and smallest sample.
    #[must_use]
    pub fn spread(&self) -> f32 {
        self.max - self.min
    }
}

/// Which statistic of a tracker is copied into the history on each snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SnapshotField {
    /// The last sample.
    #[default]
    Current,
    /// Window mean.
    Average,
    /// Window minimum.
    Min,
    /// Window maximum.
    Max,
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotField::Current => write!(f, "current"),
            SnapshotField::Average => write!(f, "average"),
            SnapshotField::Min => write!(f, "min"),
            SnapshotField::Max => write!(f, "max"),
        }
    }
}

impl FromStr for SnapshotField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" => Ok(SnapshotField::Current),
            "average" | "avg" | "mean" => Ok(SnapshotField::Average),
            "min" => Ok(SnapshotField::Min),
            "max" => Ok(SnapshotField::Max),
            other => Err(ParseError::InvalidData(format!(
                "unknown snapshot field '{}'",
                other
            ))),
        }
    }
}

/// Fill state of a fixed-capacity ring.
///
/// Both the per-stream tracker and the history store move through
/// `Empty -> Filling -> Full`. `Full` is sticky: once the ring has wrapped,
/// every new entry evicts exactly the oldest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FillState {
    /// No entries written yet.
    Empty,
    /// Some entries written, ring has not wrapped.
    Filling,
    /// Ring has wrapped at least once.
    Full,
}

impl FillState {
    /// Derive the state from a ring's write cursor and wrap flag.
    #[must_use]
    pub fn from_ring(cursor: usize, wrapped: bool) -> Self {
        if wrapped {
            FillState::Full
        } else if cursor == 0 {
            FillState::Empty
        } else {
            FillState::Filling
        }
    }
}

impl fmt::Display for FillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillState::Empty => write!(f, "empty"),
            FillState::Filling => write!(f, "filling"),
            FillState::Full => write!(f, "full"),
        }
    }
}

/// Unit a temperature stream is reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a temperature in this unit to Celsius.
    ///
    /// ```
    /// use telemetry_types::TemperatureUnit;
    ///
    /// assert_eq!(TemperatureUnit::Fahrenheit.to_celsius(212.0), 100.0);
    /// assert_eq!(TemperatureUnit::Celsius.to_celsius(21.5), 21.5);
    /// ```
    #[must_use]
    pub fn to_celsius(self, value: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    /// Convert a temperature in Celsius to this unit.
    #[must_use]
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Short symbol for display.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
