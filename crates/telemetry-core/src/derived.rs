//! Quantities computed from other streams at snapshot time.

use telemetry_types::TemperatureUnit;

use crate::error::{Error, Result};

/// Magnus coefficient `b` in °C.
const MAGNUS_B: f64 = 243.12;
/// Magnus coefficient `a` (dimensionless).
const MAGNUS_A: f64 = 17.62;

/// Dew point from temperature and relative humidity (Magnus formula).
///
/// `temperature` is interpreted in `unit` and the result is returned in the
/// same unit. Humidity is a percentage; values at or below zero have no dew
/// point and yield `NaN`, which the wire encoding writes as `null`.
///
/// ```
/// use telemetry_core::derived::dew_point;
/// use telemetry_types::TemperatureUnit;
///
/// let dp = dew_point(20.0, 50.0, TemperatureUnit::Celsius);
/// assert!((dp - 9.26).abs() < 0.05);
///
/// // Saturated air: dew point equals temperature
/// let dp = dew_point(15.0, 100.0, TemperatureUnit::Celsius);
/// assert!((dp - 15.0).abs() < 1e-3);
/// ```
pub fn dew_point(temperature: f32, relative_humidity: f32, unit: TemperatureUnit) -> f32 {
    if relative_humidity <= 0.0 {
        return f32::NAN;
    }

    let t = f64::from(unit.to_celsius(temperature));
    let gamma = (f64::from(relative_humidity) / 100.0).ln() + MAGNUS_A * t / (MAGNUS_B + t);
    let celsius = (MAGNUS_B * gamma / (MAGNUS_A - gamma)) as f32;

    unit.from_celsius(celsius)
}

/// A value computed from other entries of the same snapshot row.
///
/// Indices refer to positions in the row of source values handed to
/// [`Derivation::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Dew point from a temperature and a relative humidity stream.
    DewPoint {
        /// Row index of the temperature value.
        temperature: usize,
        /// Row index of the humidity value.
        humidity: usize,
        /// Unit of the temperature value and of the result.
        unit: TemperatureUnit,
    },
}

impl Derivation {
    /// Compute the derived value from a row of source values.
    pub fn evaluate(&self, row: &[f32]) -> Result<f32> {
        match *self {
            Derivation::DewPoint {
                temperature,
                humidity,
                unit,
            } => {
                let t = lookup(row, temperature)?;
                let rh = lookup(row, humidity)?;
                Ok(dew_point(t, rh, unit))
            }
        }
    }

    /// Row indices this derivation reads.
    pub fn inputs(&self) -> Vec<usize> {
        match *self {
            Derivation::DewPoint {
                temperature,
                humidity,
                ..
            } => vec![temperature, humidity],
        }
    }
}

fn lookup(row: &[f32], index: usize) -> Result<f32> {
    row.get(index).copied().ok_or(Error::UnknownStream {
        index,
        width: row.len(),
    })
}
