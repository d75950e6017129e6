//! Sensor readings.

use chrono::{DateTime, Utc};

use crate::data::Parameter;
use crate::protocol::Measurement;

/// One temperature/humidity reading taken from the sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorData {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// When the reading was received.
    pub read_at: DateTime<Utc>,
}

impl SensorData {
    /// Build a reading from a decoded measurement, stamped with `read_at`.
    pub fn from_measurement(measurement: Measurement, read_at: DateTime<Utc>) -> Self {
        Self {
            temperature: measurement.temperature,
            humidity: measurement.humidity,
            read_at,
        }
    }

    /// Temperature in degrees Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> f64 {
        self.temperature * 9.0 / 5.0 + 32.0
    }

    /// The value of a data parameter.
    ///
    /// Returns `None` for [`Parameter::Battery`], which is not part of a reading.
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Temperature => Some(self.temperature),
            Parameter::Humidity => Some(self.humidity),
            Parameter::Battery => None,
        }
    }
}
