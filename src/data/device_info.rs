//! Device information record.

use chrono::{DateTime, Utc};

/// Identification strings read from the sensor's standard GATT services.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    /// Device name (Generic Access).
    pub name: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model number.
    pub model: String,
    /// Firmware revision.
    pub firmware_version: String,
    /// When the record was read.
    pub read_at: DateTime<Utc>,
}
