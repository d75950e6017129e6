// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # mitemp-cgg1-ble
//!
//! Reads temperature and humidity from the Xiaomi ClearGrass CGG1
//! thermometer/hygrometer (E-Ink) over Bluetooth Low Energy.
//!
//! The sensor does not expose its readings as a readable characteristic.
//! Instead, each fetch connects, enables notifications on the vendor data
//! characteristic, waits for a single push, disables notifications and
//! disconnects. Because that is slow and drains the sensor's battery,
//! readings are cached for a configurable time and concurrent callers share
//! one fetch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mitemp_cgg1_ble::{Poller, PollerConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let poller = Poller::connect("58:2D:34:35:F3:D4", PollerConfig::default()).await?;
//!
//!     println!("Temperature: {:.1}°C", poller.temperature().await?);
//!     println!("Humidity: {:.1}%", poller.humidity().await?);
//!     println!("Firmware: {}", poller.firmware_version().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//! BlueZ hides the Generic Access service; the device name then falls back
//! to the advertised local name.
//!
//! ### macOS
//! Requires Bluetooth permission. MAC addresses are not exposed by Core
//! Bluetooth, so address lookup only works on Linux and Windows.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod poller;
pub mod protocol;
pub mod sensor;

pub use ble::connection::{ConnectionEvent, ConnectionState};
pub use btleplug::api::BDAddr;
pub use config::PollerConfig;
pub use data::{DeviceInfo, Parameter, SensorData};
pub use error::{Error, Result};
pub use poller::Poller;
pub use protocol::Measurement;
pub use sensor::{Sensor, SensorTransport};
