//! Data structures for sensor data.
//!
//! This module contains the reading, device information and parameter types,
//! plus the time-based cache the poller keeps them in.

pub mod cache;
pub mod device_info;
pub mod parameter;
pub mod reading;

pub use cache::Cached;
pub use device_info::DeviceInfo;
pub use parameter::Parameter;
pub use reading::SensorData;
