//! BLE communication module.
//!
//! This module provides the low-level Bluetooth Low Energy plumbing for
//! locating a CGG1 sensor and talking to its GATT characteristics.

pub mod characteristics;
pub mod connection;
pub mod scanner;
pub mod uuids;

pub use characteristics::{wait_for_notification, CharacteristicHandler, NotificationStream};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use scanner::{parse_address, BleScanner};
pub use uuids::*;
