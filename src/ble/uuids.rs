//! BLE Service, Characteristic and Descriptor UUIDs.
//!
//! The CGG1 data service UUIDs are fixed by the vendor firmware.

use uuid::Uuid;

// Generic Access Service (Standard BLE)
/// Standard BLE Generic Access Service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
/// Device Name characteristic UUID.
pub const DEVICE_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a00_0000_1000_8000_00805f9b34fb);

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a29_0000_1000_8000_00805f9b34fb);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a24_0000_1000_8000_00805f9b34fb);
/// Firmware Revision characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a26_0000_1000_8000_00805f9b34fb);

// Battery Service (Standard BLE)
/// Standard BLE Battery Service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
/// Battery Level characteristic UUID.
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_00805f9b34fb);

// Data Service (ClearGrass custom)
/// CGG1 data service UUID.
pub const DATA_SERVICE_UUID: Uuid = Uuid::from_u128(0x2221_0000_554a_4546_5542_46534450464d);
/// CGG1 data characteristic UUID (Notify).
pub const DATA_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_0100_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration descriptor UUID.
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);

/// CCCD value enabling notifications.
pub const CCCD_ENABLE_NOTIFICATIONS: [u8; 2] = 0x0001u16.to_le_bytes();
/// CCCD value disabling notifications.
pub const CCCD_DISABLE: [u8; 2] = 0x0000u16.to_le_bytes();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            DATA_SERVICE_UUID.to_string(),
            "22210000-554a-4546-5542-46534450464d"
        );
        assert_eq!(
            DATA_CHARACTERISTIC_UUID.to_string(),
            "00000100-0000-1000-8000-00805f9b34fb"
        );
        assert!(CCCD_UUID.to_string().starts_with("00002902"));
        assert!(DEVICE_INFO_SERVICE_UUID.to_string().contains("180a"));
    }

    #[test]
    fn test_cccd_values() {
        assert_eq!(CCCD_ENABLE_NOTIFICATIONS, [0x01, 0x00]);
        assert_eq!(CCCD_DISABLE, [0x00, 0x00]);
    }
}
