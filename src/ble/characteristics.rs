//! GATT characteristic handling.
//!
//! Provides reading, descriptor lookup and notification handling for the
//! characteristics of a connected sensor.

use btleplug::api::{CharPropFlags, Characteristic, Descriptor, Peripheral as _, ValueNotification};
use btleplug::platform::Peripheral;
use futures::stream::{Stream, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::uuids::{CCCD_DISABLE, CCCD_ENABLE_NOTIFICATIONS, CCCD_UUID};
use crate::error::{Error, Result};

/// Stream of value notifications from a peripheral.
pub type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

type CharacteristicMap = HashMap<(Uuid, Uuid), Characteristic>;

/// Handler for the GATT characteristics of a connected sensor.
pub struct CharacteristicHandler {
    peripheral: Peripheral,
    /// Cached characteristics keyed by (service, characteristic).
    characteristics: RwLock<CharacteristicMap>,
}

impl CharacteristicHandler {
    /// Create a new characteristic handler for a peripheral.
    ///
    /// Note: Services must be discovered before using this handler.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    /// Discover and cache all characteristics.
    ///
    /// This should be called after connecting and discovering services.
    pub fn discover_characteristics(&self) -> usize {
        let mut chars = self.characteristics.write();
        chars.clear();

        for service in self.peripheral.services() {
            for characteristic in service.characteristics {
                debug!(
                    "Found characteristic: {} in service {}",
                    characteristic.uuid, service.uuid
                );
                chars.insert((service.uuid, characteristic.uuid), characteristic);
            }
        }

        debug!("Discovered {} characteristics", chars.len());
        chars.len()
    }

    /// Check if any discovered characteristic belongs to `service`.
    pub fn has_service(&self, service: &Uuid) -> bool {
        self.characteristics
            .read()
            .keys()
            .any(|(service_uuid, _)| service_uuid == service)
    }

    /// Find a characteristic, preferring the one inside `service`.
    ///
    /// Falls back to the first characteristic with a matching UUID in any
    /// service, since some stacks hide or renumber standard services.
    pub fn find(&self, service: &Uuid, uuid: &Uuid) -> Result<Characteristic> {
        lookup(&self.characteristics.read(), service, uuid)
    }

    /// Find a descriptor on a characteristic.
    pub fn descriptor(&self, service: &Uuid, uuid: &Uuid, descriptor: &Uuid) -> Result<Descriptor> {
        lookup_descriptor(&self.characteristics.read(), service, uuid, descriptor)
    }

    /// Read a characteristic value.
    pub async fn read(&self, service: &Uuid, uuid: &Uuid) -> Result<Vec<u8>> {
        debug!("Reading characteristic {} of service {}", uuid, service);
        let characteristic = self.find(service, uuid)?;

        let data = self.peripheral.read(&characteristic).await?;

        trace!("Read {} bytes from {}: {:02X?}", data.len(), uuid, data);
        Ok(data)
    }

    /// Read a string value from a characteristic.
    pub async fn read_string(&self, service: &Uuid, uuid: &Uuid) -> Result<String> {
        let data = self.read(service, uuid).await?;
        decode_string(data, uuid)
    }

    /// Open the notification stream of the peripheral.
    ///
    /// Open it before enabling notifications so the first push is not lost.
    pub async fn notifications(&self) -> Result<NotificationStream> {
        Ok(self.peripheral.notifications().await?)
    }

    /// Enable notifications on a characteristic.
    ///
    /// The BLE stack writes `0x0001` to the characteristic's CCCD.
    pub async fn enable_notifications(&self, service: &Uuid, uuid: &Uuid) -> Result<()> {
        let characteristic = self.notifiable(service, uuid)?;

        self.peripheral.subscribe(&characteristic).await?;

        debug!(
            "Enabled notifications from {} (CCCD {:02X?})",
            uuid, CCCD_ENABLE_NOTIFICATIONS
        );
        Ok(())
    }

    /// Disable notifications on a characteristic.
    ///
    /// The BLE stack writes `0x0000` to the characteristic's CCCD.
    pub async fn disable_notifications(&self, service: &Uuid, uuid: &Uuid) -> Result<()> {
        let characteristic = self.notifiable(service, uuid)?;

        self.peripheral.unsubscribe(&characteristic).await?;

        debug!(
            "Disabled notifications from {} (CCCD {:02X?})",
            uuid, CCCD_DISABLE
        );
        Ok(())
    }

    fn notifiable(&self, service: &Uuid, uuid: &Uuid) -> Result<Characteristic> {
        check_notifiable(&self.characteristics.read(), service, uuid)
    }
}

/// Wait for the first notification from characteristic `uuid`.
///
/// Notifications from other characteristics are skipped.
pub async fn wait_for_notification<S>(stream: &mut S, uuid: &Uuid, timeout: Duration) -> Result<Vec<u8>>
where
    S: Stream<Item = ValueNotification> + Unpin,
{
    let wait = async {
        while let Some(notification) = stream.next().await {
            debug!(
                "Notification from {}: {:02X?}",
                notification.uuid, notification.value
            );
            if notification.uuid == *uuid {
                return Some(notification.value);
            }
        }
        None
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(Error::NotConnected),
        Err(_) => Err(Error::NotificationTimeout { timeout }),
    }
}

fn lookup(chars: &CharacteristicMap, service: &Uuid, uuid: &Uuid) -> Result<Characteristic> {
    if let Some(characteristic) = chars.get(&(*service, *uuid)) {
        return Ok(characteristic.clone());
    }

    chars
        .iter()
        .find(|((_, char_uuid), _)| char_uuid == uuid)
        .map(|(_, characteristic)| characteristic.clone())
        .ok_or_else(|| Error::CharacteristicNotFound {
            uuid: uuid.to_string(),
        })
}

fn lookup_descriptor(
    chars: &CharacteristicMap,
    service: &Uuid,
    uuid: &Uuid,
    descriptor: &Uuid,
) -> Result<Descriptor> {
    lookup(chars, service, uuid)?
        .descriptors
        .into_iter()
        .find(|d| d.uuid == *descriptor)
        .ok_or_else(|| Error::DescriptorNotFound {
            uuid: descriptor.to_string(),
        })
}

/// The characteristic, if it supports notifications and carries a CCCD.
fn check_notifiable(chars: &CharacteristicMap, service: &Uuid, uuid: &Uuid) -> Result<Characteristic> {
    let characteristic = lookup(chars, service, uuid)?;
    if !characteristic.properties.contains(CharPropFlags::NOTIFY) {
        return Err(Error::NotSupported {
            operation: format!("notifications on {}", characteristic.uuid),
        });
    }
    lookup_descriptor(chars, service, uuid, &CCCD_UUID)?;
    Ok(characteristic)
}

fn decode_string(data: Vec<u8>, uuid: &Uuid) -> Result<String> {
    let value = String::from_utf8(data).map_err(|_| Error::InvalidData {
        context: format!("Invalid UTF-8 in characteristic {}", uuid),
    })?;
    Ok(value.trim_end_matches('\0').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;
    use std::collections::BTreeSet;

    fn data_characteristic(properties: CharPropFlags, with_cccd: bool) -> Characteristic {
        let mut descriptors = BTreeSet::new();
        if with_cccd {
            descriptors.insert(Descriptor {
                uuid: CCCD_UUID,
                service_uuid: DATA_SERVICE_UUID,
                characteristic_uuid: DATA_CHARACTERISTIC_UUID,
            });
        }
        Characteristic {
            uuid: DATA_CHARACTERISTIC_UUID,
            service_uuid: DATA_SERVICE_UUID,
            properties,
            descriptors,
        }
    }

    fn notification(uuid: Uuid, value: &[u8]) -> ValueNotification {
        ValueNotification {
            uuid,
            value: value.to_vec(),
        }
    }

    fn map_of(characteristics: Vec<Characteristic>) -> CharacteristicMap {
        characteristics
            .into_iter()
            .map(|c| ((c.service_uuid, c.uuid), c))
            .collect()
    }

    #[test]
    fn test_check_notifiable() {
        let ok = map_of(vec![data_characteristic(
            CharPropFlags::NOTIFY | CharPropFlags::READ,
            true,
        )]);
        let characteristic =
            check_notifiable(&ok, &DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID).unwrap();
        assert_eq!(characteristic.uuid, DATA_CHARACTERISTIC_UUID);

        let no_notify = map_of(vec![data_characteristic(CharPropFlags::READ, true)]);
        assert!(matches!(
            check_notifiable(&no_notify, &DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID),
            Err(Error::NotSupported { .. })
        ));

        let no_cccd = map_of(vec![data_characteristic(CharPropFlags::NOTIFY, false)]);
        assert!(matches!(
            check_notifiable(&no_cccd, &DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID),
            Err(Error::DescriptorNotFound { .. })
        ));

        assert!(matches!(
            check_notifiable(&CharacteristicMap::new(), &DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID),
            Err(Error::CharacteristicNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_descriptor() {
        let chars = map_of(vec![data_characteristic(CharPropFlags::NOTIFY, true)]);

        let cccd =
            lookup_descriptor(&chars, &DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID, &CCCD_UUID)
                .unwrap();
        assert_eq!(cccd.uuid, CCCD_UUID);
        assert_eq!(cccd.characteristic_uuid, DATA_CHARACTERISTIC_UUID);

        match lookup_descriptor(
            &chars,
            &DATA_SERVICE_UUID,
            &DATA_CHARACTERISTIC_UUID,
            &BATTERY_LEVEL_UUID,
        ) {
            Err(Error::DescriptorNotFound { uuid }) => {
                assert_eq!(uuid, BATTERY_LEVEL_UUID.to_string())
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            lookup_descriptor(&chars, &DATA_SERVICE_UUID, &MODEL_NUMBER_UUID, &CCCD_UUID),
            Err(Error::CharacteristicNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_falls_back_to_any_service() {
        let chars = map_of(vec![data_characteristic(CharPropFlags::NOTIFY, true)]);

        let found = lookup(&chars, &GENERIC_ACCESS_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID).unwrap();
        assert_eq!(found.service_uuid, DATA_SERVICE_UUID);
    }

    #[test]
    fn test_decode_string_trims_nul() {
        let value = decode_string(b"ClearGrass\0\0".to_vec(), &MANUFACTURER_NAME_UUID).unwrap();
        assert_eq!(value, "ClearGrass");

        assert!(matches!(
            decode_string(vec![0xFF, 0xFE], &MODEL_NUMBER_UUID),
            Err(Error::InvalidData { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_for_notification_skips_other_characteristics() {
        let mut stream = futures::stream::iter(vec![
            notification(BATTERY_LEVEL_UUID, &[0x55]),
            notification(DATA_CHARACTERISTIC_UUID, &[0x01, 0x02, 0x03]),
        ]);

        let value = wait_for_notification(
            &mut stream,
            &DATA_CHARACTERISTIC_UUID,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(value, vec![0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn test_wait_for_notification_stream_closed() {
        let mut stream = futures::stream::iter(Vec::<ValueNotification>::new());
        let result =
            wait_for_notification(&mut stream, &DATA_CHARACTERISTIC_UUID, Duration::from_secs(1))
                .await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_notification_timeout() {
        let mut stream = futures::stream::pending::<ValueNotification>();
        let result = wait_for_notification(
            &mut stream,
            &DATA_CHARACTERISTIC_UUID,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::NotificationTimeout { timeout }) if timeout == Duration::from_secs(5)
        ));
    }
}
