//! BLE transport for a single CGG1 sensor.
//!
//! Every operation runs as its own BLE session: connect, discover, do the
//! work, disconnect. Sessions on the same sensor never overlap, and a session
//! that is cancelled part way still gets its link torn down.

use async_trait::async_trait;
use btleplug::api::{BDAddr, Peripheral as _};
use btleplug::platform::Peripheral;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::ble::characteristics::{wait_for_notification, CharacteristicHandler};
use crate::ble::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::ble::scanner::BleScanner;
use crate::ble::uuids::*;
use crate::config::PollerConfig;
use crate::data::{DeviceInfo, SensorData};
use crate::error::{Error, Result};
use crate::protocol::Measurement;

/// Access to a sensor's data, independent of how it is reached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorTransport: Send + Sync {
    /// Read the device information record.
    async fn read_device_info(&self) -> Result<DeviceInfo>;

    /// Wait for one measurement push from the sensor.
    async fn read_measurement(&self, notification_timeout: Duration) -> Result<SensorData>;

    /// Read the battery level in percent.
    async fn read_battery_level(&self) -> Result<u8>;
}

/// A CGG1 sensor reached over Bluetooth Low Energy.
pub struct Sensor {
    address: BDAddr,
    connection: ConnectionManager,
    /// Serializes BLE sessions.
    session: Arc<Mutex<()>>,
}

impl Sensor {
    /// Create a sensor for an already-discovered peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            address: peripheral.address(),
            connection: ConnectionManager::new(peripheral),
            session: Arc::new(Mutex::new(())),
        }
    }

    /// Scan for the sensor with the given address on the first adapter,
    /// for at most `config.scan_timeout`.
    pub async fn discover(address: BDAddr, config: &PollerConfig) -> Result<Self> {
        let scanner = BleScanner::new().await?;
        let peripheral = scanner
            .find_peripheral(address, config.scan_timeout)
            .await?;
        Ok(Self::new(peripheral))
    }

    /// The sensor's MAC address.
    pub fn address(&self) -> BDAddr {
        self.address
    }

    /// Get the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }

    async fn session<T, W, F>(&self, work: W) -> Result<T>
    where
        W: FnOnce(CharacteristicHandler) -> F,
        F: Future<Output = Result<T>>,
    {
        let _session = self.session.lock().await;
        run_session(
            self.open(),
            work,
            self.connection.disconnect(),
            || self.spawn_reset(),
        )
        .await
    }

    async fn open(&self) -> Result<CharacteristicHandler> {
        self.connection.connect().await?;

        let handler = CharacteristicHandler::new(self.connection.peripheral().clone());
        handler.discover_characteristics();
        Ok(handler)
    }

    /// Tear down the link of a cancelled session once the session lock frees up.
    fn spawn_reset(&self) {
        let connection = self.connection.clone();
        let session = self.session.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("Session with {} cancelled, disconnecting", self.address);
                runtime.spawn(async move {
                    let _session = session.lock_owned().await;
                    connection.reset().await;
                });
            }
            Err(_) => warn!(
                "Session with {} cancelled outside a runtime, link left open",
                self.address
            ),
        }
    }

    async fn device_info_session(&self, handler: &CharacteristicHandler) -> Result<DeviceInfo> {
        let read = handler
            .read_string(&GENERIC_ACCESS_SERVICE_UUID, &DEVICE_NAME_UUID)
            .await;
        let name = match device_name(read)? {
            Some(name) => name,
            None => self
                .connection
                .peripheral()
                .properties()
                .await?
                .and_then(|p| p.local_name)
                .unwrap_or_default(),
        };

        let manufacturer = handler
            .read_string(&DEVICE_INFO_SERVICE_UUID, &MANUFACTURER_NAME_UUID)
            .await?;
        let model = handler
            .read_string(&DEVICE_INFO_SERVICE_UUID, &MODEL_NUMBER_UUID)
            .await?;
        let firmware_version = handler
            .read_string(&DEVICE_INFO_SERVICE_UUID, &FIRMWARE_REVISION_UUID)
            .await?;

        Ok(DeviceInfo {
            name,
            manufacturer,
            model,
            firmware_version,
            read_at: Utc::now(),
        })
    }

    async fn measurement_session(
        &self,
        handler: &CharacteristicHandler,
        timeout: Duration,
    ) -> Result<SensorData> {
        if !handler.has_service(&DATA_SERVICE_UUID) {
            return Err(Error::ServiceNotFound {
                uuid: DATA_SERVICE_UUID.to_string(),
            });
        }

        let mut notifications = handler.notifications().await?;
        handler
            .enable_notifications(&DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID)
            .await?;

        let value =
            wait_for_notification(&mut notifications, &DATA_CHARACTERISTIC_UUID, timeout).await;
        let disabled = handler
            .disable_notifications(&DATA_SERVICE_UUID, &DATA_CHARACTERISTIC_UUID)
            .await;

        finish_measurement(value, disabled, Utc::now())
    }
}

#[async_trait]
impl SensorTransport for Sensor {
    async fn read_device_info(&self) -> Result<DeviceInfo> {
        info!("Getting device information of {}", self.address);
        self.session(|handler| async move { self.device_info_session(&handler).await })
            .await
    }

    async fn read_measurement(&self, notification_timeout: Duration) -> Result<SensorData> {
        debug!("Reading measurement from {}", self.address);
        self.session(|handler| async move {
            self.measurement_session(&handler, notification_timeout)
                .await
        })
        .await
    }

    async fn read_battery_level(&self) -> Result<u8> {
        self.session(|handler| async move {
            battery_level(handler.read(&BATTERY_SERVICE_UUID, &BATTERY_LEVEL_UUID).await)
        })
        .await
    }
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("address", &self.address)
            .field("connection_state", &self.connection_state())
            .finish()
    }
}

/// Open a link, run `work` on it and always close it again.
///
/// A close failure is logged and never replaces the work's result. If the
/// returned future is dropped before finishing, `on_cancel` runs.
async fn run_session<H, T, Open, Work, WorkFut, Close, Cancel>(
    open: Open,
    work: Work,
    close: Close,
    on_cancel: Cancel,
) -> Result<T>
where
    Open: Future<Output = Result<H>>,
    Work: FnOnce(H) -> WorkFut,
    WorkFut: Future<Output = Result<T>>,
    Close: Future<Output = Result<()>>,
    Cancel: FnOnce(),
{
    let guard = CancelGuard(Some(on_cancel));

    let result = match open.await {
        Ok(link) => work(link).await,
        Err(e) => Err(e),
    };

    if let Err(e) = close.await {
        warn!("Failed to close session: {}", e);
    }

    guard.disarm();
    result
}

struct CancelGuard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> CancelGuard<F> {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for CancelGuard<F> {
    fn drop(&mut self) {
        if let Some(on_cancel) = self.0.take() {
            on_cancel();
        }
    }
}

/// The Device Name, or `None` when the stack hides Generic Access.
fn device_name(read: Result<String>) -> Result<Option<String>> {
    match read {
        Ok(name) => Ok(Some(name)),
        Err(Error::CharacteristicNotFound { .. }) => {
            debug!("Device Name not exposed, using advertised name");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Battery level from a Battery Level read.
///
/// Sensors without the Battery service report 0. Values above 100 are
/// clamped to 100.
fn battery_level(read: Result<Vec<u8>>) -> Result<u8> {
    match read {
        Ok(data) => match data.first() {
            Some(&level) if level > 100 => {
                warn!("Battery level {} out of range, clamping to 100", level);
                Ok(100)
            }
            Some(&level) => Ok(level),
            None => Err(Error::InvalidData {
                context: "Empty battery level".to_string(),
            }),
        },
        Err(Error::CharacteristicNotFound { .. }) => {
            debug!("Battery Level not exposed");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Decode a measurement push. Failing to disable notifications afterwards is
/// only logged.
fn finish_measurement(
    value: Result<Vec<u8>>,
    disabled: Result<()>,
    read_at: DateTime<Utc>,
) -> Result<SensorData> {
    if let Err(e) = disabled {
        warn!("Failed to disable notifications: {}", e);
    }

    let measurement = Measurement::parse(&value?)?;
    debug!(
        "T={:.1}°C, H={:.1}%",
        measurement.temperature, measurement.humidity
    );

    Ok(SensorData::from_measurement(measurement, read_at))
}
