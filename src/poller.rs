//! Cached poller for a CGG1 sensor.
//!
//! Readings are served from a time-based cache and only fetched over BLE when
//! the cache is empty or expired. A fetch lock makes concurrent callers share
//! one fetch instead of each opening their own BLE session.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::ble::scanner::parse_address;
use crate::config::PollerConfig;
use crate::data::{Cached, DeviceInfo, Parameter, SensorData};
use crate::error::{Error, Result};
use crate::sensor::{Sensor, SensorTransport};

/// Polls one sensor, caching readings and device information.
pub struct Poller<T: SensorTransport = Sensor> {
    transport: T,
    config: PollerConfig,
    data_cache: RwLock<Cached<SensorData>>,
    /// Held for the whole check-then-fetch sequence.
    fetch_lock: Mutex<()>,
    device_info: Mutex<Cached<DeviceInfo>>,
}

impl Poller<Sensor> {
    /// Scan for the sensor at `address` (e.g. `58:2D:34:35:F3:D4`) and create a
    /// poller for it.
    pub async fn connect(address: &str, config: PollerConfig) -> Result<Self> {
        config.validate()?;
        let address = parse_address(address)?;
        let sensor = Sensor::discover(address, &config).await?;
        Self::new(sensor, config)
    }
}

impl<T: SensorTransport> Poller<T> {
    /// Create a poller over a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `config` has a zero timeout.
    pub fn new(transport: T, config: PollerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            config,
            data_cache: RwLock::new(Cached::new()),
            fetch_lock: Mutex::new(()),
            device_info: Mutex::new(Cached::new()),
        })
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Device information, read lazily and refreshed once it is older than
    /// `device_info_timeout`.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let mut cache = self.device_info.lock().await;

        if let Some(info) = cache.fresh(self.config.device_info_timeout) {
            return Ok(info.clone());
        }

        debug!("Refreshing device information");
        let info = self.transport.read_device_info().await?;
        cache.store(info.clone());
        Ok(info)
    }

    /// Fetch a reading from the sensor, bypassing the cache.
    ///
    /// Device information is loaded first if it is not cached yet.
    pub async fn fetch_data(&self) -> Result<SensorData> {
        debug!("Fetching sensor data");
        self.device_info().await?;
        self.transport
            .read_measurement(self.config.notification_timeout)
            .await
    }

    /// Get the value of a parameter.
    ///
    /// The reading comes from the cache when `read_cached` is set and the
    /// cached reading is no older than `cache_timeout`; otherwise it is
    /// fetched and cached. [`Parameter::Battery`] is always read from the
    /// sensor and never touches the cache.
    pub async fn parameter_value(&self, parameter: Parameter, read_cached: bool) -> Result<f64> {
        if parameter == Parameter::Battery {
            return self.battery_level().await.map(f64::from);
        }

        let data = {
            let _fetch = self.fetch_lock.lock().await;

            let cached = if read_cached {
                self.data_cache
                    .read()
                    .fresh(self.config.cache_timeout)
                    .cloned()
            } else {
                None
            };

            match cached {
                Some(data) => {
                    trace!("Serving {} from cache", parameter);
                    data
                }
                None => {
                    let data = self.fetch_data().await?;
                    self.data_cache.write().store(data.clone());
                    data
                }
            }
        };

        data.value(parameter).ok_or_else(|| Error::NotSupported {
            operation: format!("{} from a reading", parameter),
        })
    }

    /// Temperature in degrees Celsius, from the cache when fresh.
    pub async fn temperature(&self) -> Result<f64> {
        self.parameter_value(Parameter::Temperature, true).await
    }

    /// Relative humidity in percent, from the cache when fresh.
    pub async fn humidity(&self) -> Result<f64> {
        self.parameter_value(Parameter::Humidity, true).await
    }

    /// Battery level in percent.
    pub async fn battery_level(&self) -> Result<u8> {
        self.transport.read_battery_level().await
    }

    /// Firmware version from the device information.
    pub async fn firmware_version(&self) -> Result<String> {
        Ok(self.device_info().await?.firmware_version)
    }

    /// Drop the cached reading.
    pub fn clear_cache(&self) {
        self.data_cache.write().clear();
    }

    /// The cached reading, regardless of age.
    pub fn cached_data(&self) -> Option<SensorData> {
        self.data_cache.read().get().cloned()
    }

    /// When the cached reading was taken.
    pub fn last_read(&self) -> Option<DateTime<Utc>> {
        self.data_cache.read().get().map(|data| data.read_at)
    }
}

impl<T: SensorTransport> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("last_read", &self.last_read())
            .finish()
    }
}
