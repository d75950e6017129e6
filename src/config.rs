//! Poller configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Timing configuration for a [`Poller`](crate::Poller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// How long a reading is served from the cache.
    pub cache_timeout: Duration,
    /// How long to wait for the sensor to push a measurement.
    pub notification_timeout: Duration,
    /// How long device information is served from the cache.
    pub device_info_timeout: Duration,
    /// How long to scan for the sensor's address.
    pub scan_timeout: Duration,
}

impl PollerConfig {
    /// Default reading cache lifetime (60 seconds).
    pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default notification wait (5 seconds).
    pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default device information lifetime (24 hours).
    pub const DEFAULT_DEVICE_INFO_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
    /// Default scan duration (10 seconds).
    pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Set the reading cache lifetime.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Set the notification wait.
    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    /// Set the device information lifetime.
    pub fn with_device_info_timeout(mut self, timeout: Duration) -> Self {
        self.device_info_timeout = timeout;
        self
    }

    /// Set the scan duration.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Check that every timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cache_timeout", self.cache_timeout),
            ("notification_timeout", self.notification_timeout),
            ("device_info_timeout", self.device_info_timeout),
            ("scan_timeout", self.scan_timeout),
        ];

        match fields.iter().find(|(_, value)| value.is_zero()) {
            Some((name, value)) => Err(Error::InvalidParameter {
                name: name.to_string(),
                value: format!("{:?}", value),
            }),
            None => Ok(()),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cache_timeout: Self::DEFAULT_CACHE_TIMEOUT,
            notification_timeout: Self::DEFAULT_NOTIFICATION_TIMEOUT,
            device_info_timeout: Self::DEFAULT_DEVICE_INFO_TIMEOUT,
            scan_timeout: Self::DEFAULT_SCAN_TIMEOUT,
        }
    }
}
