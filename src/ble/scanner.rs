//! BLE scanning functionality.
//!
//! Locates the peripheral for a sensor's MAC address.

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// BLE scanner bound to one adapter.
pub struct BleScanner {
    adapter: Adapter,
}

impl BleScanner {
    /// Create a scanner on the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Find the peripheral with the given address.
    ///
    /// Peripherals already known to the adapter are returned without scanning.
    /// Otherwise a scan runs until the device shows up or `timeout` elapses.
    pub async fn find_peripheral(&self, address: BDAddr, timeout: Duration) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            debug!("{} already known to adapter", address);
            return Ok(peripheral);
        }

        info!("Scanning for {}", address);

        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let search = async {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };
                if let Some(peripheral) = self.match_peripheral(&id, address).await {
                    return Some(peripheral);
                }
            }
            None
        };

        let found = tokio::time::timeout(timeout, search).await.ok().flatten();

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        found.ok_or_else(|| Error::DeviceNotFound {
            address: address.to_string(),
        })
    }

    async fn known_peripheral(&self, address: BDAddr) -> Result<Option<Peripheral>> {
        Ok(self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address() == address))
    }

    async fn match_peripheral(&self, id: &PeripheralId, address: BDAddr) -> Option<Peripheral> {
        let peripheral = match self.adapter.peripheral(id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        if peripheral.address() != address {
            return None;
        }

        info!("Found {} ({:?})", address, id);
        Some(peripheral)
    }
}

/// Parse a MAC address such as `58:2D:34:35:F3:D4`.
pub fn parse_address(address: &str) -> Result<BDAddr> {
    address
        .trim()
        .parse::<BDAddr>()
        .map_err(|_| Error::InvalidParameter {
            name: "address".to_string(),
            value: address.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr = parse_address("58:2D:34:35:F3:D4").unwrap();
        assert_eq!(addr.into_inner(), [0x58, 0x2D, 0x34, 0x35, 0xF3, 0xD4]);

        let addr = parse_address(" 58:2d:34:35:f3:d4\n").unwrap();
        assert_eq!(addr.into_inner(), [0x58, 0x2D, 0x34, 0x35, 0xF3, 0xD4]);
    }

    #[test]
    fn test_parse_address_invalid() {
        assert!(matches!(
            parse_address("not-a-mac"),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(parse_address("58:2D:34:35:F3").is_err());
    }
}
