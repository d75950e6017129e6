//! BLE connection management.
//!
//! Tracks the link state of a single CGG1 sensor. Every session is a single
//! connect attempt followed by a disconnect; there is no reconnect loop.

use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Connection state for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the sensor.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the sensor.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// The identifier of the peripheral.
    pub identifier: String,
    /// The new connection state.
    pub state: ConnectionState,
}

/// Shared connection state plus its event channel.
#[derive(Clone)]
struct StateCell {
    identifier: String,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl StateCell {
    fn new(identifier: String) -> Self {
        let (event_tx, _) = broadcast::channel(16);

        Self {
            identifier,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
        }
    }

    fn get(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Update the state and emit an event if it changed.
    fn set(&self, new_state: ConnectionState) {
        let old_state = std::mem::replace(&mut *self.state.write(), new_state);

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);

            let _ = self.event_tx.send(ConnectionEvent {
                identifier: self.identifier.clone(),
                state: new_state,
            });
        }
    }

    /// Enter a transitional state that falls back to `Disconnected` unless
    /// the returned guard is completed.
    fn begin(&self, transition: ConnectionState) -> TransitionGuard<'_> {
        self.set(transition);
        TransitionGuard {
            cell: self,
            completed: false,
        }
    }
}

/// Resets the state to `Disconnected` when a transition is abandoned,
/// including when the connecting future is dropped mid-await.
struct TransitionGuard<'a> {
    cell: &'a StateCell,
    completed: bool,
}

impl TransitionGuard<'_> {
    fn complete(mut self, state: ConnectionState) {
        self.completed = true;
        self.cell.set(state);
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.cell.set(ConnectionState::Disconnected);
        }
    }
}

/// Manages the connection to one sensor.
#[derive(Clone)]
pub struct ConnectionManager {
    peripheral: Peripheral,
    cell: StateCell,
}

impl ConnectionManager {
    /// Create a new connection manager for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        let cell = StateCell::new(peripheral.address().to_string());
        Self { peripheral, cell }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.cell.get()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.cell.event_tx.subscribe()
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Connect to the sensor and discover its services.
    ///
    /// Makes exactly one attempt.
    pub async fn connect(&self) -> Result<()> {
        let current_state = self.state();

        if current_state.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        if current_state.is_transitioning() {
            return Err(Error::ConnectionFailed {
                reason: format!("Connection is {}", current_state),
            });
        }

        let transition = self.cell.begin(ConnectionState::Connecting);

        if !self.peripheral.is_connected().await.unwrap_or(false) {
            if let Err(e) = self.peripheral.connect().await {
                return Err(Error::ConnectionFailed {
                    reason: e.to_string(),
                });
            }
            info!("Connected to {}", self.peripheral.address());
        } else {
            info!("Peripheral already connected at BLE level");
        }

        if let Err(e) = self.peripheral.discover_services().await {
            error!("Failed to discover services: {}", e);
            if let Err(e) = self.peripheral.disconnect().await {
                warn!("Failed to disconnect after discovery failure: {}", e);
            }
            return Err(Error::Bluetooth(e));
        }

        transition.complete(ConnectionState::Connected);
        Ok(())
    }

    /// Disconnect from the sensor.
    pub async fn disconnect(&self) -> Result<()> {
        let current_state = self.state();

        if matches!(
            current_state,
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Ok(());
        }

        let transition = self.cell.begin(ConnectionState::Disconnecting);
        let result = self.peripheral.disconnect().await;
        transition.complete(ConnectionState::Disconnected);

        match result {
            Ok(()) => {
                info!("Disconnected from {}", self.peripheral.address());
                Ok(())
            }
            Err(e) => {
                error!("Failed to disconnect: {}", e);
                Err(Error::Bluetooth(e))
            }
        }
    }

    /// Drop the BLE link regardless of the tracked state.
    ///
    /// Used to clean up after a session that was cancelled part way.
    pub async fn reset(&self) {
        if self.peripheral.is_connected().await.unwrap_or(true) {
            if let Err(e) = self.peripheral.disconnect().await {
                warn!("Failed to reset link to {}: {}", self.peripheral.address(), e);
            }
        }
        self.cell.set(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());

        assert!(ConnectionState::Connecting.is_transitioning());
        assert!(ConnectionState::Disconnecting.is_transitioning());
        assert!(!ConnectionState::Connected.is_transitioning());
        assert!(!ConnectionState::Disconnected.is_transitioning());
    }

    #[test]
    fn test_connection_state_default() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    fn cell_with_events() -> (StateCell, broadcast::Receiver<ConnectionEvent>) {
        let cell = StateCell::new("58:2D:34:35:F3:D4".to_string());
        let rx = cell.event_tx.subscribe();
        (cell, rx)
    }

    #[test]
    fn test_abandoned_transition_resets_state() {
        let (cell, mut rx) = cell_with_events();

        let transition = cell.begin(ConnectionState::Connecting);
        assert_eq!(cell.get(), ConnectionState::Connecting);
        drop(transition);

        assert_eq!(cell.get(), ConnectionState::Disconnected);
        assert_eq!(rx.try_recv().unwrap().state, ConnectionState::Connecting);
        assert_eq!(rx.try_recv().unwrap().state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_completed_transition_keeps_state() {
        let (cell, mut rx) = cell_with_events();

        cell.begin(ConnectionState::Connecting)
            .complete(ConnectionState::Connected);
        assert_eq!(cell.get(), ConnectionState::Connected);

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.state)
            .collect();
        assert_eq!(
            events,
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }

    #[tokio::test]
    async fn test_cancelled_transition_resets_state() {
        let (cell, _rx) = cell_with_events();

        let pending = async {
            let _transition = cell.begin(ConnectionState::Connecting);
            futures::future::pending::<()>().await;
        };
        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;

        assert!(cancelled.is_err());
        assert_eq!(cell.get(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Connecting), "Connecting");
        assert_eq!(format!("{}", ConnectionState::Disconnecting), "Disconnecting");
    }
}
