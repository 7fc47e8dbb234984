//! Transport capability seam
//!
//! The decode/buffer/score core has no compile-time dependency on any
//! wireless stack. Anything that can scan for devices, open a link,
//! deliver characteristic notifications, and accept command writes can
//! drive a [`crate::session::DeviceSession`]: a BLE adapter in
//! production, [`mock::MockTransport`] in tests.

pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Callback invoked from the transport's delivery context with each raw
/// notification payload. Handlers must only do buffer writes; they are on
/// the arrival path, not the emission path.
pub type NotificationHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Callback invoked when the link drops for any reason, including drops
/// the transport initiates on its own.
pub type DisconnectObserver = Box<dyn Fn() + Send + Sync>;

/// Opaque handle for an active characteristic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// A device surfaced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: String,
}

/// Errors raised at the transport boundary.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("scan failed: {0}")]
    ScanFailed(String),
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    #[error("characteristic discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("subscribe failed on {characteristic}: {message}")]
    SubscribeFailed {
        characteristic: String,
        message: String,
    },
    #[error("write failed on {characteristic}: {message}")]
    WriteFailed {
        characteristic: String,
        message: String,
    },
    #[error("not connected")]
    NotConnected,
}

/// Device discovery and connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Discover nearby headsets, waiting at most `timeout`. An empty
    /// result after the full timeout is not an error.
    async fn scan(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open a link to the device with the given identifier.
    async fn connect(&self, device_id: &str) -> Result<Box<dyn DeviceLink>, TransportError>;
}

/// One open connection to a device.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Enumerate the characteristics the device exposes. Also primes any
    /// transport-side attribute cache; must be called before subscribing.
    async fn discover_characteristics(&self) -> Result<Vec<String>, TransportError>;

    /// Register for notifications on one characteristic.
    async fn subscribe(
        &self,
        characteristic: &str,
        handler: NotificationHandler,
    ) -> Result<SubscriptionId, TransportError>;

    /// Stop notification delivery for a subscription. Unknown or already
    /// released handles are a no-op.
    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), TransportError>;

    /// Write command bytes to a characteristic.
    async fn write(&self, characteristic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Install the observer fired when the link drops, whether or not the
    /// drop was caller-initiated. Replaces any previous observer.
    fn set_disconnect_observer(&self, observer: DisconnectObserver);

    /// Close the link. Idempotent.
    async fn disconnect(&self) -> Result<(), TransportError>;
}
