//! In-process transport for tests
//!
//! Scriptable stand-in for a radio stack: scan results and failures are
//! injected, notification payloads are pushed straight into registered
//! handlers, written command bytes are captured for inspection, and a
//! transport-initiated disconnect can be forced at any point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    DeviceLink, DiscoveredDevice, DisconnectObserver, NotificationHandler, SubscriptionId,
    Transport, TransportError,
};

/// Scriptable transport. Cloneable handles share the same script state.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportState>>,
}

#[derive(Default)]
struct MockTransportState {
    devices: Vec<DiscoveredDevice>,
    scan_failure: Option<String>,
    connect_failure: Option<String>,
    /// Number of successful subscribes to allow before injecting a failure.
    subscribe_budget: Option<usize>,
    last_link: Option<Arc<MockLinkState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device to future scan results.
    pub fn add_device(&self, id: &str, name: &str) {
        self.inner.lock().unwrap().devices.push(DiscoveredDevice {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Makes the next scan fail with the given message.
    pub fn fail_next_scan(&self, message: &str) {
        self.inner.lock().unwrap().scan_failure = Some(message.to_string());
    }

    /// Makes the next connect fail with the given message.
    pub fn fail_next_connect(&self, message: &str) {
        self.inner.lock().unwrap().connect_failure = Some(message.to_string());
    }

    /// Lets `allowed` subscribes succeed on the next link, then fails.
    pub fn fail_subscribe_after(&self, allowed: usize) {
        self.inner.lock().unwrap().subscribe_budget = Some(allowed);
    }

    /// Test-side handle to the most recently opened link.
    pub fn link(&self) -> Option<MockLinkHandle> {
        self.inner
            .lock()
            .unwrap()
            .last_link
            .as_ref()
            .map(|state| MockLinkHandle {
                state: Arc::clone(state),
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn scan(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.scan_failure.take() {
            return Err(TransportError::ScanFailed(message));
        }
        Ok(inner.devices.clone())
    }

    async fn connect(&self, device_id: &str) -> Result<Box<dyn DeviceLink>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.connect_failure.take() {
            return Err(TransportError::ConnectFailed(message));
        }
        let state = Arc::new(MockLinkState {
            device_id: device_id.to_string(),
            connected: AtomicBool::new(true),
            next_subscription: AtomicU64::new(0),
            subscribe_budget: Mutex::new(inner.subscribe_budget.take()),
            handlers: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
        });
        inner.last_link = Some(Arc::clone(&state));
        Ok(Box::new(MockLink { state }))
    }
}

struct MockLinkState {
    device_id: String,
    connected: AtomicBool,
    next_subscription: AtomicU64,
    subscribe_budget: Mutex<Option<usize>>,
    handlers: Mutex<HashMap<u64, (String, NotificationHandler)>>,
    written: Mutex<Vec<(String, Vec<u8>)>>,
    observer: Mutex<Option<DisconnectObserver>>,
}

struct MockLink {
    state: Arc<MockLinkState>,
}

#[async_trait]
impl DeviceLink for MockLink {
    async fn discover_characteristics(&self) -> Result<Vec<String>, TransportError> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        Ok(Vec::new())
    }

    async fn subscribe(
        &self,
        characteristic: &str,
        handler: NotificationHandler,
    ) -> Result<SubscriptionId, TransportError> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        {
            let mut budget = self.state.subscribe_budget.lock().unwrap();
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Err(TransportError::SubscribeFailed {
                        characteristic: characteristic.to_string(),
                        message: "injected subscribe failure".to_string(),
                    });
                }
                *remaining -= 1;
            }
        }
        let id = self.state.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.state
            .handlers
            .lock()
            .unwrap()
            .insert(id, (characteristic.to_string(), handler));
        Ok(SubscriptionId(id))
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), TransportError> {
        self.state.handlers.lock().unwrap().remove(&subscription.0);
        Ok(())
    }

    async fn write(&self, characteristic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(TransportError::WriteFailed {
                characteristic: characteristic.to_string(),
                message: "link closed".to_string(),
            });
        }
        self.state
            .written
            .lock()
            .unwrap()
            .push((characteristic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn set_disconnect_observer(&self, observer: DisconnectObserver) {
        *self.state.observer.lock().unwrap() = Some(observer);
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        // Caller-initiated close: delivery stops, but the observer is only
        // for drops the caller did not ask for.
        self.state.connected.store(false, Ordering::Release);
        self.state.handlers.lock().unwrap().clear();
        Ok(())
    }
}

/// Test-side view of an open mock link.
#[derive(Clone)]
pub struct MockLinkHandle {
    state: Arc<MockLinkState>,
}

impl MockLinkHandle {
    pub fn device_id(&self) -> String {
        self.state.device_id.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state.handlers.lock().unwrap().len()
    }

    /// Payloads written to a characteristic, in write order.
    pub fn written(&self, characteristic: &str) -> Vec<Vec<u8>> {
        self.state
            .written
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == characteristic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Delivers a notification payload to every handler subscribed to the
    /// characteristic. Silently dropped once the link is down, matching a
    /// real radio going quiet.
    pub fn notify(&self, characteristic: &str, payload: &[u8]) {
        if !self.state.connected.load(Ordering::Acquire) {
            return;
        }
        let handlers = self.state.handlers.lock().unwrap();
        for (subscribed, handler) in handlers.values() {
            if subscribed == characteristic {
                handler(payload);
            }
        }
    }

    /// Simulates a transport-initiated drop: delivery stops, handlers are
    /// released, and the disconnect observer fires.
    pub fn force_disconnect(&self) {
        self.state.connected.store(false, Ordering::Release);
        self.state.handlers.lock().unwrap().clear();
        let observer = self.state.observer.lock().unwrap().take();
        if let Some(observer) = observer {
            observer();
        }
    }
}
