//! In-process fake of the radio capability, for driving the scanner,
//! session, and manager without real hardware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream;
use uuid::Uuid;

use crate::error::{ConnectError, NotifyError, SubscribeError};
use crate::transport::{
    Advertisement, AdvertisementStream, Connection, DeviceAddress, GattEntry, NotificationStream,
    RadioTransport,
};

/// One scripted peripheral the fake will accept connections to.
#[derive(Clone, Default)]
pub struct FakeDevice {
    address: String,
    entries: Vec<GattEntry>,
    discovery_error: Option<String>,
    notifications: Vec<Result<Vec<u8>, NotifyError>>,
    hold_open: bool,
}

impl FakeDevice {
    pub fn new(address: &str) -> Self {
        FakeDevice {
            address: address.to_string(),
            ..Default::default()
        }
    }

    pub fn with_characteristic(mut self, service: Uuid, characteristic: Uuid) -> Self {
        self.entries.push(GattEntry {
            service,
            characteristic,
        });
        self
    }

    pub fn with_discovery_error(mut self, message: &str) -> Self {
        self.discovery_error = Some(message.to_string());
        self
    }

    pub fn with_notifications(mut self, items: Vec<Result<Vec<u8>, NotifyError>>) -> Self {
        self.notifications = items;
        self
    }

    /// Keep the notification stream pending after the scripted items
    /// instead of ending it.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[derive(Default)]
struct Inner {
    advertisements: Vec<Result<Advertisement, String>>,
    pending_scan: bool,
    devices: HashMap<String, FakeDevice>,
    scan_starts: usize,
    scan_stops: usize,
    disconnects: HashMap<String, usize>,
}

/// Scripted radio transport. Advertisements and notifications are replayed
/// from the script on every scan/subscribe; counters record the calls the
/// code under test made.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advertisements(self, items: Vec<Result<Advertisement, String>>) -> Self {
        self.inner.lock().unwrap().advertisements = items;
        self
    }

    /// Scans never yield anything and never end.
    pub fn with_pending_scan(self) -> Self {
        self.inner.lock().unwrap().pending_scan = true;
        self
    }

    pub fn with_device(self, device: FakeDevice) -> Self {
        let mut inner = self.inner.lock().unwrap();
        inner.devices.insert(device.address.clone(), device);
        drop(inner);
        self
    }

    pub fn scan_starts(&self) -> usize {
        self.inner.lock().unwrap().scan_starts
    }

    pub fn scan_stops(&self) -> usize {
        self.inner.lock().unwrap().scan_stops
    }

    pub fn disconnects(&self, address: &str) -> usize {
        *self
            .inner
            .lock()
            .unwrap()
            .disconnects
            .get(address)
            .unwrap_or(&0)
    }
}

#[async_trait]
impl RadioTransport for FakeTransport {
    async fn start_scan(&self) -> Result<AdvertisementStream, String> {
        let mut inner = self.inner.lock().unwrap();
        inner.scan_starts += 1;
        if inner.pending_scan {
            return Ok(stream::pending().boxed());
        }
        Ok(stream::iter(inner.advertisements.clone()).boxed())
    }

    async fn stop_scan(&self) -> Result<(), String> {
        self.inner.lock().unwrap().scan_stops += 1;
        Ok(())
    }

    async fn connect(&self, address: &DeviceAddress) -> Result<Box<dyn Connection>, ConnectError> {
        let inner = self.inner.lock().unwrap();
        let device = inner
            .devices
            .get(&address.0)
            .cloned()
            .ok_or_else(|| ConnectError::TransportFailure(format!("no device at {address}")))?;
        Ok(Box::new(FakeConnection {
            device,
            shared: self.inner.clone(),
        }))
    }
}

struct FakeConnection {
    device: FakeDevice,
    shared: Arc<Mutex<Inner>>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn discover_all(&self) -> Result<Vec<GattEntry>, ConnectError> {
        if let Some(message) = &self.device.discovery_error {
            return Err(ConnectError::DiscoveryFailure(message.clone()));
        }
        Ok(self.device.entries.clone())
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, SubscribeError> {
        let present = self
            .device
            .entries
            .iter()
            .any(|e| e.service == service && e.characteristic == characteristic);
        if !present {
            return Err(SubscribeError::CharacteristicNotFound);
        }

        let items = stream::iter(self.device.notifications.clone());
        if self.device.hold_open {
            Ok(items.chain(stream::pending()).boxed())
        } else {
            Ok(items.boxed())
        }
    }

    async fn disconnect(&self) {
        *self
            .shared
            .lock()
            .unwrap()
            .disconnects
            .entry(self.device.address.clone())
            .or_insert(0) += 1;
    }
}
