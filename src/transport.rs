use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::{Uuid, uuid};

use crate::error::{ConnectError, NotifyError, SubscribeError};

/// Standard heart-rate service (org.bluetooth.service.heart_rate).
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");
/// Standard heart-rate measurement characteristic.
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Opaque stable identifier for a peripheral, as rendered by the platform
/// radio stack. Not assumed to be a MAC address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceAddress(pub String);

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a peripheral as seen in its advertisements. Used only for
/// matching; never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: Option<String>,
    pub address: DeviceAddress,
}

/// One advertisement observed during a scan. Discarded once filtered.
#[derive(Clone, Debug)]
pub struct Advertisement {
    pub identity: DeviceIdentity,
}

/// One row of the diagnostic discovery log: a (service, characteristic)
/// pair found on the connected peripheral. Informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GattEntry {
    pub service: Uuid,
    pub characteristic: Uuid,
}

pub type AdvertisementStream = BoxStream<'static, Result<Advertisement, String>>;
pub type NotificationStream = BoxStream<'static, Result<Vec<u8>, NotifyError>>;

/// The process-wide radio capability. One implementation wraps the platform
/// BLE stack; tests inject `fake::FakeTransport`.
#[async_trait]
pub trait RadioTransport: Send + Sync {
    /// Start an unfiltered scan and return the advertisement stream.
    /// The stream is infinite until `stop_scan` is called or the transport
    /// errors; a transport error is yielded once and ends the stream.
    async fn start_scan(&self) -> Result<AdvertisementStream, String>;

    /// Stop a running scan. Idempotent.
    async fn stop_scan(&self) -> Result<(), String>;

    /// Connect to the peripheral behind `address`.
    async fn connect(&self, address: &DeviceAddress) -> Result<Box<dyn Connection>, ConnectError>;
}

/// One live connection to a peripheral. Owned exclusively by a `Session`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Enumerate every service/characteristic pair on the peripheral.
    async fn discover_all(&self) -> Result<Vec<GattEntry>, ConnectError>;

    /// Subscribe to notifications from one characteristic. Elements may
    /// individually fail without ending the stream; the stream ends when
    /// the peripheral disconnects.
    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, SubscribeError>;

    /// Release the connection. Idempotent.
    async fn disconnect(&self);
}
