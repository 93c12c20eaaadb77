use async_trait::async_trait;
use btleplug::api::{Central as _, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt as _;
use log::debug;
use uuid::Uuid;

use crate::error::{ConnectError, SubscribeError};
use crate::transport::{
    Advertisement, AdvertisementStream, Connection, DeviceAddress, DeviceIdentity, GattEntry,
    NotificationStream, RadioTransport,
};

/// `RadioTransport` backed by a btleplug adapter. The only module that
/// touches the platform BLE stack.
pub struct BtleTransport {
    adapter: Adapter,
}

impl BtleTransport {
    pub fn new(adapter: Adapter) -> Self {
        BtleTransport { adapter }
    }
}

#[async_trait]
impl RadioTransport for BtleTransport {
    async fn start_scan(&self) -> Result<AdvertisementStream, String> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| e.to_string())?;
        let events = self.adapter.events().await.map_err(|e| e.to_string())?;

        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let CentralEvent::DeviceDiscovered(id) = event else {
                    return None;
                };
                let peripheral = adapter.peripheral(&id).await.ok()?;
                let name = peripheral
                    .properties()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|p| p.local_name);
                Some(Ok(Advertisement {
                    identity: DeviceIdentity {
                        name,
                        address: DeviceAddress(id.to_string()),
                    },
                }))
            }
        });
        Ok(stream.boxed())
    }

    async fn stop_scan(&self) -> Result<(), String> {
        self.adapter.stop_scan().await.map_err(|e| e.to_string())
    }

    async fn connect(&self, address: &DeviceAddress) -> Result<Box<dyn Connection>, ConnectError> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| ConnectError::TransportFailure(e.to_string()))?;
        let peripheral = peripherals
            .into_iter()
            .find(|p| p.id().to_string() == address.0)
            .ok_or_else(|| {
                ConnectError::TransportFailure(format!("no peripheral at {address}"))
            })?;

        peripheral
            .connect()
            .await
            .map_err(|e| ConnectError::TransportFailure(e.to_string()))?;

        Ok(Box::new(BtleConnection { peripheral }))
    }
}

struct BtleConnection {
    peripheral: Peripheral,
}

#[async_trait]
impl Connection for BtleConnection {
    async fn discover_all(&self) -> Result<Vec<GattEntry>, ConnectError> {
        self.peripheral
            .discover_services()
            .await
            .map_err(|e| ConnectError::DiscoveryFailure(e.to_string()))?;
        Ok(self
            .peripheral
            .characteristics()
            .into_iter()
            .map(|c| GattEntry {
                service: c.service_uuid,
                characteristic: c.uuid,
            })
            .collect())
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, SubscribeError> {
        let target = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(SubscribeError::CharacteristicNotFound)?;

        self.peripheral
            .subscribe(&target)
            .await
            .map_err(|e| SubscribeError::TransportFailure(e.to_string()))?;
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| SubscribeError::TransportFailure(e.to_string()))?;

        // The btleplug notification stream is shared across characteristics;
        // keep only the one we subscribed to. The stream ends on disconnect.
        Ok(notifications
            .filter_map(move |n| async move {
                (n.uuid == characteristic).then_some(Ok(n.value))
            })
            .boxed())
    }

    async fn disconnect(&self) {
        if let Err(err) = self.peripheral.disconnect().await {
            debug!("Error disconnecting: {err}");
        }
    }
}
