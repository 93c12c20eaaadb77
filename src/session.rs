use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use crate::error::{ConnectError, SubscribeError};
use crate::transport::{Connection, DeviceAddress, GattEntry, NotificationStream, RadioTransport};

/// One connection to one peripheral: connect, enumerate GATT, subscribe,
/// release. The session exclusively owns the underlying connection handle.
pub struct Session {
    connection: Box<dyn Connection>,
    discovered: Vec<GattEntry>,
    closed: bool,
}

impl Session {
    /// Connect to `address` and enumerate all services and characteristics.
    /// Both steps are terminal on failure; a connection left half-open by a
    /// discovery failure is released before returning.
    pub async fn open(
        transport: &Arc<dyn RadioTransport>,
        address: &DeviceAddress,
    ) -> Result<Session, ConnectError> {
        let connection = transport.connect(address).await?;
        info!("Connected to {address}");

        let discovered = match connection.discover_all().await {
            Ok(entries) => entries,
            Err(err) => {
                connection.disconnect().await;
                return Err(err);
            }
        };

        for entry in &discovered {
            debug!(
                "Service: {}, Characteristic: {}",
                entry.service, entry.characteristic
            );
        }

        Ok(Session {
            connection,
            discovered,
            closed: false,
        })
    }

    /// Subscribe to notifications from one characteristic. Fails with
    /// `CharacteristicNotFound` when the pair is absent from the set
    /// enumerated at open time.
    pub async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, SubscribeError> {
        let present = self
            .discovered
            .iter()
            .any(|e| e.service == service && e.characteristic == characteristic);
        if !present {
            return Err(SubscribeError::CharacteristicNotFound);
        }

        self.connection.subscribe(service, characteristic).await
    }

    /// Every (service, characteristic) pair enumerated at open time.
    /// Diagnostic only.
    pub fn gatt_log(&self) -> &[GattEntry] {
        &self.discovered
    }

    /// Release the connection. Safe to call from any state, any number of
    /// times.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!("Closing session");
        self.connection.disconnect().await;
    }
}
