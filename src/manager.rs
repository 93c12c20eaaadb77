use std::sync::Arc;

use futures::StreamExt as _;
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::decode::{MeasurementReading, decode};
use crate::error::FailureKind;
use crate::scanner::Scanner;
use crate::session::Session;
use crate::transport::{
    DeviceIdentity, GattEntry, HEART_RATE_MEASUREMENT, HEART_RATE_SERVICE, NotificationStream,
    RadioTransport,
};

/// The one externally observable connection state. Exactly one value holds
/// at any instant; transitions are the only way it changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Scanning,
    Connecting,
    Connected(DeviceIdentity),
    Failed(FailureKind),
}

pub type IdentityMatcher = Box<dyn Fn(&DeviceIdentity) -> bool + Send + Sync>;

/// Sequences scan, connect, and subscribe for one target device, and routes
/// decoded readings and faults to the caller.
///
/// Single logical owner: every transition completes before the next external
/// event is applied. No automatic retries anywhere; recovery is always a new
/// caller request, which re-enters from Idle or Failed.
pub struct Manager {
    transport: Arc<dyn RadioTransport>,
    scanner: Scanner,
    matcher: IdentityMatcher,
    permission_granted: bool,
    state: watch::Sender<ConnectionState>,
    reading: watch::Sender<Option<MeasurementReading>>,
    session: Option<Session>,
    notifications: Option<NotificationStream>,
    gatt_log: Vec<GattEntry>,
    sequence: u64,
}

impl Manager {
    pub fn new(
        transport: Arc<dyn RadioTransport>,
        matcher: IdentityMatcher,
        permission_granted: bool,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (reading, _) = watch::channel(None);
        Manager {
            scanner: Scanner::new(transport.clone()),
            transport,
            matcher,
            permission_granted,
            state,
            reading,
            session: None,
            notifications: None,
            gatt_log: Vec::new(),
            sequence: 0,
        }
    }

    pub fn current_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver the presentation layer follows for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Receiver for the latest reading, superseded on each notification.
    pub fn subscribe_readings(&self) -> watch::Receiver<Option<MeasurementReading>> {
        self.reading.subscribe()
    }

    /// Append-only log of every (service, characteristic) pair discovered
    /// across sessions. Informational only.
    pub fn gatt_log(&self) -> &[GattEntry] {
        &self.gatt_log
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Caller request: from Idle or Failed, run the scan → connect →
    /// subscribe pipeline until Connected or Failed. A request while the
    /// pipeline is already past Idle is a no-op.
    pub async fn request(&mut self) {
        let busy = !matches!(
            &*self.state.borrow(),
            ConnectionState::Idle | ConnectionState::Failed(_)
        );
        if busy {
            debug!("Connection already in progress, ignoring request");
            return;
        }

        if !self.permission_granted {
            self.transition(ConnectionState::Failed(FailureKind::PermissionDenied));
            return;
        }

        self.reading.send_replace(None);
        self.transition(ConnectionState::Scanning);

        let found = match self.scanner.find_first(|id| (self.matcher)(id)).await {
            Ok(Some(advertisement)) => advertisement,
            Ok(None) => {
                debug!("Scan ended without a match");
                self.transition(ConnectionState::Idle);
                return;
            }
            Err(kind) => {
                self.transition(ConnectionState::Failed(kind));
                return;
            }
        };

        self.transition(ConnectionState::Connecting);
        let identity = found.identity;

        let session = match Session::open(&self.transport, &identity.address).await {
            Ok(session) => session,
            Err(err) => {
                self.transition(ConnectionState::Failed(err.into()));
                return;
            }
        };

        match session.subscribe(HEART_RATE_SERVICE, HEART_RATE_MEASUREMENT).await {
            Ok(stream) => {
                self.gatt_log.extend_from_slice(session.gatt_log());
                self.session = Some(session);
                self.notifications = Some(stream);
                self.transition(ConnectionState::Connected(identity));
            }
            Err(err) => {
                let mut session = session;
                session.close().await;
                self.transition(ConnectionState::Failed(err.into()));
            }
        }
    }

    /// Forward notifications until the stream terminates, then fail over to
    /// `Disconnected`. Decode errors and single failed notifications are
    /// absorbed: logged, state unchanged, stream kept running.
    pub async fn run(&mut self) {
        while self.pump_one().await {}
    }

    /// Process one notification event. Returns false once the stream has
    /// terminated (or none was ever established).
    pub async fn pump_one(&mut self) -> bool {
        let Some(stream) = self.notifications.as_mut() else {
            return false;
        };

        match stream.next().await {
            Some(Ok(payload)) => {
                match decode(&payload, self.sequence) {
                    Ok(reading) => {
                        self.sequence += 1;
                        info!("Heart rate: {} bpm", reading.bpm);
                        self.reading.send_replace(Some(reading));
                    }
                    Err(err) => warn!("Skipping malformed measurement: {err}"),
                }
                true
            }
            Some(Err(err)) => {
                warn!("Notification error: {err}");
                true
            }
            None => {
                info!("Notification stream terminated");
                self.notifications = None;
                self.fail(FailureKind::Disconnected).await;
                false
            }
        }
    }

    async fn fail(&mut self, kind: FailureKind) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.transition(ConnectionState::Failed(kind));
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("State: {:?} -> {:?}", *self.state.borrow(), next);
        self.state.send_replace(next);
    }
}
