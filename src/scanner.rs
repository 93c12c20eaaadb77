use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt as _;
use log::{debug, info, warn};

use crate::error::FailureKind;
use crate::transport::{Advertisement, DeviceIdentity, RadioTransport};

/// Discovers the target peripheral. Runs an unfiltered scan and applies the
/// identity predicate in-process; at most one scan is in flight at a time.
pub struct Scanner {
    transport: Arc<dyn RadioTransport>,
    scanning: AtomicBool,
}

impl Scanner {
    pub fn new(transport: Arc<dyn RadioTransport>) -> Self {
        Scanner {
            transport,
            scanning: AtomicBool::new(false),
        }
    }

    /// Whether a scan is currently in flight.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Scan until the first advertisement matching `predicate`, stop the
    /// scan, and return the match. Advertisements still in flight after the
    /// match are discarded.
    ///
    /// Returns `Ok(None)` without starting anything if a scan is already in
    /// flight, or if the advertisement stream ends before a match.
    pub async fn find_first(
        &self,
        predicate: impl Fn(&DeviceIdentity) -> bool,
    ) -> Result<Option<Advertisement>, FailureKind> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            debug!("Scan already in flight, ignoring request");
            return Ok(None);
        }

        let result = self.scan_for_match(predicate).await;

        // The transport scan is torn down on every exit path, match or not.
        if let Err(err) = self.transport.stop_scan().await {
            warn!("Error stopping scan: {err}");
        }
        self.scanning.store(false, Ordering::SeqCst);

        result
    }

    async fn scan_for_match(
        &self,
        predicate: impl Fn(&DeviceIdentity) -> bool,
    ) -> Result<Option<Advertisement>, FailureKind> {
        let mut advertisements = self
            .transport
            .start_scan()
            .await
            .map_err(FailureKind::ScanFailure)?;

        while let Some(event) = advertisements.next().await {
            let advertisement = event.map_err(FailureKind::ScanFailure)?;
            let identity = &advertisement.identity;
            debug!(
                "Advertisement: name={} address={}",
                identity.name.as_deref().unwrap_or("unknown"),
                identity.address
            );

            if predicate(identity) {
                info!("Found target device at {}", identity.address);
                return Ok(Some(advertisement));
            }
        }

        debug!("Advertisement stream ended without a match");
        Ok(None)
    }
}
