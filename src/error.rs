use thiserror::Error;

/// Decoding failures for a single heart-rate measurement payload.
///
/// Non-terminal: a bad payload is skipped and the notification stream
/// keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("measurement payload too short: {0} bytes")]
    TooShort(usize),
}

/// Failures while opening a session (connect + discovery).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("transport connect failed: {0}")]
    TransportFailure(String),

    #[error("service/characteristic discovery failed: {0}")]
    DiscoveryFailure(String),
}

/// A single failed notification element. Non-terminal for the stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification dropped by transport: {0}")]
    Transport(String),
}

/// Failures while establishing a subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscribeError {
    #[error("characteristic not found on device")]
    CharacteristicNotFound,

    #[error("subscribe failed: {0}")]
    TransportFailure(String),
}

/// Terminal failure kinds carried by `ConnectionState::Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    #[error("radio permission not granted")]
    PermissionDenied,

    #[error("scan failed: {0}")]
    ScanFailure(String),

    #[error("connect failed: {0}")]
    ConnectFailure(String),

    #[error("discovery failed: {0}")]
    DiscoveryFailure(String),

    #[error("characteristic not found on device")]
    CharacteristicNotFound,

    #[error("device disconnected")]
    Disconnected,
}

impl From<ConnectError> for FailureKind {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::TransportFailure(msg) => FailureKind::ConnectFailure(msg),
            ConnectError::DiscoveryFailure(msg) => FailureKind::DiscoveryFailure(msg),
        }
    }
}

impl From<SubscribeError> for FailureKind {
    fn from(err: SubscribeError) -> Self {
        match err {
            SubscribeError::CharacteristicNotFound => FailureKind::CharacteristicNotFound,
            SubscribeError::TransportFailure(msg) => FailureKind::ConnectFailure(msg),
        }
    }
}
