use bridge_traits::{BridgeError, LifecycleNotification};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Host capability query failed: {0}")]
    Capability(#[source] BridgeError),

    #[error("Failed to register {notification} handler: {source}")]
    Registration {
        notification: LifecycleNotification,
        #[source]
        source: BridgeError,
    },

    #[error("Async runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Resume probe failed: {0}")]
    Probe(#[source] BridgeError),

    #[error("Resume probe was dropped by the UI dispatcher before reporting")]
    ProbeAbandoned,
}

impl LifecycleError {
    pub(crate) fn registration(notification: LifecycleNotification, source: BridgeError) -> Self {
        LifecycleError::Registration {
            notification,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
