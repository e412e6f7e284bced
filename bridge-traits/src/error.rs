use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Platform not ready: {0}")]
    PlatformNotReady(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),
}

impl BridgeError {
    /// Whether this is the expected "no main surface yet" condition raised
    /// while the host is still starting up.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, BridgeError::PlatformNotReady(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
