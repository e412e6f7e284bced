use thiserror::Error;

/// Failures raised while assembling the runtime, before any host
/// notification has been registered.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid builder input, log filter or subscriber installation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host collaborator was not supplied.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
