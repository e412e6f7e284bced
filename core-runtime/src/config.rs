//! # SDK Configuration Module
//!
//! Provides configuration management for the telemetry SDK core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an `SdkConfig`
//! instance that holds the host bridge and the settings the service façade
//! needs. It enforces fail-fast validation so a misconfigured host is reported
//! before any lifecycle handler is registered.
//!
//! ## Required Dependencies
//!
//! - `HostLifecycle` - Source of suspend/resume/unhandled-error notifications
//!
//! When the `desktop-shims` feature is enabled, a `DesktopHost` is injected
//! automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SdkConfig;
//! use std::sync::Arc;
//!
//! let config = SdkConfig::builder()
//!     .host_lifecycle(Arc::new(MyHost::new()))
//!     .initial_user_id("user-42")
//!     .enable_crashes(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::identity::{is_valid_user_id, USER_ID_MAX_LENGTH};
use crate::logging::LoggingConfig;
use bridge_traits::HostLifecycle;
use std::sync::Arc;

/// Upper bound for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Turn unhandled exceptions into stored error reports
    pub enable_crashes: bool,

    /// Mirror lifecycle and crash events onto the broadcast event bus
    pub enable_event_bus_forwarding: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_crashes: true,
            enable_event_bus_forwarding: true,
        }
    }
}

/// Configuration for the telemetry SDK.
///
/// Use [`SdkConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct SdkConfig {
    /// Host lifecycle bridge (required)
    pub host_lifecycle: Arc<dyn HostLifecycle>,

    /// Buffer size of the broadcast event bus
    pub event_buffer_size: usize,

    /// User identifier applied at start-up
    pub initial_user_id: Option<String>,

    /// Logging setup; `None` leaves the global subscriber untouched
    pub logging: Option<LoggingConfig>,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkConfig")
            .field("host_lifecycle", &"HostLifecycle { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "initial_user_id",
                &self.initial_user_id.as_ref().map(|_| "[REDACTED]"),
            )
            .field("logging", &self.logging)
            .field("features", &self.features)
            .finish()
    }
}

impl SdkConfig {
    /// Creates a new builder for constructing an `SdkConfig`.
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is > 0 and below [`MAX_EVENT_BUFFER_SIZE`]
    /// - The initial user identifier passes identifier validation
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if !is_valid_user_id(self.initial_user_id.as_deref()) {
            return Err(Error::Config(format!(
                "Initial user id exceeds {} characters",
                USER_ID_MAX_LENGTH
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_host_lifecycle() -> Result<Arc<dyn HostLifecycle>> {
    Err(Error::CapabilityMissing {
        capability: "HostLifecycle".to_string(),
        message: "HostLifecycle implementation is required to observe suspend/resume. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default DesktopHost. \
                 Windows: inject a CoreApplication-backed host."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_host_lifecycle() -> Result<Arc<dyn HostLifecycle>> {
    use bridge_desktop::DesktopHost;

    let host: Arc<dyn HostLifecycle> = Arc::new(DesktopHost::new());
    Ok(host)
}

/// Builder for constructing [`SdkConfig`] instances.
#[derive(Default)]
pub struct SdkConfigBuilder {
    host_lifecycle: Option<Arc<dyn HostLifecycle>>,
    event_buffer_size: Option<usize>,
    initial_user_id: Option<String>,
    logging: Option<LoggingConfig>,
    features: FeatureFlags,
}

impl SdkConfigBuilder {
    /// Sets the host lifecycle implementation (required).
    pub fn host_lifecycle(mut self, host: Arc<dyn HostLifecycle>) -> Self {
        self.host_lifecycle = Some(host);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the user identifier applied at start-up.
    pub fn initial_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.initial_user_id = Some(user_id.into());
        self
    }

    /// Installs a global tracing subscriber when the service starts.
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Enables or disables crash reporting.
    pub fn enable_crashes(mut self, enabled: bool) -> Self {
        self.features.enable_crashes = enabled;
        self
    }

    /// Enables or disables mirroring onto the event bus.
    pub fn enable_event_bus_forwarding(mut self, enabled: bool) -> Self {
        self.features.enable_event_bus_forwarding = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `SdkConfig` instance.
    ///
    /// Returns an error if the host bridge is missing (and no desktop default
    /// is compiled in) or if any value fails validation.
    pub fn build(self) -> Result<SdkConfig> {
        let host_lifecycle = match self.host_lifecycle {
            Some(host) => host,
            None => provide_default_host_lifecycle()?,
        };

        let config = SdkConfig {
            host_lifecycle,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            initial_user_id: self.initial_user_id,
            logging: self.logging,
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
