//! Core service façade and bootstrap helpers.
//!
//! This crate is the composition root of the telemetry SDK. It wires the
//! host-provided [`HostLifecycle`](bridge_traits::HostLifecycle) into the
//! lifecycle bridge, owns the shared user identifier store, and connects the
//! crash reporter and the event bus to the bridge's sinks. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`].

pub mod error;

pub use error::{CoreError, Result};

pub use core_crashes::{generate_test_crash, is_test_crash, ErrorReport, TestCrashError};
pub use core_lifecycle::{LifecycleEventBridge, LifecycleSource, ProbeOutcome, ResumeStrategy};
pub use core_runtime::config::{FeatureFlags, SdkConfig};
pub use core_runtime::events::{CrashEvent, EventStream, LifecycleEvent, SdkEvent};

use std::sync::Arc;

use core_crashes::CrashReporter;
use core_lifecycle::{LifecycleSinks, UnhandledExceptionOccurred};
use core_runtime::events::EventBus;
use core_runtime::identity::{is_valid_user_id, UserIdContext, UserIdStore};
use core_runtime::logging::init_logging;
use tokio::runtime::Handle;
use tracing::{info, trace};

#[cfg(feature = "desktop-shims")]
use bridge_desktop::{DesktopHost, DesktopHostOptions};

/// Primary façade exposed to host applications.
pub struct TelemetryService {
    features: FeatureFlags,
    user_ids: Arc<UserIdContext>,
    event_bus: EventBus,
    lifecycle: Arc<LifecycleEventBridge>,
    crash_reporter: Option<Arc<CrashReporter>>,
}

impl TelemetryService {
    /// Start the SDK against `config.host_lifecycle`.
    ///
    /// Hosts supporting the precise resume signal need a current tokio
    /// runtime for the resume probe; use [`start_on`](Self::start_on)
    /// otherwise.
    pub fn start(config: SdkConfig) -> Result<Self> {
        Self::start_with(config, None)
    }

    /// Like [`start`](Self::start), spawning the resume probe on `runtime`.
    pub fn start_on(config: SdkConfig, runtime: Handle) -> Result<Self> {
        Self::start_with(config, Some(runtime))
    }

    fn start_with(config: SdkConfig, runtime: Option<Handle>) -> Result<Self> {
        config.validate()?;

        if let Some(logging) = config.logging.clone() {
            init_logging(logging).map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        }

        let user_ids = UserIdContext::shared();
        user_ids.set_user_id(config.initial_user_id.clone());

        let event_bus = EventBus::new(config.event_buffer_size);
        let sinks = LifecycleSinks::shared();

        if config.features.enable_event_bus_forwarding {
            forward_lifecycle_events(&sinks, &event_bus);
        }

        let crash_reporter = if config.features.enable_crashes {
            let store: Arc<dyn UserIdStore> = user_ids.clone();
            let reporter = Arc::new(CrashReporter::new(store));
            reporter.attach(sinks.as_ref());
            if config.features.enable_event_bus_forwarding {
                forward_crash_reports(&reporter, &event_bus);
            }
            Some(reporter)
        } else {
            None
        };

        // Subscribers are in place before attaching so a resume emitted while
        // attaching is not lost.
        let lifecycle = LifecycleEventBridge::attach_with_sinks(
            Arc::clone(&config.host_lifecycle),
            sinks,
            runtime,
        )?;

        info!(
            strategy = ?lifecycle.strategy(),
            started = lifecycle.is_started(),
            crashes = config.features.enable_crashes,
            "Telemetry service started"
        );

        Ok(Self {
            features: config.features,
            user_ids,
            event_bus,
            lifecycle: Arc::new(lifecycle),
            crash_reporter,
        })
    }

    /// Replace the current user identifier.
    ///
    /// Returns `false`, leaving the current identifier untouched, when the
    /// candidate is too long.
    pub fn set_user_id(&self, user_id: Option<String>) -> bool {
        if !is_valid_user_id(user_id.as_deref()) {
            return false;
        }
        self.user_ids.set_user_id(user_id);
        true
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_ids.user_id()
    }

    /// Shared identifier store, for modules that attach the user to what they
    /// send.
    pub fn user_id_store(&self) -> Arc<dyn UserIdStore> {
        Arc::clone(&self.user_ids) as Arc<dyn UserIdStore>
    }

    pub fn lifecycle(&self) -> Arc<LifecycleEventBridge> {
        Arc::clone(&self.lifecycle)
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Subscribe to the event bus. Only events emitted after this call are
    /// received.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    /// Reports captured so far, oldest first. Empty when crashes are disabled.
    pub fn crash_reports(&self) -> Vec<ErrorReport> {
        self.crash_reporter
            .as_ref()
            .map(|reporter| reporter.reports())
            .unwrap_or_default()
    }

    pub fn crash_reporter(&self) -> Option<Arc<CrashReporter>> {
        self.crash_reporter.clone()
    }
}

impl std::fmt::Debug for TelemetryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryService")
            .field("features", &self.features)
            .field("lifecycle", &self.lifecycle)
            .field("crash_reporter", &self.crash_reporter)
            .finish()
    }
}

fn publish(event_bus: &EventBus, event: SdkEvent) {
    if event_bus.emit(event).is_err() {
        trace!("No event bus subscribers");
    }
}

fn forward_lifecycle_events(sinks: &LifecycleSinks, event_bus: &EventBus) {
    let bus = event_bus.clone();
    sinks.on_suspended(Arc::new(move || {
        publish(&bus, SdkEvent::Lifecycle(LifecycleEvent::Suspended));
    }));

    let bus = event_bus.clone();
    sinks.on_resumed(Arc::new(move || {
        publish(&bus, SdkEvent::Lifecycle(LifecycleEvent::Resumed));
    }));

    let bus = event_bus.clone();
    sinks.on_unhandled_exception(Arc::new(move |event: &UnhandledExceptionOccurred| {
        publish(
            &bus,
            SdkEvent::Lifecycle(LifecycleEvent::UnhandledException {
                source: event.source.to_string(),
                message: event.error.to_string(),
            }),
        );
    }));
}

fn forward_crash_reports(reporter: &CrashReporter, event_bus: &EventBus) {
    let bus = event_bus.clone();
    reporter.on_report(Arc::new(move |report: &ErrorReport| {
        publish(
            &bus,
            SdkEvent::Crash(CrashEvent::ReportCaptured {
                report_id: report.id.to_string(),
                is_test_crash: report.is_test_crash,
            }),
        );
    }));
}

/// Start the SDK on an in-process desktop host.
///
/// Returns the host alongside the service so the application can open
/// surfaces and raise notifications on it. With the default options a tokio
/// runtime must be current.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// use bridge_desktop::DesktopHostOptions;
/// use core_service::bootstrap_desktop;
///
/// let (service, host) = bootstrap_desktop(DesktopHostOptions::default())?;
/// host.open_surface(true).ok();
/// assert!(service.set_user_id(Some("alice".to_string())));
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    options: DesktopHostOptions,
) -> Result<(TelemetryService, Arc<DesktopHost>)> {
    let host = Arc::new(DesktopHost::with_options(options));
    let config = SdkConfig::builder().host_lifecycle(host.clone()).build()?;
    let service = TelemetryService::start(config)?;
    Ok((service, host))
}
