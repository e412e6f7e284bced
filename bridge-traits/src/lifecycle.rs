//! Application Lifecycle Notifications
//!
//! Host-side contract for the lifecycle notifications the telemetry core
//! listens to, the UI dispatch queue it probes visibility on, and the
//! unhandled-error hook it observes crashes through.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

/// Fault object reported by the host as unhandled.
///
/// Shared so the exact same object can be forwarded to observers and then
/// handed back to the host's native fault path. Compare with [`Arc::ptr_eq`].
pub type HostFault = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Handler for payload-less lifecycle notifications.
pub type NotificationHandler = Arc<dyn Fn() + Send + Sync>;

/// Handler for the host's unhandled-error notification.
///
/// Returning `Err(fault)` hands the fault back to the host so native crash
/// tooling keeps handling it. Returning `Ok(())` marks it as terminated.
pub type UnhandledErrorHandler =
    Arc<dyn Fn(ErrorSource, UnhandledError) -> std::result::Result<(), HostFault> + Send + Sync>;

/// Work item executed on the host's UI thread.
pub type UiWork = Box<dyn FnOnce() + Send + 'static>;

/// Native lifecycle notifications a host may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleNotification {
    /// The application is about to be suspended.
    Suspending,
    /// Coarse resume signal, available on every host revision.
    Resuming,
    /// Precise "left background" signal, only on newer host revisions.
    LeavingBackground,
    /// A fault escaped application code.
    UnhandledError,
}

impl LifecycleNotification {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleNotification::Suspending => "Suspending",
            LifecycleNotification::Resuming => "Resuming",
            LifecycleNotification::LeavingBackground => "LeavingBackground",
            LifecycleNotification::UnhandledError => "UnhandledErrorDetected",
        }
    }
}

impl fmt::Display for LifecycleNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token identifying who raised an unhandled error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorSource(pub String);

impl ErrorSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unhandled-error notification payload.
///
/// Obtaining the fault with [`propagate`](Self::propagate) marks the error as
/// handled on the host side; a handler that only wants to observe the fault
/// must hand it back by returning `Err(fault)`.
#[derive(Debug)]
pub struct UnhandledError {
    fault: HostFault,
    handled: AtomicBool,
}

impl UnhandledError {
    pub fn new(fault: HostFault) -> Self {
        Self {
            fault,
            handled: AtomicBool::new(false),
        }
    }

    /// Returns the captured fault object and marks the error handled.
    pub fn propagate(&self) -> HostFault {
        self.handled.store(true, Ordering::SeqCst);
        Arc::clone(&self.fault)
    }

    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::SeqCst)
    }
}

/// Host UI dispatch queue.
///
/// Some host state (window visibility in particular) may only be read from
/// the UI thread. Implementations run `work` there and resolve once it has
/// finished.
#[async_trait::async_trait]
pub trait UiDispatcher: Send + Sync {
    /// Queue `work` on the UI thread and wait for it to complete.
    ///
    /// Fails with [`BridgeError::PlatformNotReady`](crate::BridgeError::PlatformNotReady)
    /// when the UI thread is not accepting work yet.
    async fn run_async(&self, work: UiWork) -> Result<()>;
}

/// Application lifecycle surface of the host platform.
///
/// # Platform Support
///
/// - **Windows (UWP/WinUI)**: `CoreApplication` Suspending / Resuming /
///   LeavingBackground / UnhandledErrorDetected
/// - **Desktop**: see `bridge-desktop`, an in-process host with a dedicated
///   UI thread
///
/// # Example
///
/// ```ignore
/// use bridge_traits::lifecycle::{HostLifecycle, LifecycleNotification};
/// use std::sync::Arc;
///
/// fn wire(host: &dyn HostLifecycle) -> bridge_traits::error::Result<()> {
///     if host.is_notification_present(LifecycleNotification::LeavingBackground)? {
///         host.on_leaving_background(Arc::new(|| tracing::info!("visible")))?;
///     }
///     Ok(())
/// }
/// ```
pub trait HostLifecycle: Send + Sync {
    /// Capability query: does this host revision raise `notification`?
    fn is_notification_present(&self, notification: LifecycleNotification) -> Result<bool>;

    /// Register for the "suspending" notification.
    fn on_suspending(&self, handler: NotificationHandler) -> Result<()>;

    /// Register for the coarse "resuming" notification.
    fn on_resuming(&self, handler: NotificationHandler) -> Result<()>;

    /// Register for the precise "left background" notification.
    ///
    /// Fails with `NotAvailable` on host revisions without it.
    fn on_leaving_background(&self, handler: NotificationHandler) -> Result<()>;

    /// Register for unhandled errors.
    fn on_unhandled_error(&self, handler: UnhandledErrorHandler) -> Result<()>;

    /// Dispatcher of the main surface.
    ///
    /// `Err(PlatformNotReady)` while the main surface has not been created,
    /// `Ok(None)` when it exists but has no window attached.
    fn main_dispatcher(&self) -> Result<Option<Arc<dyn UiDispatcher>>>;

    /// Whether any surface is currently shown.
    ///
    /// Must be called from the UI thread. Fails with `PlatformNotReady` when
    /// no main surface exists yet.
    fn query_visible_surfaces(&self) -> Result<bool>;
}
