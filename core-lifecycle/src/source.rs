//! Canonical lifecycle events and the sinks that fan them out.

use bridge_traits::{ErrorSource, HostFault};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

pub type SuspendedCallback = Arc<dyn Fn() + Send + Sync>;

pub type ResumedCallback = Arc<dyn Fn() + Send + Sync>;

pub type UnhandledExceptionCallback = Arc<dyn Fn(&UnhandledExceptionOccurred) + Send + Sync>;

/// A fault the host reported as unhandled, paired with the host-supplied
/// source token. Lives only for the duration of one dispatch.
#[derive(Debug, Clone)]
pub struct UnhandledExceptionOccurred {
    pub source: ErrorSource,
    pub error: HostFault,
}

/// Anything that publishes `Suspended`, `Resumed` and
/// `UnhandledExceptionOccurred`.
///
/// Callbacks run synchronously on the thread that raised the underlying
/// notification. A callback registered while an emission is in progress does
/// not receive that emission.
pub trait LifecycleSource: Send + Sync {
    fn on_suspended(&self, callback: SuspendedCallback);

    fn on_resumed(&self, callback: ResumedCallback);

    /// A panicking callback does not stop the fault from being handed back
    /// to the host, but callbacks registered after it miss that emission.
    fn on_unhandled_exception(&self, callback: UnhandledExceptionCallback);
}

struct CallbackList<F: ?Sized> {
    callbacks: RwLock<Vec<Arc<F>>>,
}

impl<F: ?Sized> CallbackList<F> {
    fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, callback: Arc<F>) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    // Callbacks are invoked outside the lock so they may subscribe themselves.
    fn snapshot(&self) -> Vec<Arc<F>> {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Subscriber lists for the three canonical events.
///
/// Sinks can be created and populated before a bridge attaches to the host,
/// which is the only way to be sure of observing a `Resumed` emitted during
/// attach.
pub struct LifecycleSinks {
    suspended: CallbackList<dyn Fn() + Send + Sync>,
    resumed: CallbackList<dyn Fn() + Send + Sync>,
    unhandled_exception: CallbackList<dyn Fn(&UnhandledExceptionOccurred) + Send + Sync>,
}

impl LifecycleSinks {
    pub fn new() -> Self {
        Self {
            suspended: CallbackList::new(),
            resumed: CallbackList::new(),
            unhandled_exception: CallbackList::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Deliver `Suspended` to every subscriber before returning.
    pub fn emit_suspended(&self) {
        let callbacks = self.suspended.snapshot();
        trace!(subscribers = callbacks.len(), "Emitting Suspended");
        callbacks.iter().for_each(|callback| callback());
    }

    /// Deliver `Resumed` to every subscriber before returning.
    pub fn emit_resumed(&self) {
        let callbacks = self.resumed.snapshot();
        trace!(subscribers = callbacks.len(), "Emitting Resumed");
        callbacks.iter().for_each(|callback| callback());
    }

    /// Deliver `UnhandledExceptionOccurred` to every subscriber before
    /// returning.
    pub fn emit_unhandled_exception(&self, event: &UnhandledExceptionOccurred) {
        let callbacks = self.unhandled_exception.snapshot();
        trace!(
            subscribers = callbacks.len(),
            source = %event.source,
            "Emitting UnhandledExceptionOccurred"
        );
        callbacks.iter().for_each(|callback| callback(event));
    }

    pub fn suspended_subscribers(&self) -> usize {
        self.suspended.len()
    }

    pub fn resumed_subscribers(&self) -> usize {
        self.resumed.len()
    }

    pub fn unhandled_exception_subscribers(&self) -> usize {
        self.unhandled_exception.len()
    }
}

impl Default for LifecycleSinks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSinks")
            .field("suspended", &self.suspended_subscribers())
            .field("resumed", &self.resumed_subscribers())
            .field("unhandled_exception", &self.unhandled_exception_subscribers())
            .finish()
    }
}

impl LifecycleSource for LifecycleSinks {
    fn on_suspended(&self, callback: SuspendedCallback) {
        self.suspended.push(callback);
    }

    fn on_resumed(&self, callback: ResumedCallback) {
        self.resumed.push(callback);
    }

    fn on_unhandled_exception(&self, callback: UnhandledExceptionCallback) {
        self.unhandled_exception.push(callback);
    }
}
