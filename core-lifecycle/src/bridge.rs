//! # Lifecycle Event Bridge
//!
//! Translates the host's native lifecycle notifications into the canonical
//! `Suspended` / `Resumed` / `UnhandledExceptionOccurred` events.
//!
//! ## Attach sequence
//!
//! Everything except the resume probe runs synchronously inside
//! [`LifecycleEventBridge::attach`]:
//!
//! 1. "suspending" is mapped to `Suspended`.
//! 2. The [`ResumeStrategy`] is detected once.
//!    - `Precise`: "left background" is mapped to `Resumed` and a visibility
//!      probe is spawned on the tokio runtime.
//!    - `Coarse`: "resuming" is mapped to `Resumed` and `Resumed` is emitted
//!      before `attach` returns.
//! 3. The host's unhandled-error hook is observed. The fault is forwarded to
//!    subscribers and then handed back to the host untouched, even if a
//!    subscriber panics.
//!
//! The probe is spawned last, so every emission made while attaching happens
//! before any emission made by the probe.
//!
//! ## Started state
//!
//! `started` flips to `true` the first time `Resumed` is emitted and never
//! flips back. Native notifications always emit. The probe emits only if it
//! wins the `false -> true` transition, so it can never produce a second
//! resume.

use bridge_traits::{
    ErrorSource, HostFault, HostLifecycle, LifecycleNotification, NotificationHandler,
    UnhandledError, UnhandledErrorHandler,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::{LifecycleError, Result};
use crate::probe::{self, ProbeOutcome};
use crate::source::{
    LifecycleSinks, LifecycleSource, ResumedCallback, SuspendedCallback,
    UnhandledExceptionCallback, UnhandledExceptionOccurred,
};
use crate::strategy::ResumeStrategy;

/// Handle to the spawned resume probe. Awaiting it is the only way to observe
/// a probe failure.
pub type ResumeProbe = JoinHandle<Result<ProbeOutcome>>;

/// Bridge between one host and any number of lifecycle subscribers.
pub struct LifecycleEventBridge {
    host: Arc<dyn HostLifecycle>,
    sinks: Arc<LifecycleSinks>,
    strategy: ResumeStrategy,
    started: Arc<AtomicBool>,
    resume_probe: Mutex<Option<ResumeProbe>>,
}

impl LifecycleEventBridge {
    /// Attach to `host` with empty sinks, spawning the probe (if any) on the
    /// current tokio runtime.
    ///
    /// Subscribers registered afterwards miss anything emitted while
    /// attaching; use [`attach_with_sinks`](Self::attach_with_sinks) to
    /// subscribe first.
    pub fn attach(host: Arc<dyn HostLifecycle>) -> Result<Self> {
        Self::attach_with_sinks(host, LifecycleSinks::shared(), None)
    }

    /// Attach to `host`, delivering to the already populated `sinks`.
    ///
    /// `runtime` is where the resume probe is spawned; `None` uses the
    /// current runtime. A runtime is only needed when the host supports the
    /// precise strategy.
    ///
    /// On error, registrations made before the failing step stay with the
    /// host.
    #[instrument(skip_all)]
    pub fn attach_with_sinks(
        host: Arc<dyn HostLifecycle>,
        sinks: Arc<LifecycleSinks>,
        runtime: Option<Handle>,
    ) -> Result<Self> {
        let started = Arc::new(AtomicBool::new(false));

        host.on_suspending(suspending_handler(&sinks))
            .map_err(|e| LifecycleError::registration(LifecycleNotification::Suspending, e))?;

        let strategy = ResumeStrategy::detect(host.as_ref())?;

        let probe_runtime = match (strategy.probes_visibility(), runtime) {
            (false, _) => None,
            (true, Some(handle)) => Some(handle),
            (true, None) => Some(
                Handle::try_current()
                    .map_err(|e| LifecycleError::RuntimeUnavailable(e.to_string()))?,
            ),
        };

        let resume = resume_handler(&sinks, &started);
        let registered = match strategy {
            ResumeStrategy::Precise => host.on_leaving_background(resume),
            ResumeStrategy::Coarse => host.on_resuming(resume),
        };
        registered.map_err(|e| LifecycleError::registration(strategy.resume_notification(), e))?;

        if strategy.resumes_on_attach() {
            started.store(true, Ordering::SeqCst);
            sinks.emit_resumed();
        }

        host.on_unhandled_error(unhandled_error_handler(&sinks))
            .map_err(|e| LifecycleError::registration(LifecycleNotification::UnhandledError, e))?;

        let bridge = Self {
            host,
            sinks,
            strategy,
            started,
            resume_probe: Mutex::new(None),
        };

        if let Some(runtime) = probe_runtime {
            let probe = runtime.spawn(run_probe(
                Arc::clone(&bridge.host),
                Arc::clone(&bridge.sinks),
                Arc::clone(&bridge.started),
            ));
            *bridge.lock_probe() = Some(probe);
        }

        info!(?strategy, started = bridge.is_started(), "Lifecycle bridge attached");
        Ok(bridge)
    }

    /// Whether `Resumed` has been emitted at least once.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn strategy(&self) -> ResumeStrategy {
        self.strategy
    }

    pub fn sinks(&self) -> Arc<LifecycleSinks> {
        Arc::clone(&self.sinks)
    }

    /// Take the handle of the probe spawned while attaching.
    ///
    /// Returns `None` under the coarse strategy or when already taken.
    pub fn take_resume_probe(&self) -> Option<ResumeProbe> {
        self.lock_probe().take()
    }

    /// Evaluate the resume probe again and apply its outcome.
    ///
    /// Emits `Resumed` only if nothing has been emitted yet and a surface is
    /// visible.
    pub async fn probe_resume(&self) -> Result<ProbeOutcome> {
        run_probe(
            Arc::clone(&self.host),
            Arc::clone(&self.sinks),
            Arc::clone(&self.started),
        )
        .await
    }

    fn lock_probe(&self) -> std::sync::MutexGuard<'_, Option<ResumeProbe>> {
        self.resume_probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LifecycleEventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEventBridge")
            .field("strategy", &self.strategy)
            .field("started", &self.is_started())
            .field("sinks", &self.sinks)
            .finish()
    }
}

impl LifecycleSource for LifecycleEventBridge {
    fn on_suspended(&self, callback: SuspendedCallback) {
        self.sinks.on_suspended(callback);
    }

    fn on_resumed(&self, callback: ResumedCallback) {
        self.sinks.on_resumed(callback);
    }

    fn on_unhandled_exception(&self, callback: UnhandledExceptionCallback) {
        self.sinks.on_unhandled_exception(callback);
    }
}

fn suspending_handler(sinks: &Arc<LifecycleSinks>) -> NotificationHandler {
    let sinks = Arc::clone(sinks);
    Arc::new(move || sinks.emit_suspended())
}

fn resume_handler(sinks: &Arc<LifecycleSinks>, started: &Arc<AtomicBool>) -> NotificationHandler {
    let sinks = Arc::clone(sinks);
    let started = Arc::clone(started);
    Arc::new(move || {
        started.store(true, Ordering::SeqCst);
        sinks.emit_resumed();
    })
}

fn unhandled_error_handler(sinks: &Arc<LifecycleSinks>) -> UnhandledErrorHandler {
    let sinks = Arc::clone(sinks);
    Arc::new(
        move |source: ErrorSource, error: UnhandledError| -> std::result::Result<(), HostFault> {
            let fault = error.propagate();
            let event = UnhandledExceptionOccurred {
                source,
                error: Arc::clone(&fault),
            };
            // The host already counts the fault as handled, so it must go back
            // even when a subscriber panics.
            if panic::catch_unwind(AssertUnwindSafe(|| sinks.emit_unhandled_exception(&event)))
                .is_err()
            {
                error!(source = %event.source, "Unhandled exception subscriber panicked");
            }
            Err(fault)
        },
    )
}

async fn run_probe(
    host: Arc<dyn HostLifecycle>,
    sinks: Arc<LifecycleSinks>,
    started: Arc<AtomicBool>,
) -> Result<ProbeOutcome> {
    let outcome = probe::evaluate(host, Arc::clone(&started)).await?;
    if !outcome.needs_resume() {
        debug!(?outcome, "Resume probe finished without resume");
        return Ok(outcome);
    }

    if started
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        debug!("Application already visible, emitting Resumed");
        sinks.emit_resumed();
        Ok(outcome)
    } else {
        Ok(ProbeOutcome::AlreadyStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, UiDispatcher, UiWork};
    use std::sync::atomic::AtomicUsize;
    use std::sync::RwLock;

    #[derive(Debug, thiserror::Error)]
    #[error("division by zero")]
    struct DivisionByZero;

    struct InlineDispatcher;

    #[async_trait]
    impl UiDispatcher for InlineDispatcher {
        async fn run_async(&self, work: UiWork) -> BridgeResult<()> {
            work();
            Ok(())
        }
    }

    #[derive(Default)]
    struct Handlers {
        suspending: Vec<NotificationHandler>,
        resuming: Vec<NotificationHandler>,
        leaving_background: Vec<NotificationHandler>,
        unhandled_error: Vec<UnhandledErrorHandler>,
    }

    /// Host double recording registrations so tests can fire them.
    struct FakeHost {
        precise: BridgeResult<bool>,
        visible: RwLock<Option<bool>>,
        reject_unhandled_error: bool,
        handlers: RwLock<Handlers>,
    }

    impl FakeHost {
        fn new(precise: bool) -> Self {
            Self {
                precise: Ok(precise),
                visible: RwLock::new(None),
                reject_unhandled_error: false,
                handlers: RwLock::new(Handlers::default()),
            }
        }

        fn with_visible_surface(self, visible: bool) -> Self {
            *self.visible.write().unwrap() = Some(visible);
            self
        }

        fn fire(&self, notification: LifecycleNotification) {
            let handlers = self.handlers.read().unwrap();
            let list = match notification {
                LifecycleNotification::Suspending => handlers.suspending.clone(),
                LifecycleNotification::Resuming => handlers.resuming.clone(),
                LifecycleNotification::LeavingBackground => handlers.leaving_background.clone(),
                LifecycleNotification::UnhandledError => Vec::new(),
            };
            drop(handlers);
            list.iter().for_each(|handler| handler());
        }

        fn raise(&self, fault: HostFault) -> Vec<std::result::Result<(), HostFault>> {
            let handlers = self.handlers.read().unwrap().unhandled_error.clone();
            handlers
                .iter()
                .map(|handler| {
                    handler(ErrorSource::new("test"), UnhandledError::new(Arc::clone(&fault)))
                })
                .collect()
        }
    }

    impl HostLifecycle for FakeHost {
        fn is_notification_present(&self, _: LifecycleNotification) -> BridgeResult<bool> {
            match &self.precise {
                Ok(precise) => Ok(*precise),
                Err(e) => Err(BridgeError::OperationFailed(e.to_string())),
            }
        }

        fn on_suspending(&self, handler: NotificationHandler) -> BridgeResult<()> {
            self.handlers.write().unwrap().suspending.push(handler);
            Ok(())
        }

        fn on_resuming(&self, handler: NotificationHandler) -> BridgeResult<()> {
            self.handlers.write().unwrap().resuming.push(handler);
            Ok(())
        }

        fn on_leaving_background(&self, handler: NotificationHandler) -> BridgeResult<()> {
            self.handlers.write().unwrap().leaving_background.push(handler);
            Ok(())
        }

        fn on_unhandled_error(&self, handler: UnhandledErrorHandler) -> BridgeResult<()> {
            if self.reject_unhandled_error {
                return Err(BridgeError::OperationFailed("hook locked".to_string()));
            }
            self.handlers.write().unwrap().unhandled_error.push(handler);
            Ok(())
        }

        fn main_dispatcher(&self) -> BridgeResult<Option<Arc<dyn UiDispatcher>>> {
            match *self.visible.read().unwrap() {
                Some(_) => Ok(Some(Arc::new(InlineDispatcher) as Arc<dyn UiDispatcher>)),
                None => Err(BridgeError::PlatformNotReady(
                    "main surface not created".to_string(),
                )),
            }
        }

        fn query_visible_surfaces(&self) -> BridgeResult<bool> {
            self.visible
                .read()
                .unwrap()
                .ok_or_else(|| BridgeError::PlatformNotReady("no surface".to_string()))
        }
    }

    struct Counters {
        suspended: Arc<AtomicUsize>,
        resumed: Arc<AtomicUsize>,
    }

    fn counted_sinks() -> (Arc<LifecycleSinks>, Counters) {
        let sinks = LifecycleSinks::shared();
        let suspended = Arc::new(AtomicUsize::new(0));
        let resumed = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&suspended);
        sinks.on_suspended(Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        let count = Arc::clone(&resumed);
        sinks.on_resumed(Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        (sinks, Counters { suspended, resumed })
    }

    #[test]
    fn test_coarse_resumes_before_attach_returns() {
        let host = Arc::new(FakeHost::new(false));
        let (sinks, counters) = counted_sinks();

        let bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();

        assert_eq!(bridge.strategy(), ResumeStrategy::Coarse);
        assert!(bridge.is_started());
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 1);
        assert!(bridge.take_resume_probe().is_none());
        assert_eq!(host.handlers.read().unwrap().resuming.len(), 1);
        assert!(host.handlers.read().unwrap().leaving_background.is_empty());
    }

    #[test]
    fn test_coarse_attach_without_subscribers_or_runtime() {
        let host = Arc::new(FakeHost::new(false));
        let bridge = LifecycleEventBridge::attach(host).unwrap();
        assert!(bridge.is_started());
    }

    #[test]
    fn test_coarse_resuming_emits_every_time() {
        let host = Arc::new(FakeHost::new(false));
        let (sinks, counters) = counted_sinks();
        let _bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();

        host.fire(LifecycleNotification::Resuming);
        host.fire(LifecycleNotification::Resuming);

        assert_eq!(counters.resumed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_suspended_once_per_notification() {
        let host = Arc::new(FakeHost::new(false));
        let (sinks, counters) = counted_sinks();
        let _bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();

        for _ in 0..3 {
            host.fire(LifecycleNotification::Suspending);
        }
        assert_eq!(counters.suspended.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_precise_requires_runtime() {
        let host = Arc::new(FakeHost::new(true));
        let result = LifecycleEventBridge::attach(host);
        assert!(matches!(result, Err(LifecycleError::RuntimeUnavailable(_))));
    }

    #[test]
    fn test_capability_failure_propagates() {
        let mut host = FakeHost::new(true);
        host.precise = Err(BridgeError::OperationFailed("broken".to_string()));
        let result = LifecycleEventBridge::attach(Arc::new(host));
        assert!(matches!(result, Err(LifecycleError::Capability(_))));
    }

    #[test]
    fn test_registration_failure_names_notification() {
        let mut host = FakeHost::new(false);
        host.reject_unhandled_error = true;
        let result = LifecycleEventBridge::attach(Arc::new(host));
        match result {
            Err(LifecycleError::Registration { notification, .. }) => {
                assert_eq!(notification, LifecycleNotification::UnhandledError);
            }
            other => panic!("expected registration failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_precise_probe_emits_when_visible() {
        let host = Arc::new(FakeHost::new(true).with_visible_surface(true));
        let (sinks, counters) = counted_sinks();

        let bridge = LifecycleEventBridge::attach_with_sinks(host, sinks, None).unwrap();
        assert_eq!(bridge.strategy(), ResumeStrategy::Precise);

        let outcome = bridge.take_resume_probe().unwrap().await.unwrap().unwrap();
        assert_eq!(outcome, ProbeOutcome::ResumeNeeded);
        assert!(bridge.is_started());
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 1);
        assert!(bridge.take_resume_probe().is_none());
    }

    #[tokio::test]
    async fn test_precise_probe_hidden_surface_waits_for_notification() {
        let host = Arc::new(FakeHost::new(true).with_visible_surface(false));
        let (sinks, counters) = counted_sinks();

        let bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();
        let outcome = bridge.take_resume_probe().unwrap().await.unwrap().unwrap();

        assert_eq!(outcome, ProbeOutcome::NotVisible);
        assert!(!bridge.is_started());
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 0);

        host.fire(LifecycleNotification::LeavingBackground);
        assert!(bridge.is_started());
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_precise_probe_before_main_surface() {
        let host = Arc::new(FakeHost::new(true));
        let (sinks, counters) = counted_sinks();

        let bridge = LifecycleEventBridge::attach_with_sinks(host, sinks, None).unwrap();
        let outcome = bridge.take_resume_probe().unwrap().await.unwrap().unwrap();

        assert_eq!(outcome, ProbeOutcome::NotReady);
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_probe_never_re_emits() {
        let host = Arc::new(FakeHost::new(true).with_visible_surface(true));
        let (sinks, counters) = counted_sinks();

        let bridge = LifecycleEventBridge::attach_with_sinks(host, sinks, None).unwrap();
        bridge.take_resume_probe().unwrap().await.unwrap().unwrap();

        let outcome = bridge.probe_resume().await.unwrap();
        assert_eq!(outcome, ProbeOutcome::AlreadyStarted);
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_native_notification_before_probe_wins() {
        let host = Arc::new(FakeHost::new(true).with_visible_surface(true));
        let (sinks, counters) = counted_sinks();

        // Current-thread runtime: the probe cannot run before the next await.
        let bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();
        host.fire(LifecycleNotification::LeavingBackground);

        let outcome = bridge.take_resume_probe().unwrap().await.unwrap().unwrap();
        assert_eq!(outcome, ProbeOutcome::AlreadyStarted);
        assert_eq!(counters.resumed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unhandled_error_forwarded_then_handed_back() {
        let host = Arc::new(FakeHost::new(false));
        let sinks = LifecycleSinks::shared();
        let seen: Arc<Mutex<Option<UnhandledExceptionOccurred>>> = Arc::default();
        let capture = Arc::clone(&seen);
        sinks.on_unhandled_exception(Arc::new(move |event: &UnhandledExceptionOccurred| {
            *capture.lock().unwrap() = Some(event.clone());
        }));
        let _bridge = LifecycleEventBridge::attach_with_sinks(host.clone(), sinks, None).unwrap();

        let fault: HostFault = Arc::new(DivisionByZero);
        let results = host.raise(Arc::clone(&fault));

        let event = seen.lock().unwrap().take().unwrap();
        assert!(Arc::ptr_eq(&event.error, &fault));
        assert_eq!(event.source.as_str(), "test");

        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(returned) => assert!(Arc::ptr_eq(returned, &fault)),
            Ok(()) => panic!("fault was swallowed"),
        }
    }
}
