//! Resume probe
//!
//! Decides whether a `Resumed` has to be synthesized because the application
//! was already visible when the bridge attached. Visibility may only be read
//! on the host UI thread, so the query is marshalled through the host's
//! [`UiDispatcher`](bridge_traits::UiDispatcher) and its answer is sent back
//! over a oneshot channel.
//!
//! Only the host's "not ready" condition is absorbed. Every other failure is
//! returned to whoever awaits the probe.

use bridge_traits::{BridgeError, HostLifecycle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{LifecycleError, Result};

/// Result of one probe evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A surface is visible and no resume has been delivered yet.
    ResumeNeeded,
    /// A resume was already delivered by another path.
    AlreadyStarted,
    /// The main surface exists but nothing is shown.
    NotVisible,
    /// The main surface has not been created yet (normal cold start).
    NotReady,
    /// The main surface has no window or dispatcher to query.
    NoMainWindow,
}

impl ProbeOutcome {
    pub fn needs_resume(&self) -> bool {
        matches!(self, ProbeOutcome::ResumeNeeded)
    }
}

fn check_visibility(
    host: &dyn HostLifecycle,
    started: &AtomicBool,
) -> std::result::Result<ProbeOutcome, BridgeError> {
    if started.load(Ordering::SeqCst) {
        return Ok(ProbeOutcome::AlreadyStarted);
    }
    match host.query_visible_surfaces() {
        Ok(true) => Ok(ProbeOutcome::ResumeNeeded),
        Ok(false) => Ok(ProbeOutcome::NotVisible),
        Err(e) if e.is_not_ready() => Ok(ProbeOutcome::NotReady),
        Err(e) => Err(e),
    }
}

/// Evaluate whether a resume must be emitted now.
///
/// Does not emit or touch `started`; applying the outcome is the caller's job.
pub async fn evaluate(
    host: Arc<dyn HostLifecycle>,
    started: Arc<AtomicBool>,
) -> Result<ProbeOutcome> {
    if started.load(Ordering::SeqCst) {
        return Ok(ProbeOutcome::AlreadyStarted);
    }

    let dispatcher = match host.main_dispatcher() {
        Ok(Some(dispatcher)) => dispatcher,
        Ok(None) => return Ok(ProbeOutcome::NoMainWindow),
        Err(e) if e.is_not_ready() => {
            debug!(error = %e, "Main surface not created yet, skipping resume probe");
            return Ok(ProbeOutcome::NotReady);
        }
        Err(e) => return Err(LifecycleError::Probe(e)),
    };

    let (tx, rx) = oneshot::channel();
    let ui_host = Arc::clone(&host);
    let ui_started = Arc::clone(&started);
    let dispatched = dispatcher
        .run_async(Box::new(move || {
            let _ = tx.send(check_visibility(ui_host.as_ref(), &ui_started));
        }))
        .await;

    match dispatched {
        Ok(()) => {}
        Err(e) if e.is_not_ready() => {
            debug!(error = %e, "UI dispatcher not ready, skipping resume probe");
            return Ok(ProbeOutcome::NotReady);
        }
        Err(e) => return Err(LifecycleError::Probe(e)),
    }

    let outcome = rx
        .await
        .map_err(|_| LifecycleError::ProbeAbandoned)?
        .map_err(LifecycleError::Probe)?;

    if outcome == ProbeOutcome::NotReady {
        debug!("Visibility query not ready, no resume needed");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        LifecycleNotification, NotificationHandler, UiDispatcher, UiWork, UnhandledErrorHandler,
    };
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct InlineDispatcher {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl UiDispatcher for InlineDispatcher {
        async fn run_async(&self, work: UiWork) -> BridgeResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            work();
            Ok(())
        }
    }

    struct DroppingDispatcher;

    #[async_trait]
    impl UiDispatcher for DroppingDispatcher {
        async fn run_async(&self, work: UiWork) -> BridgeResult<()> {
            drop(work);
            Ok(())
        }
    }

    enum DispatcherState {
        NotReady,
        Missing,
        Inline(Arc<InlineDispatcher>),
        Dropping,
    }

    struct FakeHost {
        dispatcher: DispatcherState,
        visibility: Mutex<Option<BridgeResult<bool>>>,
    }

    impl FakeHost {
        fn inline(visibility: BridgeResult<bool>) -> (Arc<Self>, Arc<InlineDispatcher>) {
            let dispatcher = Arc::new(InlineDispatcher {
                runs: AtomicUsize::new(0),
            });
            let host = Arc::new(Self {
                dispatcher: DispatcherState::Inline(Arc::clone(&dispatcher)),
                visibility: Mutex::new(Some(visibility)),
            });
            (host, dispatcher)
        }

        fn with(dispatcher: DispatcherState) -> Arc<Self> {
            Arc::new(Self {
                dispatcher,
                visibility: Mutex::new(Some(Ok(true))),
            })
        }
    }

    impl HostLifecycle for FakeHost {
        fn is_notification_present(&self, _: LifecycleNotification) -> BridgeResult<bool> {
            Ok(true)
        }

        fn on_suspending(&self, _: NotificationHandler) -> BridgeResult<()> {
            Ok(())
        }

        fn on_resuming(&self, _: NotificationHandler) -> BridgeResult<()> {
            Ok(())
        }

        fn on_leaving_background(&self, _: NotificationHandler) -> BridgeResult<()> {
            Ok(())
        }

        fn on_unhandled_error(&self, _: UnhandledErrorHandler) -> BridgeResult<()> {
            Ok(())
        }

        fn main_dispatcher(&self) -> BridgeResult<Option<Arc<dyn UiDispatcher>>> {
            match &self.dispatcher {
                DispatcherState::NotReady => Err(BridgeError::PlatformNotReady(
                    "no main surface".to_string(),
                )),
                DispatcherState::Missing => Ok(None),
                DispatcherState::Inline(dispatcher) => {
                    Ok(Some(Arc::clone(dispatcher) as Arc<dyn UiDispatcher>))
                }
                DispatcherState::Dropping => {
                    Ok(Some(Arc::new(DroppingDispatcher) as Arc<dyn UiDispatcher>))
                }
            }
        }

        fn query_visible_surfaces(&self) -> BridgeResult<bool> {
            self.visibility
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(false))
        }
    }

    fn not_started() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_visible_surface_needs_resume() {
        let (host, dispatcher) = FakeHost::inline(Ok(true));
        let outcome = evaluate(host, not_started()).await.unwrap();

        assert_eq!(outcome, ProbeOutcome::ResumeNeeded);
        assert!(outcome.needs_resume());
        assert_eq!(dispatcher.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hidden_surface_needs_no_resume() {
        let (host, _) = FakeHost::inline(Ok(false));
        let outcome = evaluate(host, not_started()).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::NotVisible);
        assert!(!outcome.needs_resume());
    }

    #[tokio::test]
    async fn test_already_started_skips_dispatch() {
        let (host, dispatcher) = FakeHost::inline(Ok(true));
        let outcome = evaluate(host, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();

        assert_eq!(outcome, ProbeOutcome::AlreadyStarted);
        assert_eq!(dispatcher.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_main_surface_is_not_ready() {
        let host = FakeHost::with(DispatcherState::NotReady);
        let outcome = evaluate(host, not_started()).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_missing_dispatcher_needs_no_resume() {
        let host = FakeHost::with(DispatcherState::Missing);
        let outcome = evaluate(host, not_started()).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::NoMainWindow);
    }

    #[tokio::test]
    async fn test_visibility_not_ready_is_absorbed() {
        let (host, _) = FakeHost::inline(Err(BridgeError::PlatformNotReady(
            "window not created".to_string(),
        )));
        let outcome = evaluate(host, not_started()).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_other_visibility_failures_propagate() {
        let (host, _) = FakeHost::inline(Err(BridgeError::OperationFailed(
            "compositor crashed".to_string(),
        )));
        let result = evaluate(host, not_started()).await;
        assert!(matches!(
            result,
            Err(LifecycleError::Probe(BridgeError::OperationFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_dropped_work_is_reported() {
        let host = FakeHost::with(DispatcherState::Dropping);
        let result = evaluate(host, not_started()).await;
        assert!(matches!(result, Err(LifecycleError::ProbeAbandoned)));
    }
}
