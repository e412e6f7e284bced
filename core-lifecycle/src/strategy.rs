//! Resume detection strategy, chosen once per bridge.

use bridge_traits::{HostLifecycle, LifecycleNotification};
use tracing::debug;

use crate::error::{LifecycleError, Result};

/// How a host tells the bridge that the application came back to the
/// foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStrategy {
    /// The host exposes "left background". Resume is taken from that
    /// notification, and a visibility probe covers an app that was already
    /// visible when the bridge attached.
    Precise,
    /// Only the coarse "resuming" notification exists. Attaching counts as the
    /// first resume.
    Coarse,
}

impl ResumeStrategy {
    /// Ask the host which notifications it exposes.
    ///
    /// A host that is not ready to answer is treated as an older revision.
    pub fn detect(host: &dyn HostLifecycle) -> Result<Self> {
        match host.is_notification_present(LifecycleNotification::LeavingBackground) {
            Ok(true) => Ok(ResumeStrategy::Precise),
            Ok(false) => Ok(ResumeStrategy::Coarse),
            Err(e) if e.is_not_ready() => {
                debug!(error = %e, "Capability query not ready, using coarse resume detection");
                Ok(ResumeStrategy::Coarse)
            }
            Err(e) => Err(LifecycleError::Capability(e)),
        }
    }

    /// Native notification that maps to `Resumed`.
    pub fn resume_notification(&self) -> LifecycleNotification {
        match self {
            ResumeStrategy::Precise => LifecycleNotification::LeavingBackground,
            ResumeStrategy::Coarse => LifecycleNotification::Resuming,
        }
    }

    /// Whether `Resumed` is emitted unconditionally while attaching.
    pub fn resumes_on_attach(&self) -> bool {
        matches!(self, ResumeStrategy::Coarse)
    }

    /// Whether an asynchronous visibility probe runs after attaching.
    pub fn probes_visibility(&self) -> bool {
        matches!(self, ResumeStrategy::Precise)
    }
}
