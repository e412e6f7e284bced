//! # SDK Events
//!
//! Buffered fan-out of what the SDK observed, for consumers that would rather
//! await a stream than register callbacks on the lifecycle bridge.
//!
//! The bridge delivers to its own callbacks synchronously. The service layer
//! forwards each of those emissions, and every captured crash report, onto an
//! [`EventBus`]. Subscribers only see events published after they subscribed;
//! a subscriber that falls more than the buffer size behind gets
//! [`RecvError::Lagged`].
//!
//! ```rust
//! use core_runtime::events::{EventBus, LifecycleEvent, SdkEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(16);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(SdkEvent::Lifecycle(LifecycleEvent::Resumed)).ok();
//! assert_eq!(
//!     stream.recv().await.unwrap(),
//!     SdkEvent::Lifecycle(LifecycleEvent::Resumed)
//! );
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber unless configured otherwise.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Anything published on the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum SdkEvent {
    /// Application lifecycle transitions
    Lifecycle(LifecycleEvent),
    /// Crash reporting activity
    Crash(CrashEvent),
}

impl SdkEvent {
    pub fn description(&self) -> &str {
        match self {
            SdkEvent::Lifecycle(e) => e.description(),
            SdkEvent::Crash(e) => e.description(),
        }
    }

    /// Real faults are errors; simulated ones only warn.
    pub fn severity(&self) -> EventSeverity {
        match self {
            SdkEvent::Lifecycle(LifecycleEvent::UnhandledException { .. }) => EventSeverity::Error,
            SdkEvent::Crash(CrashEvent::ReportCaptured {
                is_test_crash: false,
                ..
            }) => EventSeverity::Error,
            SdkEvent::Crash(CrashEvent::ReportCaptured { .. }) => EventSeverity::Warning,
            SdkEvent::Lifecycle(_) => EventSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Application lifecycle transitions, as normalized by the lifecycle bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    Suspended,
    /// Emitted once the app is interactive, including at attach time when it
    /// already was.
    Resumed,
    UnhandledException { source: String, message: String },
}

impl LifecycleEvent {
    fn description(&self) -> &str {
        match self {
            LifecycleEvent::Suspended => "Application suspended",
            LifecycleEvent::Resumed => "Application resumed",
            LifecycleEvent::UnhandledException { .. } => "Unhandled exception occurred",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CrashEvent {
    ReportCaptured {
        report_id: String,
        is_test_crash: bool,
    },
}

impl CrashEvent {
    fn description(&self) -> &str {
        match self {
            CrashEvent::ReportCaptured { .. } => "Error report captured",
        }
    }
}

/// Cloneable handle to one broadcast channel of [`SdkEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SdkEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Publish to every current subscriber, returning how many there were.
    /// Fails when nobody is subscribed.
    pub fn emit(&self, event: SdkEvent) -> Result<usize, SendError<SdkEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<SdkEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&SdkEvent) -> bool + Send + Sync>;

/// Bus subscription that skips events rejected by an optional predicate.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, SdkEvent};
///
/// let event_bus = EventBus::new(16);
/// let lifecycle_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, SdkEvent::Lifecycle(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<SdkEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<SdkEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&SdkEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Some(Box::new(predicate)),
            ..self
        }
    }

    fn accepts(&self, event: &SdkEvent) -> bool {
        match &self.filter {
            Some(filter) => filter(event),
            None => true,
        }
    }

    pub async fn recv(&mut self) -> Result<SdkEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, or `None` when the buffer holds
    /// no match.
    pub fn try_recv(&mut self) -> Option<Result<SdkEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
