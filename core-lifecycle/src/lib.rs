//! # Core Lifecycle
//!
//! Observes host application lifecycle transitions and republishes them as
//! three canonical events that the rest of the SDK subscribes to:
//!
//! - `Suspended` - the host is about to suspend the application
//! - `Resumed` - the application became interactive (at least once per process)
//! - `UnhandledExceptionOccurred` - the host reported a fault nobody handled
//!
//! ## Components
//!
//! - [`LifecycleEventBridge`] attaches to a [`HostLifecycle`](bridge_traits::HostLifecycle)
//!   and owns the started state
//! - [`ResumeStrategy`] picks between the precise "left background" signal and
//!   the coarse "resuming" signal
//! - [`probe`] decides whether the app was already visible when the bridge
//!   attached
//! - [`LifecycleSinks`] / [`LifecycleSource`] hold and expose the subscribers
//!
//! ## Usage
//!
//! ```ignore
//! use core_lifecycle::{LifecycleEventBridge, LifecycleSinks, LifecycleSource};
//! use std::sync::Arc;
//!
//! let sinks = LifecycleSinks::shared();
//! sinks.on_resumed(Arc::new(|| println!("resumed")));
//!
//! let bridge = LifecycleEventBridge::attach_with_sinks(host, sinks, None)?;
//! ```
//!
//! ## Late subscribers
//!
//! Delivery is miss-if-late: nothing is buffered or replayed. Subscribe on a
//! [`LifecycleSinks`] before attaching, or check
//! [`LifecycleEventBridge::is_started`] after subscribing.

pub mod bridge;
pub mod error;
pub mod probe;
pub mod source;
pub mod strategy;

pub use bridge::{LifecycleEventBridge, ResumeProbe};
pub use error::{LifecycleError, Result};
pub use probe::ProbeOutcome;
pub use source::{
    LifecycleSinks, LifecycleSource, ResumedCallback, SuspendedCallback,
    UnhandledExceptionCallback, UnhandledExceptionOccurred,
};
pub use strategy::ResumeStrategy;
