//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the telemetry core and the host
//! application platform. The core never talks to platform APIs directly; it
//! consumes these traits so the lifecycle bridge can be exercised against any
//! host (UWP/WinUI, desktop, test doubles).
//!
//! ## Traits
//!
//! ### Platform Integration
//! - [`HostLifecycle`](lifecycle::HostLifecycle) - Suspend/resume/leaving-background
//!   notifications, capability queries, unhandled-error hook
//! - [`UiDispatcher`](lifecycle::UiDispatcher) - Run work on the host UI thread
//!
//! ### Utilities
//! - [`LoggerSink`](logger::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | Windows  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Hosts
//! must report "main surface not created yet" as
//! [`BridgeError::PlatformNotReady`] so the core can tell the expected
//! cold-start condition apart from genuine failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Notification handlers may be
//! invoked on whatever thread the host raises them on.

pub mod error;
pub mod lifecycle;
pub mod logger;

pub use error::BridgeError;

// Re-export commonly used types
pub use lifecycle::{
    ErrorSource, HostFault, HostLifecycle, LifecycleNotification, NotificationHandler,
    UiDispatcher, UiWork, UnhandledError, UnhandledErrorHandler,
};
pub use logger::{LogEntry, LogLevel, LoggerSink};
