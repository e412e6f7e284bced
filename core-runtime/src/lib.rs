//! # Core Runtime
//!
//! Ambient infrastructure shared by the lifecycle bridge, the crash reporter
//! and the service façade:
//! - [`logging`]: global `tracing` subscriber, host log sink mirroring and
//!   redaction of user identifiers
//! - [`config`]: `SdkConfig` builder and feature flags
//! - [`events`]: buffered broadcast of lifecycle and crash events
//! - [`identity`]: process-wide user identifier store

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod logging;

pub use error::{Error, Result};
