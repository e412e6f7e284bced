//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! Desktop apps have no OS-driven suspend/resume cycle, so this crate provides
//! an in-process host that the embedding application drives itself:
//! - `HostLifecycle` via [`DesktopHost`], raising suspend/resume/leaving-background
//!   and unhandled-error notifications on demand
//! - `UiDispatcher` via [`DesktopUiDispatcher`], a dedicated UI thread started
//!   with the main surface
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::DesktopHost;
//! use std::sync::Arc;
//!
//! let host = Arc::new(DesktopHost::new());
//! host.open_surface(true)?;
//! // Hand `host` to the telemetry core, then drive it from the app:
//! host.suspend();
//! host.resume();
//! ```

mod dispatcher;
mod lifecycle;

pub use dispatcher::DesktopUiDispatcher;
pub use lifecycle::{DesktopHost, DesktopHostOptions, SurfaceId};
