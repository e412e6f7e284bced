//! # Core Crashes
//!
//! Crash capture on top of the lifecycle bridge.
//!
//! - [`CrashReporter`] subscribes to `UnhandledExceptionOccurred` and keeps
//!   [`ErrorReport`]s
//! - [`generate_test_crash`] produces a [`TestCrashError`] so the pipeline can
//!   be verified without a real fault

pub mod reporter;
pub mod test_crash;

pub use reporter::{CrashReporter, ErrorReport, ReportCallback, DEFAULT_MAX_REPORTS};
pub use test_crash::{generate_test_crash, is_test_crash, TestCrashError, TEST_CRASH_MESSAGE};
