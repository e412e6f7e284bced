//! Simulated crash used to verify the crash pipeline end to end.

use bridge_traits::HostFault;
use std::sync::Arc;
use thiserror::Error;

pub const TEST_CRASH_MESSAGE: &str = "Test crash exception generated by SDK";

/// Fault raised on demand by [`generate_test_crash`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("{}", TEST_CRASH_MESSAGE)]
pub struct TestCrashError;

impl TestCrashError {
    /// Wrap into the fault type hosts report unhandled errors with.
    pub fn into_fault(self) -> HostFault {
        Arc::new(self)
    }
}

/// Always fails with [`TestCrashError`].
pub fn generate_test_crash() -> Result<(), TestCrashError> {
    Err(TestCrashError)
}

/// Whether a host fault is a simulated crash.
pub fn is_test_crash(fault: &HostFault) -> bool {
    fault.downcast_ref::<TestCrashError>().is_some()
}
