//! # User Identifier Store
//!
//! Holds the identifier of the current application user, attached by the
//! analytics and crash modules to everything they send.
//!
//! The store is created once by the composition root (`core-service`) and
//! handed out as `Arc<dyn UserIdStore>`; nothing reaches it through a hidden
//! global.
//!
//! ```
//! use core_runtime::identity::{is_valid_user_id, UserIdContext, UserIdStore};
//!
//! let store = UserIdContext::shared();
//! assert!(is_valid_user_id(Some("alice")));
//! store.set_user_id(Some("alice".to_string()));
//! assert_eq!(store.user_id().as_deref(), Some("alice"));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::error;

/// Maximum user identifier length accepted by the ingestion service, in
/// UTF-16 code units.
pub const USER_ID_MAX_LENGTH: usize = 256;

/// Access to the current user identifier.
pub trait UserIdStore: Send + Sync {
    /// Current identifier, `None` when unset.
    fn user_id(&self) -> Option<String>;

    /// Replace the current identifier. Last writer wins.
    fn set_user_id(&self, user_id: Option<String>);
}

/// Mutex-guarded [`UserIdStore`].
#[derive(Debug, Default)]
pub struct UserIdContext {
    user_id: Mutex<Option<String>>,
}

impl UserIdContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// New store behind an `Arc`, ready to be shared by the composition root.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn guard(&self) -> MutexGuard<'_, Option<String>> {
        self.user_id.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserIdStore for UserIdContext {
    fn user_id(&self) -> Option<String> {
        self.guard().clone()
    }

    fn set_user_id(&self, user_id: Option<String>) {
        *self.guard() = user_id;
    }
}

/// Check whether `user_id` may be sent to the ingestion service.
///
/// Unset and empty identifiers are valid. Anything longer than
/// [`USER_ID_MAX_LENGTH`] is rejected and logged.
pub fn is_valid_user_id(user_id: Option<&str>) -> bool {
    match user_id {
        Some(candidate) if candidate.encode_utf16().count() > USER_ID_MAX_LENGTH => {
            error!(
                "userId is limited to {} characters.",
                USER_ID_MAX_LENGTH
            );
            false
        }
        _ => true,
    }
}
