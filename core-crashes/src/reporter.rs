//! # Crash Reporter
//!
//! Downstream subscriber of `UnhandledExceptionOccurred`. Every observed fault
//! becomes an [`ErrorReport`] stamped with an id, the capture time and the
//! user identifier current at that moment.
//!
//! The reporter only records; handing the fault back to the host remains the
//! lifecycle bridge's job.

use chrono::{DateTime, Utc};
use core_lifecycle::{LifecycleSource, UnhandledExceptionOccurred};
use core_runtime::identity::UserIdStore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::test_crash::is_test_crash;

/// Reports kept in memory before the oldest are dropped.
pub const DEFAULT_MAX_REPORTS: usize = 64;

pub type ReportCallback = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

/// One captured unhandled fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    /// Host-supplied origin of the fault
    pub source: String,
    pub message: String,
    pub user_id: Option<String>,
    pub is_test_crash: bool,
}

impl ErrorReport {
    fn capture(event: &UnhandledExceptionOccurred, user_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            source: event.source.to_string(),
            message: event.error.to_string(),
            user_id,
            is_test_crash: is_test_crash(&event.error),
        }
    }
}

/// Turns unhandled faults into stored [`ErrorReport`]s.
pub struct CrashReporter {
    user_ids: Arc<dyn UserIdStore>,
    max_reports: usize,
    reports: RwLock<VecDeque<ErrorReport>>,
    listeners: RwLock<Vec<ReportCallback>>,
}

impl CrashReporter {
    pub fn new(user_ids: Arc<dyn UserIdStore>) -> Self {
        Self::with_capacity(user_ids, DEFAULT_MAX_REPORTS)
    }

    pub fn with_capacity(user_ids: Arc<dyn UserIdStore>, max_reports: usize) -> Self {
        Self {
            user_ids,
            max_reports: max_reports.max(1),
            reports: RwLock::new(VecDeque::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to `source`. The source keeps the reporter alive.
    pub fn attach(self: &Arc<Self>, source: &dyn LifecycleSource) {
        let reporter = Arc::clone(self);
        source.on_unhandled_exception(Arc::new(move |event: &UnhandledExceptionOccurred| {
            reporter.record(event);
        }));
    }

    /// Register a callback invoked after each report is stored.
    pub fn on_report(&self, callback: ReportCallback) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Store a report for `event` and notify listeners.
    pub fn record(&self, event: &UnhandledExceptionOccurred) -> ErrorReport {
        let report = ErrorReport::capture(event, self.user_ids.user_id());

        if report.is_test_crash {
            info!(report_id = %report.id, "Captured test crash");
        } else {
            warn!(
                report_id = %report.id,
                source = %report.source,
                error = %report.message,
                "Captured unhandled error"
            );
        }

        {
            let mut reports = self.reports.write().unwrap_or_else(PoisonError::into_inner);
            if reports.len() == self.max_reports {
                reports.pop_front();
            }
            reports.push_back(report.clone());
        }

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        listeners.iter().for_each(|listener| listener(&report));

        report
    }

    /// Stored reports, oldest first.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn last_report(&self) -> Option<ErrorReport> {
        self.reports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    pub fn clear(&self) {
        self.reports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for CrashReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashReporter")
            .field("max_reports", &self.max_reports)
            .field("stored", &self.reports().len())
            .finish()
    }
}
