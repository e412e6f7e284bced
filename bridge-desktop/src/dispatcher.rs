//! UI Thread Dispatcher Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    lifecycle::{UiDispatcher, UiWork},
};
use std::thread::{self, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

struct UiJob {
    work: UiWork,
    done: oneshot::Sender<()>,
}

/// Dispatcher backed by a dedicated OS thread acting as the desktop UI thread.
///
/// Work items run strictly in submission order. The thread exits once the
/// dispatcher is dropped.
pub struct DesktopUiDispatcher {
    sender: mpsc::UnboundedSender<UiJob>,
    ui_thread: ThreadId,
}

impl DesktopUiDispatcher {
    /// Start a UI thread named `name`.
    pub fn spawn(name: &str) -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UiJob>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    (job.work)();
                    // The waiter may have given up; nothing to report then.
                    let _ = job.done.send(());
                }
                debug!(thread = %thread_name, "UI thread exiting");
            })
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to start UI thread: {}", e)))?;

        Ok(Self {
            sender,
            ui_thread: handle.thread().id(),
        })
    }

    /// Identifier of the UI thread.
    pub fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    /// Whether the caller is running on the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }
}

impl std::fmt::Debug for DesktopUiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopUiDispatcher")
            .field("ui_thread", &self.ui_thread)
            .finish()
    }
}

#[async_trait]
impl UiDispatcher for DesktopUiDispatcher {
    async fn run_async(&self, work: UiWork) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send(UiJob { work, done })
            .map_err(|_| BridgeError::OperationFailed("UI thread terminated".to_string()))?;
        trace!("Queued work on UI thread");

        wait.await.map_err(|_| {
            BridgeError::OperationFailed("UI work did not run to completion".to_string())
        })
    }
}
