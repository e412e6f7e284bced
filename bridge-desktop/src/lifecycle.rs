//! Desktop Application Lifecycle Implementation

use bridge_traits::{
    error::{BridgeError, Result},
    lifecycle::{
        ErrorSource, HostFault, HostLifecycle, LifecycleNotification, NotificationHandler,
        UiDispatcher, UnhandledError, UnhandledErrorHandler,
    },
};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info};

use crate::dispatcher::DesktopUiDispatcher;

/// Identifier of a desktop surface (window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

fn next_surface_id(open: usize) -> Result<SurfaceId> {
    u32::try_from(open)
        .map(SurfaceId)
        .map_err(|_| BridgeError::OperationFailed("Surface limit reached".to_string()))
}

/// Options controlling which host revision the desktop host emulates.
#[derive(Debug, Clone)]
pub struct DesktopHostOptions {
    /// Whether the precise "left background" notification exists.
    pub leaving_background_supported: bool,
    /// Name given to the UI thread once the main surface is created.
    pub ui_thread_name: String,
}

impl Default for DesktopHostOptions {
    fn default() -> Self {
        Self {
            leaving_background_supported: true,
            ui_thread_name: "desktop-ui".to_string(),
        }
    }
}

#[derive(Default)]
struct HandlerTable {
    suspending: Vec<NotificationHandler>,
    resuming: Vec<NotificationHandler>,
    leaving_background: Vec<NotificationHandler>,
    unhandled_error: Vec<UnhandledErrorHandler>,
}

#[derive(Debug, Clone, Copy)]
struct Surface {
    id: SurfaceId,
    visible: bool,
}

#[derive(Default)]
struct SurfaceTable {
    surfaces: Vec<Surface>,
    dispatcher: Option<Arc<DesktopUiDispatcher>>,
}

/// In-process desktop host.
///
/// Raises lifecycle notifications on demand (`suspend`, `resume`,
/// `leave_background`, `raise_unhandled_error`) and owns the windows whose
/// visibility the telemetry core probes. The first surface opened is the main
/// surface; opening it starts the UI thread.
pub struct DesktopHost {
    options: DesktopHostOptions,
    handlers: RwLock<HandlerTable>,
    surfaces: RwLock<SurfaceTable>,
    native_faults: Mutex<Vec<HostFault>>,
}

impl DesktopHost {
    /// Host exposing every notification, including "left background".
    pub fn new() -> Self {
        Self::with_options(DesktopHostOptions::default())
    }

    /// Host emulating an older revision without "left background".
    pub fn legacy() -> Self {
        Self::with_options(DesktopHostOptions {
            leaving_background_supported: false,
            ..Default::default()
        })
    }

    pub fn with_options(options: DesktopHostOptions) -> Self {
        Self {
            options,
            handlers: RwLock::new(HandlerTable::default()),
            surfaces: RwLock::new(SurfaceTable::default()),
            native_faults: Mutex::new(Vec::new()),
        }
    }

    fn read_handlers(&self) -> RwLockReadGuard<'_, HandlerTable> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_handlers(&self) -> RwLockWriteGuard<'_, HandlerTable> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_surfaces(&self) -> RwLockReadGuard<'_, SurfaceTable> {
        self.surfaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_surfaces(&self) -> RwLockWriteGuard<'_, SurfaceTable> {
        self.surfaces.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a window. The first one becomes the main surface and starts the
    /// UI thread.
    pub fn open_surface(&self, visible: bool) -> Result<SurfaceId> {
        let mut table = self.write_surfaces();
        if table.dispatcher.is_none() {
            let dispatcher = DesktopUiDispatcher::spawn(&self.options.ui_thread_name)?;
            table.dispatcher = Some(Arc::new(dispatcher));
        }

        let id = next_surface_id(table.surfaces.len())?;
        table.surfaces.push(Surface { id, visible });
        debug!(surface = id.0, visible, "Opened surface");
        Ok(id)
    }

    /// Show or hide a previously opened window.
    pub fn set_surface_visible(&self, id: SurfaceId, visible: bool) -> Result<()> {
        let mut table = self.write_surfaces();
        let surface = table
            .surfaces
            .iter_mut()
            .find(|surface| surface.id == id)
            .ok_or_else(|| BridgeError::OperationFailed(format!("Unknown surface {}", id.0)))?;
        surface.visible = visible;
        Ok(())
    }

    /// Whether the main surface exists.
    pub fn has_main_surface(&self) -> bool {
        !self.read_surfaces().surfaces.is_empty()
    }

    /// Raise the "suspending" notification.
    pub fn suspend(&self) {
        info!("Host suspending");
        let handlers = self.read_handlers().suspending.clone();
        handlers.iter().for_each(|handler| handler());
    }

    /// Return from suspension: raises "resuming" and, on hosts that support
    /// it, "left background" right after.
    pub fn resume(&self) {
        info!("Host resuming");
        let resuming = self.read_handlers().resuming.clone();
        resuming.iter().for_each(|handler| handler());

        if self.options.leaving_background_supported {
            let leaving = self.read_handlers().leaving_background.clone();
            leaving.iter().for_each(|handler| handler());
        }
    }

    /// Raise only the "left background" notification, as happens when the
    /// first window of a freshly launched app becomes visible.
    pub fn leave_background(&self) -> Result<()> {
        if !self.options.leaving_background_supported {
            return Err(BridgeError::NotAvailable(
                LifecycleNotification::LeavingBackground.to_string(),
            ));
        }
        let handlers = self.read_handlers().leaving_background.clone();
        handlers.iter().for_each(|handler| handler());
        Ok(())
    }

    /// Report a fault that escaped application code.
    ///
    /// Every registered handler observes the fault. The fault reaches the
    /// native fault path (and is returned) unless handlers took it and none of
    /// them handed it back.
    pub fn raise_unhandled_error(&self, source: ErrorSource, fault: HostFault) -> Option<HostFault> {
        let handlers = self.read_handlers().unhandled_error.clone();

        let mut resurfaced = None;
        for handler in &handlers {
            let error = UnhandledError::new(Arc::clone(&fault));
            if let Err(returned) = handler(source.clone(), error) {
                resurfaced.get_or_insert(returned);
            }
        }

        let native = match resurfaced {
            Some(returned) => Some(returned),
            None if handlers.is_empty() => Some(fault),
            None => None,
        };

        if let Some(native) = &native {
            error!(source = %source, error = %native, "Unhandled error reached native fault path");
            self.native_faults
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(native));
        }
        native
    }

    /// Faults that reached the native fault path, oldest first.
    pub fn native_faults(&self) -> Vec<HostFault> {
        self.native_faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of handlers registered for `notification`.
    pub fn handler_count(&self, notification: LifecycleNotification) -> usize {
        let handlers = self.read_handlers();
        match notification {
            LifecycleNotification::Suspending => handlers.suspending.len(),
            LifecycleNotification::Resuming => handlers.resuming.len(),
            LifecycleNotification::LeavingBackground => handlers.leaving_background.len(),
            LifecycleNotification::UnhandledError => handlers.unhandled_error.len(),
        }
    }
}

impl Default for DesktopHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DesktopHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopHost")
            .field("options", &self.options)
            .field("surfaces", &self.read_surfaces().surfaces)
            .finish()
    }
}

impl HostLifecycle for DesktopHost {
    fn is_notification_present(&self, notification: LifecycleNotification) -> Result<bool> {
        Ok(match notification {
            LifecycleNotification::LeavingBackground => self.options.leaving_background_supported,
            _ => true,
        })
    }

    fn on_suspending(&self, handler: NotificationHandler) -> Result<()> {
        self.write_handlers().suspending.push(handler);
        Ok(())
    }

    fn on_resuming(&self, handler: NotificationHandler) -> Result<()> {
        self.write_handlers().resuming.push(handler);
        Ok(())
    }

    fn on_leaving_background(&self, handler: NotificationHandler) -> Result<()> {
        if !self.options.leaving_background_supported {
            return Err(BridgeError::NotAvailable(
                LifecycleNotification::LeavingBackground.to_string(),
            ));
        }
        self.write_handlers().leaving_background.push(handler);
        Ok(())
    }

    fn on_unhandled_error(&self, handler: UnhandledErrorHandler) -> Result<()> {
        self.write_handlers().unhandled_error.push(handler);
        Ok(())
    }

    fn main_dispatcher(&self) -> Result<Option<Arc<dyn UiDispatcher>>> {
        let table = self.read_surfaces();
        if table.surfaces.is_empty() {
            return Err(BridgeError::PlatformNotReady(
                "main surface has not been created".to_string(),
            ));
        }
        Ok(table
            .dispatcher
            .as_ref()
            .map(|dispatcher| Arc::clone(dispatcher) as Arc<dyn UiDispatcher>))
    }

    fn query_visible_surfaces(&self) -> Result<bool> {
        let table = self.read_surfaces();
        let Some(dispatcher) = table.dispatcher.as_ref() else {
            return Err(BridgeError::PlatformNotReady(
                "main surface has not been created".to_string(),
            ));
        };
        if !dispatcher.is_ui_thread() {
            return Err(BridgeError::OperationFailed(
                "surface visibility may only be queried from the UI thread".to_string(),
            ));
        }
        Ok(table.surfaces.iter().any(|surface| surface.visible))
    }
}
