//! Foreground presence for smsreply.
//!
//! [`ForegroundService`] owns the write side of the shared
//! [`RunState`](smsreply_events::RunState): it turns monitoring on when
//! started, off when stopped or torn down, and keeps a persistent status
//! notification in sync with it. [`on_boot_completed`] starts it at boot
//! when the user asked for that.

mod notification;

pub use notification::{
    BusStatusSurface, NotificationAction, Priority, RecordingSurface, StatusNotification,
    StatusSurface, SurfaceError, NOTIFICATION_TITLE, OPEN_LABEL, STATUS_ACTIVE, STATUS_STOPPED,
};

use serde::{Deserialize, Serialize};
use smsreply_events::RunStateRef;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;

/// Command delivered to the service (from the notification, the main
/// interface or boot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Start,
    Stop,
    /// The user swiped the notification away.
    Dismissed,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Dismissed => "dismiss",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceAction::Start => "Start",
            ServiceAction::Stop => "Stop",
            ServiceAction::Dismissed => "Dismiss",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service action: {0}")]
pub struct UnknownServiceAction(pub String);

impl FromStr for ServiceAction {
    type Err = UnknownServiceAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "dismiss" | "dismissed" => Ok(ServiceAction::Dismissed),
            other => Err(UnknownServiceAction(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read start-on-boot preference: {0}")]
    Preference(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persisted "start monitoring at boot" preference.
pub trait BootPreference: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn start_on_boot(&self) -> Result<bool, Self::Error>;
    fn set_start_on_boot(&self, enabled: bool) -> Result<(), Self::Error>;
}

impl<T: BootPreference + ?Sized> BootPreference for std::sync::Arc<T> {
    type Error = T::Error;

    fn start_on_boot(&self) -> Result<bool, Self::Error> {
        (**self).start_on_boot()
    }

    fn set_start_on_boot(&self, enabled: bool) -> Result<(), Self::Error> {
        (**self).set_start_on_boot(enabled)
    }
}

/// In-memory preference for tests.
#[derive(Default)]
pub struct InMemoryBootPreference {
    enabled: Mutex<bool>,
}

impl BootPreference for InMemoryBootPreference {
    type Error = std::convert::Infallible;

    fn start_on_boot(&self) -> Result<bool, Self::Error> {
        Ok(*self.enabled.lock().unwrap_or_else(|p| p.into_inner()))
    }

    fn set_start_on_boot(&self, enabled: bool) -> Result<(), Self::Error> {
        *self.enabled.lock().unwrap_or_else(|p| p.into_inner()) = enabled;
        Ok(())
    }
}

pub struct ForegroundService<S> {
    run_state: RunStateRef,
    surface: S,
}

impl<S: StatusSurface> ForegroundService<S> {
    pub fn new(run_state: RunStateRef, surface: S) -> Self {
        Self { run_state, surface }
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Handle a start command. `None` is a plain start without an explicit
    /// action (launch or restart) and behaves like `Start`.
    pub fn on_command(&self, action: Option<ServiceAction>) {
        match action {
            Some(ServiceAction::Start) => {
                tracing::info!("start requested");
                self.start();
            }
            None => {
                tracing::info!("service started without action");
                self.start();
            }
            Some(ServiceAction::Stop) => {
                tracing::info!("stop requested");
                self.run_state.set_running(false);
                self.surface.cancel();
            }
            Some(ServiceAction::Dismissed) => {
                if self.run_state.is_running() {
                    tracing::info!("notification dismissed, restoring");
                    self.show_running();
                } else {
                    tracing::debug!("notification dismissed while stopped");
                }
            }
        }
    }

    /// Teardown: monitoring stops and the notification goes away.
    pub fn on_destroy(&self) {
        tracing::info!("service destroyed");
        self.run_state.set_running(false);
        self.surface.cancel();
    }

    fn start(&self) {
        if self.show_running() {
            self.run_state.set_running(true);
        }
    }

    fn show_running(&self) -> bool {
        match self.surface.show(&StatusNotification::for_state(true)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to show status notification");
                false
            }
        }
    }
}

/// Start the service after boot if the user enabled it.
///
/// Returns whether the service was started.
pub fn on_boot_completed<P, S>(prefs: &P, service: &ForegroundService<S>) -> Result<bool, ServiceError>
where
    P: BootPreference,
    S: StatusSurface,
{
    let enabled = prefs
        .start_on_boot()
        .map_err(|e| ServiceError::Preference(Box::new(e)))?;

    if !enabled {
        tracing::debug!("boot completed, start on boot disabled");
        return Ok(false);
    }

    tracing::info!("boot completed, starting service");
    service.on_command(Some(ServiceAction::Start));
    Ok(true)
}
