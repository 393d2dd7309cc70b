//! Persistent status notification and the surfaces that display it.

use crate::ServiceAction;
use serde::Serialize;
use smsreply_events::{event_names, EventBusRef, ServiceStatusEvent};
use std::sync::Mutex;
use thiserror::Error;

pub const NOTIFICATION_TITLE: &str = "SMS auto-reply";
pub const STATUS_ACTIVE: &str = "Auto-reply is active";
pub const STATUS_STOPPED: &str = "Auto-reply is stopped";
pub const OPEN_LABEL: &str = "Open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Default,
    High,
    Max,
}

/// Button on the status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub label: String,
    pub action: ServiceAction,
}

/// Content of the status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusNotification {
    pub title: String,
    pub text: String,
    /// Stop while running, Start otherwise.
    pub toggle: NotificationAction,
    /// Label of the action that reopens the main interface.
    pub open_label: String,
    /// Not dismissible by the user.
    pub ongoing: bool,
    pub priority: Priority,
}

impl StatusNotification {
    pub fn for_state(running: bool) -> Self {
        let (text, toggle) = if running {
            (STATUS_ACTIVE, ServiceAction::Stop)
        } else {
            (STATUS_STOPPED, ServiceAction::Start)
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            text: text.to_string(),
            toggle: NotificationAction {
                label: toggle.label().to_string(),
                action: toggle,
            },
            open_label: OPEN_LABEL.to_string(),
            ongoing: true,
            priority: Priority::Max,
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("status surface unavailable: {0}")]
    Unavailable(String),
}

/// Where the status notification is rendered.
pub trait StatusSurface: Send + Sync {
    /// Show or replace the notification.
    fn show(&self, notification: &StatusNotification) -> Result<(), SurfaceError>;

    /// Remove the notification.
    fn cancel(&self);
}

/// Surface that publishes status changes on an event bus.
pub struct BusStatusSurface {
    bus: EventBusRef,
}

impl BusStatusSurface {
    pub fn new(bus: EventBusRef) -> Self {
        Self { bus }
    }

    fn publish(&self, event: &ServiceStatusEvent) {
        match serde_json::to_value(event) {
            Ok(value) => self.bus.emit(event_names::SERVICE_STATUS, value),
            Err(e) => tracing::warn!(error = %e, "failed to encode status event"),
        }
    }
}

impl StatusSurface for BusStatusSurface {
    fn show(&self, notification: &StatusNotification) -> Result<(), SurfaceError> {
        self.publish(&ServiceStatusEvent {
            running: notification.toggle.action == ServiceAction::Stop,
            visible: true,
            text: Some(notification.text.clone()),
            toggle_action: Some(notification.toggle.action.as_str().to_string()),
        });
        Ok(())
    }

    fn cancel(&self) {
        self.publish(&ServiceStatusEvent {
            running: false,
            visible: false,
            text: None,
            toggle_action: None,
        });
    }
}

/// Surface that remembers what it was asked to show, for tests.
#[derive(Default)]
pub struct RecordingSurface {
    current: Mutex<Option<StatusNotification>>,
    shows: Mutex<usize>,
    failure: Mutex<Option<String>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<StatusNotification> {
        self.current.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn show_count(&self) -> usize {
        *self.shows.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(reason.into());
    }
}

impl StatusSurface for RecordingSurface {
    fn show(&self, notification: &StatusNotification) -> Result<(), SurfaceError> {
        if let Some(reason) = self.failure.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(SurfaceError::Unavailable(reason));
        }
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(notification.clone());
        *self.shows.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }

    fn cancel(&self) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreply_events::InMemoryEventBus;
    use std::sync::Arc;

    #[test]
    fn test_running_notification() {
        let n = StatusNotification::for_state(true);
        assert_eq!(n.text, STATUS_ACTIVE);
        assert_eq!(n.toggle.action, ServiceAction::Stop);
        assert_eq!(n.toggle.label, "Stop");
        assert!(n.ongoing);
        assert_eq!(n.priority, Priority::Max);
    }

    #[test]
    fn test_stopped_notification() {
        let n = StatusNotification::for_state(false);
        assert_eq!(n.text, STATUS_STOPPED);
        assert_eq!(n.toggle.action, ServiceAction::Start);
        assert_eq!(n.open_label, OPEN_LABEL);
    }

    #[test]
    fn test_bus_surface_publishes_status() {
        let bus = Arc::new(InMemoryEventBus::new());
        let surface = BusStatusSurface::new(bus.clone());

        surface.show(&StatusNotification::for_state(true)).unwrap();
        surface.cancel();

        let events = bus.events_for(event_names::SERVICE_STATUS);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["running"], true);
        assert_eq!(events[0].payload["toggle_action"], "stop");
        assert_eq!(events[1].payload["visible"], false);
    }
}
