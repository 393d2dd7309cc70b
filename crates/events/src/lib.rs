//! Shared event contracts and the run-state observable.
//!
//! This crate defines the DTOs for events that flow from the call monitor
//! and the foreground service to whatever hosts them, the `EventBus` trait
//! used to publish them, and `RunState`, the flag that gates monitoring.

mod bus;
mod run_state;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus};
pub use run_state::{new_listener, RunListener, RunState, RunStateRef, Subscription};

use serde::{Deserialize, Serialize};

/// Event emitted once per handled telephony event.
///
/// Producers: call monitor host
/// Consumers: daemon output, tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDecisionEvent {
    /// Telephony state that was handled ("ringing", "offhook", "idle").
    pub state: String,
    /// Outcome of handling it (e.g. "dispatched", "cooldown_active").
    pub decision: String,
    /// Number the decision concerns, when known.
    #[serde(default)]
    pub number: Option<String>,
    /// Timestamp in milliseconds since epoch.
    #[serde(default)]
    pub timestamp_ms: i64,
}

/// Event emitted whenever the status surface is shown or removed.
///
/// Producers: foreground service
/// Consumers: daemon output, tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusEvent {
    /// Whether call monitoring is active.
    pub running: bool,
    /// Whether the status surface is visible.
    pub visible: bool,
    /// Status line shown on the surface.
    #[serde(default)]
    pub text: Option<String>,
    /// Command the toggle action sends ("start" or "stop").
    #[serde(default)]
    pub toggle_action: Option<String>,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Call monitor decision event.
    pub const MONITOR_DECISION: &str = "monitor:decision";
    /// Foreground service status event.
    pub const SERVICE_STATUS: &str = "service:status";
    /// The user asked for the main interface from the status surface.
    pub const OPEN_REQUESTED: &str = "service:open";
}
