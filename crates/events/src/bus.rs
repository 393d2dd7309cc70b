//! Event bus abstraction for decoupled event emission.
//!
//! The monitor and the foreground service publish their decisions through
//! this trait so they can be observed without knowing who is listening
//! (the daemon's stdout writer, a test capture, or nothing at all).

use std::sync::{Arc, Mutex, MutexGuard};

/// Trait for emitting events to subscribers.
///
/// Implementations must not block for long: the call monitor emits from
/// inside its event handler.
pub trait EventBus: Send + Sync {
    /// Emit an event with a JSON payload.
    ///
    /// # Arguments
    /// * `topic` - Event name/topic (e.g., "monitor:decision")
    /// * `payload` - JSON payload to emit
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

/// Type alias for shared event bus reference.
pub type EventBusRef = Arc<dyn EventBus>;

/// In-memory event bus for testing.
///
/// Captures all emitted events for later inspection.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

/// A captured event from InMemoryEventBus.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    /// Topic the event was emitted under, one of `event_names`.
    pub topic: String,
    /// Serialized event DTO.
    pub payload: serde_json::Value,
}

impl InMemoryEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn captured(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get all captured events.
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.captured().clone()
    }

    /// Get events for a specific topic.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.captured()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        self.captured().clear();
    }

    /// Number of captured events across all topics.
    pub fn len(&self) -> usize {
        self.captured().len()
    }

    /// True when nothing has been emitted since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.captured().is_empty()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.captured().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// No-op event bus that discards all events.
///
/// Default for a `CallMonitor` built without a bus.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}
