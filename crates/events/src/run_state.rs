//! Observable "monitoring is active" flag.
//!
//! One `RunState` is created by the host and shared (`Arc`) with the
//! foreground service, which is the only writer, and the call monitor, which
//! reads it as a gate. Listeners are invoked synchronously on the thread that
//! changed the value.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Callback invoked with the current run state.
pub type RunListener = Arc<dyn Fn(bool) + Send + Sync + 'static>;

pub fn new_listener<F>(f: F) -> RunListener
where
    F: Fn(bool) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Type alias for shared run state reference.
pub type RunStateRef = Arc<RunState>;

#[derive(Default)]
struct Inner {
    running: bool,
    next_id: u64,
    listeners: Vec<(u64, RunListener)>,
}

#[derive(Default)]
pub struct RunState {
    inner: Mutex<Inner>,
}

impl RunState {
    /// Create a stopped run state.
    pub fn new() -> RunStateRef {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Set the flag, notifying every subscriber if the value changed.
    ///
    /// Returns `true` when the value changed.
    pub fn set_running(&self, running: bool) -> bool {
        let listeners: Vec<RunListener> = {
            let mut inner = self.lock();
            if inner.running == running {
                return false;
            }
            inner.running = running;
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        tracing::debug!(running, subscribers = listeners.len(), "run state changed");
        for listener in listeners {
            listener(running);
        }
        true
    }

    /// Register a listener. The current value is delivered immediately.
    ///
    /// The listener stays registered until the returned handle is dropped
    /// or [`Subscription::unsubscribe`] is called.
    pub fn subscribe(self: &Arc<Self>, listener: RunListener) -> Subscription {
        let (id, current) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.running)
        };

        listener(current);

        Subscription {
            id,
            state: Arc::downgrade(self),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn remove(&self, id: u64) {
        self.lock().listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Handle returned by [`RunState::subscribe`].
#[must_use = "dropping a subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    state: Weak<RunState>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.remove(self.id);
        }
    }
}
