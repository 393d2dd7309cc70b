//! Missed-call detection for smsreply.
//!
//! The monitor consumes phone-state events (RINGING, OFFHOOK, IDLE) and
//! decides, once per ring-without-answer, whether to send the active reply
//! template to the caller.
//!
//! # Architecture
//!
//! ```text
//! PhoneStateEvent ──▶ CallMonitor ──▶ ReplyTextSource (active template)
//!                      │    │                 │
//!          RunState ◀──┘    │                 ▼
//!          (gate)           │           SmsDispatch
//!                           ▼
//!        CallCycleRepository + CooldownLedger (persisted per event)
//! ```
//!
//! No state survives in memory between events; everything the next event
//! needs is written through the repositories before `handle` returns.

mod clock;
mod decision;
mod error;
mod memory;
mod monitor;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::CallDecision;
pub use error::{MonitorError, Result};
pub use memory::{InMemoryCallCycle, InMemoryLedger};
pub use monitor::{CallMonitor, COOLDOWN_WINDOW};
pub use state::{
    CallCycleRepository, CallCycleState, CooldownLedger, LedgerEntry, PhoneState, PhoneStateEvent,
    UnknownPhoneState,
};

use smsreply_templates::{TemplateRepository, TemplateStore};
use std::sync::Arc;

/// Source of the reply text, resolved once per dispatch decision.
pub trait ReplyTextSource: Send + Sync {
    fn selected_text(&self) -> String;
}

impl<R: TemplateRepository> ReplyTextSource for TemplateStore<R> {
    fn selected_text(&self) -> String {
        TemplateStore::selected_text(self)
    }
}

impl<T: ReplyTextSource + ?Sized> ReplyTextSource for Arc<T> {
    fn selected_text(&self) -> String {
        (**self).selected_text()
    }
}
