//! Outcome of handling one phone-state event.

use crate::state::PhoneState;
use smsreply_events::CallDecisionEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallDecision {
    /// Monitoring is off; the event was discarded untouched.
    Ignored,
    /// RINGING recorded. `number` is the number now stored, if any.
    Ringing { number: Option<String> },
    /// OFFHOOK: the call was answered, no reply this cycle.
    Answered,
    /// IDLE without a pending RINGING.
    NotMissed,
    /// Missed call, but no caller id to reply to.
    NoNumber,
    /// Missed call from a number replied to less than a cooldown ago.
    CooldownActive { number: String, elapsed_ms: i64 },
    /// Auto-reply handed to the dispatcher successfully.
    Dispatched { number: String, parts: usize },
    /// Dispatcher refused or failed. Not retried.
    DispatchFailed { number: String, reason: String },
}

impl CallDecision {
    pub fn label(&self) -> &'static str {
        match self {
            CallDecision::Ignored => "ignored",
            CallDecision::Ringing { .. } => "ringing",
            CallDecision::Answered => "answered",
            CallDecision::NotMissed => "not_missed",
            CallDecision::NoNumber => "no_number",
            CallDecision::CooldownActive { .. } => "cooldown_active",
            CallDecision::Dispatched { .. } => "dispatched",
            CallDecision::DispatchFailed { .. } => "dispatch_failed",
        }
    }

    pub fn number(&self) -> Option<&str> {
        match self {
            CallDecision::Ringing { number } => number.as_deref(),
            CallDecision::CooldownActive { number, .. }
            | CallDecision::Dispatched { number, .. }
            | CallDecision::DispatchFailed { number, .. } => Some(number),
            _ => None,
        }
    }

    pub fn is_dispatched(&self) -> bool {
        matches!(self, CallDecision::Dispatched { .. })
    }

    pub fn to_event(&self, state: PhoneState, timestamp_ms: i64) -> CallDecisionEvent {
        CallDecisionEvent {
            state: state.to_string(),
            decision: self.label().to_string(),
            number: self.number().map(str::to_string),
            timestamp_ms,
        }
    }
}
