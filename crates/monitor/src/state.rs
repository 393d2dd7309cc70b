//! Telephony input and the persisted call-cycle model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Telephony call state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneState {
    Ringing,
    /// A call is active (answered or outgoing).
    OffHook,
    Idle,
}

impl PhoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneState::Ringing => "ringing",
            PhoneState::OffHook => "offhook",
            PhoneState::Idle => "idle",
        }
    }
}

impl fmt::Display for PhoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phone state: {0}")]
pub struct UnknownPhoneState(pub String);

impl FromStr for PhoneState {
    type Err = UnknownPhoneState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ringing" => Ok(PhoneState::Ringing),
            "offhook" | "off_hook" => Ok(PhoneState::OffHook),
            "idle" => Ok(PhoneState::Idle),
            other => Err(UnknownPhoneState(other.to_string())),
        }
    }
}

/// One phone-state change broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneStateEvent {
    pub state: PhoneState,
    /// Caller id, when the carrier supplied one.
    #[serde(default)]
    pub number: Option<String>,
}

impl PhoneStateEvent {
    pub fn ringing(number: Option<&str>) -> Self {
        Self {
            state: PhoneState::Ringing,
            number: number.map(str::to_string),
        }
    }

    pub fn offhook() -> Self {
        Self {
            state: PhoneState::OffHook,
            number: None,
        }
    }

    pub fn idle() -> Self {
        Self {
            state: PhoneState::Idle,
            number: None,
        }
    }
}

/// Persisted state carried between phone-state events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCycleState {
    /// A RINGING has not yet been resolved by OFFHOOK or IDLE.
    pub was_ringing: bool,
    /// Caller id captured at RINGING.
    pub incoming_number: Option<String>,
}

impl CallCycleState {
    /// The stored number, if present and non-blank.
    pub fn number(&self) -> Option<&str> {
        non_blank(self.incoming_number.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Repository for the call-cycle record.
///
/// `save` must be durable when it returns: the next event may be handled by
/// a fresh process.
pub trait CallCycleRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_cycle(&self) -> Result<CallCycleState, Self::Error>;
    fn save_cycle(&self, state: &CallCycleState) -> Result<(), Self::Error>;
}

/// Last auto-reply time for one number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub number: String,
    pub last_sent_ms: i64,
}

/// Per-number record of when an auto-reply was last sent.
pub trait CooldownLedger: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn last_sent(&self, number: &str) -> Result<Option<i64>, Self::Error>;
    fn record_sent(&self, number: &str, sent_at_ms: i64) -> Result<(), Self::Error>;
    fn entries(&self) -> Result<Vec<LedgerEntry>, Self::Error>;

    /// Remove entries last sent before `cutoff_ms`. Returns how many went.
    fn prune_before(&self, cutoff_ms: i64) -> Result<usize, Self::Error>;
}

impl<T: CallCycleRepository + ?Sized> CallCycleRepository for Arc<T> {
    type Error = T::Error;

    fn load_cycle(&self) -> Result<CallCycleState, Self::Error> {
        (**self).load_cycle()
    }

    fn save_cycle(&self, state: &CallCycleState) -> Result<(), Self::Error> {
        (**self).save_cycle(state)
    }
}

impl<T: CooldownLedger + ?Sized> CooldownLedger for Arc<T> {
    type Error = T::Error;

    fn last_sent(&self, number: &str) -> Result<Option<i64>, Self::Error> {
        (**self).last_sent(number)
    }

    fn record_sent(&self, number: &str, sent_at_ms: i64) -> Result<(), Self::Error> {
        (**self).record_sent(number, sent_at_ms)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, Self::Error> {
        (**self).entries()
    }

    fn prune_before(&self, cutoff_ms: i64) -> Result<usize, Self::Error> {
        (**self).prune_before(cutoff_ms)
    }
}
