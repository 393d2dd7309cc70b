//! Missed-call state machine.
//!
//! Each event is handled to completion against persisted state only, so the
//! monitor behaves the same whether consecutive events reach one process or
//! a freshly started one.

use crate::clock::{Clock, SystemClock};
use crate::decision::CallDecision;
use crate::error::{MonitorError, Result};
use crate::state::{
    non_blank, CallCycleRepository, CallCycleState, CooldownLedger, PhoneState, PhoneStateEvent,
};
use crate::ReplyTextSource;
use smsreply_dispatch::SmsDispatch;
use smsreply_events::{event_names, EventBusRef, NullEventBus, RunStateRef};
use std::sync::Arc;
use std::time::Duration;

/// Minimum time between auto-replies to the same number.
pub const COOLDOWN_WINDOW: Duration = Duration::from_secs(60);

/// Window length in milliseconds, saturating for windows beyond `i64`.
fn window_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

pub struct CallMonitor<C, L, T, D, K = SystemClock> {
    run_state: RunStateRef,
    cycle: C,
    ledger: L,
    templates: T,
    dispatcher: D,
    clock: K,
    cooldown_ms: i64,
    bus: EventBusRef,
}

impl<C, L, T, D> CallMonitor<C, L, T, D>
where
    C: CallCycleRepository,
    L: CooldownLedger,
    T: ReplyTextSource,
    D: SmsDispatch,
{
    pub fn new(run_state: RunStateRef, cycle: C, ledger: L, templates: T, dispatcher: D) -> Self {
        Self {
            run_state,
            cycle,
            ledger,
            templates,
            dispatcher,
            clock: SystemClock,
            cooldown_ms: window_ms(COOLDOWN_WINDOW),
            bus: Arc::new(NullEventBus),
        }
    }
}

impl<C, L, T, D, K> CallMonitor<C, L, T, D, K>
where
    C: CallCycleRepository,
    L: CooldownLedger,
    T: ReplyTextSource,
    D: SmsDispatch,
    K: Clock,
{
    pub fn with_clock<K2: Clock>(self, clock: K2) -> CallMonitor<C, L, T, D, K2> {
        CallMonitor {
            run_state: self.run_state,
            cycle: self.cycle,
            ledger: self.ledger,
            templates: self.templates,
            dispatcher: self.dispatcher,
            clock,
            cooldown_ms: self.cooldown_ms,
            bus: self.bus,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = window_ms(cooldown);
        self
    }

    /// Publish every decision made by [`receive`](Self::receive) on `bus`.
    pub fn with_event_bus(mut self, bus: EventBusRef) -> Self {
        self.bus = bus;
        self
    }

    pub fn cycle(&self) -> &C {
        &self.cycle
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Handle an event the way a broadcast receiver does: the decision is
    /// published and logged, errors are logged and swallowed.
    pub fn receive(&self, event: &PhoneStateEvent) -> Option<CallDecision> {
        match self.handle(event) {
            Ok(decision) => {
                let payload = decision.to_event(event.state, self.clock.now_millis());
                match serde_json::to_value(&payload) {
                    Ok(value) => self.bus.emit(event_names::MONITOR_DECISION, value),
                    Err(e) => tracing::warn!(error = %e, "failed to encode decision event"),
                }
                Some(decision)
            }
            Err(e) => {
                tracing::error!(state = %event.state, error = %e, "failed to handle phone state");
                None
            }
        }
    }

    /// Apply one phone-state event.
    pub fn handle(&self, event: &PhoneStateEvent) -> Result<CallDecision> {
        if !self.run_state.is_running() {
            tracing::debug!(state = %event.state, "monitor not running, ignoring call");
            return Ok(CallDecision::Ignored);
        }

        tracing::debug!(state = %event.state, number = ?event.number, "phone state");

        match event.state {
            PhoneState::Ringing => self.on_ringing(event.number.as_deref()),
            PhoneState::OffHook => self.on_offhook(),
            PhoneState::Idle => self.on_idle(),
        }
    }

    fn load(&self) -> Result<CallCycleState> {
        self.cycle.load_cycle().map_err(MonitorError::persistence)
    }

    fn save(&self, state: &CallCycleState) -> Result<()> {
        self.cycle.save_cycle(state).map_err(MonitorError::persistence)
    }

    fn on_ringing(&self, number: Option<&str>) -> Result<CallDecision> {
        let mut state = self.load()?;
        state.was_ringing = true;

        // Some carriers only send the number on a second RINGING; a numberless
        // one must not wipe a number captured earlier.
        match non_blank(number) {
            Some(number) => {
                state.incoming_number = Some(number.to_string());
                tracing::debug!(number, "ringing, number saved");
            }
            None => tracing::debug!("ringing but no number available"),
        }

        self.save(&state)?;
        Ok(CallDecision::Ringing {
            number: state.number().map(str::to_string),
        })
    }

    fn on_offhook(&self) -> Result<CallDecision> {
        let mut state = self.load()?;
        state.was_ringing = false;
        self.save(&state)?;
        tracing::debug!("call answered");
        Ok(CallDecision::Answered)
    }

    fn on_idle(&self) -> Result<CallDecision> {
        let outcome = self.load().and_then(|state| {
            tracing::debug!(
                was_ringing = state.was_ringing,
                number = ?state.incoming_number,
                "call ended"
            );
            self.resolve_missed_call(&state)
        });

        // The cycle ends here whatever happened above.
        let cleared = self.save(&CallCycleState::default());
        let decision = outcome?;
        cleared?;
        Ok(decision)
    }

    fn resolve_missed_call(&self, state: &CallCycleState) -> Result<CallDecision> {
        if !state.was_ringing {
            return Ok(CallDecision::NotMissed);
        }

        let Some(number) = state.number() else {
            tracing::info!("missed call but no valid number to reply to");
            return Ok(CallDecision::NoNumber);
        };

        let now = self.clock.now_millis();
        let last_sent = self
            .ledger
            .last_sent(number)
            .map_err(MonitorError::persistence)?;

        if let Some(last_sent) = last_sent {
            let elapsed_ms = now - last_sent;
            if elapsed_ms < self.cooldown_ms {
                tracing::info!(number, elapsed_ms, "auto-reply skipped, cooldown active");
                return Ok(CallDecision::CooldownActive {
                    number: number.to_string(),
                    elapsed_ms,
                });
            }
        }

        // Recorded before sending so an overlapping cycle for the same
        // number sees the cooldown while this send is still in flight.
        self.ledger
            .record_sent(number, now)
            .map_err(MonitorError::persistence)?;

        tracing::info!(number, "missed call, sending auto-reply");
        let text = self.templates.selected_text();

        match self.dispatcher.send(number, &text) {
            Ok(report) => Ok(CallDecision::Dispatched {
                number: number.to_string(),
                parts: report.parts,
            }),
            Err(e) => {
                tracing::warn!(number, error = %e, "auto-reply not sent");
                Ok(CallDecision::DispatchFailed {
                    number: number.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
