//! In-memory repositories for tests and dry runs.

use crate::state::{CallCycleRepository, CallCycleState, CooldownLedger, LedgerEntry};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryCallCycle {
    state: Mutex<CallCycleState>,
    writes: AtomicUsize,
}

impl InMemoryCallCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CallCycleState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Number of `save_cycle` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CallCycleRepository for InMemoryCallCycle {
    type Error = Infallible;

    fn load_cycle(&self) -> Result<CallCycleState, Self::Error> {
        Ok(self.snapshot())
    }

    fn save_cycle(&self, state: &CallCycleState) -> Result<(), Self::Error> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<BTreeMap<String, i64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, i64>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CooldownLedger for InMemoryLedger {
    type Error = Infallible;

    fn last_sent(&self, number: &str) -> Result<Option<i64>, Self::Error> {
        Ok(self.map().get(number).copied())
    }

    fn record_sent(&self, number: &str, sent_at_ms: i64) -> Result<(), Self::Error> {
        self.map().insert(number.to_string(), sent_at_ms);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, Self::Error> {
        Ok(self
            .map()
            .iter()
            .map(|(number, last_sent_ms)| LedgerEntry {
                number: number.clone(),
                last_sent_ms: *last_sent_ms,
            })
            .collect())
    }

    fn prune_before(&self, cutoff_ms: i64) -> Result<usize, Self::Error> {
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, sent| *sent >= cutoff_ms);
        Ok(before - map.len())
    }
}
