//! Host process wiring: one monitor, one foreground service, one database.

use crate::input::{parse_line, DaemonCommand};
use serde_json::json;
use smsreply_dispatch::{
    CommandTransport, ProgramPermission, SmsDispatch, SmsDispatcher, SmsTransport,
    StaticPermission, TransportError,
};
use smsreply_events::{event_names, new_listener, EventBusRef, RunState, RunStateRef, Subscription};
use smsreply_monitor::CallMonitor;
use smsreply_service::{on_boot_completed, BusStatusSurface, ForegroundService};
use smsreply_storage::Database;
use smsreply_templates::TemplateStore;
use std::path::Path;
use std::sync::Arc;

type Store = Arc<Database>;

pub struct Daemon<D> {
    db: Store,
    run_state: RunStateRef,
    monitor: CallMonitor<Store, Store, TemplateStore<Store>, D>,
    service: ForegroundService<BusStatusSurface>,
    bus: EventBusRef,
    _run_log: Subscription,
}

impl<D: SmsDispatch> Daemon<D> {
    pub fn new(db: Store, dispatcher: D, bus: EventBusRef) -> Self {
        let run_state = RunState::new();
        let run_log = run_state.subscribe(new_listener(|running| {
            tracing::info!(running, "monitoring state");
        }));

        let monitor = CallMonitor::new(
            Arc::clone(&run_state),
            Arc::clone(&db),
            Arc::clone(&db),
            TemplateStore::new(Arc::clone(&db)),
            dispatcher,
        )
        .with_event_bus(Arc::clone(&bus));

        let service = ForegroundService::new(
            Arc::clone(&run_state),
            BusStatusSurface::new(Arc::clone(&bus)),
        );

        Self {
            db,
            run_state,
            monitor,
            service,
            bus,
            _run_log: run_log,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn handle_line(&self, line: &str) {
        match parse_line(line) {
            Ok(command) => self.handle(command),
            Err(e) => tracing::warn!(line, error = %e, "ignoring input line"),
        }
    }

    pub fn handle(&self, command: DaemonCommand) {
        match command {
            DaemonCommand::Phone(event) => {
                self.monitor.receive(&event);
            }
            DaemonCommand::Service(action) => self.service.on_command(Some(action)),
            DaemonCommand::Open => {
                tracing::info!("open requested");
                self.bus.emit(event_names::OPEN_REQUESTED, json!({}));
            }
            DaemonCommand::BootCompleted => self.boot_completed(),
        }
    }

    pub fn boot_completed(&self) {
        if let Err(e) = on_boot_completed(&self.db, &self.service) {
            tracing::error!(error = %e, "boot start failed");
        }
    }

    pub fn shutdown(&self) {
        self.service.on_destroy();
    }
}

/// Transport used when no SMS program is configured.
struct UnconfiguredTransport;

impl SmsTransport for UnconfiguredTransport {
    fn send_text(&self, _number: &str, _text: &str) -> Result<(), TransportError> {
        Err(TransportError::Unavailable("no sms command configured".to_string()))
    }

    fn send_multipart(&self, _number: &str, _parts: &[String]) -> Result<(), TransportError> {
        Err(TransportError::Unavailable("no sms command configured".to_string()))
    }
}

pub fn build_dispatcher(command: Option<&Path>, args: Vec<String>) -> Arc<dyn SmsDispatch> {
    match command {
        Some(program) => {
            tracing::info!(program = %program.display(), "using command transport");
            Arc::new(SmsDispatcher::new(
                CommandTransport::new(program, args),
                ProgramPermission::new(program),
            ))
        }
        None => {
            tracing::warn!("no sms command configured, missed calls will not be answered");
            Arc::new(SmsDispatcher::new(UnconfiguredTransport, StaticPermission(false)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreply_dispatch::RecordingTransport;
    use smsreply_events::InMemoryEventBus;
    use smsreply_monitor::CooldownLedger;
    use smsreply_service::BootPreference;

    struct Harness {
        daemon: Daemon<SmsDispatcher<Arc<RecordingTransport>, StaticPermission>>,
        db: Store,
        transport: Arc<RecordingTransport>,
        bus: Arc<InMemoryEventBus>,
    }

    fn harness() -> Harness {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let transport = Arc::new(RecordingTransport::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let daemon = Daemon::new(
            Arc::clone(&db),
            SmsDispatcher::new(Arc::clone(&transport), StaticPermission(true)),
            bus.clone(),
        );
        Harness {
            daemon,
            db,
            transport,
            bus,
        }
    }

    #[test]
    fn test_calls_ignored_until_started() {
        let h = harness();
        h.daemon.handle_line("ringing +15551234567");
        h.daemon.handle_line("idle");

        assert!(h.transport.sent().is_empty());
        let decisions = h.bus.events_for(event_names::MONITOR_DECISION);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].payload["decision"], "ignored");
    }

    #[test]
    fn test_missed_call_while_running() {
        let h = harness();
        h.daemon.handle_line("start");
        h.daemon.handle_line("ringing +15551234567");
        h.daemon.handle_line("idle");

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].number, "+15551234567");
        assert!(h.db.last_sent("+15551234567").unwrap().is_some());

        let decisions = h.bus.events_for(event_names::MONITOR_DECISION);
        assert_eq!(decisions.last().unwrap().payload["decision"], "dispatched");
    }

    #[test]
    fn test_answered_call_is_not_replied() {
        let h = harness();
        h.daemon.handle_line("start");
        h.daemon.handle_line("ringing +15551234567");
        h.daemon.handle_line("offhook");
        h.daemon.handle_line("idle");

        assert!(h.transport.sent().is_empty());
    }

    #[test]
    fn test_stop_and_status_events() {
        let h = harness();
        h.daemon.handle_line("start");
        assert!(h.daemon.is_running());
        h.daemon.handle_line("stop");
        assert!(!h.daemon.is_running());

        let status = h.bus.events_for(event_names::SERVICE_STATUS);
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].payload["running"], true);
        assert_eq!(status[1].payload["visible"], false);
    }

    #[test]
    fn test_boot_follows_preference() {
        let h = harness();
        h.daemon.handle_line("boot");
        assert!(!h.daemon.is_running());

        h.db.set_start_on_boot(true).unwrap();
        h.daemon.handle_line("boot");
        assert!(h.daemon.is_running());
    }

    #[test]
    fn test_open_and_invalid_lines() {
        let h = harness();
        h.daemon.handle_line("open");
        h.daemon.handle_line("bogus");
        h.daemon.handle_line("");

        assert_eq!(h.bus.events_for(event_names::OPEN_REQUESTED).len(), 1);
        assert_eq!(h.bus.len(), 1);
    }

    #[test]
    fn test_shutdown_stops_monitoring() {
        let h = harness();
        h.daemon.handle_line("start");
        h.daemon.shutdown();

        assert!(!h.daemon.is_running());
        h.daemon.handle_line("ringing +15551234567");
        h.daemon.handle_line("idle");
        assert!(h.transport.sent().is_empty());
    }

    #[test]
    fn test_unconfigured_dispatcher_refuses() {
        let dispatcher = build_dispatcher(None, Vec::new());
        assert!(dispatcher.send("+15551234567", "hi").is_err());
    }
}
