//! Integration tests for the storage crate.
//!
//! Uses in-memory SQLite for fast, isolated tests and temp files where a
//! test needs to survive a reopen.

use smsreply_dispatch::{RecordingTransport, SmsDispatcher, StaticPermission};
use smsreply_events::RunState;
use smsreply_monitor::{
    CallCycleRepository, CallCycleState, CallDecision, CallMonitor, CooldownLedger, ManualClock,
    PhoneStateEvent,
};
use smsreply_service::BootPreference;
use smsreply_storage::{Database, StorageError};
use smsreply_templates::{TemplateRepository, TemplateStore, DEFAULT_TEMPLATE_TEXT};
use std::sync::Arc;
use tempfile::tempdir;

fn create_test_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

// =============================================================================
// Database Initialization Tests
// =============================================================================

mod initialization {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok(), "Should create in-memory database");
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = Database::open(&db_path);
        assert!(db.is_ok(), "Should create file-based database");
        assert!(db_path.exists(), "Database file should exist");
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let db = Database::open(&db_path).unwrap();
            db.record_sent("+15551234567", 42).unwrap();
        }

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.last_sent("+15551234567").unwrap(), Some(42));
    }
}

// =============================================================================
// Call Cycle Tests
// =============================================================================

mod call_cycle {
    use super::*;

    #[test]
    fn test_defaults_when_never_written() {
        let db = create_test_db();
        assert_eq!(db.load_cycle().unwrap(), CallCycleState::default());
    }

    #[test]
    fn test_save_and_load() {
        let db = create_test_db();
        let state = CallCycleState {
            was_ringing: true,
            incoming_number: Some("+15551234567".into()),
        };

        db.save_cycle(&state).unwrap();
        assert_eq!(db.load_cycle().unwrap(), state);
    }

    #[test]
    fn test_save_overwrites_single_record() {
        let db = create_test_db();
        db.save_cycle(&CallCycleState {
            was_ringing: true,
            incoming_number: Some("+1".into()),
        })
        .unwrap();
        db.save_cycle(&CallCycleState::default()).unwrap();

        assert_eq!(db.load_cycle().unwrap(), CallCycleState::default());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("cycle.db");
        let state = CallCycleState {
            was_ringing: true,
            incoming_number: Some("+15551234567".into()),
        };

        Database::open(&db_path).unwrap().save_cycle(&state).unwrap();

        let reopened = Database::open(&db_path).unwrap();
        assert_eq!(reopened.load_cycle().unwrap(), state);
    }
}

// =============================================================================
// Cooldown Ledger Tests
// =============================================================================

mod ledger {
    use super::*;

    #[test]
    fn test_unknown_number() {
        let db = create_test_db();
        assert_eq!(db.last_sent("+15551234567").unwrap(), None);
    }

    #[test]
    fn test_record_overwrites() {
        let db = create_test_db();
        db.record_sent("+15551234567", 1_000).unwrap();
        db.record_sent("+15551234567", 65_000).unwrap();

        assert_eq!(db.last_sent("+15551234567").unwrap(), Some(65_000));
        assert_eq!(db.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_entries_newest_first() {
        let db = create_test_db();
        db.record_sent("+1", 10).unwrap();
        db.record_sent("+2", 30).unwrap();
        db.record_sent("+3", 20).unwrap();

        let numbers: Vec<_> = db.entries().unwrap().into_iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec!["+2", "+3", "+1"]);
    }

    #[test]
    fn test_prune_before() {
        let db = create_test_db();
        db.record_sent("+1", 10).unwrap();
        db.record_sent("+2", 30).unwrap();
        db.record_sent("+3", 20).unwrap();

        assert_eq!(db.prune_before(20).unwrap(), 1);
        assert_eq!(db.last_sent("+1").unwrap(), None);
        assert_eq!(db.last_sent("+3").unwrap(), Some(20));
        assert_eq!(db.entries().unwrap().len(), 2);
    }
}

// =============================================================================
// Template Tests
// =============================================================================

mod templates {
    use super::*;

    #[test]
    fn test_empty_database_has_no_templates() {
        let db = create_test_db();
        assert!(db.load_templates().unwrap().is_empty());
    }

    #[test]
    fn test_store_round_trip_through_database() {
        let db = Arc::new(create_test_db());
        let store = TemplateStore::new(Arc::clone(&db));

        let first = store.add("Busy, will call back").unwrap();
        let second = store.add("At work").unwrap();
        store.select(&second.id).unwrap();

        let reloaded = TemplateStore::new(Arc::clone(&db));
        let templates = reloaded.list();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].id, first.id);
        assert!(!templates[0].is_selected);
        assert_eq!(reloaded.selected_text(), "At work");
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_default() {
        let db = Arc::new(create_test_db());
        db.set_setting("templates", "{not json").unwrap();

        assert!(matches!(
            db.load_templates(),
            Err(StorageError::SerializationError(_))
        ));

        let store = TemplateStore::new(Arc::clone(&db));
        assert_eq!(store.selected_text(), DEFAULT_TEMPLATE_TEXT);

        let added = store.add("Driving").unwrap();
        assert!(added.is_selected);
        assert_eq!(db.load_templates().unwrap().len(), 1);
    }

    #[test]
    fn test_unselected_blob_is_repaired() {
        let db = Arc::new(create_test_db());
        db.set_setting(
            "templates",
            r#"[{"id":"a","text":"one","isSelected":false},{"id":"b","text":"two","isSelected":false}]"#,
        )
        .unwrap();

        let store = TemplateStore::new(Arc::clone(&db));
        assert_eq!(store.selected_text(), "one");

        let persisted = db.load_templates().unwrap();
        assert!(persisted[0].is_selected);
        assert!(!persisted[1].is_selected);
    }
}

// =============================================================================
// Settings Tests
// =============================================================================

mod settings {
    use super::*;

    #[test]
    fn test_start_on_boot_defaults_off() {
        let db = create_test_db();
        assert!(!db.start_on_boot().unwrap());
    }

    #[test]
    fn test_start_on_boot_round_trip() {
        let db = create_test_db();
        db.set_start_on_boot(true).unwrap();
        assert!(db.start_on_boot().unwrap());
        db.set_start_on_boot(false).unwrap();
        assert!(!db.start_on_boot().unwrap());
    }

    #[test]
    fn test_invalid_start_on_boot_value() {
        let db = create_test_db();
        db.set_setting("start_on_boot", "maybe").unwrap();
        assert!(matches!(
            db.start_on_boot(),
            Err(StorageError::InvalidSetting { .. })
        ));
    }
}

// =============================================================================
// Monitor Over SQLite
// =============================================================================

mod monitor {
    use super::*;

    const NUMBER: &str = "+15551234567";

    fn monitor_at(
        db: Arc<Database>,
        clock: Arc<ManualClock>,
    ) -> CallMonitor<
        Arc<Database>,
        Arc<Database>,
        TemplateStore<Arc<Database>>,
        SmsDispatcher<Arc<RecordingTransport>, StaticPermission>,
        Arc<ManualClock>,
    > {
        monitor_with(db, clock, Arc::new(RecordingTransport::new()))
    }

    fn monitor_with(
        db: Arc<Database>,
        clock: Arc<ManualClock>,
        transport: Arc<RecordingTransport>,
    ) -> CallMonitor<
        Arc<Database>,
        Arc<Database>,
        TemplateStore<Arc<Database>>,
        SmsDispatcher<Arc<RecordingTransport>, StaticPermission>,
        Arc<ManualClock>,
    > {
        let run_state = RunState::new();
        run_state.set_running(true);
        CallMonitor::new(
            run_state,
            Arc::clone(&db),
            Arc::clone(&db),
            TemplateStore::new(db),
            SmsDispatcher::new(transport, StaticPermission(true)),
        )
        .with_clock(clock)
    }

    #[test]
    fn test_missed_call_across_process_restart() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("smsreply.db");
        let clock = Arc::new(ManualClock::new(0));
        let transport = Arc::new(RecordingTransport::new());

        {
            let db = Arc::new(Database::open(&db_path).unwrap());
            let monitor = monitor_with(db, Arc::clone(&clock), Arc::clone(&transport));
            monitor.handle(&PhoneStateEvent::ringing(Some(NUMBER))).unwrap();
        }

        clock.advance_secs(1);
        let db = Arc::new(Database::open(&db_path).unwrap());
        let monitor = monitor_with(Arc::clone(&db), Arc::clone(&clock), Arc::clone(&transport));
        let decision = monitor.handle(&PhoneStateEvent::idle()).unwrap();

        assert!(decision.is_dispatched());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].parts, vec![DEFAULT_TEMPLATE_TEXT.to_string()]);
        assert_eq!(db.last_sent(NUMBER).unwrap(), Some(1_000));
        assert_eq!(db.load_cycle().unwrap(), CallCycleState::default());
    }

    #[test]
    fn test_cooldown_persisted_between_monitors() {
        let db = Arc::new(create_test_db());
        let clock = Arc::new(ManualClock::new(0));

        let first = monitor_at(Arc::clone(&db), Arc::clone(&clock));
        first.handle(&PhoneStateEvent::ringing(Some(NUMBER))).unwrap();
        assert!(first.handle(&PhoneStateEvent::idle()).unwrap().is_dispatched());

        clock.set(30_000);
        let second = monitor_at(Arc::clone(&db), Arc::clone(&clock));
        second.handle(&PhoneStateEvent::ringing(Some(NUMBER))).unwrap();
        assert!(matches!(
            second.handle(&PhoneStateEvent::idle()).unwrap(),
            CallDecision::CooldownActive { .. }
        ));

        clock.set(65_000);
        second.handle(&PhoneStateEvent::ringing(Some(NUMBER))).unwrap();
        assert!(second.handle(&PhoneStateEvent::idle()).unwrap().is_dispatched());
    }
}
