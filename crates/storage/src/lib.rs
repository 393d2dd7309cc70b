use rusqlite::{Connection, OptionalExtension};
use smsreply_monitor::{CallCycleRepository, CallCycleState, CooldownLedger, LedgerEntry};
use smsreply_service::BootPreference;
use smsreply_templates::{MessageTemplate, TemplateRepository};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const KEY_TEMPLATES: &str = "templates";
const KEY_START_ON_BOOT: &str = "start_on_boot";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("database connection lock poisoned")]
    LockPoisoned,
    #[error("invalid setting {key}: {value}")]
    InvalidSetting { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        // Every statement commits before returning and FULL sync makes that
        // commit durable: the next phone-state event may come from a new process.
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS call_cycle (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                was_ringing INTEGER NOT NULL DEFAULT 0,
                incoming_number TEXT
            );

            CREATE TABLE IF NOT EXISTS cooldown_ledger (
                number TEXT PRIMARY KEY,
                last_sent_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cooldown_last_sent ON cooldown_ledger(last_sent_ms);
            "#,
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }
}

impl CallCycleRepository for Database {
    type Error = StorageError;

    fn load_cycle(&self) -> Result<CallCycleState> {
        let conn = self.lock()?;
        let state = conn
            .query_row(
                "SELECT was_ringing, incoming_number FROM call_cycle WHERE id = 1",
                [],
                |row| {
                    Ok(CallCycleState {
                        was_ringing: row.get(0)?,
                        incoming_number: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(state.unwrap_or_default())
    }

    fn save_cycle(&self, state: &CallCycleState) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO call_cycle (id, was_ringing, incoming_number) VALUES (1, ?1, ?2)",
            (state.was_ringing, &state.incoming_number),
        )?;
        Ok(())
    }
}

impl CooldownLedger for Database {
    type Error = StorageError;

    fn last_sent(&self, number: &str) -> Result<Option<i64>> {
        let conn = self.lock()?;
        let last = conn
            .query_row(
                "SELECT last_sent_ms FROM cooldown_ledger WHERE number = ?1",
                [number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last)
    }

    fn record_sent(&self, number: &str, sent_at_ms: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cooldown_ledger (number, last_sent_ms) VALUES (?1, ?2)",
            (number, sent_at_ms),
        )?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT number, last_sent_ms FROM cooldown_ledger ORDER BY last_sent_ms DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LedgerEntry {
                number: row.get(0)?,
                last_sent_ms: row.get(1)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn prune_before(&self, cutoff_ms: i64) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM cooldown_ledger WHERE last_sent_ms < ?1",
            [cutoff_ms],
        )?;
        tracing::debug!(removed, cutoff_ms, "pruned cooldown ledger");
        Ok(removed)
    }
}

impl TemplateRepository for Database {
    type Error = StorageError;

    fn load_templates(&self) -> Result<Vec<MessageTemplate>> {
        match self.get_setting(KEY_TEMPLATES)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_templates(&self, templates: &[MessageTemplate]) -> Result<()> {
        let json = serde_json::to_string(templates)?;
        self.set_setting(KEY_TEMPLATES, &json)
    }
}

impl BootPreference for Database {
    type Error = StorageError;

    fn start_on_boot(&self) -> Result<bool> {
        match self.get_setting(KEY_START_ON_BOOT)? {
            None => Ok(false),
            Some(value) => value.parse().map_err(|_| StorageError::InvalidSetting {
                key: KEY_START_ON_BOOT.to_string(),
                value,
            }),
        }
    }

    fn set_start_on_boot(&self, enabled: bool) -> Result<()> {
        self.set_setting(KEY_START_ON_BOOT, if enabled { "true" } else { "false" })
    }
}
