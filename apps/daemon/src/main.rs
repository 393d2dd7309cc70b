mod daemon;
mod input;
mod logging;
mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use smsreply_events::EventBusRef;
use smsreply_monitor::{CooldownLedger, COOLDOWN_WINDOW};
use smsreply_service::BootPreference;
use smsreply_storage::Database;
use smsreply_templates::TemplateStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::daemon::{build_dispatcher, Daemon};
use crate::output::JsonLinesEventBus;

#[derive(Parser)]
#[command(name = "smsreply", version, about = "Reply to missed calls with a text message")]
struct Cli {
    /// SQLite database holding templates, call state and settings
    #[arg(long, env = "SMSREPLY_DB")]
    db: Option<PathBuf>,

    /// Also write logs to smsreply.log in this directory
    #[arg(long, env = "SMSREPLY_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read phone-state and service commands from stdin, write events to stdout
    Run {
        /// Program that sends one SMS part (text on stdin)
        #[arg(long, env = "SMSREPLY_SMS_COMMAND")]
        sms_command: Option<PathBuf>,
        /// Argument for the SMS program; "{number}" is replaced by the caller
        #[arg(long = "sms-arg", allow_hyphen_values = true)]
        sms_args: Vec<String>,
        /// Treat startup as boot completion
        #[arg(long)]
        boot: bool,
    },
    /// Manage reply templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Show or change whether monitoring starts at boot
    StartOnBoot {
        #[arg(value_parser = ["on", "off"])]
        value: Option<String>,
    },
    /// Inspect the per-number cooldown ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Inspect the log file
    Logs {
        #[command(subcommand)]
        command: LogCommands,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List templates; the active one is marked with '*'
    List,
    /// Add a template
    Add { text: String },
    /// Replace a template's text
    Update { id: String, text: String },
    /// Delete a template
    Delete { id: String },
    /// Make a template the active one
    Select { id: String },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// List numbers with their last reply time
    List,
    /// Forget replies older than the given age
    Prune {
        #[arg(long, default_value_t = COOLDOWN_WINDOW.as_secs())]
        older_than_secs: u64,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    Show,
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Logs { command } = &cli.command {
        return logs(cli.log_dir.as_deref(), command);
    }

    let _log_guard = logging::init(cli.log_dir.as_deref())?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting smsreply");

    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = Arc::new(open_database(&db_path)?);

    match cli.command {
        Commands::Run {
            sms_command,
            sms_args,
            boot,
        } => run(db, sms_command.as_deref(), sms_args, boot),
        Commands::Templates { command } => templates(db, command),
        Commands::StartOnBoot { value } => start_on_boot(&db, value.as_deref()),
        Commands::Ledger { command } => ledger(&db, command),
        Commands::Logs { .. } => Ok(()),
    }
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir().context("no data directory for this platform, pass --db")?;
    Ok(dir.join("smsreply").join("smsreply.db"))
}

fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tracing::debug!(path = %path.display(), "opening database");
    Database::open(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn run(
    db: Arc<Database>,
    sms_command: Option<&Path>,
    sms_args: Vec<String>,
    boot: bool,
) -> anyhow::Result<()> {
    let bus: EventBusRef = Arc::new(JsonLinesEventBus::stdout());
    let daemon = Daemon::new(db, build_dispatcher(sms_command, sms_args), bus);

    if boot {
        daemon.boot_completed();
    }

    let lines = input::spawn_stdin_reader().context("failed to start stdin reader")?;
    for line in lines.iter() {
        daemon.handle_line(&line);
    }

    daemon.shutdown();
    tracing::info!("input closed, exiting");
    Ok(())
}

fn templates(db: Arc<Database>, command: TemplateCommands) -> anyhow::Result<()> {
    let store = TemplateStore::new(db);

    match command {
        TemplateCommands::List => {
            for template in store.list() {
                let marker = if template.is_selected { '*' } else { ' ' };
                println!("{marker} {}\t{}", template.id, template.text);
            }
        }
        TemplateCommands::Add { text } => {
            let template = store.add(&text).context("failed to add template")?;
            println!("{}", template.id);
        }
        TemplateCommands::Update { id, text } => {
            store.update(&id, &text).context("failed to update template")?;
        }
        TemplateCommands::Delete { id } => {
            store.delete(&id).context("failed to delete template")?;
        }
        TemplateCommands::Select { id } => {
            store.select(&id).context("failed to select template")?;
        }
    }
    Ok(())
}

fn start_on_boot(db: &Database, value: Option<&str>) -> anyhow::Result<()> {
    match value {
        Some(value) => {
            let enabled = value == "on";
            db.set_start_on_boot(enabled)
                .context("failed to save start-on-boot preference")?;
            tracing::info!(enabled, "start on boot updated");
        }
        None => {
            let enabled = db
                .start_on_boot()
                .context("failed to read start-on-boot preference")?;
            println!("{}", if enabled { "on" } else { "off" });
        }
    }
    Ok(())
}

fn ledger(db: &Database, command: LedgerCommands) -> anyhow::Result<()> {
    match command {
        LedgerCommands::List => {
            for entry in db.entries().context("failed to read ledger")? {
                let when = chrono::DateTime::from_timestamp_millis(entry.last_sent_ms)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| entry.last_sent_ms.to_string());
                println!("{}\t{when}", entry.number);
            }
        }
        LedgerCommands::Prune { older_than_secs } => {
            let Ok(age_ms) = i64::try_from(older_than_secs.saturating_mul(1000)) else {
                bail!("--older-than-secs is too large");
            };
            let cutoff = chrono::Utc::now().timestamp_millis() - age_ms;
            let removed = db.prune_before(cutoff).context("failed to prune ledger")?;
            println!("removed {removed}");
        }
    }
    Ok(())
}

fn logs(log_dir: Option<&Path>, command: &LogCommands) -> anyhow::Result<()> {
    let Some(dir) = log_dir else {
        bail!("no log directory configured, pass --log-dir or set SMSREPLY_LOG_DIR");
    };

    match command {
        LogCommands::Show => print!("{}", logging::read(dir)?),
        LogCommands::Clear => {
            if logging::clear(dir)? {
                println!("log cleared");
            }
        }
    }
    Ok(())
}
