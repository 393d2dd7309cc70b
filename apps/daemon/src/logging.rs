use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,smsreply=debug";
pub const LOG_FILE_NAME: &str = "smsreply.log";

/// The log file never grows past this size; it starts over instead.
pub const MAX_LOG_BYTES: u64 = 500 * 1024;

pub fn log_file(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

/// Install the global subscriber. Logs go to stderr and, with a log
/// directory, also to `smsreply.log` inside it. Keep the returned guard
/// alive for as long as file logging should flush.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = log_file(dir);
    let file = CappedLogFile::open(&path, MAX_LOG_BYTES)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

/// Append-only file that is emptied whenever the next write would take it
/// past `max_bytes`.
pub struct CappedLogFile {
    file: File,
    len: u64,
    max_bytes: u64,
}

impl CappedLogFile {
    pub fn open(path: &Path, max_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            len,
            max_bytes,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Write for CappedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.len > 0 && self.len.saturating_add(buf.len() as u64) > self.max_bytes {
            self.file.set_len(0)?;
            self.len = 0;
        }
        let written = self.file.write(buf)?;
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Contents of the log file, empty when there is none.
pub fn read(dir: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(log_file(dir)) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).context("failed to read log file"),
    }
}

/// Remove the log file. Returns whether there was one.
pub fn clear(dir: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(log_file(dir)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).context("failed to remove log file"),
    }
}
