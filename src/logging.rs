use std::{fs, path::PathBuf, sync::Mutex};

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

/// File-backed subscriber for workbench events, plus the guard that flushes it.
static FILE_LOG: OnceCell<(tracing::Dispatch, WorkerGuard)> = OnceCell::new();

pub fn init() {
    file_log();
}

pub fn with_workbench_subscriber<R>(f: impl FnOnce() -> R) -> R {
    tracing::dispatcher::with_default(file_log(), f)
}

fn file_log() -> &'static tracing::Dispatch {
    let (dispatch, _guard) = FILE_LOG.get_or_init(|| {
        let dir = logs_dir();
        if let Err(error) = fs::create_dir_all(&dir) {
            eprintln!("Failed to create log directory {dir:?}: {error}");
        }
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "workbench.log"));
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .with_writer(writer)
            .finish();
        (subscriber.into(), guard)
    });
    dispatch
}

fn logs_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "cp-workbench", "cp-workbench")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Destination for the user-facing messages a window produces.
///
/// Categories are short labels such as `"Tests"` or `"Runner[2]"`; messages
/// are plain text with no structured fields.
pub trait LogSink: Send + Sync {
    fn log(&self, category: &str, severity: Severity, message: &str);

    /// Drops messages shown to the user. Sinks without a visible history ignore it.
    fn clear(&self) {}

    fn info(&self, category: &str, message: &str) {
        self.log(category, Severity::Info, message);
    }

    fn warn(&self, category: &str, message: &str) {
        self.log(category, Severity::Warn, message);
    }

    fn error(&self, category: &str, message: &str) {
        self.log(category, Severity::Error, message);
    }
}

/// Forwards every message to the workbench log file.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, category: &str, severity: Severity, message: &str) {
        emit(category, severity, message);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogEntry {
    pub category: String,
    pub severity: Severity,
    pub message: String,
}

/// Keeps messages in memory for the message pane, and mirrors them to tracing.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, category: &str, message: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.category == category && entry.message == message)
    }
}

impl LogSink for MessageLog {
    fn log(&self, category: &str, severity: Severity, message: &str) {
        emit(category, severity, message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                category: category.to_string(),
                severity,
                message: message.to_string(),
            });
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

fn emit(category: &str, severity: Severity, message: &str) {
    with_workbench_subscriber(|| match severity {
        Severity::Info => {
            tracing::info!(target: "workbench.messages", category, "{message}");
        }
        Severity::Warn => {
            tracing::warn!(target: "workbench.messages", category, "{message}");
        }
        Severity::Error => {
            tracing::error!(target: "workbench.messages", category, "{message}");
        }
    });
}
