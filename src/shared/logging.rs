use crate::shared::time::{now_rfc3339, now_secs};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLogLine {
    pub level: LogLevel,
    pub event: String,
    pub message: String,
}

/// Log lines produced for the calling build step. Every mutation and every
/// restore action goes through here. Lines are always kept in memory, even
/// when echo and the runtime log are disabled.
#[derive(Debug, Default)]
pub struct StepLog {
    lines: Mutex<Vec<StepLogLine>>,
    echo: bool,
    runtime_log: Option<PathBuf>,
    invocation: Option<String>,
}

impl StepLog {
    /// Memory-only log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_runtime_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_log = Some(path.into());
        self
    }

    /// Tags runtime log lines so one invocation can be told apart from the
    /// next in a shared log file.
    pub fn with_invocation_id(mut self, id: impl Into<String>) -> Self {
        self.invocation = Some(id.into());
        self
    }

    pub fn info(&self, event: &str, message: impl AsRef<str>) {
        self.record(LogLevel::Info, event, message.as_ref());
    }

    pub fn warn(&self, event: &str, message: impl AsRef<str>) {
        self.record(LogLevel::Warn, event, message.as_ref());
    }

    pub fn error(&self, event: &str, message: impl AsRef<str>) {
        self.record(LogLevel::Error, event, message.as_ref());
    }

    pub fn lines(&self) -> Vec<StepLogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.message).collect()
    }

    pub fn contains_event(&self, event: &str) -> bool {
        self.lines().iter().any(|line| line.event == event)
    }

    fn record(&self, level: LogLevel, event: &str, message: &str) {
        if self.echo {
            match level {
                LogLevel::Info => eprintln!("[benchwarden] {message}"),
                LogLevel::Warn => eprintln!("[benchwarden] WARNING: {message}"),
                LogLevel::Error => eprintln!("[benchwarden] ERROR: {message}"),
            }
        }
        if let Some(path) = &self.runtime_log {
            append_runtime_log(path, self.invocation.as_deref(), level, event, message);
        }
        let line = StepLogLine {
            level,
            event: event.to_string(),
            message: message.to_string(),
        };
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

pub fn append_runtime_log(
    path: &Path,
    invocation: Option<&str>,
    level: LogLevel,
    event: &str,
    message: &str,
) {
    let payload = serde_json::json!({
        "timestamp": now_secs(),
        "time": now_rfc3339(),
        "invocation": invocation,
        "level": level.as_str(),
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}
