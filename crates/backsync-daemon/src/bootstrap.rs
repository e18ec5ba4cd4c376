//! Daemon constants and logging.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::json;

use backsync_core::LoggingConfig;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How often the scheduler checks whether a task is due.
pub const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Default pid file location (tilde-expanded at use).
pub const DEFAULT_PID_FILE: &str = "~/.local/share/backsync/backsyncd.pid";

// ---------------------------------------------------------------------------
// Log level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level string (case-insensitive, defaults to Info).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Returns true if a message at `msg_level` passes this filter level.
    pub fn should_log(self, msg_level: LogLevel) -> bool {
        msg_level >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Output format for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Json,
}

impl LogFormat {
    /// Parse a format string (defaults to Console).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "json" => Self::Json,
            _ => Self::Console,
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Leveled logger writing to stderr plus an optional file sink.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    format: LogFormat,
    file: Option<PathBuf>,
}

impl Logger {
    pub fn new(level: LogLevel, format: LogFormat, file: Option<PathBuf>) -> Self {
        Self {
            level,
            format,
            file,
        }
    }

    pub fn from_config(cfg: &LoggingConfig) -> Self {
        let file = if cfg.file.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(cfg.file.trim()))
        };
        Self::new(LogLevel::parse(&cfg.level), LogFormat::parse(&cfg.format), file)
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.level.should_log(level) {
            return;
        }
        let line = self.render(level, message);
        eprintln!("{line}");
        if let Some(path) = &self.file {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn render(&self, level: LogLevel, message: &str) -> String {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        match self.format {
            LogFormat::Console => format!("{ts} {level} {message}"),
            LogFormat::Json => json!({ "ts": ts, "level": level.to_string(), "msg": message })
                .to_string(),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parse_and_ordering() {
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("bogus"), LogLevel::Info);
        assert!(LogLevel::Info.should_log(LogLevel::Error));
        assert!(!LogLevel::Warn.should_log(LogLevel::Info));
    }

    #[test]
    fn format_parse_defaults_to_console() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Console);
    }

    #[test]
    fn console_render_has_level_and_message() {
        let logger = Logger::new(LogLevel::Info, LogFormat::Console, None);
        let line = logger.render(LogLevel::Warn, "disk almost full");
        assert!(line.contains(" WARN "));
        assert!(line.ends_with("disk almost full"));
    }

    #[test]
    fn json_render_is_valid_json() {
        let logger = Logger::new(LogLevel::Info, LogFormat::Json, None);
        let line = logger.render(LogLevel::Error, "boom");
        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => panic!("expected json line, got {line:?}: {err}"),
        };
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["msg"], "boom");
    }
}
