//! Logging configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Log severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// One step more verbose, saturating at `Trace`
    pub fn more_verbose(self) -> Self {
        match self {
            Self::Error => Self::Warn,
            Self::Warn => Self::Info,
            Self::Info => Self::Debug,
            Self::Debug | Self::Trace => Self::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log format for stdout and file output
    pub format: LogFormat,
    /// Log level
    pub level: LogLevel,
    /// Also write logs to a daily-rotated file
    pub file: bool,
    /// Directory for rotated log files
    pub log_dir: PathBuf,
    /// Number of daily log files to keep
    pub retention_days: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: LogLevel::Info,
            file: true,
            log_dir: PathBuf::from("logs"),
            retention_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_steps_saturate_at_trace() {
        assert_eq!(LogLevel::Info.more_verbose(), LogLevel::Debug);
        assert_eq!(LogLevel::Debug.more_verbose(), LogLevel::Trace);
        assert_eq!(LogLevel::Trace.more_verbose(), LogLevel::Trace);
    }

    #[test]
    fn level_parses_lowercase() {
        let cfg: LoggingConfig = toml::from_str("level = \"warn\"\nformat = \"json\"").unwrap();
        assert_eq!(cfg.level, LogLevel::Warn);
        assert_eq!(cfg.format, LogFormat::Json);
        assert!(cfg.file);
        assert_eq!(cfg.retention_days, 30);
    }
}
