//! Logging setup
//!
//! Console output plus, when enabled, a daily-rotated file under `log_dir`
//! that keeps `retention_days` files. `RUST_LOG` overrides the configured
//! level.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// Prefix of rotated log file names
pub const LOG_FILE_PREFIX: &str = "pagewatch";

/// Keeps the background file writer alive; drop it last.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Configured level raised by one step per `-v`
pub fn effective_level(config: &LoggingConfig, verbose: u8) -> LogLevel {
    (0..verbose).fold(config.level, |level, _| level.more_verbose())
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<LoggingGuard> {
    let level = effective_level(config, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let mut layers: Vec<BoxedLayer> = vec![match config.format {
        LogFormat::Text => fmt::layer().with_target(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(false).boxed(),
    }];

    let mut guard = None;
    if config.file {
        let appender = file_appender(&config.log_dir, config.retention_days)?;
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(match config.format {
            LogFormat::Text => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        });
        guard = Some(worker);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install logging subscriber")?;

    Ok(LoggingGuard { _file: guard })
}

/// Daily-rotated appender writing `pagewatch.<date>.log`
pub fn file_appender(log_dir: &Path, retention_days: usize) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(retention_days.max(1))
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn verbosity_raises_level() {
        let config = LoggingConfig::default();
        assert_eq!(effective_level(&config, 0), LogLevel::Info);
        assert_eq!(effective_level(&config, 1), LogLevel::Debug);
        assert_eq!(effective_level(&config, 2), LogLevel::Trace);
        assert_eq!(effective_level(&config, 9), LogLevel::Trace);
    }

    #[test]
    fn appender_writes_into_nested_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("var").join("logs");

        let mut appender = file_appender(&log_dir, 30).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("pagewatch."), "got {}", names[0]);
        assert!(names[0].ends_with(".log"), "got {}", names[0]);
    }

    #[test]
    fn appender_fails_when_dir_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("logs");
        std::fs::write(&blocker, b"").unwrap();
        assert!(file_appender(&blocker, 30).is_err());
    }
}
