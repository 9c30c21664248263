//! Configuration for pagewatch

mod fetch;
mod logging;
mod monitoring;
mod notifications;
mod report;
mod screenshot;

pub use fetch::FetchSettings;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use monitoring::MonitoringConfig;
pub use notifications::{NotificationConfig, SlackSettings, SmtpSettings};
pub use report::{ChartType, ReportConfig, StorageConfig};
pub use screenshot::{ImageFormat, ScreenshotConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for page fetches
pub const DEFAULT_USER_AGENT: &str =
    concat!("Mozilla/5.0 (compatible; pagewatch/", env!("CARGO_PKG_VERSION"), ")");

/// Main configuration, read once per run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Monitoring window and URL list
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// HTTP fetch settings
    #[serde(default)]
    pub fetch: FetchSettings,
    /// Screenshot capture
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
    /// Notification channels
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Chart generation
    #[serde(default)]
    pub report: ReportConfig,
    /// History and report locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment overrides (proxies, user agent, SMTP and Slack credentials)
    /// are applied after parsing, then the result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.apply_env_overrides(&|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-provided values using `lookup`
    pub fn apply_env_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        self.fetch.apply_env(lookup);
        self.notifications.apply_env(lookup);
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if let (Some(start), Some(end)) = (self.monitoring.start_date, self.monitoring.end_date) {
            if start > end {
                errors.push(format!(
                    "monitoring start_date ({}) must not be after end_date ({})",
                    start, end
                ));
            }
        }
        if self.monitoring.urls_file.as_os_str().is_empty() {
            errors.push("urls_file must not be empty".to_string());
        }

        if self.fetch.timeout_secs == 0 {
            errors.push("fetch timeout_secs must be positive".to_string());
        }
        if self.fetch.user_agent.trim().is_empty() {
            errors.push("fetch user_agent must not be empty".to_string());
        }

        if self.screenshot.width == 0 || self.screenshot.height == 0 {
            errors.push("screenshot width and height must be positive".to_string());
        }
        if self.screenshot.timeout_secs == 0 {
            errors.push("screenshot timeout_secs must be positive".to_string());
        }

        if self.report.history_days == 0 {
            errors.push("report history_days must be positive".to_string());
        }

        if self.storage.history_dir.as_os_str().is_empty() {
            errors.push("history_dir must not be empty".to_string());
        }
        if self.storage.reports_dir.as_os_str().is_empty() {
            errors.push("reports_dir must not be empty".to_string());
        }

        if self.logging.file && self.logging.retention_days == 0 {
            errors.push("logging retention_days must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
