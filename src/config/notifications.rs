//! Notification channel configuration
//!
//! Channel toggles and non-secret settings live in the config file. Credentials
//! (`SMTP_PASSWORD`, `SLACK_WEBHOOK_URL`) are only ever read from the
//! environment so the config file can be committed.

use serde::{Deserialize, Serialize};

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Send email notifications
    pub email: bool,
    /// Send Slack webhook notifications
    pub slack: bool,
    /// Send only the diff (`false` also includes an excerpt of the current page text)
    pub diff_only: bool,
    /// SMTP settings for the email channel
    pub smtp: SmtpSettings,
    /// Slack webhook settings
    pub slack_webhook: SlackSettings,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: false,
            slack: false,
            diff_only: true,
            smtp: SmtpSettings::default(),
            slack_webhook: SlackSettings::default(),
        }
    }
}

impl NotificationConfig {
    /// At least one channel is switched on
    pub fn any_channel_enabled(&self) -> bool {
        self.email || self.slack
    }

    pub(super) fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        self.smtp.apply_env(lookup);
        self.slack_webhook.apply_env(lookup);
    }
}

/// SMTP connection and addressing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    /// Read from `SMTP_PASSWORD`
    #[serde(skip)]
    pub password: Option<String>,
    pub from: Option<String>,
    pub recipients: Vec<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: None,
            port: 587,
            username: None,
            password: None,
            from: None,
            recipients: Vec::new(),
        }
    }
}

impl SmtpSettings {
    fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(server) = lookup("SMTP_SERVER") {
            self.server = Some(server);
        }
        if let Some(port) = lookup("SMTP_PORT") {
            match port.trim().parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!("Ignoring invalid SMTP_PORT value '{}'", port),
            }
        }
        if let Some(username) = lookup("SMTP_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(from) = lookup("EMAIL_FROM") {
            self.from = Some(from);
        }
        if let Some(recipients) = lookup("EMAIL_RECIPIENTS") {
            self.recipients = recipients
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Names of the settings still missing for the email channel to work
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server.as_deref().map_or(true, str::is_empty) {
            missing.push("server");
        }
        if self.username.as_deref().map_or(true, str::is_empty) {
            missing.push("username");
        }
        if self.password.as_deref().map_or(true, str::is_empty) {
            missing.push("password");
        }
        if self.from.as_deref().map_or(true, str::is_empty) {
            missing.push("from");
        }
        if self.recipients.is_empty() {
            missing.push("recipients");
        }
        missing
    }
}

/// Slack incoming-webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    /// Read from `SLACK_WEBHOOK_URL`
    #[serde(skip)]
    pub webhook_url: Option<String>,
    pub channel: String,
    pub username: String,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel: "#website-monitoring".to_string(),
            username: "WebMonitor Bot".to_string(),
        }
    }
}

impl SlackSettings {
    fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SLACK_WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Some(channel) = lookup("SLACK_CHANNEL") {
            self.channel = channel;
        }
        if let Some(username) = lookup("SLACK_USERNAME") {
            self.username = username;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn email_recipients_are_split_and_trimmed() {
        let mut cfg = NotificationConfig::default();
        cfg.apply_env(&env(&[("EMAIL_RECIPIENTS", " a@example.com, ,b@example.com ")]));
        assert_eq!(cfg.smtp.recipients, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn missing_smtp_fields_are_reported() {
        let mut smtp = SmtpSettings::default();
        assert_eq!(
            smtp.missing_fields(),
            vec!["server", "username", "password", "from", "recipients"]
        );

        smtp.apply_env(&env(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_USERNAME", "bot"),
            ("SMTP_PASSWORD", "hunter2"),
            ("EMAIL_FROM", "bot@example.com"),
            ("EMAIL_RECIPIENTS", "ops@example.com"),
            ("SMTP_PORT", "2525"),
        ]));
        assert!(smtp.missing_fields().is_empty());
        assert_eq!(smtp.port, 2525);
    }

    #[test]
    fn invalid_port_keeps_default() {
        let mut smtp = SmtpSettings::default();
        smtp.apply_env(&env(&[("SMTP_PORT", "not-a-port")]));
        assert_eq!(smtp.port, 587);
    }

    #[test]
    fn secrets_are_never_read_from_file() {
        let cfg: NotificationConfig = toml::from_str(
            "slack = true\n[slack_webhook]\nwebhook_url = \"https://hooks.example\"\n",
        )
        .unwrap();
        assert!(cfg.slack);
        assert!(cfg.slack_webhook.webhook_url.is_none());
        assert!(cfg.diff_only);
    }
}
