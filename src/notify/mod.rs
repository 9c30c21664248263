//! Change notifications
//!
//! A `ChannelNotifier` fans one change out to every enabled channel (email,
//! Slack). Channels fail independently; delivery counts as successful when at
//! least one channel accepted the message.

mod email;
mod slack;

pub use email::EmailChannel;
pub use slack::SlackChannel;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::targets::UrlTarget;

/// Errors raised by a notification channel
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{channel} channel is missing settings: {fields}")]
    MissingSettings { channel: &'static str, fields: String },
    #[error("Invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Webhook responded with status {0}")]
    Status(u16),
}

/// Everything a channel needs to describe one detected change
#[derive(Debug, Clone)]
pub struct ChangeNotification<'a> {
    pub target: &'a UrlTarget,
    /// Unified diff of the change
    pub diff: &'a str,
    pub screenshot: Option<&'a Path>,
    /// Current page text, included when notifications are not diff-only
    pub page_excerpt: Option<&'a str>,
    pub detected_at: DateTime<Local>,
}

impl<'a> ChangeNotification<'a> {
    pub fn new(target: &'a UrlTarget, diff: &'a str) -> Self {
        Self {
            target,
            diff,
            screenshot: None,
            page_excerpt: None,
            detected_at: Local::now(),
        }
    }

    pub fn with_screenshot(mut self, path: Option<&'a Path>) -> Self {
        self.screenshot = path;
        self
    }

    pub fn with_page_excerpt(mut self, excerpt: Option<&'a str>) -> Self {
        self.page_excerpt = excerpt;
        self
    }

    pub fn subject(&self) -> String {
        format!(
            "Web Monitor Alert: Changes detected on {}",
            self.target.display_name()
        )
    }

    /// Detection time as shown to recipients
    pub fn timestamp_label(&self) -> String {
        self.detected_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Delivers change notifications; returns whether anything was delivered
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &ChangeNotification<'_>) -> bool;
}

/// A single delivery mechanism
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &ChangeNotification<'_>) -> Result<(), NotifyError>;
}

/// Dispatches to every configured channel
pub struct ChannelNotifier {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl ChannelNotifier {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Build the channels switched on in `config`
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();
        if config.email {
            channels.push(Box::new(EmailChannel::new(config.smtp.clone())));
        }
        if config.slack {
            channels.push(Box::new(SlackChannel::new(config.slack_webhook.clone())?));
        }
        Ok(Self::new(channels))
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notification: &ChangeNotification<'_>) -> bool {
        let mut delivered = false;
        for channel in &self.channels {
            match channel.send(notification).await {
                Ok(()) => {
                    info!(
                        "{} notification sent for {}",
                        channel.name(),
                        notification.target.url
                    );
                    delivered = true;
                }
                Err(e) => {
                    error!(
                        "Error sending {} notification for {}: {}",
                        channel.name(),
                        notification.target.url,
                        e
                    );
                }
            }
        }
        delivered
    }
}

/// Escape text for inclusion in an HTML body
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
