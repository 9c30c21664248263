//! Slack incoming-webhook channel

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{ChangeNotification, NotificationChannel, NotifyError};
use crate::config::SlackSettings;
use crate::util::truncate_str;

/// Longest diff forwarded to Slack before truncation
pub const SLACK_DIFF_LIMIT: usize = 1000;
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SlackChannel {
    client: reqwest::Client,
    settings: SlackSettings,
}

impl SlackChannel {
    pub fn new(settings: SlackSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    /// Webhook JSON payload for one change
    pub fn payload(&self, notification: &ChangeNotification<'_>) -> Value {
        let mut text = format!(
            "*Changes detected on {}*\n\n*URL:* {}\n*Timestamp:* {}\n\n*Changes:*\n```{}```",
            notification.target.display_name(),
            notification.target.url,
            notification.timestamp_label(),
            truncate_diff(notification.diff),
        );
        if let Some(excerpt) = notification.page_excerpt {
            text.push_str("\n\n*Current Page Text:*\n```");
            text.push_str(&truncate_diff(excerpt));
            text.push_str("```");
        }
        if let Some(path) = notification.screenshot {
            text.push_str(&format!("\n\n_Screenshot saved to {}_", path.display()));
        }

        json!({
            "channel": self.settings.channel,
            "username": self.settings.username,
            "text": text,
            "icon_emoji": ":mag:",
        })
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, notification: &ChangeNotification<'_>) -> Result<(), NotifyError> {
        let webhook = self
            .settings
            .webhook_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| NotifyError::MissingSettings {
                channel: "slack",
                fields: "webhook_url".to_string(),
            })?;

        let response = self
            .client
            .post(webhook)
            .json(&self.payload(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn truncate_diff(diff: &str) -> String {
    if diff.len() <= SLACK_DIFF_LIMIT {
        diff.to_string()
    } else {
        truncate_str(diff, SLACK_DIFF_LIMIT + "...".len())
    }
}
