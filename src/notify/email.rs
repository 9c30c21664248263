//! Email channel over SMTP with STARTTLS

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

use super::{escape_html, ChangeNotification, NotificationChannel, NotifyError};
use crate::config::{ImageFormat, SmtpSettings};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends an HTML email per change, with the screenshot attached when present
pub struct EmailChannel {
    settings: SmtpSettings,
}

impl EmailChannel {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn check_settings(&self) -> Result<(), NotifyError> {
        let missing = self.settings.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::MissingSettings {
                channel: "email",
                fields: missing.join(", "),
            })
        }
    }

    /// Render the HTML body
    pub fn html_body(&self, notification: &ChangeNotification<'_>) -> String {
        let url = escape_html(&notification.target.url);
        let name = escape_html(notification.target.display_name());

        let mut body = format!(
            "<html>\n<body>\n\
             <h2>Web Monitor Alert</h2>\n\
             <p>Changes have been detected on the monitored website:</p>\n\
             <ul>\n\
             <li><strong>URL:</strong> <a href=\"{url}\">{url}</a></li>\n\
             <li><strong>Name:</strong> {name}</li>\n\
             <li><strong>Timestamp:</strong> {ts}</li>\n\
             </ul>\n\
             <h3>Detected Changes:</h3>\n\
             <pre style=\"background-color: #f5f5f5; padding: 10px; border-radius: 5px;\">{diff}</pre>\n",
            url = url,
            name = name,
            ts = notification.timestamp_label(),
            diff = escape_html(notification.diff),
        );

        if let Some(excerpt) = notification.page_excerpt {
            body.push_str("<h3>Current Page Text:</h3>\n<pre>");
            body.push_str(&escape_html(excerpt));
            body.push_str("</pre>\n");
        }
        if notification.screenshot.is_some() {
            body.push_str("<h3>Screenshot:</h3><p>See attachment</p>\n");
        }
        body.push_str("<p>This is an automated notification from Web Monitor.</p>\n</body>\n</html>\n");
        body
    }

    /// Build the full MIME message
    pub async fn build_message(&self, notification: &ChangeNotification<'_>) -> Result<Message, NotifyError> {
        let from = self.settings.from.as_deref().unwrap_or_default();
        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(notification.subject());
        for recipient in &self.settings.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::html(self.html_body(notification)));
        if let Some(path) = notification.screenshot {
            match attachment(path).await {
                Ok(part) => parts = parts.singlepart(part),
                Err(e) => error!("Error attaching screenshot {}: {}", path.display(), e),
            }
        }

        Ok(builder.multipart(parts)?)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notification: &ChangeNotification<'_>) -> Result<(), NotifyError> {
        self.check_settings()?;
        let message = self.build_message(notification).await?;

        let server = self.settings.server.as_deref().unwrap_or_default();
        let credentials = Credentials::new(
            self.settings.username.clone().unwrap_or_default(),
            self.settings.password.clone().unwrap_or_default(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
            .port(self.settings.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        transport.send(message).await?;
        debug!(
            "Email for {} sent to {} recipients",
            notification.target.url,
            self.settings.recipients.len()
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

async fn attachment(path: &Path) -> std::io::Result<SinglePart> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "screenshot".to_string());
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let format = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp]
        .into_iter()
        .find(|f| f.extension() == ext)
        .unwrap_or(ImageFormat::Png);
    let content_type = ContentType::parse(format.mime_type())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    Ok(Attachment::new(filename).body(bytes, content_type))
}
