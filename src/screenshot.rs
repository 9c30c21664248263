//! Full-page screenshots through headless Chromium
//!
//! Requires a Chromium/Chrome binary discoverable by `chromiumoxide`. Each
//! capture launches a fresh browser, waits for the page's network to go idle,
//! and is bounded by the configured timeout, so a hung page load cannot stall
//! the run.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::LoaderId;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ImageFormat, ScreenshotConfig};
use crate::monitor::hasher::url_key;
use crate::report::file_timestamp;

/// Errors that can occur while capturing a screenshot
#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("Failed to configure browser: {0}")]
    Launch(String),
    #[error("Browser error: {0}")]
    Browser(#[from] CdpError),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Screenshot timed out after {0:?}")]
    Timeout(Duration),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captures an image of a page into a directory
#[async_trait]
pub trait ScreenshotService: Send + Sync {
    /// Capture `url` into `output_dir`, returning the written file
    async fn capture(&self, url: &str, output_dir: &Path) -> Result<PathBuf, ScreenshotError>;
}

/// Headless Chromium screenshotter
pub struct BrowserScreenshotter {
    config: ScreenshotConfig,
}

impl BrowserScreenshotter {
    pub fn new(config: ScreenshotConfig) -> Self {
        Self { config }
    }

    /// File name for a capture of `url` taken now
    pub fn file_name(&self, url: &str) -> String {
        format!(
            "screenshot_{}_{}.{}",
            file_timestamp(),
            &url_key(url)[..8],
            self.config.format.extension()
        )
    }

    async fn capture_with_browser(&self, url: &str, path: &Path) -> Result<(), ScreenshotError> {
        let browser_config = BrowserConfig::builder()
            .window_size(self.config.width, self.config.height)
            .viewport(Viewport {
                width: self.config.width,
                height: self.config.height,
                ..Viewport::default()
            })
            .build()
            .map_err(ScreenshotError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = async {
            let page = browser.new_page("about:blank").await?;
            load_until_network_idle(&page, url).await?;
            let params = ScreenshotParams::builder()
                .format(capture_format(self.config.format))
                .full_page(true)
                .build();
            page.save_screenshot(params, path).await?;
            Ok::<(), ScreenshotError>(())
        }
        .await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        handler_task.abort();

        outcome
    }
}

#[async_trait]
impl ScreenshotService for BrowserScreenshotter {
    async fn capture(&self, url: &str, output_dir: &Path) -> Result<PathBuf, ScreenshotError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(self.file_name(url));

        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, self.capture_with_browser(url, &path)).await {
            Ok(Ok(())) => {
                debug!("Screenshot saved to {}", path.display());
                Ok(path)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScreenshotError::Timeout(timeout)),
        }
    }
}

/// Navigate `page` to `url` and return once that document reports `networkIdle`
async fn load_until_network_idle(page: &Page, url: &str) -> Result<(), ScreenshotError> {
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
    let mut events = page.event_listener::<EventLifecycleEvent>().await?;

    let navigation = page.execute(NavigateParams::new(url)).await?;
    if let Some(reason) = navigation.result.error_text.as_deref() {
        return Err(ScreenshotError::Navigation(format!("{}: {}", url, reason)));
    }
    let loader = navigation.result.loader_id.clone();

    while let Some(event) = events.next().await {
        if is_network_idle(&event.name, &event.loader_id, loader.as_ref()) {
            debug!("Network idle on {}", url);
            return Ok(());
        }
    }
    Err(ScreenshotError::Navigation(format!(
        "{}: page closed before the network went idle",
        url
    )))
}

/// Whether a lifecycle event marks network idle for the awaited document.
/// Without a loader id from the navigation, any `networkIdle` counts.
fn is_network_idle(name: &str, event_loader: &LoaderId, awaited: Option<&LoaderId>) -> bool {
    name == "networkIdle" && awaited.map_or(true, |loader| loader == event_loader)
}

fn capture_format(format: ImageFormat) -> CaptureScreenshotFormat {
    match format {
        ImageFormat::Png => CaptureScreenshotFormat::Png,
        ImageFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        ImageFormat::Webp => CaptureScreenshotFormat::Webp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_format_extension() {
        let shooter = BrowserScreenshotter::new(ScreenshotConfig {
            format: ImageFormat::Jpeg,
            ..Default::default()
        });
        let name = shooter.file_name("https://example.com");
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".jpeg"));
        // screenshot_ + 14-digit timestamp + _ + 8 hex chars + .jpeg
        assert_eq!(name.len(), "screenshot_".len() + 14 + 1 + 8 + ".jpeg".len());
    }

    #[test]
    fn network_idle_must_come_from_the_navigated_document() {
        let current = LoaderId::new("loader-2");
        let blank = LoaderId::new("loader-1");

        assert!(is_network_idle("networkIdle", &current, Some(&current)));
        assert!(!is_network_idle("networkIdle", &blank, Some(&current)));
        assert!(!is_network_idle("load", &current, Some(&current)));
        assert!(!is_network_idle("networkAlmostIdle", &current, Some(&current)));
        assert!(is_network_idle("networkIdle", &blank, None));
    }

    #[test]
    fn file_names_differ_per_url() {
        let shooter = BrowserScreenshotter::new(ScreenshotConfig::default());
        let a = shooter.file_name("https://example.com/a");
        let b = shooter.file_name("https://example.com/b");
        assert_ne!(a[a.len() - 12..], b[b.len() - 12..]);
    }
}
