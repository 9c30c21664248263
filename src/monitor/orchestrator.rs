//! Per-URL monitoring state machine
//!
//! For each target: load history, fetch, normalize and hash, detect changes,
//! optionally screenshot and notify, then save history. URLs are processed
//! sequentially in input order and every target yields exactly one result.
//! A target whose processing panicked gets a fresh default result with status
//! `crashed`; nothing gathered before the panic is kept.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    detector::ChangeDetector,
    fetcher::PageFetcher,
    hasher::ContentHash,
    history::HistoryStore,
    normalizer::ContentNormalizer,
    types::{CheckStatus, MonitoringResult},
};
use crate::notify::{ChangeNotification, Notifier};
use crate::screenshot::ScreenshotService;
use crate::targets::UrlTarget;
use crate::util::head_lines;

/// Lines of page text included in notifications that are not diff-only
pub const PAGE_EXCERPT_LINES: usize = 50;

/// Runs the check pipeline over a list of targets
pub struct Monitor {
    fetcher: Arc<dyn PageFetcher>,
    normalizer: ContentNormalizer,
    detector: ChangeDetector,
    history: HistoryStore,
    screenshots: Option<Arc<dyn ScreenshotService>>,
    notifier: Option<Arc<dyn Notifier>>,
    diff_only: bool,
}

impl Monitor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, history: HistoryStore) -> Self {
        Self {
            fetcher,
            normalizer: ContentNormalizer::new(),
            detector: ChangeDetector::new(),
            history,
            screenshots: None,
            notifier: None,
            diff_only: true,
        }
    }

    /// Capture a screenshot of every changed page
    pub fn with_screenshots(mut self, service: Arc<dyn ScreenshotService>) -> Self {
        self.screenshots = Some(service);
        self
    }

    /// Notify about changes on targets that opted in
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// When false, notifications also carry the start of the current page text
    pub fn with_diff_only(mut self, diff_only: bool) -> Self {
        self.diff_only = diff_only;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Check every target in order, one result per target
    pub async fn run(&self, targets: &[UrlTarget], picture_dir: &Path) -> Vec<MonitoringResult> {
        let total = targets.len();
        let mut results = Vec::with_capacity(total);

        for (idx, target) in targets.iter().enumerate() {
            info!("Checking [{}/{}] {}", idx + 1, total, target.url);

            let outcome = AssertUnwindSafe(self.check_target(target, picture_dir))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    error!(
                        "Unexpected error while checking {}: {}",
                        target.url,
                        panic_message(panic.as_ref())
                    );
                    MonitoringResult::new(target).with_status(CheckStatus::Crashed)
                }
            };

            debug!("{} finished as {}", target.url, result.status);
            results.push(result);
        }

        results
    }

    /// Run the pipeline for a single target
    pub async fn check_target(&self, target: &UrlTarget, picture_dir: &Path) -> MonitoringResult {
        let mut result = MonitoringResult::new(target);

        let baseline = self.history.load(&target.url);

        let page = match self.fetcher.fetch(&target.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch {}: {}", target.url, e);
                return result.with_status(CheckStatus::FetchFailed);
            }
        };
        result.status_code = page.status_code;
        debug!(
            "Fetched {} in {:?} (final URL {})",
            target.url, page.fetch_duration, page.final_url
        );

        let content = self.normalizer.normalize(&page.body);
        if content.is_empty() {
            warn!("No text content extracted from {}", target.url);
            return result.with_status(CheckStatus::NoContent);
        }
        let hash = ContentHash::compute(&content);

        let report = self.detector.detect(&baseline.last_content, &content);
        if report.has_changed {
            info!("Changes detected on {}", target.url);
            result.has_changed = true;
            result.screenshot_path = self.capture_screenshot(target, picture_dir).await;
            result.notified = self
                .send_notification(target, &report.diff, &content, result.screenshot_path.as_deref())
                .await;
        } else if baseline.is_empty() {
            info!("Recorded first snapshot of {}", target.url);
        } else {
            debug!("No changes on {}", target.url);
        }

        // Failure is logged by the store and does not affect this result
        self.history.save(&target.url, hash.as_str(), &content);

        let status = if report.has_changed {
            CheckStatus::Changed
        } else if baseline.last_content.is_empty() {
            CheckStatus::Baseline
        } else {
            CheckStatus::Unchanged
        };
        result.with_status(status)
    }

    async fn capture_screenshot(&self, target: &UrlTarget, picture_dir: &Path) -> Option<PathBuf> {
        let service = self.screenshots.as_ref()?;
        match service.capture(&target.url, picture_dir).await {
            Ok(path) => {
                info!("Screenshot of {} saved to {}", target.url, path.display());
                Some(path)
            }
            Err(e) => {
                error!("Failed to capture screenshot of {}: {}", target.url, e);
                None
            }
        }
    }

    async fn send_notification(
        &self,
        target: &UrlTarget,
        diff: &str,
        content: &str,
        screenshot: Option<&Path>,
    ) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };
        if !target.notification {
            debug!("Notifications disabled for {}", target.url);
            return false;
        }
        if diff.is_empty() {
            return false;
        }

        let excerpt = (!self.diff_only).then(|| head_lines(content, PAGE_EXCERPT_LINES));
        let notification = ChangeNotification::new(target, diff)
            .with_screenshot(screenshot)
            .with_page_excerpt(excerpt.as_deref());

        let delivered = notifier.notify(&notification).await;
        if !delivered {
            warn!("No notification channel delivered the change on {}", target.url);
        }
        delivered
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::fetcher::{FetchError, FetchedPage};
    use crate::screenshot::ScreenshotError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    enum FakePage {
        Html(String),
        Fail,
        Panic,
    }

    #[derive(Default)]
    struct FakeFetcher {
        pages: Mutex<HashMap<String, FakePage>>,
    }

    impl FakeFetcher {
        fn set(&self, url: &str, page: FakePage) {
            self.pages.lock().unwrap().insert(url.to_string(), page);
        }

        fn html(&self, url: &str, body: &str) {
            self.set(url, FakePage::Html(format!("<html><body>{}</body></html>", body)));
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            // Guard is released before panicking so the mutex is not poisoned
            let body = match self.pages.lock().unwrap().get(url) {
                Some(FakePage::Html(body)) => Some(body.clone()),
                Some(FakePage::Panic) => None,
                Some(FakePage::Fail) | None => return Err(FetchError::Status(503)),
            };
            let Some(body) = body else {
                panic!("fetcher blew up");
            };
            Ok(FetchedPage {
                final_url: url.to_string(),
                status_code: 200,
                body,
                fetch_duration: Duration::from_millis(1),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, Option<String>, Option<PathBuf>)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, n: &ChangeNotification<'_>) -> bool {
            self.sent.lock().unwrap().push((
                n.target.url.clone(),
                n.diff.to_string(),
                n.page_excerpt.map(str::to_string),
                n.screenshot.map(Path::to_path_buf),
            ));
            true
        }
    }

    struct FakeScreenshots {
        fail: bool,
    }

    #[async_trait]
    impl ScreenshotService for FakeScreenshots {
        async fn capture(&self, _url: &str, output_dir: &Path) -> Result<PathBuf, ScreenshotError> {
            if self.fail {
                Err(ScreenshotError::Timeout(Duration::from_secs(60)))
            } else {
                Ok(output_dir.join("shot.png"))
            }
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        fetcher: Arc<FakeFetcher>,
        notifier: Arc<RecordingNotifier>,
        pictures: PathBuf,
        history_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            Self {
                pictures: tmp.path().join("PICTURE"),
                history_dir: tmp.path().join("history"),
                _tmp: tmp,
                fetcher: Arc::new(FakeFetcher::default()),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn monitor(&self) -> Monitor {
            Monitor::new(self.fetcher.clone(), HistoryStore::new(&self.history_dir))
                .with_notifier(self.notifier.clone())
        }

        fn sent(&self) -> usize {
            self.notifier.sent.lock().unwrap().len()
        }
    }

    #[tokio::test]
    async fn first_check_records_baseline_without_change() {
        let fx = Fixture::new();
        fx.fetcher.html("https://a.example", "<p>Line1</p>");
        let monitor = fx.monitor();

        let results = monitor.run(&[UrlTarget::new("https://a.example")], &fx.pictures).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Baseline);
        assert!(!results[0].has_changed);
        assert_eq!(results[0].status_code, 200);
        assert_eq!(fx.sent(), 0);
        let baseline = monitor.history().load("https://a.example");
        assert_eq!(baseline.last_content, "Line1");
        assert_eq!(baseline.last_hash, ContentHash::compute("Line1").0);
    }

    #[tokio::test]
    async fn second_run_detects_change_and_notifies() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example").with_name("A")];
        let monitor = fx.monitor();

        fx.fetcher.html("https://a.example", "<p>Line1</p>\n<p>Line2</p>");
        monitor.run(&targets, &fx.pictures).await;

        fx.fetcher.html("https://a.example", "<p>Line1</p>\n<p>Line2</p>\n<p>Line3</p>");
        let results = monitor.run(&targets, &fx.pictures).await;

        assert_eq!(results[0].status, CheckStatus::Changed);
        assert!(results[0].has_changed);
        assert!(results[0].notified);
        assert_eq!(results[0].screenshot_path, None);
        let sent = fx.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("+Line3"));
        assert_eq!(sent[0].2, None, "diff-only notifications carry no page text");
        drop(sent);

        let results = monitor.run(&targets, &fx.pictures).await;
        assert_eq!(results[0].status, CheckStatus::Unchanged);
        assert_eq!(fx.sent(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_skips_history() {
        let fx = Fixture::new();
        fx.fetcher.set("https://a.example", FakePage::Fail);
        let monitor = fx.monitor();

        let results = monitor.run(&[UrlTarget::new("https://a.example")], &fx.pictures).await;

        assert_eq!(results[0].status, CheckStatus::FetchFailed);
        assert!(!results[0].has_changed);
        assert_eq!(results[0].status_code, 0);
        assert!(!monitor.history().record_path("https://a.example").exists());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_baseline() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example")];
        let monitor = fx.monitor();

        fx.fetcher.html("https://a.example", "<p>old</p>");
        monitor.run(&targets, &fx.pictures).await;
        fx.fetcher.set("https://a.example", FakePage::Fail);
        monitor.run(&targets, &fx.pictures).await;

        assert_eq!(monitor.history().load("https://a.example").last_content, "old");
    }

    #[tokio::test]
    async fn page_without_text_is_not_saved() {
        let fx = Fixture::new();
        fx.fetcher.html("https://a.example", "<script>var x = 1;</script>");
        let monitor = fx.monitor();

        let results = monitor.run(&[UrlTarget::new("https://a.example")], &fx.pictures).await;

        assert_eq!(results[0].status, CheckStatus::NoContent);
        assert_eq!(results[0].status_code, 200);
        assert!(!monitor.history().record_path("https://a.example").exists());
    }

    #[tokio::test]
    async fn opted_out_target_is_not_notified() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example").with_notification(false)];
        let monitor = fx.monitor();

        fx.fetcher.html("https://a.example", "<p>before</p>");
        monitor.run(&targets, &fx.pictures).await;
        fx.fetcher.html("https://a.example", "<p>after</p>");
        let results = monitor.run(&targets, &fx.pictures).await;

        assert!(results[0].has_changed);
        assert!(!results[0].notified);
        assert_eq!(fx.sent(), 0);
    }

    #[tokio::test]
    async fn panicking_target_does_not_stop_batch() {
        let fx = Fixture::new();
        fx.fetcher.html("https://a.example", "<p>a</p>");
        fx.fetcher.set("https://b.example", FakePage::Panic);
        fx.fetcher.html("https://c.example", "<p>c</p>");
        let targets = [
            UrlTarget::new("https://a.example"),
            UrlTarget::new("https://b.example"),
            UrlTarget::new("https://c.example"),
        ];

        let results = fx.monitor().run(&targets, &fx.pictures).await;

        let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example", "https://b.example", "https://c.example"]);
        assert_eq!(results[0].status, CheckStatus::Baseline);
        assert_eq!(results[1].status, CheckStatus::Crashed);
        assert!(!results[1].has_changed);
        assert!(!results[1].notified);
        assert_eq!(results[1].status_code, 0);
        assert_eq!(results[1].screenshot_path, None);
        assert_eq!(results[2].status, CheckStatus::Baseline);
    }

    #[tokio::test]
    async fn changed_page_gets_screenshot_and_excerpt() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example")];
        let monitor = fx
            .monitor()
            .with_screenshots(Arc::new(FakeScreenshots { fail: false }))
            .with_diff_only(false);

        fx.fetcher.html("https://a.example", "<p>one</p>");
        let first = monitor.run(&targets, &fx.pictures).await;
        assert_eq!(first[0].screenshot_path, None, "unchanged pages are not captured");

        fx.fetcher.html("https://a.example", "<p>two</p>");
        let results = monitor.run(&targets, &fx.pictures).await;

        let expected = fx.pictures.join("shot.png");
        assert_eq!(results[0].screenshot_path.as_deref(), Some(expected.as_path()));
        let sent = fx.notifier.sent.lock().unwrap();
        assert_eq!(sent[0].2.as_deref(), Some("two"));
        assert_eq!(sent[0].3.as_deref(), Some(expected.as_path()));
    }

    #[tokio::test]
    async fn screenshot_failure_still_notifies() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example")];
        let monitor = fx
            .monitor()
            .with_screenshots(Arc::new(FakeScreenshots { fail: true }));

        fx.fetcher.html("https://a.example", "<p>one</p>");
        monitor.run(&targets, &fx.pictures).await;
        fx.fetcher.html("https://a.example", "<p>two</p>");
        let results = monitor.run(&targets, &fx.pictures).await;

        assert!(results[0].has_changed);
        assert_eq!(results[0].screenshot_path, None);
        assert!(results[0].notified);
        assert_eq!(monitor.history().load("https://a.example").last_content, "two");
    }

    #[tokio::test]
    async fn no_notifier_means_no_notification() {
        let fx = Fixture::new();
        let targets = [UrlTarget::new("https://a.example")];
        let monitor = Monitor::new(fx.fetcher.clone(), HistoryStore::new(&fx.history_dir));

        fx.fetcher.html("https://a.example", "<p>one</p>");
        monitor.run(&targets, &fx.pictures).await;
        fx.fetcher.html("https://a.example", "<p>two</p>");
        let results = monitor.run(&targets, &fx.pictures).await;

        assert!(results[0].has_changed);
        assert!(!results[0].notified);
    }
}
