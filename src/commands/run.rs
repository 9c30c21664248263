use anyhow::{Context, Result};
use chrono::NaiveDate;
use pagewatch::{
    config::Config,
    monitor::{FetchEngine, HistoryStore, Monitor, RunSummary},
    notify::ChannelNotifier,
    report::{generate_visualizations, write_run_report, ReportLayout},
    screenshot::BrowserScreenshotter,
    targets::load_targets,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Check every configured URL once.
///
/// Returns `None` when the run was skipped: outside the monitoring window, or
/// the URL list or HTTP client could not be set up. Those cases are logged
/// and are not errors.
pub async fn run_monitoring(config: &Config, today: NaiveDate) -> Result<Option<RunSummary>> {
    if !config.monitoring.is_active(today) {
        info!(
            "{} is outside the monitoring window ({} to {}); skipping run",
            today,
            config
                .monitoring
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "open".to_string()),
            config
                .monitoring
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "open".to_string()),
        );
        return Ok(None);
    }

    let urls_file = &config.monitoring.urls_file;
    let targets = match load_targets(urls_file) {
        Ok(targets) if targets.is_empty() => {
            warn!("No URLs listed in {}; nothing to monitor", urls_file.display());
            return Ok(None);
        }
        Ok(targets) => targets,
        Err(e) => {
            error!("Failed to load URL list {}: {}", urls_file.display(), e);
            return Ok(None);
        }
    };
    info!("Loaded {} URLs from {}", targets.len(), urls_file.display());

    let fetcher = match FetchEngine::new(&config.fetch) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("Failed to set up HTTP client: {}", e);
            return Ok(None);
        }
    };

    let layout = ReportLayout::for_date(&config.storage.reports_dir, today);
    layout
        .create()
        .context("Failed to create report directories")?;

    let mut monitor = Monitor::new(fetcher, HistoryStore::new(&config.storage.history_dir))
        .with_diff_only(config.notifications.diff_only);

    if config.screenshot.enabled {
        monitor = monitor.with_screenshots(Arc::new(BrowserScreenshotter::new(config.screenshot.clone())));
    }

    if config.notifications.any_channel_enabled() {
        match ChannelNotifier::from_config(&config.notifications) {
            Ok(notifier) => monitor = monitor.with_notifier(Arc::new(notifier)),
            Err(e) => error!("Notifications disabled for this run: {}", e),
        }
    }

    let results = monitor.run(&targets, &layout.picture_dir).await;

    if let Err(e) = write_run_report(&results, &layout.csv_dir) {
        error!("Failed to write run report: {}", e);
    }

    if config.report.visualization_enabled {
        match generate_visualizations(
            &config.storage.reports_dir,
            &layout.picture_dir,
            &config.report,
            today,
        ) {
            Ok(charts) => info!("Generated {} charts", charts.len()),
            Err(e) => error!("Failed to generate charts: {}", e),
        }
    }

    let summary = RunSummary::from_results(&results);
    info!("Run complete: {}", summary);
    Ok(Some(summary))
}
