use anyhow::{Context, Result};
use chrono::NaiveDate;
use pagewatch::config::Config;
use pagewatch::report::{generate_visualizations, ReportLayout};
use std::path::PathBuf;
use tracing::info;

/// Render charts from recent run reports without checking any URL
pub fn regenerate_charts(config: &Config, today: NaiveDate) -> Result<Vec<PathBuf>> {
    let layout = ReportLayout::for_date(&config.storage.reports_dir, today);
    let charts = generate_visualizations(
        &config.storage.reports_dir,
        &layout.picture_dir,
        &config.report,
        today,
    )
    .context("Failed to generate charts")?;

    if charts.is_empty() {
        println!(
            "No changes recorded in the last {} days; no charts written",
            config.report.history_days
        );
    }
    for chart in &charts {
        println!("{}", chart.display());
    }
    info!("Report generation finished with {} charts", charts.len());
    Ok(charts)
}
