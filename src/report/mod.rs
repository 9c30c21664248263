//! Run reports
//!
//! Every run writes its results to `<reports_dir>/<YYYYMMDD>/CSV/` and, when
//! visualization is on, renders charts from recent runs into the sibling
//! `PICTURE/` directory.

mod charts;
mod history;

pub use charts::{generate_charts, timeline_counts, url_change_totals, TimelineCounts};
pub use history::{load_recent_rows, read_report, ReportRow};

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::monitor::MonitoringResult;

/// Timestamp format used in every generated file name
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Column order of a run report
pub const REPORT_COLUMNS: [&str; 6] = [
    "timestamp",
    "url",
    "name",
    "status_code",
    "has_changed",
    "screenshot_path",
];

/// Errors that can occur while writing or reading reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to render chart: {0}")]
    Chart(String),
}

/// Local time formatted for file names
pub fn file_timestamp() -> String {
    Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Date-partitioned output directories of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub day_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub picture_dir: PathBuf,
}

impl ReportLayout {
    pub fn for_date(reports_dir: &Path, date: NaiveDate) -> Self {
        let day_dir = reports_dir.join(date.format("%Y%m%d").to_string());
        Self {
            csv_dir: day_dir.join("CSV"),
            picture_dir: day_dir.join("PICTURE"),
            day_dir,
        }
    }

    /// Create the CSV and PICTURE directories
    pub fn create(&self) -> Result<(), ReportError> {
        for dir in [&self.csv_dir, &self.picture_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Write one run's results as `report_<timestamp>.csv` in `csv_dir`
pub fn write_run_report(results: &[MonitoringResult], csv_dir: &Path) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(csv_dir).map_err(|source| ReportError::Io {
        path: csv_dir.to_path_buf(),
        source,
    })?;
    let path = csv_dir.join(format!("report_{}.csv", file_timestamp()));

    // Header is written by hand so an empty run still yields a readable file
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(REPORT_COLUMNS)?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;

    info!("Run report written to {} ({} rows)", path.display(), results.len());
    Ok(path)
}

/// Render charts from the recent run history under `reports_dir`
pub fn generate_visualizations(
    reports_dir: &Path,
    picture_dir: &Path,
    config: &ReportConfig,
    today: NaiveDate,
) -> Result<Vec<PathBuf>, ReportError> {
    let rows = load_recent_rows(reports_dir, config.history_days, today)?;
    if rows.is_empty() {
        warn!("No report data from the last {} days; skipping charts", config.history_days);
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(picture_dir).map_err(|source| ReportError::Io {
        path: picture_dir.to_path_buf(),
        source,
    })?;
    generate_charts(&rows, picture_dir, config.chart_type, &file_timestamp())
}
