//! Reading past run reports back for charting

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ReportError;

/// One row of a run report as read back from disk
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRow {
    pub timestamp: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub has_changed: String,
    #[serde(default)]
    pub screenshot_path: Option<String>,
}

impl ReportRow {
    /// Whether the row records a change; accepts `true`, `True`, and `1`
    pub fn changed(&self) -> bool {
        matches!(
            self.has_changed.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        )
    }

    /// Calendar date of the check
    pub fn date(&self) -> Option<NaiveDate> {
        let head = self.timestamp.get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    /// Name when present, otherwise the URL
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// Parse a single report file
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<ReportRow>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Rows from every report dated within the last `days` days of `today`.
///
/// Day directories whose names are not `YYYYMMDD` are ignored, and a report
/// that fails to parse is skipped with a warning.
pub fn load_recent_rows(reports_dir: &Path, days: u32, today: NaiveDate) -> Result<Vec<ReportRow>, ReportError> {
    let cutoff = today - Duration::days(i64::from(days));
    let entries = match std::fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ReportError::Io {
                path: reports_dir.to_path_buf(),
                source,
            })
        }
    };

    let mut day_dirs: Vec<(NaiveDate, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let date = NaiveDate::parse_from_str(name.to_str()?, "%Y%m%d").ok()?;
            (date >= cutoff && date <= today).then(|| (date, entry.path()))
        })
        .collect();
    day_dirs.sort();

    let mut rows = Vec::new();
    for (_, dir) in day_dirs {
        for path in report_files(&dir.join("CSV")) {
            match read_report(&path) {
                Ok(mut parsed) => {
                    debug!("Loaded {} rows from {}", parsed.len(), path.display());
                    rows.append(&mut parsed);
                }
                Err(e) => warn!("Skipping unreadable report {}: {}", path.display(), e),
            }
        }
    }
    Ok(rows)
}

fn report_files(csv_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(csv_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    files
}
