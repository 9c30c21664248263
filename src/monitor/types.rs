//! Per-run result types

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::targets::UrlTarget;

/// How a single URL check ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Not processed yet
    Pending,
    /// First successful check; the snapshot became the baseline
    Baseline,
    /// Content matches the previous snapshot
    Unchanged,
    /// Content differs from the previous snapshot
    Changed,
    /// The page could not be fetched
    FetchFailed,
    /// The page was fetched but held no extractable text
    NoContent,
    /// Processing stopped on an unexpected error
    Crashed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Baseline => "baseline",
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::FetchFailed => "fetch_failed",
            Self::NoContent => "no_content",
            Self::Crashed => "crashed",
        }
    }

    /// Whether the check ended without a usable snapshot
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::NoContent | Self::Crashed)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one URL during the current run.
///
/// Serialized field order is the column order of the run report CSV.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringResult {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub name: String,
    /// HTTP status of a successful fetch, 0 otherwise
    pub status_code: u16,
    pub has_changed: bool,
    pub screenshot_path: Option<PathBuf>,
    #[serde(skip)]
    pub status: CheckStatus,
    #[serde(skip)]
    pub notified: bool,
}

impl MonitoringResult {
    /// Default result for `target`, stamped now
    pub fn new(target: &UrlTarget) -> Self {
        Self {
            timestamp: Local::now(),
            url: target.url.clone(),
            name: target.name.clone().unwrap_or_default(),
            status_code: 0,
            has_changed: false,
            screenshot_path: None,
            status: CheckStatus::Pending,
            notified: false,
        }
    }

    pub fn with_status(mut self, status: CheckStatus) -> Self {
        self.status = status;
        self
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub changed: usize,
    pub failed: usize,
    pub notified: usize,
}

impl RunSummary {
    pub fn from_results(results: &[MonitoringResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            acc.checked += 1;
            if r.has_changed {
                acc.changed += 1;
            }
            if r.status.is_failure() {
                acc.failed += 1;
            }
            if r.notified {
                acc.notified += 1;
            }
            acc
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} changed, {} failed, {} notified",
            self.checked, self.changed, self.failed, self.notified
        )
    }
}
