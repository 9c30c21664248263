//! Monitoring window and URL list location

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// When monitoring runs are allowed, and where the URL list lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// First day (inclusive) on which runs are performed
    pub start_date: Option<NaiveDate>,
    /// Last day (inclusive) on which runs are performed
    pub end_date: Option<NaiveDate>,
    /// CSV file with `url,name,notification` rows
    pub urls_file: PathBuf,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            urls_file: PathBuf::from("config/urls.csv"),
        }
    }
}

impl MonitoringConfig {
    /// Whether `today` falls inside the configured window.
    ///
    /// A missing bound is open on that side.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        let after_start = self.start_date.map_or(true, |start| start <= today);
        let before_end = self.end_date.map_or(true, |end| today <= end);
        after_start && before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn open_window_is_always_active() {
        let cfg = MonitoringConfig::default();
        assert!(cfg.is_active(date("1999-01-01")));
        assert!(cfg.is_active(date("2099-12-31")));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let cfg = MonitoringConfig {
            start_date: Some(date("2026-01-01")),
            end_date: Some(date("2026-12-31")),
            ..Default::default()
        };
        assert!(cfg.is_active(date("2026-01-01")));
        assert!(cfg.is_active(date("2026-12-31")));
        assert!(!cfg.is_active(date("2025-12-31")));
        assert!(!cfg.is_active(date("2027-01-01")));
    }

    #[test]
    fn dates_deserialize_from_iso_strings() {
        let cfg: MonitoringConfig =
            toml::from_str("start_date = \"2026-03-01\"\nend_date = \"2026-03-31\"").unwrap();
        assert_eq!(cfg.start_date, Some(date("2026-03-01")));
        assert_eq!(cfg.end_date, Some(date("2026-03-31")));
        assert_eq!(cfg.urls_file, PathBuf::from("config/urls.csv"));
    }
}
