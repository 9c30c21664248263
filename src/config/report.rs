//! Report and storage layout configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which charts to render after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Timeline,
    Bar,
    All,
}

impl ChartType {
    pub fn includes_timeline(&self) -> bool {
        matches!(self, Self::Timeline | Self::All)
    }

    pub fn includes_bar(&self) -> bool {
        matches!(self, Self::Bar | Self::All)
    }
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Render charts after each run
    pub visualization_enabled: bool,
    /// Chart selection
    pub chart_type: ChartType,
    /// How many days of run results feed the charts
    pub history_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            visualization_enabled: false,
            chart_type: ChartType::All,
            history_days: 30,
        }
    }
}

/// On-disk locations for history records and reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// One JSON record per monitored URL
    pub history_dir: PathBuf,
    /// Root of the per-day `CSV/` and `PICTURE/` directories
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from("data/history"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}
