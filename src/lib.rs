//! pagewatch: scheduled web page change monitoring
//!
//! Each run reads a list of URLs, fetches every page once, and compares its
//! visible text against the snapshot stored by the previous run:
//! - HTML normalization that drops scripts, styles and volatile meta tags
//! - SHA-256 content digests and unified line diffs
//! - Per-URL JSON history files, replaced atomically
//! - Email (SMTP) and Slack webhook notifications on change
//! - Optional full-page screenshots via headless Chromium
//! - Per-run CSV reports and SVG charts of recent changes

pub mod config;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod report;
pub mod screenshot;
pub mod targets;
pub mod util;

pub use config::Config;
pub use monitor::{CheckStatus, Monitor, MonitoringResult, RunSummary};
pub use targets::UrlTarget;
