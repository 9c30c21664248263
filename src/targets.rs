//! Monitored URL list
//!
//! The list is a CSV file with a `url,name,notification` header. Rows keep
//! their file order, which is also the order URLs are checked in.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors raised while loading the URL list
#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("Failed to open URL list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed URL list: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {row}: url is empty")]
    EmptyUrl { row: usize },
    #[error("Row {row}: invalid url '{url}': {reason}")]
    InvalidUrl { row: usize, url: String, reason: String },
    #[error("Row {row}: invalid notification flag '{value}'")]
    InvalidFlag { row: usize, value: String },
}

/// A single monitored page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTarget {
    pub url: String,
    pub name: Option<String>,
    /// Whether changes on this page may trigger notifications
    pub notification: bool,
}

impl UrlTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            notification: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_notification(mut self, enabled: bool) -> Self {
        self.notification = enabled;
        self
    }

    /// Name if set, otherwise the URL
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Row as it appears in the CSV file
#[derive(Debug, Deserialize)]
struct UrlRow {
    url: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notification: Option<String>,
}

/// Load the URL list from a CSV file
pub fn load_targets(path: &Path) -> Result<Vec<UrlTarget>, TargetsError> {
    let file = std::fs::File::open(path).map_err(|source| TargetsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let targets = parse_targets(file)?;
    debug!("Loaded {} URLs for monitoring from {}", targets.len(), path.display());
    Ok(targets)
}

/// Parse a URL list from any CSV reader
pub fn parse_targets<R: Read>(reader: R) -> Result<Vec<UrlTarget>, TargetsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut targets = Vec::new();
    for (idx, row) in csv_reader.deserialize::<UrlRow>().enumerate() {
        // Header is line 1
        let row_no = idx + 2;
        let row = row?;

        if row.url.is_empty() {
            return Err(TargetsError::EmptyUrl { row: row_no });
        }
        validate_url(&row.url).map_err(|reason| TargetsError::InvalidUrl {
            row: row_no,
            url: row.url.clone(),
            reason,
        })?;

        let notification = match row.notification.as_deref() {
            None | Some("") => true,
            Some(value) => parse_flag(value).ok_or_else(|| TargetsError::InvalidFlag {
                row: row_no,
                value: value.to_string(),
            })?,
        };

        targets.push(UrlTarget {
            url: row.url,
            name: row.name.filter(|n| !n.is_empty()),
            notification,
        });
    }

    Ok(targets)
}

fn validate_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
