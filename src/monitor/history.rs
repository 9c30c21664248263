//! Per-URL history records
//!
//! One pretty-printed JSON file per URL, named by the SHA-256 of the URL
//! string. Records are always replaced whole: the new record is written to a
//! temp file in the same directory and renamed over the old one, so an
//! interrupted run leaves either the previous record or the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::hasher::url_key;

/// Errors from reading or writing history records
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt history record '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode history record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Last known state of a monitored URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub url: String,
    /// Digest of `last_content`, empty if never checked
    pub last_hash: String,
    /// Normalized text used as the diff baseline on the next run
    pub last_content: String,
    pub last_checked: DateTime<Utc>,
}

/// Diff baseline handed to the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    pub last_hash: String,
    pub last_content: String,
}

impl Baseline {
    /// No previous snapshot exists
    pub fn is_empty(&self) -> bool {
        self.last_hash.is_empty() && self.last_content.is_empty()
    }
}

impl From<HistoryRecord> for Baseline {
    fn from(record: HistoryRecord) -> Self {
        Self {
            last_hash: record.last_hash,
            last_content: record.last_content,
        }
    }
}

/// File-backed history store, exclusive owner of all history records
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `url`
    pub fn record_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", url_key(url)))
    }

    /// Read the record for `url`, `None` if it was never saved
    pub fn read(&self, url: &str) -> Result<Option<HistoryRecord>, HistoryError> {
        let path = self.record_path(url);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(HistoryError::Io { path, source }),
        };

        let record: HistoryRecord = serde_json::from_slice(&bytes)
            .map_err(|source| HistoryError::Decode { path: path.clone(), source })?;

        if record.url != url {
            warn!(
                "History record {} belongs to '{}', not '{}'; ignoring it",
                path.display(),
                record.url,
                url
            );
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Replace the record for `record.url`
    pub fn write(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| HistoryError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.record_path(&record.url);
        let json = serde_json::to_vec_pretty(record).map_err(HistoryError::Encode)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|source| HistoryError::Io {
            path: self.dir.clone(),
            source,
        })?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| HistoryError::Io {
                path: tmp.path().to_path_buf(),
                source,
            })?;
        tmp.persist(&path).map_err(|e| HistoryError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        debug!("Saved history for {} to {}", record.url, path.display());
        Ok(())
    }

    /// Load the diff baseline for `url`.
    ///
    /// Missing, unreadable, or corrupt records all yield an empty baseline;
    /// failures are logged.
    pub fn load(&self, url: &str) -> Baseline {
        match self.read(url) {
            Ok(Some(record)) => record.into(),
            Ok(None) => Baseline::default(),
            Err(e) => {
                error!("Error loading history for {}: {}", url, e);
                Baseline::default()
            }
        }
    }

    /// Save a fresh record for `url` stamped with the current time.
    ///
    /// Returns `false` (after logging) if the record could not be written.
    pub fn save(&self, url: &str, hash: &str, content: &str) -> bool {
        let record = HistoryRecord {
            url: url.to_string(),
            last_hash: hash.to_string(),
            last_content: content.to_string(),
            last_checked: Utc::now(),
        };
        match self.write(&record) {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving history for {}: {}", url, e);
                false
            }
        }
    }
}
