//! Change-detection pipeline
//!
//! Fetch, normalize, hash, diff against the stored snapshot, then persist the
//! new snapshot. `Monitor` drives these steps for each URL in turn.

pub mod detector;
pub mod fetcher;
pub mod hasher;
pub mod history;
pub mod normalizer;
pub mod orchestrator;
pub mod types;

pub use detector::{ChangeDetector, DiffReport};
pub use fetcher::{FetchEngine, FetchError, FetchedPage, PageFetcher};
pub use hasher::{url_key, ContentHash};
pub use history::{Baseline, HistoryError, HistoryRecord, HistoryStore};
pub use normalizer::ContentNormalizer;
pub use orchestrator::Monitor;
pub use types::{CheckStatus, MonitoringResult, RunSummary};
