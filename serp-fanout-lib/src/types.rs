//! Core data types for the search fan-out engine.
//!
//! This module defines the unit of work (`Query`), the run configuration,
//! and the values a finished run reports back to its caller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";

/// Upper bound for calls allowed in one rate window.
pub const MAX_RATE_LIMIT_CALLS: usize = 100_000;

/// Upper bound for the rate window length (one day).
pub const MAX_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// One unit of search work: a trimmed line of the input file.
///
/// Identity is the text. `seq` is the zero-based position the query was
/// loaded at; it only exists so that equal link counts in the ranked
/// summary come out in input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub seq: usize,
    pub text: String,
}

impl Query {
    pub fn new<T: Into<String>>(seq: usize, text: T) -> Self {
        Self {
            seq,
            text: text.into(),
        }
    }
}

/// Configuration for one fan-out run.
///
/// Paths point at the files the run reads and appends to. Numeric knobs
/// are validated by [`RunConfig::validate`] before a run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// File with one query per line
    pub input_path: PathBuf,

    /// Primary output: one link per line, appended
    pub output_path: PathBuf,

    /// Failed queries, one per line, appended
    /// Default: failed.txt
    pub failed_path: PathBuf,

    /// Ranked summary, rewritten at the end of the run
    /// Default: unique.txt
    pub summary_path: PathBuf,

    /// API key sent as `X-API-KEY`
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Search endpoint URL
    pub endpoint: String,

    /// Number of concurrent workers
    /// Default: 5, Range: 1-100
    pub threads: usize,

    /// Page parameter sent with every query
    /// Default: 1
    pub pages: u32,

    /// Results per page sent with every query
    /// Default: 10, Range: 1-100
    pub num: u32,

    /// Timeout for each remote call
    /// Default: 30 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Maximum calls allowed inside one rate window
    /// Default: 60
    pub rate_limit_calls: usize,

    /// Length of the sliding rate window
    /// Default: 60 seconds
    #[serde(skip)]
    pub rate_limit_period: Duration,

    /// How often the progress monitor redraws
    /// Default: 100 milliseconds
    #[serde(skip)]
    pub progress_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            failed_path: PathBuf::from("failed.txt"),
            summary_path: PathBuf::from("unique.txt"),
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            threads: 5,
            pages: 1,
            num: 10,
            timeout: Duration::from_secs(30),
            rate_limit_calls: 60,
            rate_limit_period: Duration::from_secs(60),
            progress_interval: Duration::from_millis(100),
        }
    }
}

impl RunConfig {
    /// Set the number of workers, capped at 100.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.clamp(1, 100);
        self
    }

    /// Set input and output paths.
    pub fn with_paths<I: Into<PathBuf>, O: Into<PathBuf>>(mut self, input: I, output: O) -> Self {
        self.input_path = input.into();
        self.output_path = output.into();
        self
    }

    /// Set the failed-queries and summary file paths.
    pub fn with_report_paths<F: Into<PathBuf>, S: Into<PathBuf>>(
        mut self,
        failed: F,
        summary: S,
    ) -> Self {
        self.failed_path = failed.into();
        self.summary_path = summary.into();
        self
    }

    pub fn with_api_key<K: Into<String>>(mut self, api_key: K) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set pagination parameters sent with every query.
    pub fn with_pagination(mut self, pages: u32, num: u32) -> Self {
        self.pages = pages;
        self.num = num;
        self
    }

    /// Set the sliding-window rate limit.
    pub fn with_rate_limit(mut self, calls: usize, period: Duration) -> Self {
        self.rate_limit_calls = calls;
        self.rate_limit_period = period;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check the numeric settings for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), crate::SearchError> {
        use crate::SearchError;

        if self.threads == 0 || self.threads > 100 {
            return Err(SearchError::config("Threads must be between 1 and 100"));
        }
        if self.pages == 0 {
            return Err(SearchError::config("Pages must be at least 1"));
        }
        if self.num == 0 || self.num > 100 {
            return Err(SearchError::config(
                "Results per page must be between 1 and 100",
            ));
        }
        if self.rate_limit_calls == 0 || self.rate_limit_calls > MAX_RATE_LIMIT_CALLS {
            return Err(SearchError::config(format!(
                "Rate limit calls must be between 1 and {}",
                MAX_RATE_LIMIT_CALLS
            )));
        }
        if self.rate_limit_period.is_zero() || self.rate_limit_period > MAX_RATE_LIMIT_PERIOD {
            return Err(SearchError::config(
                "Rate limit period must be non-zero and at most 24h",
            ));
        }
        if self.timeout.is_zero() {
            return Err(SearchError::config("Timeout must be non-zero"));
        }
        if self.progress_interval.is_zero() {
            return Err(SearchError::config("Progress interval must be non-zero"));
        }
        Ok(())
    }
}

/// One line of the ranked summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub query: String,
    pub link_count: usize,
}

impl std::fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} links", self.query, self.link_count)
    }
}

/// Point-in-time view of the run counters.
///
/// Snapshots taken while workers are running may be stale; they are for
/// display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
    pub total_links: u64,
}

/// Final result of a run, read after every worker has stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Queries that produced at least one persisted link
    pub completed: u64,

    /// Queries that errored or produced no links
    pub failed: u64,

    /// Number of distinct query texts with a successful result
    pub unique_queries: usize,

    /// Sum of all persisted link counts
    pub total_links: u64,

    /// Per-query link counts, highest first
    pub ranked: Vec<RankedEntry>,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.threads, 5);
        assert_eq!(config.pages, 1);
        assert_eq!(config.num, 10);
        assert_eq!(config.rate_limit_calls, 60);
        assert_eq!(config.rate_limit_period, Duration::from_secs(60));
        assert_eq!(config.failed_path, PathBuf::from("failed.txt"));
        assert_eq!(config.summary_path, PathBuf::from("unique.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_threads_clamps() {
        assert_eq!(RunConfig::default().with_threads(0).threads, 1);
        assert_eq!(RunConfig::default().with_threads(500).threads, 100);
    }

    #[test]
    fn test_validate_rejects_zero_rate_limit() {
        let config = RunConfig::default().with_rate_limit(0, Duration::from_secs(60));
        assert!(config.validate().is_err());

        let config = RunConfig::default().with_rate_limit(10, Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_rate_limit() {
        let config =
            RunConfig::default().with_rate_limit(usize::MAX / 2, Duration::from_secs(60));
        assert!(config.validate().is_err());

        let config = RunConfig::default().with_rate_limit(10, Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());

        let config = RunConfig::default().with_rate_limit(MAX_RATE_LIMIT_CALLS, MAX_RATE_LIMIT_PERIOD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ranked_entry_display() {
        let entry = RankedEntry {
            query: "cats".to_string(),
            link_count: 2,
        };
        assert_eq!(entry.to_string(), "cats: 2 links");
    }
}
