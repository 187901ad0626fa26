//! Durable, append-only storage for query outcomes.
//!
//! Every outcome goes through one lock that covers the file append, the
//! counters and the per-query link index, so an observer holding the lock
//! never sees counters that disagree with what is on disk.

use crate::error::SearchError;
use crate::types::{ProgressSnapshot, Query, RankedEntry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Shared run counters.
///
/// Written only while the sink lock is held. Reads through
/// [`RunCounters::snapshot`] take no lock and may be slightly behind.
#[derive(Debug, Default)]
pub struct RunCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    total_links: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total_links(&self) -> u64 {
        self.total_links.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed(),
            failed: self.failed(),
            total,
            total_links: self.total_links(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    link_count: usize,
    // Load position of the first successful occurrence, used for tie-breaks.
    seq: usize,
}

#[derive(Debug)]
struct SinkState {
    output: File,
    failed: File,
    index: HashMap<String, IndexEntry>,
}

/// Append-only link store plus failed-query store.
#[derive(Debug)]
pub struct ResultSink {
    state: Mutex<SinkState>,
    counters: Arc<RunCounters>,
    output_path: PathBuf,
    failed_path: PathBuf,
}

impl ResultSink {
    /// Open (or create) both files in append mode.
    ///
    /// Existing content is kept: running twice with the same paths
    /// accumulates links and failures.
    pub async fn open<O: AsRef<Path>, F: AsRef<Path>>(
        output_path: O,
        failed_path: F,
    ) -> Result<Self, SearchError> {
        let output_path = output_path.as_ref().to_path_buf();
        let failed_path = failed_path.as_ref().to_path_buf();

        let output = open_append(&output_path).await?;
        let failed = open_append(&failed_path).await?;

        Ok(Self {
            state: Mutex::new(SinkState {
                output,
                failed,
                index: HashMap::new(),
            }),
            counters: Arc::new(RunCounters::new()),
            output_path,
            failed_path,
        })
    }

    /// Handle to the counters for lock-free progress reads.
    pub fn counters(&self) -> Arc<RunCounters> {
        Arc::clone(&self.counters)
    }

    /// Persist the links found for `query` and count it as completed.
    ///
    /// An empty link list is a failure, not a success, and is routed to
    /// [`ResultSink::record_failure`].
    pub async fn record_success(&self, query: &Query, links: &[String]) -> Result<(), SearchError> {
        if links.is_empty() {
            return self.record_failure(query).await;
        }

        let mut buf = String::with_capacity(links.iter().map(|l| l.len() + 1).sum());
        for link in links {
            buf.push_str(link);
            buf.push('\n');
        }

        let mut state = self.state.lock().await;
        append(&mut state.output, &buf, &self.output_path).await?;

        let link_count = links.len();
        self.counters
            .total_links
            .fetch_add(link_count as u64, Ordering::Relaxed);
        state
            .index
            .entry(query.text.clone())
            .and_modify(|entry| entry.link_count = link_count)
            .or_insert(IndexEntry {
                link_count,
                seq: query.seq,
            });
        self.counters.completed.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Persist `query` to the failed file and count it as failed.
    pub async fn record_failure(&self, query: &Query) -> Result<(), SearchError> {
        let line = format!("{}\n", query.text);

        let mut state = self.state.lock().await;
        append(&mut state.failed, &line, &self.failed_path).await?;
        self.counters.failed.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Number of distinct query texts with at least one success.
    pub async fn unique_queries(&self) -> usize {
        self.state.lock().await.index.len()
    }

    /// Link counts per query, highest first, ties in load order.
    pub async fn ranked(&self) -> Vec<RankedEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<(&String, IndexEntry)> =
            state.index.iter().map(|(q, e)| (q, *e)).collect();
        entries.sort_by(|a, b| {
            b.1.link_count
                .cmp(&a.1.link_count)
                .then(a.1.seq.cmp(&b.1.seq))
        });

        entries
            .into_iter()
            .map(|(query, entry)| RankedEntry {
                query: query.clone(),
                link_count: entry.link_count,
            })
            .collect()
    }
}

/// Write the ranked summary, replacing any previous one.
pub async fn write_ranked_summary<P: AsRef<Path>>(
    path: P,
    ranked: &[RankedEntry],
) -> Result<(), SearchError> {
    let path = path.as_ref();
    let mut content = String::new();
    for entry in ranked {
        content.push_str(&entry.to_string());
        content.push('\n');
    }

    tokio::fs::write(path, content).await.map_err(|e| {
        SearchError::file_error(
            path.to_string_lossy(),
            format!("Failed to write summary: {}", e),
        )
    })
}

async fn open_append(path: &Path) -> Result<File, SearchError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| {
            SearchError::file_error(
                path.to_string_lossy(),
                format!("Failed to open for appending: {}", e),
            )
        })
}

async fn append(file: &mut File, content: &str, path: &Path) -> Result<(), SearchError> {
    file.write_all(content.as_bytes()).await.map_err(|e| {
        SearchError::file_error(path.to_string_lossy(), format!("Write failed: {}", e))
    })?;
    file.flush().await.map_err(|e| {
        SearchError::file_error(path.to_string_lossy(), format!("Flush failed: {}", e))
    })
}
