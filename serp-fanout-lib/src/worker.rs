//! Fixed-size pool of workers draining the shared queue.
//!
//! Each worker loops: take a query, search it, record the outcome, repeat
//! until the queue is empty. Query-scoped search errors stay with their
//! query and become a recorded failure. A sink error (the output files can
//! no longer be written) or a run-level client error stops the pool.

use crate::client::QueryClient;
use crate::error::SearchError;
use crate::queue::WorkQueue;
use crate::sink::ResultSink;
use crate::types::Query;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Per-query request parameters shared by every worker.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub api_key: String,
    pub results_per_page: u32,
    pub page: u32,
}

/// Outcome of processing one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success { links: usize },
    Failure,
}

pub struct WorkerPool {
    client: Arc<dyn QueryClient>,
    queue: Arc<WorkQueue>,
    sink: Arc<ResultSink>,
    params: Arc<SearchParams>,
    halted: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        client: Arc<dyn QueryClient>,
        queue: Arc<WorkQueue>,
        sink: Arc<ResultSink>,
        params: SearchParams,
    ) -> Self {
        Self {
            client,
            queue,
            sink,
            params: Arc::new(params),
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run `workers` workers until the queue is drained.
    ///
    /// Returns the number of queries processed, or the first sink error.
    pub async fn run(&self, workers: usize) -> Result<usize, SearchError> {
        let mut set = JoinSet::new();
        for id in 0..workers.max(1) {
            let worker = Worker {
                id,
                client: Arc::clone(&self.client),
                queue: Arc::clone(&self.queue),
                sink: Arc::clone(&self.sink),
                params: Arc::clone(&self.params),
                halted: Arc::clone(&self.halted),
            };
            set.spawn(worker.run());
        }

        let mut processed = 0;
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(count)) => processed += count,
                Ok(Err(e)) => {
                    self.halted.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    self.halted.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(SearchError::internal(format!(
                        "worker task failed: {}",
                        e
                    )));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }
}

struct Worker {
    id: usize,
    client: Arc<dyn QueryClient>,
    queue: Arc<WorkQueue>,
    sink: Arc<ResultSink>,
    params: Arc<SearchParams>,
    halted: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self) -> Result<usize, SearchError> {
        let mut succeeded = 0;
        let mut failed = 0;

        while !self.halted.load(Ordering::SeqCst) {
            let Some(query) = self.queue.try_dequeue() else {
                break;
            };
            match self.process(&query).await {
                Ok(QueryOutcome::Success { .. }) => succeeded += 1,
                Ok(QueryOutcome::Failure) => failed += 1,
                Err(e) => {
                    self.halted.store(true, Ordering::SeqCst);
                    tracing::error!(worker = self.id, error = %e, "run-level failure, stopping");
                    return Err(e);
                }
            }
        }

        tracing::debug!(worker = self.id, succeeded, failed, "worker finished");
        Ok(succeeded + failed)
    }

    /// Search one query and record its outcome.
    ///
    /// Query-scoped errors, including an empty result, become a recorded
    /// failure. Any other error (sink I/O, or a run-level error from the
    /// client) is returned and stops the pool.
    async fn process(&self, query: &Query) -> Result<QueryOutcome, SearchError> {
        let result = self
            .client
            .search(
                &query.text,
                &self.params.api_key,
                self.params.results_per_page,
                self.params.page,
            )
            .await
            .and_then(|links| {
                if links.is_empty() {
                    Err(SearchError::empty_result(&query.text))
                } else {
                    Ok(links)
                }
            });

        match result {
            Ok(links) => {
                self.sink.record_success(query, &links).await?;
                tracing::info!(query = %query.text, links = links.len(), "links saved");
                Ok(QueryOutcome::Success { links: links.len() })
            }
            Err(e) if e.is_query_scoped() => {
                tracing::warn!(query = %query.text, error = %e, "error processing query");
                self.sink.record_failure(query).await?;
                Ok(QueryOutcome::Failure)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Stub client answering from a fixed table; unknown queries error.
    struct TableClient {
        answers: HashMap<String, Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl TableClient {
        fn new(entries: Vec<(String, Vec<String>)>) -> Self {
            Self {
                answers: entries.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    fn entry(query: &str, links: &[&str]) -> (String, Vec<String>) {
        (
            query.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        )
    }

    #[async_trait]
    impl QueryClient for TableClient {
        async fn search(
            &self,
            query: &str,
            _api_key: &str,
            _results_per_page: u32,
            _page: u32,
        ) -> Result<Vec<String>, SearchError> {
            self.calls.lock().unwrap().push(query.to_string());
            tokio::task::yield_now().await;
            self.answers
                .get(query)
                .cloned()
                .ok_or_else(|| SearchError::remote_request(query, 500))
        }
    }

    fn params() -> SearchParams {
        SearchParams {
            api_key: "key".to_string(),
            results_per_page: 10,
            page: 1,
        }
    }

    async fn sink_in(dir: &TempDir) -> Arc<ResultSink> {
        Arc::new(
            ResultSink::open(dir.path().join("links.txt"), dir.path().join("failed.txt"))
                .await
                .unwrap(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_query_reaches_a_terminal_state() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir).await;

        let mut entries = Vec::new();
        for i in 0..50 {
            // Every third query has no table entry and fails.
            if i % 3 != 0 {
                entries.push((format!("q{}", i), vec![format!("https://e.x/{}", i)]));
            }
        }
        let client = Arc::new(TableClient::new(entries));

        let queue = Arc::new(WorkQueue::seeded(
            (0..50).map(|i| Query::new(i, format!("q{}", i))),
        ));
        let pool = WorkerPool::new(client.clone(), Arc::clone(&queue), Arc::clone(&sink), params());

        let processed = pool.run(5).await.unwrap();

        let counters = sink.counters();
        assert_eq!(processed, 50);
        assert_eq!(counters.completed() + counters.failed(), 50);
        assert_eq!(counters.failed(), 17);
        assert_eq!(counters.total_links(), 33);
        assert!(queue.is_empty());

        let mut calls = client.calls.lock().unwrap().clone();
        calls.sort();
        calls.dedup();
        assert_eq!(calls.len(), 50, "each query searched exactly once");
    }

    #[tokio::test]
    async fn test_empty_result_is_failure() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir).await;
        let client = Arc::new(TableClient::new(vec![entry("empty", &[])]));
        let queue = Arc::new(WorkQueue::seeded(vec![Query::new(0, "empty")]));

        WorkerPool::new(client, queue, Arc::clone(&sink), params())
            .run(1)
            .await
            .unwrap();

        assert_eq!(sink.counters().failed(), 1);
        assert_eq!(sink.counters().total_links(), 0);
        let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
        assert_eq!(failed, "empty\n");
    }

    /// Client whose every call fails with a run-level error.
    struct MisconfiguredClient;

    #[async_trait]
    impl QueryClient for MisconfiguredClient {
        async fn search(
            &self,
            _query: &str,
            _api_key: &str,
            _results_per_page: u32,
            _page: u32,
        ) -> Result<Vec<String>, SearchError> {
            Err(SearchError::config("search client is not configured"))
        }
    }

    #[tokio::test]
    async fn test_run_level_client_error_stops_pool() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir).await;
        let queue = Arc::new(WorkQueue::seeded(
            (0..5).map(|i| Query::new(i, format!("q{}", i))),
        ));

        let err = WorkerPool::new(
            Arc::new(MisconfiguredClient),
            Arc::clone(&queue),
            Arc::clone(&sink),
            params(),
        )
        .run(1)
        .await
        .unwrap_err();

        assert!(matches!(err, SearchError::Config { .. }));
        assert_eq!(sink.counters().failed(), 0);
        assert_eq!(queue.len(), 4, "no further queries taken after the error");
        let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn test_more_workers_than_queries() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir).await;
        let client = Arc::new(TableClient::new(vec![entry("only", &["https://one"])]));
        let queue = Arc::new(WorkQueue::seeded(vec![Query::new(0, "only")]));

        let processed = WorkerPool::new(client, queue, Arc::clone(&sink), params())
            .run(8)
            .await
            .unwrap();

        assert_eq!(processed, 1);
        assert_eq!(sink.counters().completed(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_finishes_immediately() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir).await;
        let client = Arc::new(TableClient::new(Vec::new()));

        let processed = WorkerPool::new(client, Arc::new(WorkQueue::new()), sink, params())
            .run(3)
            .await
            .unwrap();
        assert_eq!(processed, 0);
    }
}
