//! Run orchestration.
//!
//! The `Orchestrator` owns one run end to end: load the queries, seed the
//! queue, drive the worker pool with a progress monitor alongside, then rank
//! the per-query link counts and write the summary file.

use crate::client::{QueryClient, SerperClient};
use crate::error::SearchError;
use crate::input::load_queries;
use crate::progress::{ProgressMonitor, ProgressRenderer};
use crate::queue::WorkQueue;
use crate::rate_limit::RateLimiter;
use crate::sink::{write_ranked_summary, ResultSink};
use crate::types::{RunConfig, RunSummary};
use crate::worker::{SearchParams, WorkerPool};
use std::sync::Arc;
use std::time::Instant;

/// Coordinates one fan-out run.
///
/// # Example
///
/// ```rust,no_run
/// use serp_fanout_lib::{NoProgress, Orchestrator, RunConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RunConfig::default()
///         .with_paths("queries.txt", "links.txt")
///         .with_api_key("my-key")
///         .with_threads(5);
///
///     let summary = Orchestrator::new(config)?.run(NoProgress).await?;
///     println!("{} done, {} failed", summary.completed, summary.failed);
///     Ok(())
/// }
/// ```
pub struct Orchestrator {
    config: RunConfig,
    client: Arc<dyn QueryClient>,
}

impl Orchestrator {
    /// Create an orchestrator talking to the configured HTTP endpoint.
    ///
    /// The rate limiter is created here and lives as long as the client.
    pub fn new(config: RunConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_calls,
            config.rate_limit_period,
        ));
        let client = SerperClient::new(config.endpoint.clone(), config.timeout, limiter)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Create an orchestrator with a caller-provided search client.
    pub fn with_client(config: RunConfig, client: Arc<dyn QueryClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run and return its final counts.
    ///
    /// Per-query failures are part of a successful run. An error is only
    /// returned when the input cannot be read, the output files cannot be
    /// written, or the configuration is invalid.
    pub async fn run<R: ProgressRenderer>(&self, renderer: R) -> Result<RunSummary, SearchError> {
        self.config.validate()?;
        let start = Instant::now();

        let queries = load_queries(&self.config.input_path).await?;
        let total = queries.len();
        let queue = Arc::new(WorkQueue::seeded(queries));

        let sink = Arc::new(
            ResultSink::open(&self.config.output_path, &self.config.failed_path).await?,
        );

        tracing::info!(
            queries = total,
            workers = self.config.threads,
            "starting search run"
        );

        let pool = WorkerPool::new(
            Arc::clone(&self.client),
            queue,
            Arc::clone(&sink),
            SearchParams {
                api_key: self.config.api_key.clone(),
                results_per_page: self.config.num,
                page: self.config.pages,
            },
        );

        let monitor = ProgressMonitor::spawn(
            sink.counters(),
            total as u64,
            self.config.progress_interval,
            renderer,
        );
        let pool_result = pool.run(self.config.threads).await;
        // The monitor must be gone before anything else is printed.
        monitor.stop().await;
        pool_result?;

        let ranked = sink.ranked().await;
        write_ranked_summary(&self.config.summary_path, &ranked).await?;

        let counters = sink.counters();
        let summary = RunSummary {
            completed: counters.completed(),
            failed: counters.failed(),
            unique_queries: ranked.len(),
            total_links: counters.total_links(),
            ranked,
            duration: start.elapsed(),
        };

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            total_links = summary.total_links,
            "all search queries completed"
        );

        Ok(summary)
    }
}
