//! # serp-fanout Library
//!
//! Fans a batch of search queries out over a fixed pool of async workers,
//! throttled by a shared sliding-window rate limiter, and aggregates the
//! returned organic result links into durable output files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serp_fanout_lib::{NoProgress, Orchestrator, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::default()
//!         .with_paths("queries.txt", "links.txt")
//!         .with_api_key("my-key");
//!
//!     let summary = Orchestrator::new(config)?.run(NoProgress).await?;
//!     for entry in &summary.ranked {
//!         println!("{}", entry);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Rate Limiting**: At most N calls in any trailing window, across all workers
//! - **Worker Pool**: Each query is taken by exactly one worker
//! - **Durable Output**: Links and failures are appended as they arrive
//! - **Ranked Summary**: Queries ordered by link count
//! - **Pluggable Client**: The search API sits behind the [`QueryClient`] trait

// Re-export main public API types and functions
// This makes them available as serp_fanout_lib::TypeName
pub use client::{extract_links, QueryClient, SerperClient};
pub use config::{
    load_env_config, load_env_config_from, parse_duration_string, ConfigManager, EnvConfig,
    FileConfig,
};
pub use error::SearchError;
pub use input::{load_queries, parse_queries};
pub use orchestrator::Orchestrator;
pub use progress::{NoProgress, ProgressMonitor, ProgressRenderer};
pub use queue::WorkQueue;
pub use rate_limit::RateLimiter;
pub use sink::{write_ranked_summary, ResultSink, RunCounters};
pub use types::{
    ProgressSnapshot, Query, RankedEntry, RunConfig, RunSummary, DEFAULT_ENDPOINT,
    MAX_RATE_LIMIT_CALLS, MAX_RATE_LIMIT_PERIOD,
};
pub use worker::{QueryOutcome, SearchParams, WorkerPool};

// Internal modules - these are not part of the public API
mod client;
mod config;
mod error;
mod input;
mod orchestrator;
mod progress;
mod queue;
mod rate_limit;
mod sink;
mod types;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SearchError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        default_endpoint: DEFAULT_ENDPOINT,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub default_endpoint: &'static str,
}
