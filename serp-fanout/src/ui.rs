//! Terminal display for serp-fanout.
//!
//! Live progress is a single line on stderr, redrawn in place while workers
//! run. Log lines share that stream, so the log writer wipes the progress
//! line first and the next tick draws it again below the log output. The
//! final summary goes to stdout once the monitor has stopped. Uses only the
//! `console` crate.

use console::{style, Term};
use serp_fanout_lib::{ProgressRenderer, ProgressSnapshot, RunConfig, RunSummary};
use std::io;

// ── Live progress ────────────────────────────────────────────────────────────

/// Redraws one progress line on stderr on every tick.
pub struct ConsoleProgress {
    term: Term,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn draw(&mut self, snapshot: &ProgressSnapshot) {
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&progress_line(snapshot));
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRenderer for ConsoleProgress {
    fn render(&mut self, snapshot: &ProgressSnapshot) {
        self.draw(snapshot);
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) {
        self.draw(snapshot);
        let _ = self.term.write_line("");
    }
}

/// The progress line for one snapshot.
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    format!(
        "Processing search queries: {}/{} (Failed: {}) | Total links saved: {}",
        snapshot.completed, snapshot.total, snapshot.failed, snapshot.total_links
    )
}

/// Writer factory for the log subscriber.
///
/// With `clear_progress`, every log event first wipes the current stderr
/// line so it never lands on top of, or gets erased by, the progress line.
pub fn log_writer(clear_progress: bool) -> impl Fn() -> io::Stderr + Send + Sync + 'static {
    move || {
        if clear_progress {
            let _ = Term::stderr().clear_line();
        }
        io::stderr()
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of an interactive run.
pub fn print_header(config: &RunConfig) {
    println!(
        "{} {} {}",
        style("serp-fanout").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("- {}", config.input_path.display())).dim(),
    );
    println!(
        "{}",
        style(format!(
            "Threads: {} | Page: {} | Results: {} | Limit: {} calls / {}s",
            config.threads,
            config.pages,
            config.num,
            config.rate_limit_calls,
            config.rate_limit_period.as_secs()
        ))
        .dim()
    );
    println!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final counts after every worker has stopped.
pub fn print_summary(summary: &RunSummary, config: &RunConfig) {
    for line in summary_lines(summary) {
        println!("{}", line);
    }
    println!(
        "{}",
        style(format!(
            "Links: {} | Failed: {} | Ranked: {} | {:.1}s",
            config.output_path.display(),
            config.failed_path.display(),
            config.summary_path.display(),
            summary.duration.as_secs_f64()
        ))
        .dim()
    );
}

pub fn summary_lines(summary: &RunSummary) -> [String; 4] {
    [
        format!("Done Queries: {}", summary.completed),
        format!("Failed Queries: {}", summary.failed),
        format!("Unique Queries: {}", summary.unique_queries),
        format!("Total Links: {}", summary.total_links),
    ]
}
