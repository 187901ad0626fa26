//! serp-fanout CLI Application
//!
//! Runs every line of a query file through a rate-limited search API with a
//! pool of workers, appending result links to an output file and writing a
//! ranked per-query summary at the end.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use serp_fanout_lib::{
    load_env_config, parse_duration_string, ConfigManager, FileConfig, NoProgress, Orchestrator,
    RunConfig, RunSummary,
};
use std::process;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for serp-fanout
#[derive(Parser, Debug)]
#[command(name = "serp-fanout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fan a file of search queries out over a rate-limited search API")]
#[command(
    long_about = "Fan a file of search queries out over a rate-limited search API.\n\nEvery organic result link is appended to the output file, failed queries go to a\nfailed-queries file, and a ranked per-query summary is written when the run ends."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Input file with one search query per line
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        help_heading = "Files"
    )]
    pub input: String,

    /// Output file that result links are appended to
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Files"
    )]
    pub output: String,

    /// API key for the search service
    #[arg(
        short = 'k',
        long = "apikey",
        value_name = "KEY",
        env = "SF_API_KEY",
        hide_env_values = true,
        help_heading = "Search"
    )]
    pub apikey: String,

    /// Page number requested for every query (default: 1)
    #[arg(short = 'p', long = "pages", value_name = "N", help_heading = "Search")]
    pub pages: Option<u32>,

    /// Results per page (default: 10, max: 100)
    #[arg(short = 'n', long = "num", value_name = "N", help_heading = "Search")]
    pub num: Option<u32>,

    /// Number of concurrent workers (default: 5, max: 100)
    #[arg(
        short = 't',
        long = "threads",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub threads: Option<usize>,

    /// Timeout for each search request, e.g. "30s" or "2m" (default: 30s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let interactive = Term::stderr().is_term();
    init_logging(args.verbose, interactive);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args, interactive).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output for
/// both crates with `--verbose`. In interactive runs each log line first
/// clears the live progress line.
fn init_logging(verbose: bool, interactive: bool) {
    let default_filter = if verbose {
        "serp_fanout=debug,serp_fanout_lib=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ui::log_writer(interactive))
        .with_target(false)
        .init();
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.input.trim().is_empty() {
        return Err("Input file path must not be empty".to_string());
    }
    if args.output.trim().is_empty() {
        return Err("Output file path must not be empty".to_string());
    }
    if args.apikey.trim().is_empty() {
        return Err("API key must not be empty (use -k/--apikey or SF_API_KEY)".to_string());
    }

    if let Some(threads) = args.threads {
        if threads == 0 || threads > 100 {
            return Err("Threads must be between 1 and 100".to_string());
        }
    }
    if args.pages == Some(0) {
        return Err("Pages must be at least 1".to_string());
    }
    if let Some(num) = args.num {
        if num == 0 || num > 100 {
            return Err("Results per page must be between 1 and 100".to_string());
        }
    }
    if let Some(timeout) = &args.timeout {
        if parse_duration_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use a non-zero value like '30s' or '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

async fn run(args: Args, interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    tracing::debug!(
        threads = config.threads,
        pages = config.pages,
        num = config.num,
        endpoint = %config.endpoint,
        "resolved configuration"
    );

    let orchestrator = Orchestrator::new(config)?;
    let summary: RunSummary = if interactive {
        ui::print_header(orchestrator.config());
        orchestrator.run(ui::ConsoleProgress::new()).await?
    } else {
        orchestrator.run(NoProgress).await?
    };

    ui::print_summary(&summary, orchestrator.config());
    Ok(())
}

/// Resolve the run configuration.
///
/// Precedence, lowest first: built-in defaults, config file(s), `SF_*`
/// environment variables, CLI arguments.
fn build_config(args: &Args) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    // Step 1: explicit config file, or automatic discovery
    let file_config: FileConfig = if let Some(explicit_config_path) = &args.config {
        tracing::debug!("using config file from --config: {}", explicit_config_path);
        config_manager
            .load_file(explicit_config_path)
            .map_err(|e| {
                format!(
                    "Failed to load config file '{}': {}",
                    explicit_config_path, e
                )
            })?
    } else if let Some(env_config_path) = &env_config.config {
        tracing::debug!("using config file from SF_CONFIG: {}", env_config_path);
        config_manager
            .load_file(env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => file_config,
            Err(e) => {
                tracing::warn!("config discovery failed: {}", e);
                FileConfig::default()
            }
        }
    };
    let config = file_config.apply_to(RunConfig::default());

    // Step 2: environment variables (SF_*)
    let config = env_config.apply_to(config);

    // Step 3: CLI arguments (highest precedence)
    let config = apply_cli_args_to_config(config, args);

    config.validate()?;
    Ok(config)
}

/// Apply CLI arguments to config.
///
/// Optional flags only override when the user actually passed them.
fn apply_cli_args_to_config(config: RunConfig, args: &Args) -> RunConfig {
    let mut config = config
        .with_paths(&args.input, &args.output)
        .with_api_key(args.apikey.trim());

    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(pages) = args.pages {
        config.pages = pages;
    }
    if let Some(num) = args.num {
        config.num = num;
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration_string) {
        config.timeout = timeout;
    }

    config
}
