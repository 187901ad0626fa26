//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `SF_*`
//! environment variables, merging them with proper precedence rules, and
//! folding the result into a [`RunConfig`].

use crate::error::SearchError;
use crate::types::{RunConfig, MAX_RATE_LIMIT_CALLS, MAX_RATE_LIMIT_PERIOD};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Sliding-window rate limit for the search API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    /// Search API settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    /// Report file locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,

    /// Per-request timeout (as string, e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RateLimitConfig {
    /// Calls allowed per window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls: Option<usize>,

    /// Window length (e.g., "60s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_file: Option<String>,
}

impl DefaultsConfig {
    fn merged_with(self, higher: Self) -> Self {
        Self {
            threads: higher.threads.or(self.threads),
            pages: higher.pages.or(self.pages),
            num: higher.num.or(self.num),
            timeout: higher.timeout.or(self.timeout),
        }
    }
}

impl RateLimitConfig {
    fn merged_with(self, higher: Self) -> Self {
        Self {
            calls: higher.calls.or(self.calls),
            period: higher.period.or(self.period),
        }
    }
}

impl ApiConfig {
    fn merged_with(self, higher: Self) -> Self {
        Self {
            endpoint: higher.endpoint.or(self.endpoint),
        }
    }
}

impl OutputConfig {
    fn merged_with(self, higher: Self) -> Self {
        Self {
            failed_file: higher.failed_file.or(self.failed_file),
            summary_file: higher.summary_file.or(self.summary_file),
        }
    }
}

fn merge_section<T>(lower: Option<T>, higher: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(merge(lower, higher)),
        (None, higher) => higher,
        (lower, None) => lower,
    }
}

impl FileConfig {
    /// Overlay the values present in this file onto `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(threads) = defaults.threads {
                config.threads = threads;
            }
            if let Some(pages) = defaults.pages {
                config.pages = pages;
            }
            if let Some(num) = defaults.num {
                config.num = num;
            }
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
                config.timeout = timeout;
            }
        }

        if let Some(rate_limit) = &self.rate_limit {
            if let Some(calls) = rate_limit.calls {
                config.rate_limit_calls = calls;
            }
            if let Some(period) = rate_limit.period.as_deref().and_then(parse_duration_string) {
                config.rate_limit_period = period;
            }
        }

        if let Some(endpoint) = self.api.as_ref().and_then(|api| api.endpoint.clone()) {
            config.endpoint = endpoint;
        }

        if let Some(output) = &self.output {
            if let Some(failed) = &output.failed_file {
                config.failed_path = PathBuf::from(failed);
            }
            if let Some(summary) = &output.summary_file {
                config.summary_path = PathBuf::from(summary);
            }
        }

        config
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SearchError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SearchError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SearchError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| SearchError::config(format!("Failed to parse TOML configuration: {}", e)))?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the global file in `$HOME`, then a
    /// local file in the working directory; later files win per field.
    /// Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, SearchError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!("skipping config file: {}", e),
            }
        }

        for path in &loaded_files {
            tracing::debug!(path = %path.display(), "loaded config file");
        }

        Ok(merged_config)
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./serp-fanout.toml", "./.serp-fanout.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".serp-fanout.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("serp-fanout").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` take precedence.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: merge_section(lower.defaults, higher.defaults, DefaultsConfig::merged_with),
            rate_limit: merge_section(
                lower.rate_limit,
                higher.rate_limit,
                RateLimitConfig::merged_with,
            ),
            api: merge_section(lower.api, higher.api, ApiConfig::merged_with),
            output: merge_section(lower.output, higher.output, OutputConfig::merged_with),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), SearchError> {
        if let Some(defaults) = &config.defaults {
            if let Some(threads) = defaults.threads {
                if threads == 0 || threads > 100 {
                    return Err(SearchError::config("Threads must be between 1 and 100"));
                }
            }
            if defaults.pages == Some(0) {
                return Err(SearchError::config("Pages must be at least 1"));
            }
            if let Some(num) = defaults.num {
                if num == 0 || num > 100 {
                    return Err(SearchError::config(
                        "Results per page must be between 1 and 100",
                    ));
                }
            }
            if let Some(timeout) = &defaults.timeout {
                check_duration("timeout", timeout)?;
            }
        }

        if let Some(rate_limit) = &config.rate_limit {
            if let Some(calls) = rate_limit.calls {
                if !valid_rate_limit_calls(calls) {
                    return Err(SearchError::config(format!(
                        "Rate limit calls must be between 1 and {}",
                        MAX_RATE_LIMIT_CALLS
                    )));
                }
            }
            if let Some(period) = &rate_limit.period {
                check_duration("rate_limit.period", period)?;
                if parse_rate_limit_period(period).is_none() {
                    return Err(SearchError::config(format!(
                        "Rate limit period '{}' is longer than 24h",
                        period
                    )));
                }
            }
        }

        if let Some(endpoint) = config.api.as_ref().and_then(|api| api.endpoint.as_ref()) {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(SearchError::config(format!(
                    "Invalid endpoint '{}', must be an http(s) URL",
                    endpoint
                )));
            }
        }

        Ok(())
    }
}

fn valid_rate_limit_calls(calls: usize) -> bool {
    (1..=MAX_RATE_LIMIT_CALLS).contains(&calls)
}

fn parse_rate_limit_period(value: &str) -> Option<Duration> {
    parse_duration_string(value).filter(|period| *period <= MAX_RATE_LIMIT_PERIOD)
}

fn check_duration(field: &str, value: &str) -> Result<(), SearchError> {
    match parse_duration_string(value) {
        Some(_) => Ok(()),
        None => Err(SearchError::config(format!(
            "Invalid {} '{}'. Use a non-zero value like '30s', '2m' or '1h'",
            field, value
        ))),
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via SF_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub threads: Option<usize>,
    pub pages: Option<u32>,
    pub num: Option<u32>,
    pub timeout: Option<Duration>,
    pub rate_limit_calls: Option<usize>,
    pub rate_limit_period: Option<Duration>,
    pub endpoint: Option<String>,
    pub failed_file: Option<String>,
    pub summary_file: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values present in the environment onto `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(pages) = self.pages {
            config.pages = pages;
        }
        if let Some(num) = self.num {
            config.num = num;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(calls) = self.rate_limit_calls {
            config.rate_limit_calls = calls;
        }
        if let Some(period) = self.rate_limit_period {
            config.rate_limit_period = period;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(failed) = &self.failed_file {
            config.failed_path = PathBuf::from(failed);
        }
        if let Some(summary) = &self.summary_file {
            config.summary_path = PathBuf::from(summary);
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig {
        threads: parse_env(&lookup, "SF_THREADS", |v| {
            v.parse::<usize>().ok().filter(|t| (1..=100).contains(t))
        }),
        pages: parse_env(&lookup, "SF_PAGES", |v| {
            v.parse::<u32>().ok().filter(|p| *p > 0)
        }),
        num: parse_env(&lookup, "SF_NUM", |v| {
            v.parse::<u32>().ok().filter(|n| (1..=100).contains(n))
        }),
        timeout: parse_env(&lookup, "SF_TIMEOUT", parse_duration_string),
        rate_limit_calls: parse_env(&lookup, "SF_RATE_LIMIT_CALLS", |v| {
            v.parse::<usize>().ok().filter(|c| valid_rate_limit_calls(*c))
        }),
        rate_limit_period: parse_env(&lookup, "SF_RATE_LIMIT_PERIOD", parse_rate_limit_period),
        ..Default::default()
    };

    for (key, slot) in [
        ("SF_ENDPOINT", &mut env_config.endpoint),
        ("SF_FAILED_FILE", &mut env_config.failed_file),
        ("SF_SUMMARY_FILE", &mut env_config.summary_file),
        ("SF_CONFIG", &mut env_config.config),
    ] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("using {}={}", key, value);
            *slot = Some(value);
        }
    }

    env_config
}

fn parse_env<T, F, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    match parse(raw.trim()) {
        Some(value) => {
            tracing::debug!("using {}={}", key, raw);
            Some(value)
        }
        None => {
            tracing::warn!("ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}

/// Parse a duration string like "500ms", "30s", "2m" or "1h".
///
/// A bare number is taken as seconds. Zero durations are rejected.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let duration = if let Some(ms) = value.strip_suffix("ms") {
        Duration::from_millis(ms.parse().ok()?)
    } else if let Some(s) = value.strip_suffix('s') {
        Duration::from_secs(s.parse().ok()?)
    } else if let Some(m) = value.strip_suffix('m') {
        Duration::from_secs(m.parse::<u64>().ok()?.checked_mul(60)?)
    } else if let Some(h) = value.strip_suffix('h') {
        Duration::from_secs(h.parse::<u64>().ok()?.checked_mul(3600)?)
    } else {
        Duration::from_secs(value.parse().ok()?)
    };

    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}
