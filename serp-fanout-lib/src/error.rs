//! Error handling for search fan-out operations.
//!
//! This module defines one error type covering both per-query failures
//! (which the worker loop downgrades to a recorded failure) and run-level
//! failures such as unreadable input or invalid configuration.

use std::fmt;
use std::time::Duration;

/// Main error type for the fan-out engine.
#[derive(Debug, Clone)]
pub enum SearchError {
    /// The search API answered with a non-success status code
    RemoteRequest {
        query: String,
        status_code: u16,
    },

    /// The search API answered 200 but the body could not be parsed
    ResponseParse {
        message: String,
        content: Option<String>,
    },

    /// Well-formed response without any organic results.
    ///
    /// Not a transport problem: the worker loop classifies "no results"
    /// as a failed query.
    EmptyResult {
        query: String,
    },

    /// Network-related errors (connection refused, DNS, TLS, etc.)
    Network {
        message: String,
        source: Option<String>,
    },

    /// The remote call exceeded the configured timeout
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// File I/O errors on the input list or the output files
    File {
        path: String,
        message: String,
    },

    /// Configuration errors (invalid settings, unparsable config file, etc.)
    Config {
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl SearchError {
    /// Create a new remote request error for a non-success HTTP status.
    pub fn remote_request<Q: Into<String>>(query: Q, status_code: u16) -> Self {
        Self::RemoteRequest {
            query: query.into(),
            status_code,
        }
    }

    /// Create a new response parse error.
    pub fn response_parse<M: Into<String>>(message: M) -> Self {
        Self::ResponseParse {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new "no organic results" error.
    pub fn empty_result<Q: Into<String>>(query: Q) -> Self {
        Self::EmptyResult {
            query: query.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error belongs to a single query rather than the run.
    ///
    /// Per-query errors are recorded as failed queries; everything else
    /// stops the run.
    pub fn is_query_scoped(&self) -> bool {
        matches!(
            self,
            Self::RemoteRequest { .. }
                | Self::ResponseParse { .. }
                | Self::EmptyResult { .. }
                | Self::Network { .. }
                | Self::Timeout { .. }
        )
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteRequest { query, status_code } => {
                write!(
                    f,
                    "API request for '{}' failed with status code {}",
                    query, status_code
                )
            }
            Self::ResponseParse { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::EmptyResult { query } => {
                write!(f, "No organic results for '{}'", query)
            }
            Self::Network { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::File { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SearchError {}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("HTTP request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseParse {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_request_display_carries_status() {
        let err = SearchError::remote_request("rust", 403);
        assert_eq!(
            err.to_string(),
            "API request for 'rust' failed with status code 403"
        );
    }

    #[test]
    fn test_query_scoped_classification() {
        assert!(SearchError::remote_request("q", 500).is_query_scoped());
        assert!(SearchError::response_parse("bad json").is_query_scoped());
        assert!(SearchError::empty_result("q").is_query_scoped());
        assert!(SearchError::network("refused").is_query_scoped());
        assert!(SearchError::timeout("search", Duration::from_secs(1)).is_query_scoped());

        assert!(!SearchError::file_error("out.txt", "denied").is_query_scoped());
        assert!(!SearchError::config("threads must be positive").is_query_scoped());
    }

    #[test]
    fn test_serde_error_becomes_parse_error() {
        let err: SearchError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, SearchError::ResponseParse { .. }));
    }
}
