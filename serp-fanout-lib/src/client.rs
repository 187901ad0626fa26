//! Remote search client.
//!
//! `QueryClient` is the seam between the worker pool and the search API.
//! `SerperClient` is the HTTP implementation: it takes a slot from the shared
//! [`RateLimiter`], POSTs the query and turns the `organic` results into a
//! list of links.

use crate::error::SearchError;
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Performs one search and returns the links it found.
///
/// Implementations must not retry; a failed call is final for that query
/// within the run.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn search(
        &self,
        query: &str,
        api_key: &str,
        results_per_page: u32,
        page: u32,
    ) -> Result<Vec<String>, SearchError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    page: u32,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Option<Vec<OrganicResult>>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: String,
}

/// HTTP client for a Serper-style search endpoint.
#[derive(Clone)]
pub struct SerperClient {
    /// HTTP client shared by all workers
    http_client: reqwest::Client,
    /// Full URL of the search endpoint
    endpoint: String,
    /// Upper bound for one request, body included
    timeout: Duration,
    /// Budget shared with every other caller in the run
    limiter: Arc<RateLimiter>,
}

impl SerperClient {
    pub fn new<E: Into<String>>(
        endpoint: E,
        timeout: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            SearchError::network_with_source("Failed to create search HTTP client", e.to_string())
        })?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
            limiter,
        })
    }

    async fn send_request(
        &self,
        query: &str,
        api_key: &str,
        results_per_page: u32,
        page: u32,
    ) -> Result<String, SearchError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&SearchRequest {
                q: query,
                page,
                num: results_per_page,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::remote_request(query, status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl QueryClient for SerperClient {
    async fn search(
        &self,
        query: &str,
        api_key: &str,
        results_per_page: u32,
        page: u32,
    ) -> Result<Vec<String>, SearchError> {
        self.limiter.acquire().await;

        let body = tokio::time::timeout(
            self.timeout,
            self.send_request(query, api_key, results_per_page, page),
        )
        .await
        .map_err(|_| SearchError::timeout("search request", self.timeout))??;

        tracing::debug!(query, body = %body, "API response");

        let links = extract_links(&body)?;
        if links.is_none() {
            tracing::info!(query, "no organic results in API response");
        }
        Ok(links.unwrap_or_default())
    }
}

/// Parse a search response body into its organic links.
///
/// Returns `Ok(None)` when the body is valid but has no `organic` field,
/// and an error when the body is not the expected JSON shape.
pub fn extract_links(body: &str) -> Result<Option<Vec<String>>, SearchError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        SearchError::ResponseParse {
            message: format!("Unexpected search response: {}", e),
            content: Some(body.chars().take(200).collect()),
        }
    })?;

    Ok(response
        .organic
        .map(|results| results.into_iter().map(|r| r.link).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> (SerperClient, Arc<RateLimiter>) {
        let limiter = Arc::new(RateLimiter::new(60, Duration::from_secs(60)));
        let client = SerperClient::new(
            format!("{}/search", server.uri()),
            timeout,
            Arc::clone(&limiter),
        )
        .unwrap();
        (client, limiter)
    }

    #[test]
    fn test_extract_links_in_order() {
        let body = r#"{"organic":[{"link":"https://a.example"},{"link":"https://b.example","title":"B"}]}"#;
        let links = extract_links(body).unwrap().unwrap();
        assert_eq!(links, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_extract_links_missing_organic() {
        let links = extract_links(r#"{"searchParameters":{"q":"x"}}"#).unwrap();
        assert!(links.is_none());
    }

    #[test]
    fn test_extract_links_malformed() {
        assert!(matches!(
            extract_links("<html>oops</html>"),
            Err(SearchError::ResponseParse { .. })
        ));
        assert!(matches!(
            extract_links(r#"{"organic":[{"title":"no link"}]}"#),
            Err(SearchError::ResponseParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_sends_query_and_parses_links() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "secret"))
            .and(body_json(serde_json::json!({"q": "rust", "page": 2, "num": 20})))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"organic":[{"link":"https://www.rust-lang.org"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (client, limiter) = client_for(&server, Duration::from_secs(5));
        let links = client.search("rust", "secret", 20, 2).await.unwrap();

        assert_eq!(links, vec!["https://www.rust-lang.org"]);
        assert_eq!(limiter.in_window().await, 1);
    }

    #[tokio::test]
    async fn test_search_non_200_is_remote_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, Duration::from_secs(5));
        let err = client.search("rust", "bad-key", 10, 1).await.unwrap_err();

        assert!(matches!(
            err,
            SearchError::RemoteRequest {
                status_code: 403,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_missing_organic_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"answerBox":{}}"#))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, Duration::from_secs(5));
        let links = client.search("rust", "key", 10, 1).await.unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_search_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"organic":[]}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, Duration::from_millis(100));
        let err = client.search("slow", "key", 10, 1).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_search_connection_refused_is_network_error() {
        let limiter = Arc::new(RateLimiter::new(60, Duration::from_secs(60)));
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client =
            SerperClient::new("http://127.0.0.1:9/search", Duration::from_secs(5), limiter)
                .unwrap();

        let err = client.search("q", "key", 10, 1).await.unwrap_err();
        assert!(matches!(err, SearchError::Network { .. }));
    }
}
