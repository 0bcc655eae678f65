//! Common utilities for the Controller API client
//!
//! Provides the authenticated HTTP wrapper shared by every endpoint family.

pub mod backoff;

use crate::error::ApiError;
use crate::models::ApiResponse;
use backoff::FibonacciBackoff;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

/// Default number of retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// HTTP client wrapper with token authentication and transient-error retry
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry budget for transient failures
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Build query string from filters
    pub fn build_query_string(filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append a query string to a path when filters are present
    pub fn with_query(path: &str, filters: &[(&str, &str)]) -> String {
        if filters.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, Self::build_query_string(filters))
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").json(body);
        }

        let response = request.send().await.map_err(ApiError::Http)?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("{} {} - {}", method, path, text)));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Authentication(format!(
                "{} {} rejected: {} - {}",
                method,
                path,
                status.as_u16(),
                text
            )));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status,
                body: text,
            });
        }
        Ok(text)
    }

    /// Send a request, retrying transient failures with Fibonacci backoff
    ///
    /// A write that timed out is not retried, it may already be running on
    /// the Controller.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let url = self.build_url(path);
        let mut backoff = FibonacciBackoff::default();
        let mut attempt = 0;

        loop {
            debug!("{} {}", method, url);
            match self.send_once(&method, &url, path, body).await {
                Ok(text) => return Ok(text),
                Err(e) if should_retry(&method, &e) && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff();
                    warn!(
                        "{} {} failed ({}), retrying in {:?} (attempt {}/{})",
                        method, path, e, delay, attempt, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, ApiError> {
        serde_json::from_str(text).map_err(|e| {
            ApiError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    /// Make a GET request and unwrap the `response` envelope
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send(Method::GET, path, None).await?;
        Self::decode::<ApiResponse<T>>(&text).map(|envelope| envelope.response)
    }

    /// Make a POST request and unwrap the `response` envelope
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!("POST {} with body: {}", path, body);
        let text = self.send(Method::POST, path, Some(body)).await?;
        Self::decode::<ApiResponse<T>>(&text).map(|envelope| envelope.response)
    }

    /// Make a POST request to an endpoint that answers without the envelope
    pub async fn post_raw<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!("POST {} with body: {}", path, body);
        let text = self.send(Method::POST, path, Some(body)).await?;
        Self::decode::<T>(&text)
    }

    /// Make a PUT request and unwrap the `response` envelope
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!("PUT {} with body: {}", path, body);
        let text = self.send(Method::PUT, path, Some(body)).await?;
        Self::decode::<ApiResponse<T>>(&text).map(|envelope| envelope.response)
    }

    /// Make a DELETE request and unwrap the `response` envelope
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send(Method::DELETE, path, None).await?;
        Self::decode::<ApiResponse<T>>(&text).map(|envelope| envelope.response)
    }
}

fn should_retry(method: &Method, error: &ApiError) -> bool {
    error.is_transient() && (*method == Method::GET || !error.may_have_been_applied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttled_writes_are_retried() {
        let throttled = ApiError::Status {
            method: "POST".to_string(),
            path: "/dna/intent/api/v1/tag".to_string(),
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        assert!(should_retry(&Method::POST, &throttled));
        assert!(!should_retry(&Method::POST, &ApiError::Api("decode".to_string())));
    }

    #[test]
    fn test_query_string_is_encoded() {
        let query = HttpClient::build_query_string(&[("nameHierarchy", "Global/San Jose/Bldg 1")]);
        assert_eq!(query, "nameHierarchy=Global%2FSan%20Jose%2FBldg%201");
    }

    #[test]
    fn test_with_query_leaves_bare_path() {
        assert_eq!(HttpClient::with_query("/dna/intent/api/v1/tags", &[]), "/dna/intent/api/v1/tags");
        assert_eq!(
            HttpClient::with_query("/dna/intent/api/v1/tags", &[("name", "edge")]),
            "/dna/intent/api/v1/tags?name=edge"
        );
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let http = HttpClient::new(Client::new(), "https://controller/".to_string(), "t".to_string());
        assert_eq!(http.build_url("/api"), "https://controller/api");
        assert_eq!(http.build_url("https://other/x"), "https://other/x");
    }
}
