//! Controller client errors

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when interacting with the Controller API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Controller API returned an error
    #[error("Controller API error: {0}")]
    Api(String),

    /// Controller answered with a non-success status
    #[error("{method} {path} failed: {} - {body}", .status.as_u16())]
    Status {
        /// HTTP method
        method: String,
        /// Request path without the base URL
        path: String,
        /// Response status
        status: StatusCode,
        /// Response body
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, expired token, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether a retry of the same request could succeed.
    ///
    /// Connection failures, timeouts, throttling and 5xx responses are retried;
    /// everything else is a deterministic answer from the Controller.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            ApiError::Status { status, .. } => matches!(
                *status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            _ => false,
        }
    }

    /// Whether the request may have reached the Controller before failing
    pub fn may_have_been_applied(&self) -> bool {
        matches!(self, ApiError::Http(e) if e.is_timeout() && !e.is_connect())
    }

    /// Whether this is the soft "no such interface on device" miss
    pub fn is_missing_device_resource(&self) -> bool {
        matches!(self, ApiError::NotFound(msg) if msg.contains("No resource found with deviceId"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode) -> ApiError {
        ApiError::Status {
            method: "PUT".to_string(),
            path: "/dna/intent/api/v1/tag".to_string(),
            status: code,
            body: "busy".to_string(),
        }
    }

    #[test]
    fn test_transient_statuses_are_matched_by_code() {
        assert!(status(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(!status(StatusCode::INTERNAL_SERVER_ERROR).is_transient());
        assert!(!status(StatusCode::BAD_REQUEST).is_transient());
        assert!(!ApiError::Api("upstream said 503 in passing".to_string()).is_transient());
    }

    #[test]
    fn test_status_error_message() {
        assert_eq!(
            status(StatusCode::BAD_GATEWAY).to_string(),
            "PUT /dna/intent/api/v1/tag failed: 502 - busy"
        );
        assert!(!status(StatusCode::BAD_GATEWAY).may_have_been_applied());
    }
}
