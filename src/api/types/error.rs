//! API error envelope

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Seconds until a rate-limited caller may retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

/// Whole seconds, rounded up, never below one
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let millis = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX);
    millis.div_ceil(1000).max(1)
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                success: false,
                error: message.into(),
                code: None,
                retry_after: None,
            },
        }
    }

    /// Add error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.code = Some(code.into());
        self
    }

    /// Bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message).with_code("invalid_query")
    }

    /// Not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message).with_code("not_found")
    }

    /// Rate limit error carrying a retry hint
    pub fn rate_limited(retry_after: Duration) -> Self {
        let secs = retry_after_secs(retry_after);
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests, retry after {} seconds", secs),
        )
        .with_code("rate_limited");
        err.response.retry_after = Some(secs);
        err
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message).with_code("internal_error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = self.response.retry_after;
        let mut response = (self.status, Json(self.response)).into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidQuery { message } => Self::bad_request(message),
            DomainError::RateLimited { retry_after } => Self::rate_limited(retry_after),
            DomainError::FetchFailed { .. } => {
                Self::internal("Failed to fetch search results").with_code("fetch_failed")
            }
            DomainError::Cache { message }
            | DomainError::Configuration { message }
            | DomainError::Internal { message } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.response.error)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let err = ApiError::bad_request("latitude out of range");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!err.response.success);
        assert_eq!(err.response.error, "latitude out of range");
        assert_eq!(err.response.code.as_deref(), Some("invalid_query"));
    }

    #[test]
    fn test_domain_error_conversion() {
        let cases = [
            (DomainError::invalid_query("bad"), StatusCode::BAD_REQUEST),
            (
                DomainError::rate_limited(Duration::from_secs(3)),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                DomainError::fetch_failed("timeout"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (DomainError::cache("broken"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DomainError::internal("shut down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (domain_err, status) in cases {
            let api_err: ApiError = domain_err.into();
            assert_eq!(api_err.status, status);
        }
    }

    #[test]
    fn test_fetch_failure_details_are_not_exposed() {
        let api_err: ApiError = DomainError::fetch_failed("password=hunter2").into();

        assert!(!api_err.response.error.contains("hunter2"));
        assert_eq!(api_err.response.code.as_deref(), Some("fetch_failed"));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1_001)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(50)), 50);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_rate_limited_response_has_header() {
        let response = ApiError::rate_limited(Duration::from_millis(2_500)).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::rate_limited(Duration::from_secs(7));
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["retryAfter"], 7);
        assert_eq!(json["code"], "rate_limited");

        let json = serde_json::to_string(&ApiError::internal("boom").response).unwrap();
        assert!(!json.contains("retryAfter"));
    }
}
