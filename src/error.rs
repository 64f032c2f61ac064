use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

/// Failures talking to the LLM provider. Callers decide whether to fall back or surface them.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl InsightError {
    pub fn code(&self) -> &'static str {
        match self {
            InsightError::MissingApiKey => "MISSING_API_KEY",
            InsightError::Timeout(_) => "HTTP_TIMEOUT",
            InsightError::Http { status: 429 } => "RATE_LIMITED",
            InsightError::Http { .. } => "HTTP_ERROR",
            InsightError::Network(_) => "PROVIDER_UNAVAILABLE",
            InsightError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            InsightError::Timeout(timeout_secs)
        } else if let Some(status) = err.status() {
            InsightError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            InsightError::InvalidResponse(err.to_string())
        } else {
            InsightError::Network(err.to_string())
        }
    }
}

/// Errors surfaced to HTTP clients as `{ success: false, error }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: InsightError,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "loadcheck::server", %message, "rejected request");
        ApiError::BadRequest(message)
    }

    pub fn upstream(message: impl Into<String>, source: InsightError) -> Self {
        let message = message.into();
        warn!(
            target: "loadcheck::server",
            code = source.code(),
            error = %source,
            %message,
            "upstream provider failed"
        );
        ApiError::Upstream { message, source }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Internal(_) | ApiError::Upstream { .. } => 500,
        }
    }

    pub fn to_body(&self) -> Value {
        match self {
            ApiError::Upstream { message, source } => json!({
                "success": false,
                "error": message,
                "details": source.to_string(),
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError::bad_request("No data provided").status_code(), 400);
        assert_eq!(ApiError::NotFound.status_code(), 404);
        assert_eq!(ApiError::MethodNotAllowed.status_code(), 405);
        assert_eq!(
            ApiError::upstream("Failed to get AI response", InsightError::Timeout(5)).status_code(),
            500
        );
    }

    #[test]
    fn upstream_body_carries_details() {
        let body = ApiError::upstream(
            "Failed to get AI response",
            InsightError::Http { status: 503 },
        )
        .to_body();

        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to get AI response");
        assert_eq!(body["details"], "provider returned HTTP 503");
    }

    #[test]
    fn rate_limit_has_its_own_code() {
        assert_eq!(InsightError::Http { status: 429 }.code(), "RATE_LIMITED");
        assert_eq!(InsightError::Http { status: 500 }.code(), "HTTP_ERROR");
    }
}
