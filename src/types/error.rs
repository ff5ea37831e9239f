//! Crate-wide error type.
//!
//! Every variant maps onto one of the stable wire `code` values from the
//! public API (spec.md §6/§7). Internal-only failure modes (`Io`, `Json`,
//! `Toml`) never escape past the admin/reload endpoints that can trigger
//! them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type RouterResult<T> = Result<T, RouterError>;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no candidates matched the request")]
    NoCandidates,

    #[error("failed to fetch models: {0}")]
    ModelsFetchFailed(String),

    #[error("classification failed: {0}")]
    ClassificationFailed(String),

    #[error("analytics feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("failed to load catalog: {0}")]
    CatalogLoadFailed(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RouterError {
    /// Stable wire code, per spec.md §6 `Error codes`.
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::InvalidRequest(_) => "invalid_request",
            RouterError::NoCandidates => "no_candidates",
            RouterError::ModelsFetchFailed(_) => "models_fetch_failed",
            RouterError::ClassificationFailed(_) => "classification_failed",
            RouterError::FeedUnavailable(_) => "feed_unavailable",
            RouterError::CatalogLoadFailed(_) => "catalog_load_failed",
            RouterError::RateLimitExceeded => "rate_limit_exceeded",
            RouterError::Unauthorized => "unauthorized",
            RouterError::NotFound(_) => "not_found",
            RouterError::ServiceUnavailable(_) => "service_unavailable",
            RouterError::Io(_) | RouterError::Json(_) | RouterError::Toml(_) => "internal_error",
            RouterError::Config(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RouterError::NoCandidates => StatusCode::OK,
            RouterError::ModelsFetchFailed(_) => StatusCode::BAD_GATEWAY,
            RouterError::ClassificationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::FeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            RouterError::CatalogLoadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            RouterError::Unauthorized => StatusCode::UNAUTHORIZED,
            RouterError::NotFound(_) => StatusCode::NOT_FOUND,
            RouterError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::Io(_) | RouterError::Json(_) | RouterError::Toml(_) | RouterError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RouterError::InvalidRequest("x".into()).code(), "invalid_request");
        assert_eq!(RouterError::NoCandidates.code(), "no_candidates");
        assert_eq!(RouterError::Unauthorized.code(), "unauthorized");
    }
}
