//! Minimal bearer-token principal extraction.
//!
//! spec.md §1/§9 puts user accounts, JWT issuance, and API-key hashing
//! out of scope: "a standard auth layer injects an authenticated
//! principal into the request context." This module is that seam — just
//! enough to let admin routes require a principal without owning session
//! storage, key issuance, or rate-limit counters (the teacher's full
//! Ed25519 challenge-response `AuthSystem` is not needed here).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone)]
pub struct Principal {
    pub token: String,
}

pub struct RequirePrincipal(pub Principal);

#[derive(Debug)]
pub enum AuthRejection {
    Missing,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = header.and_then(|h| h.strip_prefix("Bearer ")).map(str::trim).filter(|t| !t.is_empty());

        match token {
            Some(token) => Ok(RequirePrincipal(Principal { token: token.to_string() })),
            None => Err(AuthRejection::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn extracts_bearer_token() {
        let request = Request::builder().header("authorization", "Bearer abc123").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let RequirePrincipal(principal) = RequirePrincipal::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(principal.token, "abc123");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let result = RequirePrincipal::from_request_parts(&mut parts, &()).await;
        assert!(result.is_err());
    }
}
