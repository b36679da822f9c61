//! Authorizer error types.
//!
//! Every failure maps to the same client-facing outcome: HTTP 401 with a
//! fixed `Unauthorized` body. The variant is kept for logs and metrics only;
//! nothing about the failure kind leaks to the caller.

use crate::auth::{KeySetError, TokenError};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Fixed client-facing message for every rejection.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Why a request was not authorized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizeError {
    /// No usable `Authorization` header in the request.
    #[error("authorization token required")]
    TokenRequired,

    /// The bearer token failed validation.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Signing keys could not be obtained.
    #[error("signing keys unavailable: {0}")]
    KeySetUnavailable(#[from] KeySetError),

    /// No `methodArn` in the request.
    #[error("resource required")]
    ResourceRequired,

    /// The decision was not reached within the request timeout.
    #[error("authorization timed out")]
    TimedOut,
}

impl AuthorizeError {
    /// Outcome label for metrics. Always "unauthorized".
    pub fn outcome(&self) -> &'static str {
        "unauthorized"
    }

    /// Bounded reason label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthorizeError::TokenRequired => "token_required",
            AuthorizeError::InvalidToken(e) => e.kind(),
            AuthorizeError::KeySetUnavailable(e) => e.kind(),
            AuthorizeError::ResourceRequired => "resource_required",
            AuthorizeError::TimedOut => "timed_out",
        }
    }

    fn www_authenticate(&self) -> &'static str {
        match self {
            AuthorizeError::TokenRequired => "Bearer realm=\"authorizer\"",
            _ => "Bearer realm=\"authorizer\", error=\"invalid_token\"",
        }
    }
}

#[derive(Serialize)]
struct UnauthorizedBody {
    message: &'static str,
}

impl IntoResponse for AuthorizeError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(UnauthorizedBody {
                message: UNAUTHORIZED_MESSAGE,
            }),
        )
            .into_response();

        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(self.www_authenticate()),
        );

        response
    }
}
