//! Authorizer models.
//!
//! Data types shared between handlers and the authorization service.

use common::secret::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;

/// Bearer token taken from a request's `Authorization` header.
///
/// Wrapped in `SecretString` so it cannot end up in logs by accident.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw token text, for handing to the validator.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Whether signing keys can currently be obtained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_keys: Option<&'static str>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
