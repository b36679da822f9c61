//! Request orchestration.
//!
//! Takes one inbound request event, pulls out the bearer token and the
//! resource identifier, validates the token against the issuer's keys and
//! produces an Allow decision. Every failure along the way is returned as an
//! [`AuthorizeError`], which the HTTP layer renders as a single Unauthorized
//! response.
//!
//! Request event shape:
//!
//! ```json
//! {
//!   "headers": { "Authorization": "Bearer <token>" },
//!   "methodArn": "arn:aws:execute-api:region:account:api/stage/METHOD/path"
//! }
//! ```

use crate::auth::jwks::{CachePolicy, HttpKeySetFetcher, KeySetProvider};
use crate::auth::jwt::{TokenError, TokenValidator};
use crate::config::Config;
use crate::errors::AuthorizeError;
use crate::models::BearerToken;
use crate::observability::metrics::record_decision;
use crate::policy::{generate_decision, AuthorizationDecision, Effect};
use common::jwt::{extract_kid, JwtValidationError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Header carrying the bearer token.
const AUTHORIZATION_HEADER: &str = "Authorization";

/// Required scheme prefix of the `Authorization` value.
const BEARER_PREFIX: &str = "Bearer ";

/// Decides whether a request may invoke its resource.
pub struct Authorizer {
    key_sets: Arc<KeySetProvider>,
    validator: TokenValidator,
    principal_id: String,
}

impl Authorizer {
    pub fn new(
        key_sets: Arc<KeySetProvider>,
        validator: TokenValidator,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            key_sets,
            validator,
            principal_id: principal_id.into(),
        }
    }

    /// Wire up an authorizer that fetches keys over HTTP from `config.jwks_url`.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(HttpKeySetFetcher::with_timeout(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
        ));
        let policy = CachePolicy {
            ttl: config.jwks_cache_ttl,
            max_stale: config.jwks_max_stale,
            miss_refresh_cooldown: config.jwks_miss_refresh_cooldown,
        };

        Self::new(
            Arc::new(KeySetProvider::new(fetcher, policy)),
            TokenValidator::new(
                config.trusted_issuer.clone(),
                config.trusted_client_id.clone(),
            ),
            config.principal_id.clone(),
        )
    }

    /// The key-set provider, shared with the readiness probe.
    pub fn key_sets(&self) -> &Arc<KeySetProvider> {
        &self.key_sets
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Authorize one request event.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizeError` for every rejection. The caller renders all of
    /// them the same way; the variant is logged and counted here.
    #[instrument(skip_all, name = "authorizer.authorize")]
    pub async fn authorize(
        &self,
        request: &Value,
    ) -> Result<AuthorizationDecision, AuthorizeError> {
        let start = Instant::now();
        let result = self.decide(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(decision) => {
                tracing::info!(
                    target: "authorizer.handler",
                    principal_id = %decision.principal_id,
                    duration_ms = duration.as_millis() as u64,
                    "Request authorized"
                );
                record_decision("allow", "none", duration);
            }
            Err(e @ AuthorizeError::KeySetUnavailable(_)) => {
                tracing::warn!(
                    target: "authorizer.handler",
                    reason = e.reason(),
                    error = %e,
                    "Request rejected, signing keys unavailable"
                );
                record_decision(e.outcome(), e.reason(), duration);
            }
            Err(e) => {
                tracing::info!(
                    target: "authorizer.handler",
                    reason = e.reason(),
                    "Request rejected"
                );
                record_decision(e.outcome(), e.reason(), duration);
            }
        }

        result
    }

    async fn decide(&self, request: &Value) -> Result<AuthorizationDecision, AuthorizeError> {
        let token = extract_bearer_token(request)?;

        // Structure and kid are checked before any key fetch
        let kid = extract_kid(token.expose()).map_err(|e| match e {
            JwtValidationError::MissingKid => TokenError::SignatureInvalid,
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                TokenError::Malformed
            }
        })?;

        let key_set = self.key_sets.key_set_for(Some(&kid)).await?;
        let claims = self.validator.validate(token.expose(), &key_set)?;

        let resource = extract_resource(request)?;

        tracing::debug!(
            target: "authorizer.handler",
            claims = ?claims,
            "Token accepted"
        );

        Ok(generate_decision(&self.principal_id, Effect::Allow, resource))
    }
}

/// Pull the bearer token out of `headers.Authorization`.
///
/// The header name is matched exactly first, then ASCII case-insensitively.
///
/// # Errors
///
/// Returns `TokenRequired` if there are no headers, no `Authorization` string,
/// or it is empty (including a bare `"Bearer "`).
///
/// One leading, case-sensitive `"Bearer "` is stripped when present. Any other
/// value is handed to validation unchanged.
pub fn extract_bearer_token(request: &Value) -> Result<BearerToken, AuthorizeError> {
    let headers = request
        .get("headers")
        .and_then(Value::as_object)
        .ok_or(AuthorizeError::TokenRequired)?;

    let value = headers
        .get(AUTHORIZATION_HEADER)
        .or_else(|| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
                .map(|(_, value)| value)
        })
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(AuthorizeError::TokenRequired)?;

    // A raw token without the scheme is passed on as-is; the validator decides
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value);

    if token.is_empty() {
        return Err(AuthorizeError::TokenRequired);
    }

    Ok(BearerToken::new(token))
}

/// Pull the resource identifier out of `methodArn`, verbatim.
///
/// # Errors
///
/// Returns `ResourceRequired` if `methodArn` is absent or not a string.
pub fn extract_resource(request: &Value) -> Result<&str, AuthorizeError> {
    request
        .get("methodArn")
        .and_then(Value::as_str)
        .ok_or(AuthorizeError::ResourceRequired)
}
