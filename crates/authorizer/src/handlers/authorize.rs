//! Authorization endpoint.
//!
//! `POST /authorize` takes a request event and answers with either the
//! decision document (200) or the fixed Unauthorized response (401).

use crate::errors::AuthorizeError;
use crate::policy::AuthorizationDecision;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::BoxError;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

/// Handler for POST /authorize
///
/// The body is read as raw bytes and parsed here, so a body that is not JSON
/// (or has the wrong Content-Type) is an ordinary `TokenRequired` rejection
/// rather than a framework 4xx.
///
/// ## Response
///
/// ```json
/// {
///   "principalId": "user",
///   "policyDocument": {
///     "Version": "2012-10-17",
///     "Statement": [{
///       "Action": "execute-api:Invoke",
///       "Effect": "Allow",
///       "Resource": "arn:aws:execute-api:us-east-1:123456789012:abc123/prod/GET/items"
///     }]
///   }
/// }
/// ```
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AuthorizationDecision>, AuthorizeError> {
    let request: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(target: "authorizer.handler", error = %e, "Request body is not JSON");
        Value::Null
    });

    state.authorizer.authorize(&request).await.map(Json)
}

/// Error handler for the `/authorize` timeout layer.
///
/// A request that runs out of time is rejected like any other failure.
pub async fn authorize_timeout(error: BoxError) -> AuthorizeError {
    tracing::warn!(
        target: "authorizer.handler",
        error = %error,
        "Request rejected, authorization timed out"
    );
    AuthorizeError::TimedOut
}
