//! Authorization endpoint integration tests.
//!
//! Runs the real server against a mocked issuer JWKS endpoint and checks the
//! decision for each kind of request, plus key-set caching behavior.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use authorizer_test_utils::{
    Ed25519TestKey, MockIssuer, RsaTestKey, TestAuthorizerServer, TestSigner, TestTokenBuilder,
};
use serde_json::{json, Value};
use std::time::Duration;

const ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/items";

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

async fn assert_unauthorized(response: reqwest::Response) -> Result<()> {
    assert_eq!(response.status(), 401);
    assert!(
        response.headers().contains_key("www-authenticate"),
        "401 must carry WWW-Authenticate"
    );
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"message": "Unauthorized"}));
    Ok(())
}

// ============================================================================
// Allow
// ============================================================================

#[tokio::test]
async fn test_valid_token_returns_allow_decision() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    let response = server.authorize(&bearer(&token), ARN).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({
            "principalId": "user",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "execute-api:Invoke",
                    "Effect": "Allow",
                    "Resource": ARN
                }]
            }
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_eddsa_signed_token_allowed() -> Result<()> {
    let key = Ed25519TestKey::new(1, "ed-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    let response = server.authorize(&bearer(&token), ARN).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_audience_mismatch_alone_is_allowed() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let claims = TestTokenBuilder::new().audience("unrelated-audience").build();
    let response = server
        .authorize(&bearer(&key.sign_token(&claims)), ARN)
        .await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_resource_is_returned_verbatim() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    for resource in ["", "*", "arn:aws:execute-api:eu-west-1:1:api/*/POST/a b/ü"] {
        let response = server.authorize(&bearer(&token), resource).await?;
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await?;
        assert_eq!(body["policyDocument"]["Statement"][0]["Resource"], resource);
    }

    Ok(())
}

#[tokio::test]
async fn test_same_token_twice_gives_same_decision() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    let first: Value = server.authorize(&bearer(&token), ARN).await?.json().await?;
    let second: Value = server.authorize(&bearer(&token), ARN).await?.json().await?;

    assert_eq!(first, second);
    assert_eq!(issuer.jwks_requests().await, 1, "keys should come from cache");

    Ok(())
}

#[tokio::test]
async fn test_configured_principal_is_used() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server =
        TestAuthorizerServer::spawn_with(&issuer.jwks_url(), &[("PRINCIPAL_ID", "gateway-caller")])
            .await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    let body: Value = server.authorize(&bearer(&token), ARN).await?.json().await?;

    assert_eq!(body["principalId"], "gateway-caller");
    Ok(())
}

// ============================================================================
// Unauthorized: request shape
// ============================================================================

#[tokio::test]
async fn test_missing_authorization_is_unauthorized() -> Result<()> {
    let issuer = MockIssuer::start().await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    for event in [
        json!({"methodArn": ARN}),
        json!({"headers": {}, "methodArn": ARN}),
        json!({"headers": {"Authorization": ""}, "methodArn": ARN}),
        json!({"headers": {"Authorization": null}, "methodArn": ARN}),
    ] {
        let response = server.authorize_event(&event).await?;
        assert_eq!(
            response.headers()["www-authenticate"],
            "Bearer realm=\"authorizer\""
        );
        assert_unauthorized(response).await?;
    }

    assert_eq!(issuer.jwks_requests().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_unparsable_body_is_unauthorized() -> Result<()> {
    let issuer = MockIssuer::start().await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    assert_unauthorized(server.authorize_raw("not json at all").await?).await?;
    assert_unauthorized(server.authorize_raw("").await?).await?;

    Ok(())
}

#[tokio::test]
async fn test_raw_token_without_scheme_is_allowed() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    let response = server.authorize(&token, ARN).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
    assert_eq!(body["policyDocument"]["Statement"][0]["Resource"], ARN);
    Ok(())
}

#[tokio::test]
async fn test_basic_credential_is_unauthorized() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let response = server.authorize("Basic dXNlcjpwYXNz", ARN).await?;
    assert_eq!(
        response.headers()["www-authenticate"],
        "Bearer realm=\"authorizer\", error=\"invalid_token\""
    );
    assert_unauthorized(response).await?;

    // Not a JWT, so no key fetch is attempted
    assert_eq!(issuer.jwks_requests().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_method_arn_is_unauthorized() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    let response = server
        .authorize_event(&json!({"headers": {"Authorization": bearer(&token)}}))
        .await?;

    assert_unauthorized(response).await
}

// ============================================================================
// Unauthorized: token content
// ============================================================================

#[tokio::test]
async fn test_invalid_tokens_are_unauthorized() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let impostor = Ed25519TestKey::new(9, "rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let cases = [
        ("malformed", "abc.def.ghi".to_string()),
        (
            "foreign signature",
            impostor.sign_token(&TestTokenBuilder::new().build()),
        ),
        (
            "wrong issuer",
            key.sign_token(&TestTokenBuilder::new().issuer("https://evil.example").build()),
        ),
        (
            "expired",
            key.sign_token(&TestTokenBuilder::new().expires_in(-1).build()),
        ),
        (
            "expires now",
            key.sign_token(
                &TestTokenBuilder::new()
                    .expires_at(chrono::Utc::now().timestamp())
                    .build(),
            ),
        ),
        (
            "wrong client",
            key.sign_token(&TestTokenBuilder::new().client_id("other-client").build()),
        ),
        (
            "no client",
            key.sign_token(&TestTokenBuilder::new().without_claim("client_id").build()),
        ),
    ];

    for (name, token) in cases {
        let response = server.authorize(&bearer(&token), ARN).await?;
        assert_eq!(response.status(), 401, "case: {name}");
        let body: Value = response.json().await?;
        assert_eq!(body, json!({"message": "Unauthorized"}), "case: {name}");
    }

    Ok(())
}

// ============================================================================
// Key set
// ============================================================================

#[tokio::test]
async fn test_key_set_unreachable_is_unauthorized_not_crash() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::start().await;
    issuer.serve_status(503).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    assert_unauthorized(server.authorize(&bearer(&token), ARN).await?).await?;

    // Server keeps serving
    assert_eq!(server.get("/health").await?.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_malformed_key_set_is_unauthorized() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::start().await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    for body in ["<html>oops</html>", r#"{"keys": "nope"}"#, r#"{"keys": []}"#] {
        issuer.serve_body(body).await;
        assert_unauthorized(server.authorize(&bearer(&token), ARN).await?).await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_slow_key_set_fetch_times_out_to_unauthorized() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::start().await;
    issuer
        .serve_keys_after(&[key.jwk_json()], Duration::from_secs(3))
        .await;
    let server = TestAuthorizerServer::spawn_with(
        &issuer.jwks_url(),
        &[("JWKS_FETCH_TIMEOUT_SECONDS", "1")],
    )
    .await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    assert_unauthorized(server.authorize(&bearer(&token), ARN).await?).await
}

#[tokio::test]
async fn test_request_timeout_is_the_same_unauthorized_response() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::start().await;
    issuer
        .serve_keys_after(&[key.jwk_json()], Duration::from_secs(3))
        .await;
    let server = TestAuthorizerServer::spawn_with(
        &issuer.jwks_url(),
        &[
            ("REQUEST_TIMEOUT_SECONDS", "1"),
            ("JWKS_FETCH_TIMEOUT_SECONDS", "10"),
        ],
    )
    .await?;

    let token = key.sign_token(&TestTokenBuilder::new().build());
    let response = server.authorize(&bearer(&token), ARN).await?;

    assert_eq!(
        response.headers()["www-authenticate"],
        "Bearer realm=\"authorizer\", error=\"invalid_token\""
    );
    assert_unauthorized(response).await
}

#[tokio::test]
async fn test_rotated_key_picked_up_before_ttl() -> Result<()> {
    let old_key = RsaTestKey::new("key-old");
    let new_key = Ed25519TestKey::new(5, "key-new");
    let issuer = MockIssuer::with_keys(&[old_key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let old_token = old_key.sign_token(&TestTokenBuilder::new().build());
    assert_eq!(server.authorize(&bearer(&old_token), ARN).await?.status(), 200);

    issuer
        .serve_keys(&[old_key.jwk_json(), new_key.jwk_json()])
        .await;

    let new_token = new_key.sign_token(&TestTokenBuilder::new().build());
    assert_eq!(server.authorize(&bearer(&new_token), ARN).await?.status(), 200);
    assert_eq!(issuer.jwks_requests().await, 2);

    Ok(())
}

#[tokio::test]
async fn test_unknown_kid_refresh_is_rate_limited() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let stranger = Ed25519TestKey::new(3, "never-published");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let good = key.sign_token(&TestTokenBuilder::new().build());
    assert_eq!(server.authorize(&bearer(&good), ARN).await?.status(), 200);

    let bad = stranger.sign_token(&TestTokenBuilder::new().build());
    for _ in 0..5 {
        assert_unauthorized(server.authorize(&bearer(&bad), ARN).await?).await?;
    }

    // Initial fetch plus one miss-triggered refresh
    assert_eq!(issuer.jwks_requests().await, 2);
    Ok(())
}

#[tokio::test]
async fn test_stale_keys_served_when_refresh_fails() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server =
        TestAuthorizerServer::spawn_with(&issuer.jwks_url(), &[("JWKS_CACHE_TTL_SECONDS", "0")])
            .await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    assert_eq!(server.authorize(&bearer(&token), ARN).await?.status(), 200);

    issuer.serve_status(500).await;
    assert_eq!(server.authorize(&bearer(&token), ARN).await?.status(), 200);
    assert_eq!(issuer.jwks_requests().await, 2, "TTL zero refetches every call");

    Ok(())
}

#[tokio::test]
async fn test_no_stale_fallback_when_disabled() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn_with(
        &issuer.jwks_url(),
        &[("JWKS_CACHE_TTL_SECONDS", "0"), ("JWKS_MAX_STALE_SECONDS", "0")],
    )
    .await?;
    let token = key.sign_token(&TestTokenBuilder::new().build());

    assert_eq!(server.authorize(&bearer(&token), ARN).await?.status(), 200);

    issuer.serve_status(500).await;
    assert_unauthorized(server.authorize(&bearer(&token), ARN).await?).await
}

#[tokio::test]
async fn test_rejections_are_indistinguishable() -> Result<()> {
    let key = RsaTestKey::new("rsa-key-1");
    let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
    let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;

    let expired = key.sign_token(&TestTokenBuilder::new().expires_in(-60).build());
    let wrong_client = key.sign_token(&TestTokenBuilder::new().client_id("x").build());

    let first = server.authorize(&bearer(&expired), ARN).await?.text().await?;
    let second = server
        .authorize(&bearer(&wrong_client), ARN)
        .await?
        .text()
        .await?;
    let third = server.authorize(&bearer("garbage"), ARN).await?.text().await?;

    assert_eq!(first, second);
    assert_eq!(second, third);
    Ok(())
}
