//! Mock token issuer
//!
//! A wiremock server publishing a JWKS document at
//! `/.well-known/jwks.json`. The response can be swapped mid-test to
//! simulate key rotation, outages and broken documents.

use crate::crypto_fixtures::jwks_json;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the JWKS document on the mock issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub struct MockIssuer {
    server: MockServer,
    /// JWKS requests seen before the last `reset()`, which clears the journal.
    earlier_requests: AtomicUsize,
}

impl MockIssuer {
    /// Start an issuer that serves nothing until told to.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            earlier_requests: AtomicUsize::new(0),
        }
    }

    /// Start an issuer already publishing `keys`.
    pub async fn with_keys(keys: &[Value]) -> Self {
        let issuer = Self::start().await;
        issuer.serve_keys(keys).await;
        issuer
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Publish `keys`, replacing whatever was served before.
    pub async fn serve_keys(&self, keys: &[Value]) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .await;
    }

    /// Answer with `status` and an empty body.
    pub async fn serve_status(&self, status: u16) {
        self.respond_with(ResponseTemplate::new(status)).await;
    }

    /// Answer 200 with a raw body.
    pub async fn serve_body(&self, body: &str) {
        self.respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
        )
        .await;
    }

    /// Publish `keys` but only after `delay`.
    pub async fn serve_keys_after(&self, keys: &[Value], delay: Duration) {
        self.respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Number of JWKS requests received so far.
    pub async fn jwks_requests(&self) -> usize {
        self.earlier_requests.load(Ordering::SeqCst) + self.journaled_jwks_requests().await
    }

    async fn journaled_jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }

    async fn respond_with(&self, template: ResponseTemplate) {
        let journaled = self.journaled_jwks_requests().await;
        self.earlier_requests.fetch_add(journaled, Ordering::SeqCst);
        self.server.reset().await;

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}
