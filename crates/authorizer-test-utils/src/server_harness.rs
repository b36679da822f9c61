//! Test server harness for E2E testing
//!
//! Provides `TestAuthorizerServer` for spawning real authorizer instances in
//! tests, wired to a JWKS URL of the test's choosing (usually a `MockIssuer`).

use crate::token_builders::{authorize_request_event, TEST_CLIENT_ID, TEST_ISSUER};
use authorizer::config::Config;
use authorizer::observability::metrics::init_metrics_recorder;
use authorizer::routes::{self, AppState};
use authorizer::services::Authorizer;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// One recorder per test process; later servers share its handle.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the authorizer in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let issuer = MockIssuer::with_keys(&[key.jwk_json()]).await;
/// let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
///
/// let response = server.authorize("Bearer <token>", "arn:resource").await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestAuthorizerServer {
    addr: SocketAddr,
    config: Config,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestAuthorizerServer {
    /// Spawn a server trusting `TEST_ISSUER` / `TEST_CLIENT_ID` and fetching
    /// keys from `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(jwks_url, &[]).await
    }

    /// Like [`spawn`](Self::spawn), with extra environment-style overrides
    /// (e.g. `("JWKS_CACHE_TTL_SECONDS", "0")`).
    pub async fn spawn_with(
        jwks_url: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("TRUSTED_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("TRUSTED_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            authorizer: Arc::new(Authorizer::from_config(&config)),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind(config.bind_address.as_str())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// POST a request event with the given `Authorization` value.
    pub async fn authorize(
        &self,
        authorization: &str,
        method_arn: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        self.authorize_event(&authorize_request_event(authorization, method_arn))
            .await
    }

    /// POST an arbitrary request event.
    pub async fn authorize_event(
        &self,
        event: &serde_json::Value,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/authorize", self.url()))
            .json(event)
            .send()
            .await?)
    }

    /// POST a raw body to `/authorize`.
    pub async fn authorize_raw(&self, body: &'static str) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/authorize", self.url()))
            .header("content-type", "text/plain")
            .body(body)
            .send()
            .await?)
    }

    /// GET a path on the server.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self.client.get(format!("{}{}", self.url(), path)).send().await?)
    }
}

impl Drop for TestAuthorizerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
