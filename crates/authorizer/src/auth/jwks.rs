//! Key-set provider: fetches and caches the issuer's signing keys.
//!
//! The issuer publishes its public keys as a JWKS document at a well-known URL.
//! [`HttpKeySetFetcher`] performs one GET of that document; [`KeySetProvider`]
//! wraps any [`KeySetFetcher`] with a freshness policy:
//!
//! - A fetched set is reused until its TTL runs out (TTL zero = fetch every call)
//! - A token naming an unknown `kid` forces an early refresh, at most once per cooldown
//! - If a refresh fails, a cached set younger than `ttl + max_stale` is served instead
//!
//! Fetches are never retried inside a single call.

use crate::observability::metrics::{record_jwks_cache, record_jwks_fetch};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default stale window in seconds (1 hour).
const DEFAULT_MAX_STALE_SECONDS: u64 = 3600;

/// Default cooldown in seconds between refreshes forced by an unknown `kid`.
const DEFAULT_MISS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Default HTTP timeout in seconds for one fetch.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Errors from obtaining a key set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    /// Transport failure, timeout, or non-2xx response.
    #[error("Key set fetch failed: {0}")]
    NetworkFailure(String),

    /// The response body is not a usable JWKS document.
    #[error("Key set document is malformed: {0}")]
    MalformedKeySet(String),
}

impl KeySetError {
    /// Bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            KeySetError::NetworkFailure(_) => "network_failure",
            KeySetError::MalformedKeySet(_) => "malformed_key_set",
        }
    }
}

/// JSON Web Key as published by the issuer.
///
/// Covers RSA (`n`, `e`), EC (`crv`, `x`, `y`) and OKP (`crv`, `x`) keys.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is meant for (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (only "sig" keys are kept).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC/OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document as served by the issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Signing keys indexed by key ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningKeySet {
    keys: HashMap<String, Jwk>,
}

impl SigningKeySet {
    /// Build a key set from a parsed JWKS document.
    ///
    /// Keys without a `kid` or with a `use` other than `sig` are skipped. When
    /// two keys share a `kid`, the first one wins.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::MalformedKeySet` if no usable key remains.
    pub fn from_document(document: JwksDocument) -> Result<Self, KeySetError> {
        let total = document.keys.len();
        let key_set = Self::from_keys(document.keys);

        if key_set.is_empty() {
            return Err(KeySetError::MalformedKeySet(format!(
                "no usable signing keys among {total} published"
            )));
        }
        if key_set.len() < total {
            tracing::debug!(
                target: "authorizer.auth.jwks",
                published = total,
                usable = key_set.len(),
                "Skipped unusable keys in JWKS document"
            );
        }

        Ok(key_set)
    }

    /// Build a key set from individual keys, applying the same filtering.
    pub fn from_keys(keys: impl IntoIterator<Item = Jwk>) -> Self {
        let mut map = HashMap::new();
        for key in keys {
            let usable_for_signing = key.key_use.as_deref().map_or(true, |u| u == "sig");
            let Some(kid) = key.kid.clone().filter(|kid| !kid.is_empty()) else {
                continue;
            };
            if usable_for_signing {
                map.entry(kid).or_insert(key);
            }
        }
        Self { keys: map }
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    /// Whether a key with this ID is present.
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Source of the issuer's current key set.
///
/// Implemented over HTTP in production and by in-memory fakes in tests.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch and parse the issuer's key set.
    async fn fetch_key_set(&self) -> Result<SigningKeySet, KeySetError>;
}

/// Fetches the key set from the issuer's JWKS URL.
///
/// Holds one `reqwest::Client` so connections are reused across requests.
pub struct HttpKeySetFetcher {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher with the default 10 second timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_timeout(jwks_url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authorizer.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    /// The configured JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip_all, name = "authorizer.jwks.fetch")]
    async fn fetch_key_set(&self) -> Result<SigningKeySet, KeySetError> {
        tracing::debug!(target: "authorizer.auth.jwks", url = %self.jwks_url, "Fetching JWKS from issuer");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authorizer.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeySetError::NetworkFailure(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "authorizer.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeySetError::NetworkFailure(format!(
                "JWKS endpoint returned {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "authorizer.auth.jwks", error = %e, "Failed to read JWKS response body");
            KeySetError::NetworkFailure(e.to_string())
        })?;

        let document: JwksDocument = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "authorizer.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeySetError::MalformedKeySet(e.to_string())
        })?;

        SigningKeySet::from_document(document)
    }
}

/// Freshness policy for [`KeySetProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a fetched set is used without refetching. Zero disables reuse.
    pub ttl: Duration,

    /// How long past `ttl` a set may be served when refresh fails. Zero disables.
    pub max_stale: Duration,

    /// Minimum spacing between refreshes forced by an unknown `kid`.
    pub miss_refresh_cooldown: Duration,
}

impl CachePolicy {
    /// Fetch on every call and never fall back to old keys.
    pub fn no_cache() -> Self {
        Self {
            ttl: Duration::ZERO,
            max_stale: Duration::ZERO,
            miss_refresh_cooldown: Duration::ZERO,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            max_stale: Duration::from_secs(DEFAULT_MAX_STALE_SECONDS),
            miss_refresh_cooldown: Duration::from_secs(DEFAULT_MISS_REFRESH_COOLDOWN_SECONDS),
        }
    }
}

/// Cached key set with its fetch time.
#[derive(Clone)]
struct CachedKeySet {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
}

impl CachedKeySet {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }

    fn is_servable_stale(&self, now: Instant, policy: &CachePolicy) -> bool {
        now.saturating_duration_since(self.fetched_at) < policy.ttl.saturating_add(policy.max_stale)
    }
}

/// Key-set provider with caching, miss-triggered refresh and stale fallback.
///
/// Thread-safe; share it behind an `Arc`.
pub struct KeySetProvider {
    /// Underlying source of key sets.
    fetcher: Arc<dyn KeySetFetcher>,

    /// Freshness policy.
    policy: CachePolicy,

    /// Last successfully fetched set.
    cache: RwLock<Option<CachedKeySet>>,

    /// When an unknown `kid` last forced a refresh.
    last_miss_refresh: Mutex<Option<Instant>>,
}

impl KeySetProvider {
    /// Create a provider with the given fetcher and policy.
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, policy: CachePolicy) -> Self {
        Self {
            fetcher,
            policy,
            cache: RwLock::new(None),
            last_miss_refresh: Mutex::new(None),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Current key set, refetching if the cache is empty or expired.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's `KeySetError` when no servable key set exists.
    pub async fn key_set(&self) -> Result<Arc<SigningKeySet>, KeySetError> {
        self.key_set_for(None).await
    }

    /// Key set suitable for verifying a token signed with `kid`.
    ///
    /// A fresh cached set that lacks `kid` is refreshed once per cooldown, so a
    /// key rotated in at the issuer is picked up before the TTL runs out. The
    /// returned set may still lack `kid`; that is for the validator to reject.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's `KeySetError` when no servable key set exists.
    #[instrument(skip(self), name = "authorizer.jwks.key_set")]
    pub async fn key_set_for(&self, kid: Option<&str>) -> Result<Arc<SigningKeySet>, KeySetError> {
        let now = Instant::now();

        let previous = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.is_fresh(now, self.policy.ttl) => {
                    let missing = kid.filter(|kid| !cached.keys.contains(kid));
                    match missing {
                        Some(kid) if self.claim_miss_refresh(now).await => {
                            tracing::debug!(target: "authorizer.auth.jwks", kid = %kid, "Key not in cached JWKS, refreshing");
                            record_jwks_cache("miss");
                            Some(cached.clone())
                        }
                        _ => {
                            tracing::debug!(target: "authorizer.auth.jwks", "JWKS cache hit");
                            record_jwks_cache("hit");
                            return Ok(Arc::clone(&cached.keys));
                        }
                    }
                }
                Some(cached) => {
                    record_jwks_cache("expired");
                    Some(cached.clone())
                }
                None => {
                    record_jwks_cache("empty");
                    None
                }
            }
        };

        match self.refresh().await {
            Ok(keys) => Ok(keys),
            Err(e) => match previous {
                Some(cached) if cached.is_servable_stale(Instant::now(), &self.policy) => {
                    tracing::warn!(
                        target: "authorizer.auth.jwks",
                        error = %e,
                        age_secs = cached.fetched_at.elapsed().as_secs(),
                        "JWKS refresh failed, serving previously fetched keys"
                    );
                    record_jwks_cache("stale");
                    Ok(cached.keys)
                }
                _ => Err(e),
            },
        }
    }

    /// Fetch a new key set and replace the cache.
    #[instrument(skip(self), name = "authorizer.jwks.refresh")]
    pub async fn refresh(&self) -> Result<Arc<SigningKeySet>, KeySetError> {
        let start = Instant::now();
        let result = self.fetcher.fetch_key_set().await;
        let duration = start.elapsed();

        match result {
            Ok(key_set) => {
                record_jwks_fetch("success", duration);
                let keys = Arc::new(key_set);

                tracing::info!(
                    target: "authorizer.auth.jwks",
                    key_count = keys.len(),
                    "JWKS cache refreshed"
                );

                let mut cache = self.cache.write().await;
                *cache = Some(CachedKeySet {
                    keys: Arc::clone(&keys),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                record_jwks_fetch(e.kind(), duration);
                Err(e)
            }
        }
    }

    /// Returns true (and records the attempt) if a miss-triggered refresh is allowed now.
    async fn claim_miss_refresh(&self, now: Instant) -> bool {
        let mut last = self.last_miss_refresh.lock().await;
        let allowed = last.map_or(true, |at| {
            now.saturating_duration_since(at) >= self.policy.miss_refresh_cooldown
        });
        if allowed {
            *last = Some(now);
        }
        allowed
    }
}
