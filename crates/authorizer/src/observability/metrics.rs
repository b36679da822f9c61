//! Metrics definitions for the authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authorizer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: 4 known paths plus "/other"
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: 2 values (allow, unauthorized)
//! - `reason`: bounded by the rejection variants
//! - `result`: 5 cache results (hit, miss, expired, empty, stale)
//!
//! No token content, subject or resource identifier is ever used as a label.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Decisions are CPU-bound on a warm cache
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_decision".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set decision buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authorizer_http_requests_total`, `authorizer_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures framework-level responses too (404, 405, 408 from the timeout layer).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authorizer_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/authorize" => "/authorize",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record one authorization decision.
///
/// Metric: `authorizer_decisions_total`, `authorizer_decision_duration_seconds`
/// Labels: `outcome` ("allow" | "unauthorized"), `reason` (rejection kind or "none")
pub fn record_decision(outcome: &'static str, reason: &'static str, duration: Duration) {
    histogram!("authorizer_decision_duration_seconds",
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_decisions_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// Key Set Metrics
// ============================================================================

/// Record one key-set fetch from the issuer.
///
/// Metric: `authorizer_jwks_fetch_total`, `authorizer_jwks_fetch_duration_seconds`
/// Labels: `status` ("success" | "network_failure" | "malformed_key_set")
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("authorizer_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("authorizer_jwks_fetch_total",
        "status" => status
    )
    .increment(1);
}

/// Record a key-set cache lookup result.
///
/// Metric: `authorizer_jwks_cache_total`
/// Labels: `result` ("hit" | "miss" | "expired" | "empty" | "stale")
pub fn record_jwks_cache(result: &'static str) {
    counter!("authorizer_jwks_cache_total",
        "result" => result
    )
    .increment(1);
}
