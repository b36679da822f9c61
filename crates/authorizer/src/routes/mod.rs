//! HTTP routes for the authorizer.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::Authorizer;
use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Request authorizer (owns the key-set cache).
    pub authorizer: Arc<Authorizer>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/authorize` - Authorization decision for one request event
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe (signing keys obtainable)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - Request timeout from `config.request_timeout`
/// - HTTP metrics middleware
///
/// A timed-out `/authorize` call answers with the usual 401 rejection. The
/// operational routes answer 408.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.request_timeout;

    let authorize_route = post(handlers::authorize).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handlers::authorize_timeout))
            .layer(tower::timeout::TimeoutLayer::new(request_timeout)),
    );

    let probe_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .layer(TimeoutLayer::new(request_timeout));

    let app_routes = Router::new()
        .route("/authorize", authorize_route)
        .merge(probe_routes)
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. Per-route timeouts (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
