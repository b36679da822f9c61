//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that signing keys can be obtained

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does not check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 once a key set can be obtained through the provider (cached,
/// freshly fetched or stale within its window), 503 otherwise. The error text
/// is generic; the actual failure is logged.
#[tracing::instrument(skip_all, name = "authorizer.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.authorizer.key_sets().key_set().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                signing_keys: Some("available"),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "authorizer.handler", error = %e, "Readiness check failed: signing keys unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    signing_keys: Some("unavailable"),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
