//! HTTP middleware.
//!
//! - `http_metrics` - request count and latency for every response

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
