//! Observability for the authorizer.
//!
//! Metric definitions and recording helpers. Logging goes through `tracing`
//! directly at each call site.

pub mod metrics;
