//! Request Authorizer Library
//!
//! Decides, per inbound request, whether the bearer token it carries entitles
//! the caller to invoke the requested resource:
//!
//! - Signing keys are fetched from the issuer's JWKS endpoint and cached
//! - Tokens are verified for signature, issuer, lifetime and client identity
//! - Accepted requests get a single-statement "Allow" policy document
//! - Every failure collapses to one Unauthorized outcome
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/authorizer.rs -> auth/*.rs, policy/
//! ```
//!
//! # Modules
//!
//! - `auth` - Key-set provider, token validator, validated claims
//! - `config` - Service configuration from environment
//! - `errors` - Unauthorized outcome and its HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `policy` - Authorization decision documents
//! - `routes` - Axum router setup
//! - `services` - Request orchestration

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod routes;
pub mod services;
