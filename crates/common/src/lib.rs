//! Common token primitives shared by the authorizer crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact JWS parsing (size limit, segments, key ID, numeric dates)
pub mod jwt;
