//! Compact JWS parsing shared by the authorizer crates.
//!
//! This module provides the structural half of token validation:
//! - Size limits for DoS prevention
//! - Splitting a compact token into header, claims and signature segments
//! - Key ID extraction from the protected header
//! - Lenient NumericDate reading for `exp`/`nbf`
//! - base64url decoding of JWK key material
//!
//! Nothing here verifies a signature. A [`CompactToken`] is untrusted until the
//! caller has checked it against a signing key.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, parse_compact};
//!
//! // Key ID for the JWKS lookup
//! let kid = extract_kid(token)?;
//!
//! // Full structural parse (header and claims are JSON objects)
//! let parsed = parse_compact(token)?;
//! let alg = parsed.alg();
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical identity-provider access tokens are 800-1500
/// bytes; 8KB leaves room for large claim sets.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors from structural token parsing.
///
/// Display strings are deliberately identical so they never leak which check
/// failed; the variant itself is for logs and metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid compact JWS structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing a usable `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,
}

// =============================================================================
// Parsed token
// =============================================================================

/// A compact JWS whose three segments decoded cleanly.
///
/// Header and claims were JSON objects and the signature segment was valid
/// base64url. Only the protected header is kept.
#[derive(Debug, Clone)]
pub struct CompactToken {
    header: Map<String, Value>,
}

impl CompactToken {
    /// The `alg` header, if it is a string.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The `kid` header, if it is a non-empty string.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split and decode a compact JWS (`header.claims.signature`).
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - wrong segment count, bad base64url, or a header/claims
///   segment that is not a JSON object
pub fn parse_compact(token: &str) -> Result<CompactToken, JwtValidationError> {
    check_size(token)?;

    let mut segments = token.split('.');
    let (Some(header_part), Some(claims_part), Some(signature_part), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header = decode_object(header_part, "header")?;
    decode_object(claims_part, "claims")?;

    if signature_part.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty signature segment");
        return Err(JwtValidationError::MalformedToken);
    }
    URL_SAFE_NO_PAD.decode(signature_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT signature base64");
        JwtValidationError::MalformedToken
    })?;

    Ok(CompactToken { header })
}

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// Only the header segment is decoded, so this is cheap enough to run before
/// deciding whether the signing keys need refreshing.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds the size limit
/// - `MalformedToken` - not three segments, bad base64url, or invalid JSON header
/// - `MissingKid` - header has no `kid`, or it is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    check_size(token)?;

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header = decode_object(header_part, "header")?;

    header
        .get("kid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Read a NumericDate claim value (seconds since the epoch).
///
/// Integers are taken as-is and floats are truncated toward zero. Anything
/// else, including non-finite floats, yields `None`.
#[must_use]
pub fn numeric_date(value: &Value) -> Option<i64> {
    if let Some(seconds) = value.as_i64() {
        return Some(seconds);
    }
    let seconds = value.as_f64()?;
    if !seconds.is_finite() {
        return None;
    }
    // Safe cast: out-of-range floats saturate, which still compares correctly
    #[allow(clippy::cast_possible_truncation)]
    Some(seconds.trunc() as i64)
}

/// Decode an Ed25519 public key from the JWK `x` field (base64url).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not valid base64url.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

fn check_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

fn decode_object(segment: &str, name: &'static str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            tracing::debug!(target: "common.jwt", segment = name, "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
        Err(e) => {
            tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JWT segment JSON");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
