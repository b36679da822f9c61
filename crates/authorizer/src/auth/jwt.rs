//! Token validation against the issuer's signing keys.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Structure - size limit, three base64url segments, JSON header and claims
//! 2. Signature - key resolved by `kid`, algorithm compatible with the key, verified
//! 3. Issuer - `iss` equals the trusted issuer exactly
//! 4. Lifetime - rejected once `now >= exp`, or while `now < nbf`
//! 5. Client - `client_id` equals the trusted client exactly
//!
//! The audience claim is not checked; client identity is checked instead.
//!
//! # Security
//!
//! - Only asymmetric algorithms are accepted (RSA, ECDSA, EdDSA)
//! - The header `alg` must agree with the key's `kty`, curve and declared `alg`
//! - No clock leeway on `exp`
//! - Every failure kind produces the same client-facing outcome

use crate::auth::claims::ValidatedClaims;
use crate::auth::jwks::{Jwk, SigningKeySet};
use common::jwt::{decode_ed25519_public_key_jwk, numeric_date, parse_compact, CompactToken};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Reasons a token is rejected.
///
/// All variants collapse to one Unauthorized outcome; they exist for logs
/// and metrics only.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token issuer is not trusted")]
    IssuerMismatch,

    #[error("token is expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token client is not trusted")]
    ClientIdMismatch,

    #[error("unexpected token validation failure")]
    Unexpected,
}

impl TokenError {
    /// Bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::IssuerMismatch => "issuer_mismatch",
            TokenError::Expired => "expired",
            TokenError::NotYetValid => "not_yet_valid",
            TokenError::ClientIdMismatch => "client_id_mismatch",
            TokenError::Unexpected => "unexpected",
        }
    }
}

/// Validates bearer tokens for one trusted issuer and one trusted client.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    /// Exact `iss` value accepted.
    trusted_issuer: String,

    /// Exact `client_id` value accepted.
    trusted_client_id: String,
}

impl TokenValidator {
    /// Create a validator.
    ///
    /// # Arguments
    ///
    /// * `trusted_issuer` - the only accepted `iss` value
    /// * `trusted_client_id` - the only accepted `client_id` value
    pub fn new(trusted_issuer: impl Into<String>, trusted_client_id: impl Into<String>) -> Self {
        Self {
            trusted_issuer: trusted_issuer.into(),
            trusted_client_id: trusted_client_id.into(),
        }
    }

    /// Validate a token against `key_set` at the current time.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a `TokenError`.
    pub fn validate(
        &self,
        token: &str,
        key_set: &SigningKeySet,
    ) -> Result<ValidatedClaims, TokenError> {
        self.validate_at(token, key_set, chrono::Utc::now().timestamp())
    }

    /// Validate a token against `key_set` at an explicit `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a `TokenError`.
    pub fn validate_at(
        &self,
        token: &str,
        key_set: &SigningKeySet,
        now: i64,
    ) -> Result<ValidatedClaims, TokenError> {
        // 1. Structure
        let parsed = parse_compact(token).map_err(|e| {
            tracing::debug!(target: "authorizer.auth.jwt", error = ?e, "Token structure rejected");
            TokenError::Malformed
        })?;

        // 2. Signature
        let claims = verify_signature(token, &parsed, key_set)?;

        // 3-5. Claims
        let validated = self.check_claims(&claims, now)?;

        tracing::debug!(target: "authorizer.auth.jwt", "Token validated successfully");
        Ok(validated)
    }

    fn check_claims(
        &self,
        claims: &Map<String, Value>,
        now: i64,
    ) -> Result<ValidatedClaims, TokenError> {
        let issuer = claims.get("iss").and_then(Value::as_str);
        if issuer != Some(self.trusted_issuer.as_str()) {
            tracing::debug!(target: "authorizer.auth.jwt", iss = ?issuer, "Token issuer rejected");
            return Err(TokenError::IssuerMismatch);
        }

        let expires_at = claims.get("exp").and_then(numeric_date).ok_or_else(|| {
            tracing::debug!(target: "authorizer.auth.jwt", "Token has no usable exp claim");
            TokenError::Expired
        })?;
        if now >= expires_at {
            tracing::debug!(target: "authorizer.auth.jwt", exp = expires_at, now = now, "Token expired");
            return Err(TokenError::Expired);
        }

        if let Some(raw_nbf) = claims.get("nbf") {
            match numeric_date(raw_nbf) {
                Some(not_before) if now >= not_before => {}
                not_before => {
                    tracing::debug!(target: "authorizer.auth.jwt", nbf = ?not_before, now = now, "Token not yet valid");
                    return Err(TokenError::NotYetValid);
                }
            }
        }

        // Audience is deliberately not checked.

        let client_id = claims.get("client_id").and_then(Value::as_str);
        if client_id != Some(self.trusted_client_id.as_str()) {
            tracing::debug!(target: "authorizer.auth.jwt", client_id = ?client_id, "Token client rejected");
            return Err(TokenError::ClientIdMismatch);
        }

        Ok(ValidatedClaims {
            issuer: self.trusted_issuer.clone(),
            expires_at,
            client_id: self.trusted_client_id.clone(),
            subject: claims
                .get("sub")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    }
}

/// Resolve the key, check algorithm compatibility and verify the signature.
///
/// Returns the claim set as decoded by the verifier.
fn verify_signature(
    token: &str,
    parsed: &CompactToken,
    key_set: &SigningKeySet,
) -> Result<Map<String, Value>, TokenError> {
    let kid = parsed.kid().ok_or_else(|| {
        tracing::debug!(target: "authorizer.auth.jwt", "Token header has no kid");
        TokenError::SignatureInvalid
    })?;

    let jwk = key_set.get(kid).ok_or_else(|| {
        tracing::debug!(target: "authorizer.auth.jwt", kid = %kid, "Token kid not in key set");
        TokenError::SignatureInvalid
    })?;

    let algorithm = resolve_algorithm(parsed.alg(), jwk)?;
    let decoding_key = decoding_key(jwk)?;

    // Signature only; claim checks are done by the validator in its own order
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data =
        decode::<Map<String, Value>>(token, &decoding_key, &validation).map_err(|e| {
            let mapped = map_decode_error(e.kind());
            tracing::debug!(target: "authorizer.auth.jwt", error = %e, kid = %kid, reason = mapped.kind(), "Token verification failed");
            mapped
        })?;

    Ok(token_data.claims)
}

/// Pick the verification algorithm from the header, checked against the key.
fn resolve_algorithm(header_alg: Option<&str>, jwk: &Jwk) -> Result<Algorithm, TokenError> {
    let name = header_alg.ok_or_else(|| {
        tracing::debug!(target: "authorizer.auth.jwt", "Token header has no alg");
        TokenError::SignatureInvalid
    })?;

    let algorithm = Algorithm::from_str(name).map_err(|_| {
        tracing::debug!(target: "authorizer.auth.jwt", alg = %name, "Unsupported token algorithm");
        TokenError::SignatureInvalid
    })?;

    if let Some(declared) = jwk.alg.as_deref() {
        if declared != name {
            tracing::warn!(target: "authorizer.auth.jwt", alg = %name, key_alg = %declared, "Token algorithm does not match key");
            return Err(TokenError::SignatureInvalid);
        }
    }

    let curve = jwk.crv.as_deref();
    let compatible = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => jwk.kty == "RSA",
        Algorithm::ES256 => jwk.kty == "EC" && curve == Some("P-256"),
        Algorithm::ES384 => jwk.kty == "EC" && curve == Some("P-384"),
        Algorithm::EdDSA => jwk.kty == "OKP" && curve.map_or(true, |c| c == "Ed25519"),
        // Symmetric algorithms cannot be verified with published keys
        _ => false,
    };

    if !compatible {
        tracing::warn!(target: "authorizer.auth.jwt", alg = %name, kty = %jwk.kty, "Token algorithm incompatible with key type");
        return Err(TokenError::SignatureInvalid);
    }

    Ok(algorithm)
}

/// Build a verification key from JWK key material.
fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, TokenError> {
    let invalid = |what: &str| {
        tracing::error!(target: "authorizer.auth.jwt", kid = ?jwk.kid, kty = %jwk.kty, problem = %what, "Unusable JWK");
        TokenError::SignatureInvalid
    };

    match jwk.kty.as_str() {
        "RSA" => {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                return Err(invalid("missing n or e"));
            };
            DecodingKey::from_rsa_components(n, e).map_err(|_| invalid("bad RSA components"))
        }
        "EC" => {
            let (Some(x), Some(y)) = (jwk.x.as_deref(), jwk.y.as_deref()) else {
                return Err(invalid("missing x or y"));
            };
            DecodingKey::from_ec_components(x, y).map_err(|_| invalid("bad EC components"))
        }
        "OKP" => {
            let x = jwk.x.as_deref().ok_or_else(|| invalid("missing x"))?;
            let public_key_bytes =
                decode_ed25519_public_key_jwk(x).map_err(|_| invalid("bad x encoding"))?;
            Ok(DecodingKey::from_ed_der(&public_key_bytes))
        }
        _ => Err(invalid("unsupported kty")),
    }
}

/// Map verifier errors onto the rejection taxonomy.
fn map_decode_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_) => TokenError::SignatureInvalid,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed
        }
        _ => TokenError::Unexpected,
    }
}
