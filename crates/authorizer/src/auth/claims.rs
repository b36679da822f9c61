//! Verified claims of an accepted token.
//!
//! `ValidatedClaims` is only constructed by the token validator after the
//! signature and every claim check have passed. The `sub` field is redacted
//! in Debug output.

use std::fmt;

/// Claims of a token that passed validation.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedClaims {
    /// Issuer (`iss`), equal to the trusted issuer.
    pub issuer: String,

    /// Expiration timestamp (`exp`, Unix epoch seconds).
    pub expires_at: i64,

    /// Client identity (`client_id`), equal to the trusted client.
    pub client_id: String,

    /// Subject (`sub`), if present - redacted in Debug output.
    pub subject: Option<String>,
}

impl fmt::Debug for ValidatedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedClaims")
            .field("issuer", &self.issuer)
            .field("expires_at", &self.expires_at)
            .field("client_id", &self.client_id)
            .field("subject", &self.subject.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(subject: Option<&str>) -> ValidatedClaims {
        ValidatedClaims {
            issuer: "https://issuer.example.com".to_string(),
            expires_at: 1_900_000_000,
            client_id: "client-123".to_string(),
            subject: subject.map(ToString::to_string),
        }
    }

    #[test]
    fn test_claims_debug_redacts_subject() {
        let debug_str = format!("{:?}", claims(Some("secret-user-id")));

        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("client-123"));
    }

    #[test]
    fn test_claims_debug_without_subject() {
        let debug_str = format!("{:?}", claims(None));
        assert!(debug_str.contains("subject: None"));
    }
}
