//! Builder patterns for test data construction
//!
//! Provides fluent APIs for token claim sets and authorizer request events.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer trusted by test configurations.
pub const TEST_ISSUER: &str = "https://issuer.test.example/us-east-1_TestPool";

/// Client identifier trusted by test configurations.
pub const TEST_CLIENT_ID: &str = "test-client-id";

/// Builder for token claim sets.
///
/// Defaults to claims the test configuration accepts: trusted issuer and
/// client, `exp` one hour out.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .client_id("someone-else")
///     .expires_in(-60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("client_id".to_string(), json!(TEST_CLIENT_ID));
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("token_use".to_string(), json!("access"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    pub fn client_id(self, client_id: &str) -> Self {
        self.claim("client_id", json!(client_id))
    }

    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Set expiration to an absolute Unix timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", json!(timestamp))
    }

    pub fn not_before(self, timestamp: i64) -> Self {
        self.claim("nbf", json!(timestamp))
    }

    /// Set any claim, replacing an existing value
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Request event carrying `authorization` as its `Authorization` header.
pub fn authorize_request_event(authorization: &str, method_arn: &str) -> Value {
    json!({
        "type": "REQUEST",
        "methodArn": method_arn,
        "headers": {
            "Authorization": authorization
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_trusted_and_unexpired() {
        let claims = TestTokenBuilder::new().build();

        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["client_id"], TEST_CLIENT_ID);
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
        assert!(claims.get("aud").is_none());
    }

    #[test]
    fn test_overrides_and_removal() {
        let claims = TestTokenBuilder::new()
            .issuer("https://other")
            .audience("aud-1")
            .expires_at(42)
            .without_claim("sub")
            .build();

        assert_eq!(claims["iss"], "https://other");
        assert_eq!(claims["aud"], "aud-1");
        assert_eq!(claims["exp"], 42);
        assert!(claims.get("sub").is_none());
    }

    #[test]
    fn test_request_event_shape() {
        let event = authorize_request_event("Bearer t", "arn:x");

        assert_eq!(event["headers"]["Authorization"], "Bearer t");
        assert_eq!(event["methodArn"], "arn:x");
    }
}
