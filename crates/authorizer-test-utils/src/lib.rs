//! # Authorizer Test Utilities
//!
//! Shared test utilities for the request authorizer:
//! - Deterministic signing keys (Ed25519 from a seed, a fixed RSA key)
//! - `TestTokenBuilder` for claim sets accepted by the test configuration
//! - `MockIssuer`, a wiremock JWKS endpoint
//! - `TestAuthorizerServer`, a real server bound to a random port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = RsaTestKey::new("key-1");
//!     let issuer = MockIssuer::start().await;
//!     issuer.serve_keys(&[key.jwk_json()]).await;
//!
//!     let server = TestAuthorizerServer::spawn(&issuer.jwks_url()).await?;
//!     let token = key.sign_token(&TestTokenBuilder::new().build());
//!
//!     let response = server.authorize(&format!("Bearer {token}"), "arn:resource").await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_issuer;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use mock_issuer::*;
pub use server_harness::*;
pub use token_builders::*;
