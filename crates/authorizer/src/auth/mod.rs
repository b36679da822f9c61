//! Token authentication.
//!
//! - `jwks` - fetching and caching the issuer's signing keys
//! - `jwt` - validating a bearer token against those keys
//! - `claims` - what a validated token yields

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::ValidatedClaims;
pub use jwks::{
    CachePolicy, HttpKeySetFetcher, Jwk, JwksDocument, KeySetError, KeySetFetcher, KeySetProvider,
    SigningKeySet,
};
pub use jwt::{TokenError, TokenValidator};
