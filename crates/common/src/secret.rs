//! Secret types for keeping bearer tokens out of logs.
//!
//! Re-exports the [`secrecy`] types used to carry credentials through the
//! authorizer. `SecretString` implements `Debug` with redaction, so a struct
//! that derives `Debug` and holds a token stays safe to pass to `tracing`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct InboundCredential {
//!     scheme: &'static str,
//!     token: SecretString,
//! }
//!
//! let credential = InboundCredential {
//!     scheme: "Bearer",
//!     token: SecretString::from("eyJhbGciOiJSUzI1NiJ9.e30.c2ln"),
//! };
//!
//! let debug = format!("{credential:?}");
//! assert!(!debug.contains("eyJhbGciOiJSUzI1NiJ9"));
//!
//! // Reading the value requires an explicit call.
//! assert!(credential.token.expose_secret().starts_with("eyJ"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
