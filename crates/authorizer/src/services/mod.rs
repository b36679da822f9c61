//! Service layer.
//!
//! - `authorizer` - turns a request event into a decision or a rejection

pub mod authorizer;

pub use authorizer::Authorizer;
