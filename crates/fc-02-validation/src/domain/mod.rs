//! Validation domain: refusal reasons and the stateless rules.

pub mod errors;
pub mod rules;

pub use errors::{RejectionKind, Result, ValidationError};
