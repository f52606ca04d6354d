//! procwalk common types, IDs, and errors.
//!
//! This crate provides foundational types shared across pw-core modules:
//! - Process identity
//! - The unified error type with codes and categories
//! - [`Outcome`], the hard-error / soft-error result carrier

pub mod error;
pub mod id;
pub mod outcome;

pub use error::{Error, ErrorCategory, Result};
pub use id::ProcessId;
pub use outcome::Outcome;
