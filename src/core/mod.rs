//! Core types shared by every stage of a closure build.
//!
//! Currently this is the error taxonomy ([`ClosureError`]) and the CLI-facing
//! [`ErrorContext`] conversion.

pub mod error;

pub use error::{ClosureError, ErrorContext, Result, user_friendly_error};
