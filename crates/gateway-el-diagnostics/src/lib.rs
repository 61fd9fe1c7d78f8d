//! Diagnostics and error handling for the gateway expression language
//!
//! This crate provides the error infrastructure shared by every stage of the
//! template pipeline: error codes, source locations and diagnostic reporting.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for expression language operations
pub type Result<T> = std::result::Result<T, ElError>;
