//! Host type catalog for gateway expressions
//!
//! This crate provides:
//! - Type, method and constructor descriptors
//! - The [`TypeRegistry`] used for member lookup and overload selection
//! - Built-in types with native method implementations
//! - The bundled built-in whitelist

pub mod builtins;
pub mod descriptor;
pub mod pattern;
pub mod registry;

pub use descriptor::*;
pub use registry::*;

/// Whitelist declarations shipped with the engine
pub const BUILTIN_WHITELIST: &str = include_str!("../resources/whitelist");
