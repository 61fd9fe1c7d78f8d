//! Sandboxed expression templates for API gateways
//!
//! Templates mix literal text with `{...}` fragments evaluated against a
//! per-request context:
//!
//! ```text
//! Bearer {#request.headers['Authorization'][0]}
//! {#request.params['limit'] ?: '10'}
//! {T(java.util.Base64).getEncoder().encodeToString(#request.content.getBytes())}
//! ```
//!
//! This crate ties the pipeline together:
//!
//! - Compiled templates are cached by text, shared across requests
//! - Deferred sources are resolved only when a template reads them, and
//!   concurrently
//! - Calls on deferred holders are lifted out and resolved before the rest of
//!   the template runs
//! - Method and constructor calls pass a whitelist
//!
//! # Example
//!
//! ```
//! use gateway_el::{TemplateEngine, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gateway_el::Result<()> {
//! let mut engine = TemplateEngine::new();
//! engine.set_variable("api", "echo");
//! engine.set_deferred_single("owner", async { Ok(Value::from("alice")) });
//!
//! let text: Option<String> = engine.evaluate("{#api} is owned by {#owner}").await?;
//! assert_eq!(text.as_deref(), Some("echo is owned by alice"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod provider;

// Re-export internal crates
pub use gateway_el_ast as ast;
pub use gateway_el_compiler as compiler;
pub use gateway_el_diagnostics as diagnostics;
pub use gateway_el_eval as eval;
pub use gateway_el_model as model;
pub use gateway_el_parser as parser;
pub use gateway_el_types as types;

// Convenience re-exports
pub use config::EngineConfig;
pub use engine::TemplateEngine;
pub use provider::{ProviderRegistry, TemplateVariableProvider};

pub use gateway_el_compiler::{compile, CompiledExpression};
pub use gateway_el_diagnostics::{ElError, ErrorCode, Result};
pub use gateway_el_eval::{
    CacheConfig, CacheStats, EvaluationContext, ExpressionCache, WhitelistConfig, WhitelistMode,
    WhitelistRegistry,
};
pub use gateway_el_model::{TypeDescriptor, TypeRegistry};
pub use gateway_el_parser::TemplateSyntax;
pub use gateway_el_types::{DeferredValue, FromValue, Headers, HostError, HostObject, Value};
