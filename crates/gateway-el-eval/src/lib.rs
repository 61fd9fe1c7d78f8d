//! Secured evaluation for gateway expression templates
//!
//! This crate evaluates compiled templates against a per-request context:
//!
//! - **Whitelist**: method and constructor grants resolved against the host
//!   type catalog, in append or replace mode, swappable at runtime
//! - **Resolver**: property, index, method and constructor access, each host
//!   member checked against the whitelist before it runs
//! - **Operators**: arithmetic with checked overflow, comparisons, regular
//!   expression matching, short-circuit logic, ternary and Elvis
//! - **Cache**: compiled templates shared across requests with LRU and idle
//!   eviction
//!
//! # Example
//!
//! ```
//! use gateway_el_compiler::compile;
//! use gateway_el_eval::{EvaluationContext, Evaluator, WhitelistRegistry};
//! use gateway_el_types::Value;
//!
//! let whitelist = WhitelistRegistry::builtin();
//! let mut ctx = EvaluationContext::new();
//! ctx.set_variable("name", "gravitee");
//!
//! let compiled = compile("{#name.length()}").unwrap();
//! let value = Evaluator::new(&whitelist, &ctx)
//!     .evaluate_template(compiled.executable())
//!     .unwrap();
//! assert_eq!(value, Value::Integer(8));
//! ```
//!
//! Evaluation itself is synchronous. Deferred values flow through it
//! untouched; resolving them is up to the caller.

pub mod cache;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod operators;
pub mod resolver;
pub mod whitelist;

// Re-export main types
pub use cache::{CacheConfig, CacheStats, ExpressionCache};
pub use context::{EvaluationContext, Function};
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use resolver::SecuredResolver;
pub use whitelist::{Declaration, WhitelistConfig, WhitelistError, WhitelistMode, WhitelistRegistry};
