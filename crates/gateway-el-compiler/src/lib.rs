//! Template compilation for gateway expressions
//!
//! Compilation parses a template once and derives what evaluation needs
//! before it runs:
//! - the context variables the template reads, used to decide which deferred
//!   sources must be resolved first
//! - the deferred rewrite, which lifts calls on deferred holders into
//!   placeholder variables resolved asynchronously
//!
//! ```
//! use gateway_el_compiler::compile;
//!
//! let compiled = compile("{#request.headers['X-Id'][0]}").unwrap();
//! assert!(compiled.requires("request"));
//! ```

mod analyzer;
mod compiled;
mod rewriter;

pub use analyzer::{expression_variables, extract_variables, requires};
pub use compiled::{compile, CompiledExpression, Compiler};
pub use rewriter::{placeholder_name, rewrite, DeferredExpression, DeferredRewriter, Rewrite};
