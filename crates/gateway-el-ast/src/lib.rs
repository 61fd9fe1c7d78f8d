//! Abstract syntax tree for gateway expression templates
//!
//! A [`Template`] is an ordered list of literal and expression segments. Each
//! expression is a closed tree of [`Expression`] variants; navigation chains such
//! as `#request.headers['X'][0]` are kept flat in a [`CompoundExpr`] so analysis
//! passes can walk them left to right.
//!
//! Every node implements `Display`, printing source text that parses back to an
//! equivalent tree. The compiler relies on this to name and re-evaluate extracted
//! subexpressions.

mod expression;
mod literal;
mod operator;
mod template;

pub use expression::*;
pub use literal::*;
pub use operator::*;
pub use template::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node with source span information
pub type Spanned<T> = gateway_el_diagnostics::Spanned<T>;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Spanned<Expression>>;

/// Call arguments
pub type Arguments = Vec<Spanned<Expression>>;

/// A plain identifier (variable, property, method or function name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fully qualified host type name, e.g. `java.lang.Math`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName {
    pub name: String,
}

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Last dotted segment (`Math` for `java.lang.Math`)
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
