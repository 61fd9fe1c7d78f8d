//! Host objects: values backed by the embedding application

use crate::Value;
use gateway_el_diagnostics::{ElError, EL0205, EL0209};
use std::fmt;
use thiserror::Error;

/// Failure raised by a host method implementation
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("no method '{method}' taking {arity} argument(s) on {type_name}")]
    NoSuchMethod {
        type_name: String,
        method: String,
        arity: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Failed(String),

    /// Propagated expression error (e.g. from a nested deferred value)
    #[error(transparent)]
    El(#[from] ElError),
}

impl HostError {
    pub fn no_such_method(type_name: impl Into<String>, method: impl Into<String>, arity: usize) -> Self {
        Self::NoSuchMethod {
            type_name: type_name.into(),
            method: method.into(),
            arity,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<HostError> for ElError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::El(inner) => inner,
            HostError::NoSuchMethod { .. } => ElError::evaluation(EL0205, err.to_string()),
            other => ElError::evaluation(EL0209, other.to_string()),
        }
    }
}

/// An object owned by the host application and exposed to expressions.
///
/// Method calls on host objects pass the whitelist check for
/// [`type_name`](HostObject::type_name) before [`invoke`](HostObject::invoke)
/// is reached; the object itself never needs to enforce access rules.
pub trait HostObject: Send + Sync {
    /// Fully qualified type name used for whitelist lookups
    fn type_name(&self) -> &str;

    /// Read-only property access; `None` reads as null
    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        Err(HostError::no_such_method(self.type_name(), method, args.len()))
    }

    /// String form used in templates and JSON output
    fn display(&self) -> String {
        self.type_name().to_string()
    }
}

impl fmt::Debug for dyn HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.type_name())
    }
}
