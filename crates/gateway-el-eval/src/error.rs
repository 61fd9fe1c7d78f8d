//! Evaluation errors

use gateway_el_diagnostics::{
    ElError, ErrorCode, EL0100, EL0101, EL0102, EL0201, EL0202, EL0204, EL0205, EL0206, EL0207,
    EL0208, EL0301,
};
use gateway_el_types::{CoercionError, HostError};
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while evaluating a compiled template
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Navigation through null without `?.`
    #[error("cannot access '{member}' on null")]
    NullNavigation { member: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: String },

    #[error("invalid operand for '{operator}': {message}")]
    InvalidOperand { operator: String, message: String },

    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("cannot index {type_name} with {index}")]
    InvalidIndex { type_name: String, index: String },

    #[error("property '{property}' cannot be read on {type_name}")]
    UnknownProperty { property: String, type_name: String },

    #[error("no method {type_name}.{method}({arguments})")]
    UnknownMethod {
        type_name: String,
        method: String,
        arguments: String,
    },

    #[error("no constructor {type_name}({arguments})")]
    UnknownConstructor { type_name: String, arguments: String },

    #[error("unknown function '#{name}'")]
    UnknownFunction { name: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// Method exists but is not whitelisted
    #[error("method {member} is not allowed")]
    MethodNotAllowed { member: String },

    /// Constructor exists but is not whitelisted
    #[error("constructor {member} is not allowed")]
    ConstructorNotAllowed { member: String },

    /// A deferred value reached an operation before it was resolved
    #[error("deferred value used by {operation} before resolution")]
    UnresolvedDeferred { operation: String },

    #[error(transparent)]
    Conversion(#[from] CoercionError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    El(#[from] ElError),
}

impl EvalError {
    pub fn null_navigation(member: impl Into<String>) -> Self {
        Self::NullNavigation {
            member: member.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }

    pub fn unknown_property(property: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
            type_name: type_name.into(),
        }
    }

    pub fn unresolved(operation: impl Into<String>) -> Self {
        Self::UnresolvedDeferred {
            operation: operation.into(),
        }
    }

    /// Whether the whitelist rejected the operation
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::MethodNotAllowed { .. } | Self::ConstructorNotAllowed { .. } | Self::UnknownType { .. }
        )
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::NullNavigation { .. } => EL0201,
            Self::DivisionByZero => EL0202,
            Self::IndexOutOfBounds { .. } | Self::InvalidIndex { .. } => EL0204,
            Self::UnknownProperty { .. } => EL0206,
            Self::UnknownMethod { .. } | Self::UnknownConstructor { .. } => EL0205,
            Self::UnknownFunction { .. } => EL0207,
            Self::UnresolvedDeferred { .. } => EL0301,
            _ => EL0208,
        }
    }
}

impl From<EvalError> for ElError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::MethodNotAllowed { ref member } => {
                let member = member.clone();
                ElError::security(EL0100, err.to_string(), member)
            }
            EvalError::ConstructorNotAllowed { ref member } => {
                let member = member.clone();
                ElError::security(EL0101, err.to_string(), member)
            }
            EvalError::UnknownType { ref name } => {
                let name = name.clone();
                ElError::security(EL0102, err.to_string(), name)
            }
            EvalError::Conversion(inner) => inner.into(),
            EvalError::Host(inner) => inner.into(),
            EvalError::El(inner) => inner,
            other => ElError::evaluation(other.code(), other.to_string()),
        }
    }
}
