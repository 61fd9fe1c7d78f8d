//! Error taxonomy for template compilation and evaluation

use crate::{EL0300, EL0400, ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A reportable message with location and help text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location: None,
            help: code.info().help.map(str::to_string),
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Main error type of the expression language
#[derive(Debug, Clone, Error)]
pub enum ElError {
    /// Malformed template or expression. Never cached.
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        expression: String,
        location: Option<SourceLocation>,
    },

    /// Method or constructor rejected by the whitelist
    #[error("{code}: {message}")]
    Security {
        code: ErrorCode,
        message: String,
        /// Offending member, e.g. `java.lang.System.getenv()`
        member: String,
        expression: Option<String>,
    },

    /// An upstream deferred source failed before evaluation started
    #[error("{code}: deferred variable '{name}' failed: {message}")]
    DeferredResolution {
        code: ErrorCode,
        name: String,
        message: String,
    },

    /// API used from the wrong execution context
    #[error("{code}: {message}")]
    Misuse { code: ErrorCode, message: String },

    #[error("{code}: {message}")]
    Evaluation {
        code: ErrorCode,
        message: String,
        expression: Option<String>,
    },

    #[error("{code}: {message}")]
    Configuration { code: ErrorCode, message: String },
}

impl ElError {
    pub fn parse(code: ErrorCode, message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            location: None,
        }
    }

    /// Parse error positioned at `span` of `expression`
    pub fn parse_at(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
        span: Span,
    ) -> Self {
        let expression = expression.into();
        let location = SourceLocation::from_span(span, &expression);
        Self::Parse {
            code,
            message: message.into(),
            expression,
            location: Some(location),
        }
    }

    pub fn security(code: ErrorCode, message: impl Into<String>, member: impl Into<String>) -> Self {
        Self::Security {
            code,
            message: message.into(),
            member: member.into(),
            expression: None,
        }
    }

    pub fn deferred(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeferredResolution {
            code: EL0300,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse {
            code: EL0400,
            message: message.into(),
        }
    }

    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
            expression: None,
        }
    }

    pub fn configuration(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
        }
    }

    /// Attach the expression text that was being evaluated.
    ///
    /// Keeps the innermost expression when one is already attached.
    pub fn with_expression(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::Security { expression, .. } | Self::Evaluation { expression, .. } => {
                if expression.is_none() {
                    *expression = Some(text.into());
                }
            }
            _ => {}
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. }
            | Self::Security { code, .. }
            | Self::DeferredResolution { code, .. }
            | Self::Misuse { code, .. }
            | Self::Evaluation { code, .. }
            | Self::Configuration { code, .. } => *code,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// Expression text the error is attached to, if any
    pub fn expression(&self) -> Option<&str> {
        match self {
            Self::Parse { expression, .. } => Some(expression),
            Self::Security { expression, .. } | Self::Evaluation { expression, .. } => {
                expression.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::Security { .. })
    }

    pub fn is_deferred_resolution(&self) -> bool {
        matches!(self, Self::DeferredResolution { .. })
    }

    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse { .. })
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse {
                code,
                message,
                location,
                ..
            } => {
                let diag = Diagnostic::error(*code, message.clone());
                match location {
                    Some(loc) => diag.with_location(loc.clone()),
                    None => diag,
                }
            }
            Self::Security { code, message, member, .. } => {
                Diagnostic::error(*code, format!("{} ({})", message, member))
            }
            Self::Evaluation { code, message, .. } => Diagnostic::error(*code, message.clone()),
            Self::DeferredResolution { code, .. }
            | Self::Misuse { code, .. }
            | Self::Configuration { code, .. } => Diagnostic::error(*code, self.to_string()),
        }
    }
}
