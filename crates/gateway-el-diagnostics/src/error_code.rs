//! Structured error codes
//!
//! Error code ranges:
//! - EL0001-EL0099: Parse errors (template and expression syntax)
//! - EL0100-EL0199: Security violations (whitelist denials)
//! - EL0200-EL0299: Evaluation errors (runtime)
//! - EL0300-EL0399: Deferred resolution errors
//! - EL0400-EL0499: Misuse and configuration errors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Static description for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_security_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_deferred_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_misuse_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EL{:04}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub description: &'static str,
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(
        3,
        ErrorInfo::new("Unterminated expression fragment")
            .with_help("Every expression prefix needs a matching suffix"),
    );
    map.insert(4, ErrorInfo::new("Invalid literal"));
    map.insert(5, ErrorInfo::new("Unterminated string literal"));
    map.insert(6, ErrorInfo::new("Empty expression"));
    map.insert(7, ErrorInfo::new("Invalid type name"));

    // Security violations (0100-0199)
    map.insert(
        100,
        ErrorInfo::new("Method not allowed")
            .with_help("Declare the method in the EL whitelist to allow it"),
    );
    map.insert(
        101,
        ErrorInfo::new("Constructor not allowed")
            .with_help("Declare the constructor in the EL whitelist to allow it"),
    );
    map.insert(102, ErrorInfo::new("Unknown type"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(
        201,
        ErrorInfo::new("Null navigation").with_help("Use '?.' to navigate through null values"),
    );
    map.insert(202, ErrorInfo::new("Division by zero"));
    map.insert(203, ErrorInfo::new("Invalid conversion"));
    map.insert(204, ErrorInfo::new("Invalid index"));
    map.insert(205, ErrorInfo::new("Unknown method"));
    map.insert(206, ErrorInfo::new("Unknown property"));
    map.insert(207, ErrorInfo::new("Unknown function"));
    map.insert(208, ErrorInfo::new("Invalid operand"));
    map.insert(209, ErrorInfo::new("Host invocation failed"));
    map.insert(210, ErrorInfo::new("Invalid regular expression"));

    // Deferred resolution errors (0300-0399)
    map.insert(300, ErrorInfo::new("Deferred source failed"));
    map.insert(301, ErrorInfo::new("Deferred value left unresolved"));

    // Misuse and configuration errors (0400-0499)
    map.insert(
        400,
        ErrorInfo::new("Blocking evaluation on a non-blocking dispatcher")
            .with_help("Use the asynchronous evaluate entry point instead"),
    );
    map.insert(401, ErrorInfo::new("Internal error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Invalid whitelist declaration"));

    map
});

// Parse errors
pub const EL0001: ErrorCode = ErrorCode::new(1);
pub const EL0002: ErrorCode = ErrorCode::new(2);
pub const EL0003: ErrorCode = ErrorCode::new(3);
pub const EL0004: ErrorCode = ErrorCode::new(4);
pub const EL0005: ErrorCode = ErrorCode::new(5);
pub const EL0006: ErrorCode = ErrorCode::new(6);
pub const EL0007: ErrorCode = ErrorCode::new(7);

// Security violations
pub const EL0100: ErrorCode = ErrorCode::new(100);
pub const EL0101: ErrorCode = ErrorCode::new(101);
pub const EL0102: ErrorCode = ErrorCode::new(102);

// Evaluation errors
pub const EL0200: ErrorCode = ErrorCode::new(200);
pub const EL0201: ErrorCode = ErrorCode::new(201);
pub const EL0202: ErrorCode = ErrorCode::new(202);
pub const EL0203: ErrorCode = ErrorCode::new(203);
pub const EL0204: ErrorCode = ErrorCode::new(204);
pub const EL0205: ErrorCode = ErrorCode::new(205);
pub const EL0206: ErrorCode = ErrorCode::new(206);
pub const EL0207: ErrorCode = ErrorCode::new(207);
pub const EL0208: ErrorCode = ErrorCode::new(208);
pub const EL0209: ErrorCode = ErrorCode::new(209);
pub const EL0210: ErrorCode = ErrorCode::new(210);

// Deferred resolution errors
pub const EL0300: ErrorCode = ErrorCode::new(300);
pub const EL0301: ErrorCode = ErrorCode::new(301);

// Misuse and configuration errors
pub const EL0400: ErrorCode = ErrorCode::new(400);
pub const EL0401: ErrorCode = ErrorCode::new(401);
pub const EL0402: ErrorCode = ErrorCode::new(402);
pub const EL0403: ErrorCode = ErrorCode::new(403);
