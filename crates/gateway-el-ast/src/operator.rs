//! Operators with precedence information

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Precedence 1
    Or,

    // Precedence 2
    And,

    // Precedence 3
    Equal,
    NotEqual,

    // Precedence 4
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Regular expression match (`'abc' matches '[a-z]+'`)
    Matches,

    // Precedence 5
    /// Numeric addition or string concatenation
    Add,
    Subtract,

    // Precedence 6
    Multiply,
    Divide,
    Modulo,

    // Precedence 7, right-associative
    Power,
}

impl BinaryOp {
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal | Self::NotEqual => 3,
            Self::Less
            | Self::LessOrEqual
            | Self::Greater
            | Self::GreaterOrEqual
            | Self::Matches => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::Power => 7,
        }
    }

    pub const fn is_right_associative(&self) -> bool {
        matches!(self, Self::Power)
    }

    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::Or | Self::And)
    }

    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
        )
    }

    /// Canonical source spelling
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Matches => "matches",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
