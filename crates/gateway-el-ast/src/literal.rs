//! Literal nodes

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    /// 32-bit integer
    Integer(i32),
    /// 64-bit integer, written with an `L` suffix
    Long(i64),
    Decimal(f64),
    String(String),
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Long(l) => write!(f, "{}L", l),
            // Debug keeps a fractional part on whole numbers ("2.0")
            Literal::Decimal(d) => write!(f, "{:?}", d),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_source_form() {
        assert_eq!(Literal::string("it's").to_string(), "'it''s'");
        assert_eq!(Literal::Long(7).to_string(), "7L");
        assert_eq!(Literal::Decimal(2.0).to_string(), "2.0");
        assert_eq!(Literal::Null.to_string(), "null");
    }
}
