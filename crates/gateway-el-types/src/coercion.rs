//! Scalar coercion and typed result extraction

use crate::Value;
use gateway_el_diagnostics::{ElError, EL0203};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("cannot convert {from} to {to}")]
    Unsupported { from: String, to: &'static str },

    #[error("cannot convert '{value}' to {to}")]
    InvalidFormat { value: String, to: &'static str },

    #[error("value {value} is out of range for {to}")]
    OutOfRange { value: String, to: &'static str },
}

impl CoercionError {
    fn unsupported(value: &Value, to: &'static str) -> Self {
        Self::Unsupported {
            from: value.type_name().to_string(),
            to,
        }
    }

    fn invalid(value: &str, to: &'static str) -> Self {
        Self::InvalidFormat {
            value: value.to_string(),
            to,
        }
    }
}

impl From<CoercionError> for ElError {
    fn from(err: CoercionError) -> Self {
        ElError::evaluation(EL0203, err.to_string())
    }
}

/// Conversion from an evaluation result into a Rust type
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CoercionError>;
}

impl Value {
    /// Convert into `T` using the scalar coercion rules
    pub fn coerce<T: FromValue>(self) -> Result<T, CoercionError> {
        T::from_value(self)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(true),
                "false" | "off" | "no" | "0" => Ok(false),
                _ => Err(CoercionError::invalid(s, "boolean")),
            },
            other => Err(CoercionError::unsupported(&other, "boolean")),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Integer(i) => Ok(i64::from(i)),
            Value::Long(l) => Ok(l),
            Value::Decimal(d) if d.is_finite() && d.abs() < 9.223_372_036_854_776e18 => {
                Ok(d.trunc() as i64)
            }
            Value::Decimal(d) => Err(CoercionError::OutOfRange {
                value: d.to_string(),
                to: "long",
            }),
            Value::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CoercionError::invalid(s, "long")),
            other => Err(CoercionError::unsupported(&other, "long")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        let wide = match value {
            Value::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CoercionError::invalid(s, "int"))?,
            other => i64::from_value(other).map_err(|err| match err {
                CoercionError::Unsupported { from, .. } => CoercionError::Unsupported { from, to: "int" },
                other => other,
            })?,
        };
        i32::try_from(wide).map_err(|_| CoercionError::OutOfRange {
            value: wide.to_string(),
            to: "int",
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::String(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoercionError::invalid(s, "double")),
            other => other
                .as_f64()
                .ok_or_else(|| CoercionError::unsupported(&other, "double")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Deferred(_) => Err(CoercionError::unsupported(&value, "string")),
            other => Ok(other.to_display_string()),
        }
    }
}

impl FromValue for Vec<Value> {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::List(items) => Ok(items),
            Value::String(s) => Ok(s
                .split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect()),
            Value::Null => Ok(Vec::new()),
            Value::Deferred(_) => Err(CoercionError::unsupported(&value, "list")),
            scalar => Ok(vec![scalar]),
        }
    }
}

impl FromValue for IndexMap<String, Value> {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Map(map) => Ok(map),
            Value::Headers(headers) => Ok(headers
                .iter()
                .map(|(name, values)| {
                    let values = values.iter().cloned().map(Value::String).collect();
                    (name.to_string(), Value::List(values))
                })
                .collect()),
            other => Err(CoercionError::unsupported(&other, "map")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Bytes(bytes) => Ok(bytes),
            Value::String(s) => Ok(s.into_bytes()),
            other => Err(CoercionError::unsupported(&other, "byte[]")),
        }
    }
}
