//! Built-in host types
//!
//! Value types map onto the `java.*` names expressions are written against;
//! their members are implemented natively over [`Value`].

mod format;
mod http;
mod lang;
mod util;

use crate::registry::TypeRegistry;
use gateway_el_types::{HostError, Value};

pub use format::format;

/// Register every built-in type
pub fn register_all(registry: &mut TypeRegistry) {
    for descriptor in lang::types().into_iter().chain(util::types()).chain(http::types()) {
        registry.register(descriptor);
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, HostError> {
    args.get(index)
        .ok_or_else(|| HostError::invalid_argument(format!("missing argument {}", index + 1)))
}

fn str_arg(args: &[Value], index: usize) -> Result<&str, HostError> {
    match arg(args, index)? {
        Value::String(s) => Ok(s),
        other => Err(HostError::invalid_argument(format!(
            "expected a string, got {}",
            other.type_name()
        ))),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i64, HostError> {
    match arg(args, index)? {
        Value::Integer(i) => Ok(i64::from(*i)),
        Value::Long(l) => Ok(*l),
        other => Err(HostError::invalid_argument(format!(
            "expected an integer, got {}",
            other.type_name()
        ))),
    }
}

fn f64_arg(args: &[Value], index: usize) -> Result<f64, HostError> {
    let value = arg(args, index)?;
    value.as_f64().ok_or_else(|| {
        HostError::invalid_argument(format!("expected a number, got {}", value.type_name()))
    })
}

fn receiver_str(receiver: &Value) -> Result<&str, HostError> {
    match receiver {
        Value::String(s) => Ok(s),
        other => Err(HostError::invalid_argument(format!(
            "expected a string receiver, got {}",
            other.type_name()
        ))),
    }
}

/// Character index of a byte offset
fn char_index(s: &str, byte_offset: usize) -> i32 {
    s[..byte_offset].chars().count() as i32
}

/// Hash of a string as computed over its UTF-16 code units with multiplier 31
fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Flatten a rest argument: a single list argument is spread
fn rest_args(args: &[Value]) -> Vec<Value> {
    match args {
        [Value::List(items)] => items.clone(),
        _ => args.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_hash_matches_known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("hello"), 99_162_322);
    }

    #[test]
    fn test_rest_args_spread_single_list() {
        let spread = rest_args(&[Value::List(vec![Value::Integer(1), Value::Integer(2)])]);
        assert_eq!(spread, vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(rest_args(&[Value::Integer(1)]), vec![Value::Integer(1)]);
    }

    #[test]
    fn test_catalog_registers_core_types() {
        let mut registry = TypeRegistry::new();
        register_all(&mut registry);
        for name in [
            "java.lang.Object",
            "java.lang.String",
            "java.lang.Math",
            "java.util.ArrayList",
            "java.util.LinkedHashMap",
            "java.util.Base64",
            "io.gravitee.gateway.api.http.HttpHeaders",
            "java.lang.Thread",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
    }
}
