//! Runtime values
//!
//! Scalar numbers follow the host's boxed types: `Integer` is 32-bit, `Long`
//! 64-bit and `Decimal` a double. Arithmetic widens along
//! `Integer -> Long -> Decimal`.

use crate::{DeferredValue, Headers, HostObject};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Host type names of the built-in value kinds
pub mod type_names {
    pub const OBJECT: &str = "java.lang.Object";
    pub const BOOLEAN: &str = "java.lang.Boolean";
    pub const INTEGER: &str = "java.lang.Integer";
    pub const LONG: &str = "java.lang.Long";
    pub const DOUBLE: &str = "java.lang.Double";
    pub const STRING: &str = "java.lang.String";
    pub const BYTES: &str = "byte[]";
    pub const LIST: &str = "java.util.ArrayList";
    pub const MAP: &str = "java.util.LinkedHashMap";
    pub const HEADERS: &str = "io.gravitee.gateway.api.http.HttpHeaders";
    pub const CLASS: &str = "java.lang.Class";
    pub const DEFERRED: &str = "deferred";
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Decimal(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Headers(Headers),
    /// Reference to a host type, target of static calls (`T(java.lang.Math)`)
    Type(String),
    Object(Arc<dyn HostObject>),
    Deferred(DeferredValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Long(_) | Self::Decimal(_))
    }

    /// Host type name used for method lookup and whitelist checks
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => type_names::OBJECT,
            Self::Boolean(_) => type_names::BOOLEAN,
            Self::Integer(_) => type_names::INTEGER,
            Self::Long(_) => type_names::LONG,
            Self::Decimal(_) => type_names::DOUBLE,
            Self::String(_) => type_names::STRING,
            Self::Bytes(_) => type_names::BYTES,
            Self::List(_) => type_names::LIST,
            Self::Map(_) => type_names::MAP,
            Self::Headers(_) => type_names::HEADERS,
            Self::Type(_) => type_names::CLASS,
            Self::Object(object) => object.type_name(),
            Self::Deferred(_) => type_names::DEFERRED,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value of `Integer` or `Long`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Any numeric value widened to a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(f64::from(*i)),
            Self::Long(l) => Some(*l as f64),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Text form used when a value is embedded in a template.
    ///
    /// Null renders as the empty string and lists join their elements with `,`.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::List(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        }
    }

    /// Ordering for comparison operators; `None` when the kinds do not compare
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
            _ => None,
        }
    }
}

/// Equality as seen by `==`: numbers compare across widths, host objects by
/// identity, deferred values never compare equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Headers(a), Self::Headers(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (a, b) if a.is_numeric() && b.is_numeric() => a.compare(b) == Some(Ordering::Equal),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Long(l) => f.debug_tuple("Long").field(l).finish(),
            Self::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Headers(h) => f.debug_tuple("Headers").field(h).finish(),
            Self::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
            Self::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
        }
    }
}

/// Host-style `toString` rendering
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Long(l) => write!(f, "{}", l),
            Self::Decimal(d) => write!(f, "{:?}", d),
            Self::String(s) => f.write_str(s),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                f.write_str("}")
            }
            Self::Headers(headers) => write!(f, "{}", headers),
            Self::Type(name) => write!(f, "class {}", name),
            Self::Object(object) => f.write_str(&object.display()),
            Self::Deferred(_) => f.write_str("<deferred>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Deferred(_) => serializer.serialize_none(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i32(*i),
            Self::Long(l) => serializer.serialize_i64(*l),
            Self::Decimal(d) => serializer.serialize_f64(*d),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Headers(headers) => headers.serialize(serializer),
            Self::Type(name) => serializer.serialize_str(name),
            Self::Object(object) => serializer.serialize_str(&object.display()),
        }
    }
}

// === Conversions ===

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Self::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<Headers> for Value {
    fn from(headers: Headers) -> Self {
        Self::Headers(headers)
    }
}

impl From<DeferredValue> for Value {
    fn from(deferred: DeferredValue) -> Self {
        Self::Deferred(deferred)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::List(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numeric_equality_across_widths() {
        assert_eq!(Value::Integer(1), Value::Long(1));
        assert_eq!(Value::Long(2), Value::Decimal(2.0));
        assert_ne!(Value::Integer(1), Value::from("1"));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Integer(3).compare(&Value::Decimal(2.5)), Some(Ordering::Greater));
        assert_eq!(Value::from("a").compare(&Value::from("b")), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_display_forms() {
        let list = Value::List(vec![Value::from("a"), Value::Integer(2)]);
        assert_eq!(list.to_string(), "[a, 2]");
        assert_eq!(list.to_display_string(), "a,2");
        assert_eq!(Value::Decimal(2.0).to_string(), "2.0");
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Type("java.lang.Math".into()).to_string(), "class java.lang.Math");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::from("x").type_name(), "java.lang.String");
        assert_eq!(Value::List(vec![]).type_name(), "java.util.ArrayList");
        assert_eq!(Value::Headers(Headers::new()).type_name(), type_names::HEADERS);
    }

    #[test]
    fn test_serialize_to_json() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::from("gravitee"));
        map.insert("tags".to_string(), Value::List(vec![Value::Integer(1), Value::Null]));
        map.insert("raw".to_string(), Value::Bytes(b"hi".to_vec()));
        let headers: Headers = [("X", "1")].into_iter().collect();
        map.insert("headers".to_string(), Value::Headers(headers));

        let json = serde_json::to_string(&Value::Map(map)).unwrap();
        assert_eq!(
            json,
            r#"{"name":"gravitee","tags":[1,null],"raw":"aGk=","headers":{"X":["1"]}}"#
        );
    }
}
