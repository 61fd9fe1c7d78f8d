//! Multi-valued HTTP headers

use super::{arg, str_arg};
use crate::descriptor::TypeDescriptor;
use gateway_el_types::{type_names, Headers, HostError, Value};

const CHAR_SEQUENCE: &str = "java.lang.CharSequence";

fn headers(receiver: &Value) -> Result<&Headers, HostError> {
    match receiver {
        Value::Headers(headers) => Ok(headers),
        other => Err(HostError::invalid_argument(format!(
            "expected headers, got {}",
            other.type_name()
        ))),
    }
}

fn first_value(receiver: &Value, args: &[Value]) -> Result<Value, HostError> {
    let name = str_arg(args, 0)?;
    Ok(headers(receiver)?
        .get(name)
        .map_or(Value::Null, Value::from))
}

fn strings(values: &[String]) -> Value {
    values.iter().map(String::as_str).collect()
}

pub(super) fn types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::class(type_names::HEADERS)
            .method("get", &[CHAR_SEQUENCE], first_value)
            .method("getFirst", &[CHAR_SEQUENCE], first_value)
            .method("getAll", &[CHAR_SEQUENCE], |receiver, args| {
                Ok(strings(headers(receiver)?.get_all(str_arg(args, 0)?)))
            })
            .method("contains", &[CHAR_SEQUENCE], |receiver, args| {
                Ok(Value::Boolean(headers(receiver)?.contains(str_arg(args, 0)?)))
            })
            .method("containsKey", &[CHAR_SEQUENCE], |receiver, args| {
                Ok(Value::Boolean(headers(receiver)?.contains(str_arg(args, 0)?)))
            })
            .method("containsAllKeys", &["java.util.Collection"], |receiver, args| {
                let headers = headers(receiver)?;
                let names = arg(args, 0)?
                    .as_list()
                    .ok_or_else(|| HostError::invalid_argument("expected a collection of names"))?;
                Ok(Value::Boolean(names.iter().all(|name| match name {
                    Value::String(name) => headers.contains(name),
                    _ => false,
                })))
            })
            .method("names", &[], |receiver, _| Ok(headers(receiver)?.names().collect()))
            .method("size", &[], |receiver, _| Ok(Value::Integer(headers(receiver)?.len() as i32)))
            .method("isEmpty", &[], |receiver, _| Ok(Value::Boolean(headers(receiver)?.is_empty())))
            .method("toSingleValueMap", &[], |receiver, _| {
                Ok(Value::Map(
                    headers(receiver)?
                        .to_single_value_map()
                        .into_iter()
                        .map(|(name, value)| (name, Value::String(value)))
                        .collect(),
                ))
            })
            .method("toListValuesMap", &[], |receiver, _| {
                Ok(Value::Map(
                    headers(receiver)?
                        .iter()
                        .map(|(name, values)| (name.to_string(), strings(values)))
                        .collect(),
                ))
            })
            .host_method("add", &[CHAR_SEQUENCE, CHAR_SEQUENCE])
            .host_method("set", &[CHAR_SEQUENCE, CHAR_SEQUENCE])
            .host_method("remove", &[CHAR_SEQUENCE])
            .host_method("clear", &[]),
    ]
}
