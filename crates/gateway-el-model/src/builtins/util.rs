//! `java.util` types: collections, maps and Base64 codecs

use super::{arg, int_arg, str_arg};
use crate::descriptor::TypeDescriptor;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use gateway_el_types::{type_names, HostError, HostObject, Value};
use std::sync::Arc;

const COLLECTION: &str = "java.util.Collection";
const LIST: &str = "java.util.List";
const ABSTRACT_COLLECTION: &str = "java.util.AbstractCollection";
const ABSTRACT_LIST: &str = "java.util.AbstractList";
const MAP: &str = "java.util.Map";
const ABSTRACT_MAP: &str = "java.util.AbstractMap";
const HASH_MAP: &str = "java.util.HashMap";
const BASE64: &str = "java.util.Base64";
const ENCODER: &str = "java.util.Base64$Encoder";
const DECODER: &str = "java.util.Base64$Decoder";

pub(super) fn types() -> Vec<TypeDescriptor> {
    vec![
        collection(),
        list(),
        TypeDescriptor::class(ABSTRACT_COLLECTION).implements(COLLECTION),
        TypeDescriptor::class(ABSTRACT_LIST)
            .extends(ABSTRACT_COLLECTION)
            .implements(LIST),
        TypeDescriptor::class(type_names::LIST)
            .extends(ABSTRACT_LIST)
            .implements(LIST)
            .constructor(&[], |_| Ok(Value::List(Vec::new()))),
        map(),
        TypeDescriptor::class(ABSTRACT_MAP).implements(MAP),
        TypeDescriptor::class(HASH_MAP).extends(ABSTRACT_MAP).implements(MAP),
        TypeDescriptor::class(type_names::MAP)
            .extends(HASH_MAP)
            .implements(MAP)
            .constructor(&[], |_| Ok(Value::Map(Default::default()))),
        TypeDescriptor::class(type_names::BYTES),
        base64(),
        TypeDescriptor::class(ENCODER)
            .host_method("encodeToString", &[type_names::BYTES])
            .host_method("encode", &[type_names::BYTES]),
        TypeDescriptor::class(DECODER)
            .host_method("decode", &[type_names::STRING])
            .host_method("decode", &[type_names::BYTES]),
    ]
}

fn items(receiver: &Value) -> Result<&[Value], HostError> {
    receiver.as_list().ok_or_else(|| {
        HostError::invalid_argument(format!("expected a list, got {}", receiver.type_name()))
    })
}

fn collection() -> TypeDescriptor {
    TypeDescriptor::interface(COLLECTION)
        .method("size", &[], |receiver, _| Ok(Value::Integer(items(receiver)?.len() as i32)))
        .method("isEmpty", &[], |receiver, _| Ok(Value::Boolean(items(receiver)?.is_empty())))
        .method("contains", &[type_names::OBJECT], |receiver, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Boolean(items(receiver)?.contains(needle)))
        })
        .method("containsAll", &[COLLECTION], |receiver, args| {
            let haystack = items(receiver)?;
            let needles = items(arg(args, 0)?)?;
            Ok(Value::Boolean(needles.iter().all(|n| haystack.contains(n))))
        })
        // Mutators exist so the whitelist can deny them; values are immutable
        .host_method("add", &[type_names::OBJECT])
        .host_method("remove", &[type_names::OBJECT])
        .host_method("clear", &[])
}

fn list() -> TypeDescriptor {
    TypeDescriptor::interface(LIST)
        .implements(COLLECTION)
        .method("get", &["int"], |receiver, args| {
            let items = items(receiver)?;
            let index = int_arg(args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| {
                    HostError::invalid_argument(format!(
                        "Index {index} out of bounds for length {}",
                        items.len()
                    ))
                })
        })
        .method("indexOf", &[type_names::OBJECT], |receiver, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Integer(
                items(receiver)?.iter().position(|v| v == needle).map_or(-1, |i| i as i32),
            ))
        })
        .method("lastIndexOf", &[type_names::OBJECT], |receiver, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Integer(
                items(receiver)?.iter().rposition(|v| v == needle).map_or(-1, |i| i as i32),
            ))
        })
        .method("subList", &["int", "int"], |receiver, args| {
            let items = items(receiver)?;
            let (from, to) = (int_arg(args, 0)?, int_arg(args, 1)?);
            let range = usize::try_from(from).ok().zip(usize::try_from(to).ok());
            match range {
                Some((from, to)) if from <= to && to <= items.len() => Ok(Value::List(items[from..to].to_vec())),
                _ => Err(HostError::invalid_argument(format!(
                    "invalid sub list range {from}..{to} for length {}",
                    items.len()
                ))),
            }
        })
        .host_method("set", &["int", type_names::OBJECT])
}

fn entries(receiver: &Value) -> Result<&indexmap::IndexMap<String, Value>, HostError> {
    receiver.as_map().ok_or_else(|| {
        HostError::invalid_argument(format!("expected a map, got {}", receiver.type_name()))
    })
}

/// Map keys are strings; other key values are looked up by their text form
fn key(args: &[Value]) -> Result<String, HostError> {
    Ok(match arg(args, 0)? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn map() -> TypeDescriptor {
    TypeDescriptor::interface(MAP)
        .method("get", &[type_names::OBJECT], |receiver, args| {
            Ok(entries(receiver)?.get(&key(args)?).cloned().unwrap_or(Value::Null))
        })
        .method("getOrDefault", &[type_names::OBJECT, type_names::OBJECT], |receiver, args| {
            match entries(receiver)?.get(&key(args)?) {
                Some(value) => Ok(value.clone()),
                None => Ok(arg(args, 1)?.clone()),
            }
        })
        .method("containsKey", &[type_names::OBJECT], |receiver, args| {
            Ok(Value::Boolean(entries(receiver)?.contains_key(&key(args)?)))
        })
        .method("containsValue", &[type_names::OBJECT], |receiver, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Boolean(entries(receiver)?.values().any(|v| v == needle)))
        })
        .method("keySet", &[], |receiver, _| {
            Ok(entries(receiver)?.keys().cloned().map(Value::String).collect())
        })
        .method("values", &[], |receiver, _| Ok(entries(receiver)?.values().cloned().collect()))
        .method("size", &[], |receiver, _| Ok(Value::Integer(entries(receiver)?.len() as i32)))
        .method("isEmpty", &[], |receiver, _| Ok(Value::Boolean(entries(receiver)?.is_empty())))
        .host_method("put", &[type_names::OBJECT, type_names::OBJECT])
        .host_method("remove", &[type_names::OBJECT])
        .host_method("clear", &[])
}

fn base64() -> TypeDescriptor {
    TypeDescriptor::class(BASE64)
        .static_method("getEncoder", &[], |_, _| Ok(Codec::value(ENCODER, false)))
        .static_method("getDecoder", &[], |_, _| Ok(Codec::value(DECODER, false)))
        .static_method("getUrlEncoder", &[], |_, _| Ok(Codec::value(ENCODER, true)))
        .static_method("getUrlDecoder", &[], |_, _| Ok(Codec::value(DECODER, true)))
}

/// Encoder or decoder handed out by `java.util.Base64`
struct Codec {
    type_name: &'static str,
    url_safe: bool,
}

impl Codec {
    fn value(type_name: &'static str, url_safe: bool) -> Value {
        Value::Object(Arc::new(Self { type_name, url_safe }))
    }

    fn engine(&self) -> &'static base64::engine::GeneralPurpose {
        if self.url_safe { &URL_SAFE } else { &STANDARD }
    }

    fn input_bytes(args: &[Value]) -> Result<Vec<u8>, HostError> {
        match arg(args, 0)? {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            Value::String(_) => Ok(str_arg(args, 0)?.as_bytes().to_vec()),
            other => Err(HostError::invalid_argument(format!(
                "expected byte[], got {}",
                other.type_name()
            ))),
        }
    }
}

impl HostObject for Codec {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match (self.type_name, method) {
            (ENCODER, "encodeToString") => {
                Ok(Value::String(self.engine().encode(Self::input_bytes(args)?)))
            }
            (ENCODER, "encode") => Ok(Value::Bytes(
                self.engine().encode(Self::input_bytes(args)?).into_bytes(),
            )),
            (DECODER, "decode") => self
                .engine()
                .decode(Self::input_bytes(args)?)
                .map(Value::Bytes)
                .map_err(|err| HostError::invalid_argument(format!("invalid base64 input: {err}"))),
            (_, other) => Err(HostError::no_such_method(self.type_name, other, args.len())),
        }
    }
}
