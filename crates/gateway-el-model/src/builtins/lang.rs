//! `java.lang` types: strings, boxed numbers, math, system and the
//! non-whitelisted types used to demonstrate denials

use super::{arg, char_index, f64_arg, int_arg, receiver_str, rest_args, str_arg, string_hash};
use crate::descriptor::TypeDescriptor;
use crate::pattern;
use gateway_el_types::{type_names, HostError, HostObject, Value};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const CHAR_SEQUENCE: &str = "java.lang.CharSequence";
const COMPARABLE: &str = "java.lang.Comparable";
const NUMBER: &str = "java.lang.Number";
const THROWABLE: &str = "java.lang.Throwable";
const EXCEPTION: &str = "java.lang.Exception";
const THREAD: &str = "java.lang.Thread";

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

pub(super) fn types() -> Vec<TypeDescriptor> {
    vec![
        object(),
        TypeDescriptor::interface(CHAR_SEQUENCE)
            .host_method("length", &[])
            .host_method("charAt", &["int"])
            .host_method("isEmpty", &[])
            .host_method("toString", &[]),
        TypeDescriptor::interface(COMPARABLE).method("compareTo", &[type_names::OBJECT], |receiver, args| {
            let other = arg(args, 0)?;
            receiver
                .compare(other)
                .map(|ordering| Value::Integer(ordering as i32))
                .ok_or_else(|| {
                    HostError::invalid_argument(format!(
                        "cannot compare {} with {}",
                        receiver.type_name(),
                        other.type_name()
                    ))
                })
        }),
        string(),
        number(),
        integer(),
        long(),
        double(),
        boolean(),
        math(),
        system(),
        class(),
        TypeDescriptor::class(THREAD)
            .constructor(&[], |_| Ok(Value::Object(Arc::new(ThreadHandle))))
            .host_method("start", &[])
            .host_method("getName", &[]),
        TypeDescriptor::class(THROWABLE)
            .constructor(&[], |_| Ok(Throwable::value(THROWABLE, None)))
            .host_method("getMessage", &[]),
        TypeDescriptor::class(EXCEPTION)
            .extends(THROWABLE)
            .constructor(&[], |_| Ok(Throwable::value(EXCEPTION, None)))
            .constructor(&[type_names::STRING], |args| {
                let message = str_arg(args, 0)?.to_string();
                Ok(Throwable::value(EXCEPTION, Some(message)))
            }),
    ]
}

fn object() -> TypeDescriptor {
    TypeDescriptor::class(type_names::OBJECT)
        .method("toString", &[], |receiver, _| Ok(Value::String(receiver.to_string())))
        .method("equals", &[type_names::OBJECT], |receiver, args| {
            Ok(Value::Boolean(receiver == arg(args, 0)?))
        })
        .method("hashCode", &[], |receiver, _| {
            Ok(Value::Integer(string_hash(&receiver.to_string())))
        })
        .method("getClass", &[], |receiver, _| {
            Ok(Value::Type(receiver.type_name().to_string()))
        })
}

fn string() -> TypeDescriptor {
    TypeDescriptor::class(type_names::STRING)
        .implements(CHAR_SEQUENCE)
        .implements(COMPARABLE)
        .constructor(&[], |_| Ok(Value::String(String::new())))
        .constructor(&[type_names::STRING], |args| Ok(Value::String(str_arg(args, 0)?.to_string())))
        .constructor(&[type_names::BYTES], |args| match arg(args, 0)? {
            Value::Bytes(bytes) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
            other => Err(HostError::invalid_argument(format!(
                "expected byte[], got {}",
                other.type_name()
            ))),
        })
        .method("length", &[], |receiver, _| {
            Ok(Value::Integer(receiver_str(receiver)?.chars().count() as i32))
        })
        .method("isEmpty", &[], |receiver, _| Ok(Value::Boolean(receiver_str(receiver)?.is_empty())))
        .method("isBlank", &[], |receiver, _| {
            Ok(Value::Boolean(receiver_str(receiver)?.trim().is_empty()))
        })
        .method("charAt", &["int"], |receiver, args| {
            let s = receiver_str(receiver)?;
            let index = int_arg(args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| out_of_range(index))
        })
        .method("contains", &[CHAR_SEQUENCE], |receiver, args| {
            Ok(Value::Boolean(receiver_str(receiver)?.contains(str_arg(args, 0)?)))
        })
        .method("startsWith", &[type_names::STRING], |receiver, args| {
            Ok(Value::Boolean(receiver_str(receiver)?.starts_with(str_arg(args, 0)?)))
        })
        .method("endsWith", &[type_names::STRING], |receiver, args| {
            Ok(Value::Boolean(receiver_str(receiver)?.ends_with(str_arg(args, 0)?)))
        })
        .method("indexOf", &[type_names::STRING], |receiver, args| {
            let s = receiver_str(receiver)?;
            Ok(Value::Integer(s.find(str_arg(args, 0)?).map_or(-1, |at| char_index(s, at))))
        })
        .method("lastIndexOf", &[type_names::STRING], |receiver, args| {
            let s = receiver_str(receiver)?;
            Ok(Value::Integer(s.rfind(str_arg(args, 0)?).map_or(-1, |at| char_index(s, at))))
        })
        .method("substring", &["int"], |receiver, args| {
            let s = receiver_str(receiver)?;
            let len = s.chars().count() as i64;
            substring(s, int_arg(args, 0)?, len)
        })
        .method("substring", &["int", "int"], |receiver, args| {
            substring(receiver_str(receiver)?, int_arg(args, 0)?, int_arg(args, 1)?)
        })
        .method("toUpperCase", &[], |receiver, _| {
            Ok(Value::String(receiver_str(receiver)?.to_uppercase()))
        })
        .method("toLowerCase", &[], |receiver, _| {
            Ok(Value::String(receiver_str(receiver)?.to_lowercase()))
        })
        .method("trim", &[], |receiver, _| Ok(Value::String(receiver_str(receiver)?.trim().to_string())))
        .method("strip", &[], |receiver, _| Ok(Value::String(receiver_str(receiver)?.trim().to_string())))
        .method("concat", &[type_names::STRING], |receiver, args| {
            Ok(Value::String(format!("{}{}", receiver_str(receiver)?, str_arg(args, 0)?)))
        })
        .method("equalsIgnoreCase", &[type_names::STRING], |receiver, args| {
            let other = match arg(args, 0)? {
                Value::Null => return Ok(Value::Boolean(false)),
                _ => str_arg(args, 0)?,
            };
            Ok(Value::Boolean(receiver_str(receiver)?.eq_ignore_ascii_case(other)))
        })
        .method("matches", &[type_names::STRING], |receiver, args| {
            Ok(Value::Boolean(pattern::full_match(str_arg(args, 0)?, receiver_str(receiver)?)?))
        })
        .method("replace", &[CHAR_SEQUENCE, CHAR_SEQUENCE], |receiver, args| {
            Ok(Value::String(receiver_str(receiver)?.replace(str_arg(args, 0)?, str_arg(args, 1)?)))
        })
        .method("replaceAll", &[type_names::STRING, type_names::STRING], |receiver, args| {
            let regex = pattern::compile(str_arg(args, 0)?)?;
            let replacement = pattern::replacement(str_arg(args, 1)?);
            Ok(Value::String(
                regex.replace_all(receiver_str(receiver)?, replacement.as_str()).into_owned(),
            ))
        })
        .method("replaceFirst", &[type_names::STRING, type_names::STRING], |receiver, args| {
            let regex = pattern::compile(str_arg(args, 0)?)?;
            let replacement = pattern::replacement(str_arg(args, 1)?);
            Ok(Value::String(
                regex.replace(receiver_str(receiver)?, replacement.as_str()).into_owned(),
            ))
        })
        .method("split", &[type_names::STRING], |receiver, args| {
            let parts = pattern::split(str_arg(args, 0)?, receiver_str(receiver)?)?;
            Ok(parts.into_iter().map(Value::String).collect())
        })
        .method("getBytes", &[], |receiver, _| {
            Ok(Value::Bytes(receiver_str(receiver)?.as_bytes().to_vec()))
        })
        .method("toString", &[], |receiver, _| Ok(Value::String(receiver_str(receiver)?.to_string())))
        .static_method("format", &[type_names::STRING, "java.lang.Object..."], |_, args| {
            let pattern = str_arg(args, 0)?;
            let values = rest_args(&args[1..]);
            Ok(Value::String(super::format(pattern, &values)?))
        })
        .static_method("valueOf", &[type_names::OBJECT], |_, args| {
            Ok(Value::String(arg(args, 0)?.to_string()))
        })
        .static_method("join", &[CHAR_SEQUENCE, "java.lang.Object..."], |_, args| {
            let delimiter = str_arg(args, 0)?;
            let parts: Vec<String> = rest_args(&args[1..]).iter().map(Value::to_string).collect();
            Ok(Value::String(parts.join(delimiter)))
        })
}

fn out_of_range(index: i64) -> HostError {
    HostError::invalid_argument(format!("String index out of range: {index}"))
}

fn substring(s: &str, begin: i64, end: i64) -> Result<Value, HostError> {
    let len = s.chars().count() as i64;
    if begin < 0 || begin > len {
        return Err(out_of_range(begin));
    }
    if end < begin || end > len {
        return Err(out_of_range(end));
    }
    let taken = s
        .chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect();
    Ok(Value::String(taken))
}

fn number() -> TypeDescriptor {
    TypeDescriptor::class(NUMBER)
        .method("intValue", &[], |receiver, _| {
            let wide = to_long(receiver)?;
            Ok(Value::Integer(wide as i32))
        })
        .method("longValue", &[], |receiver, _| Ok(Value::Long(to_long(receiver)?)))
        .method("doubleValue", &[], |receiver, _| {
            receiver
                .as_f64()
                .map(Value::Decimal)
                .ok_or_else(|| not_a_number(receiver))
        })
}

/// Narrowing conversion: decimals truncate toward zero and saturate
fn to_long(value: &Value) -> Result<i64, HostError> {
    match value {
        Value::Decimal(d) => Ok(*d as i64),
        other => other.as_i64().ok_or_else(|| not_a_number(other)),
    }
}

fn not_a_number(value: &Value) -> HostError {
    HostError::invalid_argument(format!("{} is not a number", value.type_name()))
}

fn parse_failure(text: &str, to: &str) -> HostError {
    HostError::invalid_argument(format!("For input string: \"{text}\" ({to})"))
}

fn integer() -> TypeDescriptor {
    fn parse(args: &[Value]) -> Result<Value, HostError> {
        let text = str_arg(args, 0)?;
        text.parse::<i32>()
            .map(Value::Integer)
            .map_err(|_| parse_failure(text, "int"))
    }
    TypeDescriptor::class(type_names::INTEGER)
        .extends(NUMBER)
        .implements(COMPARABLE)
        .static_method("parseInt", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &["int"], |_, args| Ok(arg(args, 0)?.clone()))
}

fn long() -> TypeDescriptor {
    fn parse(args: &[Value]) -> Result<Value, HostError> {
        let text = str_arg(args, 0)?;
        text.parse::<i64>()
            .map(Value::Long)
            .map_err(|_| parse_failure(text, "long"))
    }
    TypeDescriptor::class(type_names::LONG)
        .extends(NUMBER)
        .implements(COMPARABLE)
        .static_method("parseLong", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &["long"], |_, args| Ok(Value::Long(int_arg(args, 0)?)))
}

fn double() -> TypeDescriptor {
    fn parse(args: &[Value]) -> Result<Value, HostError> {
        let text = str_arg(args, 0)?;
        text.trim()
            .parse::<f64>()
            .map(Value::Decimal)
            .map_err(|_| parse_failure(text, "double"))
    }
    TypeDescriptor::class(type_names::DOUBLE)
        .extends(NUMBER)
        .implements(COMPARABLE)
        .method("isNaN", &[], |receiver, _| {
            Ok(Value::Boolean(receiver.as_f64().is_some_and(f64::is_nan)))
        })
        .static_method("parseDouble", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &["double"], |_, args| Ok(Value::Decimal(f64_arg(args, 0)?)))
}

fn boolean() -> TypeDescriptor {
    fn parse(args: &[Value]) -> Result<Value, HostError> {
        Ok(Value::Boolean(match arg(args, 0)? {
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }))
    }
    TypeDescriptor::class(type_names::BOOLEAN)
        .implements(COMPARABLE)
        .method("booleanValue", &[], |receiver, _| {
            receiver
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| HostError::invalid_argument("not a boolean"))
        })
        .static_method("parseBoolean", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &[type_names::STRING], |_, args| parse(args))
        .static_method("valueOf", &["boolean"], |_, args| Ok(arg(args, 0)?.clone()))
}

fn math() -> TypeDescriptor {
    const MATH: &str = "java.lang.Math";
    TypeDescriptor::class(MATH)
        .static_method("abs", &["int"], |_, args| {
            Ok(Value::Integer((int_arg(args, 0)? as i32).wrapping_abs()))
        })
        .static_method("abs", &["long"], |_, args| Ok(Value::Long(int_arg(args, 0)?.wrapping_abs())))
        .static_method("abs", &["double"], |_, args| Ok(Value::Decimal(f64_arg(args, 0)?.abs())))
        .static_method("max", &["int", "int"], |_, args| {
            Ok(Value::Integer(int_arg(args, 0)?.max(int_arg(args, 1)?) as i32))
        })
        .static_method("max", &["long", "long"], |_, args| {
            Ok(Value::Long(int_arg(args, 0)?.max(int_arg(args, 1)?)))
        })
        .static_method("max", &["double", "double"], |_, args| {
            Ok(Value::Decimal(f64_arg(args, 0)?.max(f64_arg(args, 1)?)))
        })
        .static_method("min", &["int", "int"], |_, args| {
            Ok(Value::Integer(int_arg(args, 0)?.min(int_arg(args, 1)?) as i32))
        })
        .static_method("min", &["long", "long"], |_, args| {
            Ok(Value::Long(int_arg(args, 0)?.min(int_arg(args, 1)?)))
        })
        .static_method("min", &["double", "double"], |_, args| {
            Ok(Value::Decimal(f64_arg(args, 0)?.min(f64_arg(args, 1)?)))
        })
        .static_method("round", &["double"], |_, args| {
            Ok(Value::Long((f64_arg(args, 0)? + 0.5).floor() as i64))
        })
        .static_method("floor", &["double"], |_, args| Ok(Value::Decimal(f64_arg(args, 0)?.floor())))
        .static_method("ceil", &["double"], |_, args| Ok(Value::Decimal(f64_arg(args, 0)?.ceil())))
        .static_method("pow", &["double", "double"], |_, args| {
            Ok(Value::Decimal(f64_arg(args, 0)?.powf(f64_arg(args, 1)?)))
        })
        .static_method("sqrt", &["double"], |_, args| Ok(Value::Decimal(f64_arg(args, 0)?.sqrt())))
        .static_method("random", &[], |_, _| Ok(Value::Decimal(random())))
}

/// Uniform double in `[0, 1)`
fn random() -> f64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(PROCESS_START.elapsed().as_nanos());
    (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
}

fn system() -> TypeDescriptor {
    TypeDescriptor::class("java.lang.System")
        .static_method("currentTimeMillis", &[], |_, _| {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|err| HostError::Failed(err.to_string()))?
                .as_millis();
            Ok(Value::Long(i64::try_from(millis).unwrap_or(i64::MAX)))
        })
        .static_method("nanoTime", &[], |_, _| {
            Ok(Value::Long(
                i64::try_from(PROCESS_START.elapsed().as_nanos()).unwrap_or(i64::MAX),
            ))
        })
        .static_method("getenv", &[], |_, _| {
            let variables: IndexMap<String, Value> =
                std::env::vars().map(|(k, v)| (k, Value::String(v))).collect();
            Ok(Value::Map(variables))
        })
        .static_method("getenv", &[type_names::STRING], |_, args| {
            Ok(std::env::var(str_arg(args, 0)?).map_or(Value::Null, Value::String))
        })
}

fn class() -> TypeDescriptor {
    TypeDescriptor::class(type_names::CLASS)
        .static_method("forName", &[type_names::STRING], |_, args| {
            Ok(Value::Type(str_arg(args, 0)?.to_string()))
        })
        .method("getName", &[], |receiver, _| match receiver {
            Value::Type(name) => Ok(Value::String(name.clone())),
            other => Err(HostError::invalid_argument(format!(
                "{} is not a class",
                other.type_name()
            ))),
        })
        .method("getSimpleName", &[], |receiver, _| match receiver {
            Value::Type(name) => Ok(Value::String(
                name.rsplit(['.', '$']).next().unwrap_or(name).to_string(),
            )),
            other => Err(HostError::invalid_argument(format!(
                "{} is not a class",
                other.type_name()
            ))),
        })
}

/// Inert thread handle; expressions cannot start threads
struct ThreadHandle;

impl HostObject for ThreadHandle {
    fn type_name(&self) -> &str {
        THREAD
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match method {
            "getName" => Ok(Value::from("expression-thread")),
            "start" => Err(HostError::Failed("threads cannot be started from expressions".into())),
            other => Err(HostError::no_such_method(THREAD, other, args.len())),
        }
    }
}

/// Throwable built by `new java.lang.Exception(...)`
struct Throwable {
    type_name: &'static str,
    message: Option<String>,
}

impl Throwable {
    fn value(type_name: &'static str, message: Option<String>) -> Value {
        Value::Object(Arc::new(Self { type_name, message }))
    }

    fn message_value(&self) -> Value {
        self.message.clone().map_or(Value::Null, Value::String)
    }
}

impl HostObject for Throwable {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn property(&self, name: &str) -> Option<Value> {
        (name == "message").then(|| self.message_value())
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match method {
            "getMessage" => Ok(self.message_value()),
            other => Err(HostError::no_such_method(self.type_name, other, args.len())),
        }
    }

    fn display(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.type_name, message),
            None => self.type_name.to_string(),
        }
    }
}
