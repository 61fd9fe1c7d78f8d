//! Secured member resolution: property reads, indexing, method calls and
//! constructors, every host member checked against the whitelist first

use crate::error::{EvalError, EvalResult};
use crate::whitelist::WhitelistRegistry;
use gateway_el_model::{MethodDescriptor, TypeRegistry};
use gateway_el_types::{type_names, Value};
use log::trace;

/// Resolves navigation steps against runtime values
#[derive(Debug, Clone, Copy)]
pub struct SecuredResolver<'a> {
    whitelist: &'a WhitelistRegistry,
}

impl<'a> SecuredResolver<'a> {
    pub fn new(whitelist: &'a WhitelistRegistry) -> Self {
        Self { whitelist }
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.whitelist.types()
    }

    // =========================================================================
    // Properties and indexing
    // =========================================================================

    /// Read `target.name`
    pub fn property(&self, target: &Value, name: &str, null_safe: bool) -> EvalResult<Value> {
        match target {
            Value::Null if null_safe => Ok(Value::Null),
            Value::Null => Err(EvalError::null_navigation(name)),
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Value::Headers(headers) => Ok(header_values(headers.get_all(name))),
            Value::Object(object) => Ok(object.property(name).unwrap_or_default()),
            Value::Deferred(_) => Err(EvalError::unresolved(format!("property '{}'", name))),
            other => Err(EvalError::unknown_property(name, other.type_name())),
        }
    }

    /// Read `target[index]`
    pub fn index(&self, target: &Value, index: &Value) -> EvalResult<Value> {
        match (target, index) {
            (Value::Null, _) => Err(EvalError::null_navigation(format!("[{}]", index))),
            (Value::Deferred(_), _) => Err(EvalError::unresolved("indexer")),
            (Value::List(items), _) => {
                let position = position(index, items.len(), target)?;
                Ok(items[position].clone())
            }
            (Value::Bytes(bytes), _) => {
                let position = position(index, bytes.len(), target)?;
                Ok(Value::Integer(i32::from(bytes[position] as i8)))
            }
            (Value::String(text), _) => {
                let length = text.chars().count();
                let position = position(index, length, target)?;
                Ok(text
                    .chars()
                    .nth(position)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or_default())
            }
            (Value::Map(map), key) => Ok(map.get(&key.to_display_string()).cloned().unwrap_or_default()),
            (Value::Headers(headers), key) => Ok(header_values(headers.get_all(&key.to_display_string()))),
            (Value::Object(object), key) => Ok(object.property(&key.to_display_string()).unwrap_or_default()),
            (other, index) => Err(EvalError::InvalidIndex {
                type_name: other.type_name().to_string(),
                index: index.to_string(),
            }),
        }
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Call `receiver.name(args)`.
    ///
    /// On a `T(...)` receiver the static methods of the referenced type are
    /// candidates, followed by the methods of `java.lang.Class` itself.
    pub fn invoke(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        null_safe: bool,
    ) -> EvalResult<Value> {
        match receiver {
            Value::Null if null_safe => return Ok(Value::Null),
            Value::Null => return Err(EvalError::null_navigation(format!("{}()", name))),
            Value::Deferred(_) => return Err(EvalError::unresolved(format!("method '{}'", name))),
            _ => {}
        }

        let types = self.types();
        let runtime_type = receiver.type_name();

        // (descriptor, type the grant is looked up on)
        let candidates: Vec<(&MethodDescriptor, &str)> = match receiver {
            Value::Type(type_name) => types
                .find_static_methods(type_name, name)
                .into_iter()
                .map(|m| (m, type_name.as_str()))
                .chain(
                    types
                        .find_methods(type_names::CLASS, name)
                        .into_iter()
                        .filter(|m| !m.signature.is_static)
                        .map(|m| (m, type_names::CLASS)),
                )
                .collect(),
            _ => types
                .find_methods(runtime_type, name)
                .into_iter()
                .filter(|m| !m.signature.is_static)
                .map(|m| (m, runtime_type))
                .collect(),
        };

        let applicable: Vec<(&MethodDescriptor, &str)> = candidates
            .into_iter()
            .filter(|(m, _)| types.signature_cost(&m.signature.params, args).is_some())
            .collect();
        if applicable.is_empty() {
            return Err(unknown_method(receiver, name, args));
        }

        let allowed: Vec<&MethodDescriptor> = applicable
            .iter()
            .filter(|(m, lookup)| self.whitelist.is_method_allowed(lookup, &m.signature))
            .map(|(m, _)| *m)
            .collect();

        let Some(method) = types.select_method(allowed, args) else {
            let denied = types
                .select_method(applicable.iter().map(|(m, _)| *m), args)
                .map(|m| m.signature.to_string())
                .unwrap_or_else(|| format!("{}.{}", runtime_type, name));
            return Err(EvalError::MethodNotAllowed { member: denied });
        };

        trace!("invoking {} on {}", method.signature, runtime_type);
        let implementation = if method.signature.is_static || matches!(receiver, Value::Type(_)) {
            method
        } else {
            types
                .implementation_for(runtime_type, &method.signature)
                .unwrap_or(method)
        };
        Ok(implementation.invoke(receiver, args)?)
    }

    // =========================================================================
    // Types and constructors
    // =========================================================================

    /// `T(name)`; unknown types are rejected like non-whitelisted ones
    pub fn type_ref(&self, name: &str) -> EvalResult<Value> {
        if self.types().contains(name) {
            Ok(Value::Type(name.to_string()))
        } else {
            Err(EvalError::UnknownType {
                name: name.to_string(),
            })
        }
    }

    /// `new name(args)`
    pub fn construct(&self, type_name: &str, args: &[Value]) -> EvalResult<Value> {
        let types = self.types();
        if !types.contains(type_name) {
            return Err(EvalError::UnknownType {
                name: type_name.to_string(),
            });
        }

        let applicable: Vec<_> = types
            .constructors(type_name)
            .iter()
            .filter(|c| types.signature_cost(&c.signature.params, args).is_some())
            .collect();
        if applicable.is_empty() {
            return Err(EvalError::UnknownConstructor {
                type_name: type_name.to_string(),
                arguments: argument_types(args),
            });
        }

        let allowed = applicable
            .iter()
            .copied()
            .filter(|c| self.whitelist.is_constructor_allowed(&c.signature));
        let Some(constructor) = types.select_constructor(allowed, args) else {
            let member = types
                .select_constructor(applicable.iter().copied(), args)
                .map(|c| c.signature.to_string())
                .unwrap_or_else(|| format!("new {}", type_name));
            return Err(EvalError::ConstructorNotAllowed { member });
        };

        trace!("constructing {}", constructor.signature);
        Ok(constructor.construct(args)?)
    }
}

fn header_values(values: &[String]) -> Value {
    if values.is_empty() {
        Value::Null
    } else {
        values.iter().map(String::as_str).collect()
    }
}

fn position(index: &Value, length: usize, target: &Value) -> EvalResult<usize> {
    let Some(index) = index.as_i64() else {
        return Err(EvalError::InvalidIndex {
            type_name: target.type_name().to_string(),
            index: index.to_string(),
        });
    };
    usize::try_from(index)
        .ok()
        .filter(|i| *i < length)
        .ok_or(EvalError::IndexOutOfBounds { index, length })
}

fn argument_types(args: &[Value]) -> String {
    args.iter().map(Value::type_name).collect::<Vec<_>>().join(", ")
}

fn unknown_method(receiver: &Value, name: &str, args: &[Value]) -> EvalError {
    let type_name = match receiver {
        Value::Type(name) => name.clone(),
        other => other.type_name().to_string(),
    };
    EvalError::UnknownMethod {
        type_name,
        method: name.to_string(),
        arguments: argument_types(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whitelist::WhitelistConfig;
    use gateway_el_types::Headers;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    fn builtin() -> WhitelistRegistry {
        WhitelistRegistry::builtin()
    }

    #[test]
    fn test_property_reads() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);

        let mut map = IndexMap::new();
        map.insert("application".to_string(), Value::from("app-1"));
        let map = Value::Map(map);
        assert_eq!(resolver.property(&map, "application", false).unwrap(), Value::from("app-1"));
        assert_eq!(resolver.property(&map, "missing", false).unwrap(), Value::Null);

        assert_eq!(resolver.property(&Value::Null, "name", true).unwrap(), Value::Null);
        assert!(matches!(
            resolver.property(&Value::Null, "name", false),
            Err(EvalError::NullNavigation { .. })
        ));
        assert!(matches!(
            resolver.property(&Value::Integer(1), "name", false),
            Err(EvalError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_header_index_yields_all_values() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);

        let mut headers = Headers::new();
        headers.add("X-Gravitee-Endpoint", "a").add("X-Gravitee-Endpoint", "b");
        let headers = Value::Headers(headers);

        let values = resolver.index(&headers, &Value::from("x-gravitee-endpoint")).unwrap();
        assert_eq!(values, Value::from(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(resolver.index(&values, &Value::Integer(1)).unwrap(), Value::from("b"));
        assert_eq!(resolver.index(&headers, &Value::from("missing")).unwrap(), Value::Null);
    }

    #[rstest]
    #[case(Value::Integer(2))]
    #[case(Value::Integer(-1))]
    fn test_list_index_out_of_bounds(#[case] index: Value) {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);
        let list = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert!(matches!(
            resolver.index(&list, &index),
            Err(EvalError::IndexOutOfBounds { length: 2, .. })
        ));
    }

    #[test]
    fn test_static_method_call() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);
        let math = resolver.type_ref("java.lang.Math").unwrap();
        assert_eq!(
            resolver.invoke(&math, "abs", &[Value::Integer(-1)], false).unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn test_denied_method_reports_signature() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);
        let system = resolver.type_ref("java.lang.System").unwrap();
        let err = resolver
            .invoke(&system, "getenv", &[], false)
            .unwrap_err();
        assert!(err.is_security_violation());
    }

    #[test]
    fn test_unknown_type_is_security_violation() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);
        let err = resolver.type_ref("java.lang.Runtime.Missing").unwrap_err();
        assert!(err.is_security_violation());
    }

    #[test]
    fn test_instance_method_on_string() {
        let whitelist = builtin();
        let resolver = SecuredResolver::new(&whitelist);
        let text = Value::from("gravitee");
        assert_eq!(
            resolver.invoke(&text, "length", &[], false).unwrap(),
            Value::Integer(8)
        );
        assert!(matches!(
            resolver.invoke(&text, "noSuchMethod", &[], false),
            Err(EvalError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_constructor_denied_in_replace_mode() {
        let types = Arc::new(TypeRegistry::with_builtins());
        let whitelist = WhitelistRegistry::new(
            types,
            &WhitelistConfig::replace(["method java.lang.Math abs int"]),
        );
        let resolver = SecuredResolver::new(&whitelist);
        let err = resolver
            .construct("java.lang.String", &[Value::from("x")])
            .unwrap_err();
        assert!(matches!(err, EvalError::ConstructorNotAllowed { .. }));
    }
}
