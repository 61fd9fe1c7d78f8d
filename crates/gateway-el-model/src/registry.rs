//! Type registry: hierarchy walks, assignability and overload selection

use crate::descriptor::{ConstructorDescriptor, MethodDescriptor, MethodSignature, TypeDescriptor};
use gateway_el_diagnostics::{ElError, EL0102, EL0205};
use gateway_el_types::{type_names, Value};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("no method {type_name}.{name}({params}) is declared")]
    UnknownMethod {
        type_name: String,
        name: String,
        params: String,
    },

    #[error("no constructor {type_name}({params}) is declared")]
    UnknownConstructor { type_name: String, params: String },
}

impl From<ModelError> for ElError {
    fn from(err: ModelError) -> Self {
        match &err {
            ModelError::UnknownType(name) => {
                let name = name.clone();
                ElError::security(EL0102, err.to_string(), name)
            }
            _ => ElError::evaluation(EL0205, err.to_string()),
        }
    }
}

const PRIMITIVES: [&str; 4] = ["int", "long", "double", "boolean"];

/// Catalog of host types known to the evaluator
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in catalog
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_all(&mut registry);
        registry
    }

    /// Add or replace a type
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        debug!(
            "registering type {} ({} methods, {} constructors)",
            descriptor.name,
            descriptor.methods.len(),
            descriptor.constructors.len()
        );
        self.types.insert(descriptor.name.clone(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Direct supertype followed by directly implemented interfaces
    pub fn direct_supertypes<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let descriptor = self.types.get(name);
        descriptor
            .and_then(|d| d.supertype.as_deref())
            .into_iter()
            .chain(descriptor.into_iter().flat_map(|d| d.interfaces.iter().map(String::as_str)))
    }

    /// `name` followed by every supertype and interface, depth first, without repeats
    pub fn linearize<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.linearize_into(name, &mut order, &mut seen);
        order
    }

    fn linearize_into<'a>(&'a self, name: &'a str, order: &mut Vec<&'a str>, seen: &mut HashSet<&'a str>) {
        if !seen.insert(name) {
            return;
        }
        order.push(name);
        for parent in self.direct_supertypes(name) {
            self.linearize_into(parent, order, seen);
        }
    }

    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        from == to || to == type_names::OBJECT || self.linearize(from).contains(&to)
    }

    /// Methods named `name` visible on `type_name`, most specific declaration first.
    ///
    /// A method redeclared lower in the hierarchy hides the inherited one.
    pub fn find_methods(&self, type_name: &str, name: &str) -> Vec<&MethodDescriptor> {
        let mut found: Vec<&MethodDescriptor> = Vec::new();
        for ty in self.linearize(type_name) {
            let Some(descriptor) = self.types.get(ty) else {
                continue;
            };
            for method in descriptor.methods.iter().filter(|m| m.signature.name == name) {
                if !found.iter().any(|f| f.signature.overrides(&method.signature)) {
                    found.push(method);
                }
            }
        }
        found
    }

    pub fn find_static_methods(&self, type_name: &str, name: &str) -> Vec<&MethodDescriptor> {
        self.types
            .get(type_name)
            .map(|d| {
                d.methods
                    .iter()
                    .filter(|m| m.signature.is_static && m.signature.name == name)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn constructors(&self, type_name: &str) -> &[ConstructorDescriptor] {
        self.types
            .get(type_name)
            .map(|d| d.constructors.as_slice())
            .unwrap_or(&[])
    }

    /// Implementation to run for `signature` on a receiver of `runtime_type`.
    ///
    /// Interface methods usually carry no implementation; the most specific
    /// declaration with a native implementation wins, falling back to the
    /// host-dispatched declaration.
    pub fn implementation_for<'a>(
        &'a self,
        runtime_type: &str,
        signature: &MethodSignature,
    ) -> Option<&'a MethodDescriptor> {
        let declarations: Vec<&MethodDescriptor> = self
            .linearize(runtime_type)
            .into_iter()
            .filter_map(|ty| self.types.get(ty))
            .flat_map(|d| d.methods.iter())
            .filter(|m| m.signature.overrides(signature))
            .collect();
        declarations
            .iter()
            .find(|m| m.implementation.is_some())
            .or_else(|| declarations.first())
            .copied()
    }

    /// Method declared on `type_name` with exactly `params`
    pub fn resolve_method(
        &self,
        type_name: &str,
        name: &str,
        params: &[String],
    ) -> Result<&MethodDescriptor, ModelError> {
        let descriptor = self
            .types
            .get(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))?;
        descriptor
            .declared_method(name, params)
            .ok_or_else(|| ModelError::UnknownMethod {
                type_name: type_name.to_string(),
                name: name.to_string(),
                params: params.join(", "),
            })
    }

    pub fn resolve_constructor(
        &self,
        type_name: &str,
        params: &[String],
    ) -> Result<&ConstructorDescriptor, ModelError> {
        let descriptor = self
            .types
            .get(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))?;
        descriptor
            .declared_constructor(params)
            .ok_or_else(|| ModelError::UnknownConstructor {
                type_name: type_name.to_string(),
                params: params.join(", "),
            })
    }

    /// Cost of passing `arg` where `param` is expected; `None` when it does not fit.
    ///
    /// 0 is an exact match, 1 a widening or supertype conversion, 2 a match
    /// through `java.lang.Object`.
    pub fn argument_cost(&self, param: &str, arg: &Value) -> Option<u32> {
        let param = param.trim_end_matches("...");
        match (param, arg) {
            ("int", Value::Integer(_))
            | ("long", Value::Long(_))
            | ("double", Value::Decimal(_))
            | ("boolean", Value::Boolean(_)) => Some(0),
            ("long", Value::Integer(_)) | ("double", Value::Integer(_) | Value::Long(_)) => Some(1),
            (p, _) if PRIMITIVES.contains(&p) => None,
            (_, Value::Null) => Some(1),
            (p, _) if p == arg.type_name() => Some(0),
            (p, _) if p == type_names::OBJECT => Some(2),
            (p, _) if self.is_assignable(arg.type_name(), p) => Some(1),
            _ => None,
        }
    }

    /// Total cost of calling with `params`, honouring a trailing rest parameter
    pub fn signature_cost(&self, params: &[String], args: &[Value]) -> Option<u32> {
        let varargs = params.last().is_some_and(|p| p.ends_with("..."));
        if !varargs {
            if params.len() != args.len() {
                return None;
            }
            return params
                .iter()
                .zip(args)
                .map(|(param, arg)| self.argument_cost(param, arg))
                .sum();
        }

        let fixed = params.len() - 1;
        if args.len() < fixed {
            return None;
        }
        let head: u32 = params[..fixed]
            .iter()
            .zip(args)
            .map(|(param, arg)| self.argument_cost(param, arg))
            .sum::<Option<u32>>()?;
        let rest = &params[fixed];
        let tail: u32 = args[fixed..]
            .iter()
            .map(|arg| self.argument_cost(rest, arg).map(|cost| cost + 1))
            .sum::<Option<u32>>()?;
        Some(head + tail + 1)
    }

    /// Cheapest applicable method; ties go to the earlier candidate
    pub fn select_method<'a, I>(&self, candidates: I, args: &[Value]) -> Option<&'a MethodDescriptor>
    where
        I: IntoIterator<Item = &'a MethodDescriptor>,
    {
        candidates
            .into_iter()
            .filter_map(|m| self.signature_cost(&m.signature.params, args).map(|cost| (cost, m)))
            .min_by_key(|(cost, _)| *cost)
            .map(|(_, m)| m)
    }

    pub fn select_constructor<'a, I>(
        &self,
        candidates: I,
        args: &[Value],
    ) -> Option<&'a ConstructorDescriptor>
    where
        I: IntoIterator<Item = &'a ConstructorDescriptor>,
    {
        candidates
            .into_iter()
            .filter_map(|c| self.signature_cost(&c.signature.params, args).map(|cost| (cost, c)))
            .min_by_key(|(cost, _)| *cost)
            .map(|(_, c)| c)
    }
}
